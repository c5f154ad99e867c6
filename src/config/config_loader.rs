use anyhow::{Ok, Result};

use super::config_model::{
    Billing, Database, DotEnvyConfig, Notifications, Razorpay, Scheduler, Server, UserSecret,
};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let razorpay = Razorpay {
        key_id: std::env::var("RAZORPAY_KEY_ID").expect("RAZORPAY_KEY_ID is invalid"),
        key_secret: std::env::var("RAZORPAY_KEY_SECRET").expect("RAZORPAY_KEY_SECRET is invalid"),
        webhook_secret: std::env::var("RAZORPAY_WEBHOOK_SECRET")
            .expect("RAZORPAY_WEBHOOK_SECRET is invalid"),
        currency: std::env::var("RAZORPAY_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
    };

    let billing = Billing {
        max_payment_retries: env_or("BILLING_MAX_PAYMENT_RETRIES", 3),
        retry_interval_days: env_or("BILLING_RETRY_INTERVAL_DAYS", 2),
        auto_cancel_on_exhaustion: env_or("BILLING_AUTO_CANCEL_ON_EXHAUSTION", false),
        failed_grace_days: env_or("BILLING_FAILED_GRACE_DAYS", 30),
        overdue_grace_hours: env_or("BILLING_OVERDUE_GRACE_HOURS", 6),
        trial_reminder_days: env_or("BILLING_TRIAL_REMINDER_DAYS", 3),
        charge_throttle_ms: env_or("BILLING_CHARGE_THROTTLE_MS", 250),
    };

    let scheduler = Scheduler {
        renewal_sweep_secs: env_or("SCHEDULER_RENEWAL_SWEEP_SECS", 86_400),
        retry_sweep_secs: env_or("SCHEDULER_RETRY_SWEEP_SECS", 3_600),
    };

    let notifications = Notifications {
        lifecycle_webhook_url: std::env::var("NOTIFY_LIFECYCLE_WEBHOOK_URL").ok(),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        razorpay,
        billing,
        scheduler,
        notifications,
    })
}

pub fn get_user_secret() -> Result<UserSecret> {
    dotenvy::dotenv().ok();

    Ok(UserSecret {
        secret: std::env::var("JWT_USER_SECRET").expect("JWT_USER_SECRET is invalid"),
    })
}
