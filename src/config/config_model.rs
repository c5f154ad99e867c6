#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub razorpay: Razorpay,
    pub billing: Billing,
    pub scheduler: Scheduler,
    pub notifications: Notifications,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Razorpay {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Billing {
    pub max_payment_retries: i32,
    pub retry_interval_days: i64,
    pub auto_cancel_on_exhaustion: bool,
    pub failed_grace_days: i64,
    pub overdue_grace_hours: i64,
    pub trial_reminder_days: i64,
    pub charge_throttle_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    pub renewal_sweep_secs: u64,
    pub retry_sweep_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    pub lifecycle_webhook_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserSecret {
    pub secret: String,
}
