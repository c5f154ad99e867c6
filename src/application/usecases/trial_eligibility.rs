use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::trial_history::InsertTrialHistoryEntity;
use crate::domain::repositories::{
    products::ProductRepository, subscriptions::SubscriptionRepository,
    trial_history::TrialHistoryRepository,
};
use crate::domain::value_objects::enums::trial_statuses::TrialStatus;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialEligibility {
    pub eligible: bool,
    pub reason: Option<&'static str>,
}

impl TrialEligibility {
    fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    fn ineligible(reason: &'static str) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialUsage {
    Recorded,
    AlreadyUsed,
}

pub struct TrialEligibilityUseCase {
    product_repo: Arc<dyn ProductRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    trial_history_repo: Arc<dyn TrialHistoryRepository + Send + Sync>,
}

impl TrialEligibilityUseCase {
    pub fn new(
        product_repo: Arc<dyn ProductRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        trial_history_repo: Arc<dyn TrialHistoryRepository + Send + Sync>,
    ) -> Self {
        Self {
            product_repo,
            subscription_repo,
            trial_history_repo,
        }
    }

    /// Advisory check used by the storefront. The authoritative gate is the
    /// uniqueness constraint behind `record_trial_usage`.
    pub async fn check_eligibility(
        &self,
        user_id: Option<Uuid>,
        product_id: Uuid,
    ) -> Result<TrialEligibility, TrialError> {
        let Some(user_id) = user_id else {
            return Ok(TrialEligibility::ineligible("authentication required"));
        };

        let Some(product) = self.product_repo.find_by_id(product_id).await? else {
            return Ok(TrialEligibility::ineligible("product not found"));
        };

        if !product.is_subscription {
            return Ok(TrialEligibility::ineligible(
                "product is not a subscription",
            ));
        }

        if !product.has_trial() {
            return Ok(TrialEligibility::ineligible("product has no trial"));
        }

        if self.trial_history_repo.exists(user_id, product_id).await? {
            return Ok(TrialEligibility::ineligible("trial already used"));
        }

        if self
            .subscription_repo
            .find_active_or_trial(user_id, product_id)
            .await?
            .is_some()
        {
            return Ok(TrialEligibility::ineligible(
                "subscription already active",
            ));
        }

        Ok(TrialEligibility::eligible())
    }

    /// Exactly-once per (user, product): the insert re-checks existence
    /// inside the same statement as the write, so the second of two racing
    /// calls observes the first's row and declines.
    pub async fn record_trial_usage(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<TrialUsage, TrialError> {
        let recorded = self
            .trial_history_repo
            .insert_if_absent(InsertTrialHistoryEntity {
                user_id,
                product_id,
                subscription_id,
                status: TrialStatus::Active.to_string(),
                started_at: Utc::now(),
            })
            .await?;

        if recorded {
            info!(%user_id, %product_id, %subscription_id, "trial usage recorded");
            Ok(TrialUsage::Recorded)
        } else {
            // The constraint caught a concurrent or repeated claim.
            warn!(%user_id, %product_id, "duplicate trial usage declined");
            Ok(TrialUsage::AlreadyUsed)
        }
    }
}
