//! Payment processor bridge.
//!
//! The card form and the charge confirmation live in the processor's own
//! client library. The core hands it a published key plus the client secret
//! issued by the API and gets back the outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Final status of a confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessorStatus {
    Succeeded,
    /// The charge needs an extra step (3-D Secure and the like) the host must drive.
    RequiresAction,
    Failed { reason: String },
}

/// Outcome returned by [`PaymentProcessor::confirm_card_payment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorOutcome {
    /// Processor-side payment intent identifier, echoed to the API on success.
    pub intent_id: String,
    #[serde(flatten)]
    pub status: ProcessorStatus,
}

impl ProcessorOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ProcessorStatus::Succeeded
    }
}

/// External payment processor client.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Collect card details and confirm the charge identified by `client_secret`.
    ///
    /// Declines are reported through [`ProcessorStatus::Failed`]; `Err` is
    /// reserved for the processor being unreachable.
    async fn confirm_card_payment(
        &self,
        publishable_key: &str,
        client_secret: &str,
    ) -> Result<ProcessorOutcome>;
}
