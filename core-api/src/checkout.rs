//! # Checkout
//!
//! Buying a single audiobook takes four steps:
//!
//! 1. fetch the processor's publishable key (`payments/config/`)
//! 2. ask the server for a payment intent (`payments/create-intent/`)
//! 3. let the [`PaymentProcessor`] collect the card and confirm the charge
//! 4. report the confirmed intent back to the server (`payments/confirm/`)
//!
//! The server learns about the purchase only in step 4, so a decline in
//! step 3 leaves nothing to undo.

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::PaymentConfirmation;
use bridge_traits::payment::{PaymentProcessor, ProcessorStatus};
use core_runtime::events::{CoreEvent, PaymentEvent};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct CheckoutFlow {
    api: ApiClient,
    processor: Arc<dyn PaymentProcessor>,
}

impl CheckoutFlow {
    pub fn new(api: ApiClient, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { api, processor }
    }

    /// Runs the whole purchase of `audiobook_id`.
    ///
    /// Publishes `IntentCreated` once the server issued an intent, then
    /// either `Succeeded` or `Failed`.
    ///
    /// # Errors
    ///
    /// - `PaymentDeclined` with the processor's reason
    /// - `PaymentRequiresAction` when the charge needs a step the processor
    ///   did not complete
    /// - any [`ApiClient`] error from the three server calls
    #[instrument(skip(self))]
    pub async fn purchase(&self, audiobook_id: u64) -> Result<PaymentConfirmation> {
        let result = self.try_purchase(audiobook_id).await;

        match &result {
            Ok(_) => {
                info!(audiobook_id, "Purchase completed");
                self.emit(PaymentEvent::Succeeded { audiobook_id });
            }
            Err(e) => {
                warn!(audiobook_id, error = %e, "Purchase failed");
                self.emit(PaymentEvent::Failed {
                    audiobook_id,
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn try_purchase(&self, audiobook_id: u64) -> Result<PaymentConfirmation> {
        let config = self.api.payment_config().await?;
        let intent = self.api.create_payment_intent(audiobook_id).await?;
        self.emit(PaymentEvent::IntentCreated { audiobook_id });

        let outcome = self
            .processor
            .confirm_card_payment(&config.publishable_key, &intent.client_secret)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        match outcome.status {
            ProcessorStatus::Succeeded => self.api.confirm_payment(&outcome.intent_id).await,
            ProcessorStatus::RequiresAction => Err(ApiError::PaymentRequiresAction),
            ProcessorStatus::Failed { reason } => Err(ApiError::PaymentDeclined(reason)),
        }
    }

    fn emit(&self, event: PaymentEvent) {
        let _ = self.api.event_bus().emit(CoreEvent::Payment(event));
    }
}
