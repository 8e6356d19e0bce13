//! Payment gateway seam and its deterministic stub.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use business_cart_core::{Money, PaymentMethod, TransactionId};

/// Token the stub accepts for card payments.
pub const STRIPE_TEST_TOKEN: &str = "tok_stripe_valid";

/// Token the stub accepts for Amazon Pay.
pub const AMAZON_PAY_TEST_TOKEN: &str = "amz_pay_valid";

/// Errors a charge can end in.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway refused the charge.
    #[error("payment declined")]
    Declined,

    /// The gateway could not be reached or answered unexpectedly.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// A payment processor.
///
/// One call, one attempt: implementations never retry internally.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Capture `amount` in full.
    async fn charge(
        &self,
        amount: Money,
        method: PaymentMethod,
        token: &str,
    ) -> Result<TransactionId, PaymentError>;
}

/// Gateway that approves exactly one sentinel token per method.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubGateway;

impl StubGateway {
    const fn accepted_token(method: PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::Stripe => STRIPE_TEST_TOKEN,
            PaymentMethod::AmazonPay => AMAZON_PAY_TEST_TOKEN,
        }
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn charge(
        &self,
        amount: Money,
        method: PaymentMethod,
        token: &str,
    ) -> Result<TransactionId, PaymentError> {
        if amount.is_negative() || token != Self::accepted_token(method) {
            tracing::info!(%method, "Stub gateway declined charge");
            return Err(PaymentError::Declined);
        }

        let transaction = TransactionId::new(format!(
            "{}_{}",
            method.transaction_prefix(),
            Uuid::new_v4()
        ));
        tracing::info!(%method, %amount, %transaction, "Stub gateway captured charge");
        Ok(transaction)
    }
}
