use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::payments::{GatewayCallback, PaymentLink};

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_link(
        &self,
        order_code: i64,
        amount: i64,
        description: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PaymentLink>;

    /// Checks the callback signature and extracts the settlement fields.
    fn verify_and_parse_webhook(&self, raw_body: &[u8]) -> Result<GatewayCallback>;

    async fn register_webhook(&self, webhook_url: &str) -> Result<()>;
}
