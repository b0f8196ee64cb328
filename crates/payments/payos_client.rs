use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tracing::{error, info};

use crate::domain::{
    interfaces::payment_gateway::PaymentGateway,
    value_objects::payments::{GatewayCallback, PaymentLink},
};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_PAYOS_API_BASE_URL: &str = "https://api-merchant.payos.vn";
/// PayOS rejects payment descriptions longer than this.
pub const MAX_DESCRIPTION_CHARS: usize = 25;
const PAYOS_OK_CODE: &str = "00";

#[derive(Debug, Clone)]
pub struct PayOsCredentials {
    pub client_id: String,
    pub api_key: String,
    pub checksum_key: String,
}

/// PayOS merchant API client built on reqwest.
pub struct PayOsClient {
    http: reqwest::Client,
    credentials: PayOsCredentials,
    api_base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentItem<'a> {
    name: &'a str,
    quantity: u32,
    price: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    items: Vec<PaymentItem<'a>>,
    cancel_url: &'a str,
    return_url: &'a str,
    signature: String,
}

/// Every PayOS response is wrapped as `{code, desc, data}`.
#[derive(Debug, Deserialize)]
struct PayOsEnvelope<T> {
    code: String,
    desc: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentLinkData {
    checkout_url: String,
    payment_link_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    code: Option<String>,
    data: Value,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookData {
    order_code: i64,
    code: Option<String>,
    reference: Option<String>,
}

impl PayOsClient {
    pub fn new(
        credentials: PayOsCredentials,
        api_base_url: String,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build PayOS http client")?;

        Ok(Self {
            http,
            credentials,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn ensure_success<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<Option<T>> {
        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        if status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<PayOsEnvelope<T>>(&body) {
                if envelope.code == PAYOS_OK_CODE {
                    return Ok(envelope.data);
                }
                error!(
                    status = %status,
                    payos_code = %envelope.code,
                    payos_desc = ?envelope.desc,
                    context = %context,
                    "payos api rejected request"
                );
                bail!(
                    "PayOS API request failed: {} (code {}, desc={:?})",
                    context,
                    envelope.code,
                    envelope.desc
                );
            }
        }

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "payos api request failed"
        );

        bail!("PayOS API request failed: {} (status {})", context, status);
    }

    /// Creates a hosted checkout link for `order_code`.
    pub async fn create_payment_link(
        &self,
        order_code: i64,
        amount: i64,
        description: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PaymentLink> {
        let description = truncate_description(description);
        let signature = self.sign(&payment_request_signing_string(
            amount,
            cancel_url,
            &description,
            order_code,
            return_url,
        ))?;

        let request = CreatePaymentRequest {
            order_code,
            amount,
            description: &description,
            items: vec![PaymentItem {
                name: &description,
                quantity: 1,
                price: amount,
            }],
            cancel_url,
            return_url,
            signature,
        };

        let resp = self
            .http
            .post(format!("{}/v2/payment-requests", self.api_base_url))
            .header("x-client-id", &self.credentials.client_id)
            .header("x-api-key", &self.credentials.api_key)
            .json(&request)
            .send()
            .await?;

        let data = Self::ensure_success::<PaymentLinkData>(resp, "create payment link")
            .await?
            .ok_or_else(|| anyhow!("PayOS payment link response has no data"))?;

        Ok(PaymentLink {
            checkout_url: data.checkout_url,
            payment_link_id: data.payment_link_id,
        })
    }

    /// Registers the URL PayOS posts payment results to.
    pub async fn confirm_webhook(&self, webhook_url: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/confirm-webhook", self.api_base_url))
            .header("x-client-id", &self.credentials.client_id)
            .header("x-api-key", &self.credentials.api_key)
            .json(&serde_json::json!({ "webhookUrl": webhook_url }))
            .send()
            .await?;
        Self::ensure_success::<Value>(resp, "confirm webhook").await?;

        info!(webhook_url = %webhook_url, "PayOS webhook registered");
        Ok(())
    }

    /// Verifies a webhook body and extracts the settlement fields.
    pub fn verify_webhook(&self, payload: &[u8]) -> Result<GatewayCallback> {
        let raw_payload = std::str::from_utf8(payload)
            .context("webhook body is not valid UTF-8")?
            .to_string();
        let body: WebhookBody =
            serde_json::from_str(&raw_payload).context("webhook body is not a PayOS callback")?;

        let provided = hex::decode(body.signature.trim()).context("webhook signature is not hex")?;
        let mut mac = self.mac()?;
        mac.update(webhook_signing_string(&body.data)?.as_bytes());
        // constant-time comparison
        mac.verify_slice(&provided)
            .map_err(|_| anyhow!("invalid webhook signature"))?;

        let data: WebhookData =
            serde_json::from_value(body.data).context("webhook data is missing orderCode")?;

        let result_code = data
            .code
            .or(body.code)
            .ok_or_else(|| anyhow!("webhook carries no result code"))?;

        Ok(GatewayCallback {
            order_code: data.order_code,
            result_code,
            reference: data.reference.filter(|reference| !reference.is_empty()),
            raw_payload,
        })
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.credentials.checksum_key.as_bytes())
            .map_err(|err| anyhow!("invalid PayOS checksum key: {err}"))
    }

    fn sign(&self, message: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentGateway for PayOsClient {
    async fn create_link(
        &self,
        order_code: i64,
        amount: i64,
        description: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PaymentLink> {
        self.create_payment_link(order_code, amount, description, return_url, cancel_url)
            .await
    }

    fn verify_and_parse_webhook(&self, raw_body: &[u8]) -> Result<GatewayCallback> {
        self.verify_webhook(raw_body)
    }

    async fn register_webhook(&self, webhook_url: &str) -> Result<()> {
        self.confirm_webhook(webhook_url).await
    }
}

fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

/// Fixed field order PayOS expects for payment request signatures.
fn payment_request_signing_string(
    amount: i64,
    cancel_url: &str,
    description: &str,
    order_code: i64,
    return_url: &str,
) -> String {
    format!(
        "amount={amount}&cancelUrl={cancel_url}&description={description}&orderCode={order_code}&returnUrl={return_url}"
    )
}

/// `key=value` pairs of the webhook data object, keys sorted, joined with `&`.
/// Nulls sign as empty strings; nested values sign as their JSON text.
fn webhook_signing_string(data: &Value) -> Result<String> {
    let object = data
        .as_object()
        .ok_or_else(|| anyhow!("webhook data is not an object"))?;

    let sorted: BTreeMap<&str, String> = object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::Null => String::new(),
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.as_str(), rendered)
        })
        .collect();

    Ok(sorted
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHECKSUM_KEY: &str = "test-checksum-key";

    fn client() -> PayOsClient {
        PayOsClient::new(
            PayOsCredentials {
                client_id: "client".to_string(),
                api_key: "api".to_string(),
                checksum_key: CHECKSUM_KEY.to_string(),
            },
            DEFAULT_PAYOS_API_BASE_URL.to_string(),
            Duration::from_secs(10),
        )
        .unwrap()
    }

    fn webhook_data(code: &str) -> Value {
        json!({
            "orderCode": 1_700_000_000_123_i64,
            "amount": 49000,
            "description": "Subscription - month",
            "accountNumber": "12345678",
            "reference": "FT2601",
            "transactionDateTime": "2026-03-01 10:00:00",
            "currency": "VND",
            "paymentLinkId": "abc",
            "code": code,
            "desc": "success",
            "counterAccountName": null
        })
    }

    fn signed_body(client: &PayOsClient, data: Value) -> Vec<u8> {
        let signature = client
            .sign(&webhook_signing_string(&data).unwrap())
            .unwrap();
        serde_json::to_vec(&json!({
            "code": "00",
            "desc": "success",
            "success": true,
            "data": data,
            "signature": signature
        }))
        .unwrap()
    }

    #[test]
    fn signing_string_sorts_keys_and_blanks_nulls() {
        let data = json!({ "b": 2, "a": "x", "c": null });
        assert_eq!(webhook_signing_string(&data).unwrap(), "a=x&b=2&c=");
    }

    #[test]
    fn payment_request_signature_matches_known_vector() {
        let message = payment_request_signing_string(
            49000,
            "https://app.example/cancel",
            "Subscription - month",
            123,
            "https://app.example/return",
        );
        assert_eq!(
            message,
            "amount=49000&cancelUrl=https://app.example/cancel&description=Subscription - month&orderCode=123&returnUrl=https://app.example/return"
        );
        assert_eq!(
            client().sign(&message).unwrap(),
            "d7c7d532484a6a3fcc30dc9ab3522ed2b194ee5c1f2adc816be99344890c223f"
        );
    }

    #[test]
    fn valid_webhook_is_parsed() {
        let client = client();
        let body = signed_body(&client, webhook_data("00"));

        let callback = client.verify_webhook(&body).unwrap();

        assert_eq!(callback.order_code, 1_700_000_000_123);
        assert_eq!(callback.result_code, "00");
        assert_eq!(callback.reference.as_deref(), Some("FT2601"));
        assert_eq!(callback.raw_payload.as_bytes(), body.as_slice());
    }

    #[test]
    fn tampered_webhook_is_rejected() {
        let client = client();
        let body = signed_body(&client, webhook_data("00"));
        let tampered = String::from_utf8(body)
            .unwrap()
            .replace("49000", "1000");

        assert!(client.verify_webhook(tampered.as_bytes()).is_err());
    }

    #[test]
    fn webhook_signed_with_another_key_is_rejected() {
        let other = PayOsClient::new(
            PayOsCredentials {
                client_id: "client".to_string(),
                api_key: "api".to_string(),
                checksum_key: "someone-else".to_string(),
            },
            DEFAULT_PAYOS_API_BASE_URL.to_string(),
            Duration::from_secs(10),
        )
        .unwrap();
        let body = signed_body(&other, webhook_data("00"));

        assert!(client().verify_webhook(&body).is_err());
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(client().verify_webhook(b"not json").is_err());
        assert!(client().verify_webhook(br#"{"data":{},"signature":"zz"}"#).is_err());
    }

    #[test]
    fn descriptions_are_cut_to_gateway_limit() {
        let description = truncate_description("Subscription - premium-yearly-family");
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert_eq!(truncate_description("Subscription - day"), "Subscription - day");
    }
}
