// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bank-data aggregator client (Plaid-compatible REST API).
//!
//! Covers the four calls the linking flow needs: link-token creation,
//! public-token exchange, account fetch, and processor-token creation.
//! Client credentials ride in every request body, per the aggregator's
//! API convention.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::PlaidConfig;

const LINK_PRODUCTS: [&str; 1] = ["auth"];
const LINK_LANGUAGE: &str = "en";
const LINK_COUNTRY_CODES: [&str; 1] = ["US"];
const PROCESSOR: &str = "dwolla";

#[derive(Debug, thiserror::Error)]
pub enum PlaidError {
    #[error("aggregator request failed: {0}")]
    Request(String),

    #[error("aggregator rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("aggregator response was invalid: {0}")]
    InvalidResponse(String),
}

/// Result of a public-token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    pub item_id: String,
}

/// Balance data reported by the aggregator for one account.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AccountBalances {
    pub available: Option<f64>,
    pub current: Option<f64>,
}

/// One account attached to a linked item.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LinkedAccount {
    pub account_id: String,
    pub name: String,
    pub balances: AccountBalances,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<LinkedAccount>,
}

#[derive(Debug, Deserialize)]
struct ProcessorTokenCreateResponse {
    processor_token: String,
}

#[derive(Debug, Clone)]
pub struct PlaidClient {
    base_url: String,
    client_id: String,
    secret: String,
    client_name: String,
    http: Client,
}

impl PlaidClient {
    pub fn new(config: &PlaidConfig) -> Result<Self, PlaidError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| PlaidError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            client_name: config.client_name.clone(),
            http,
        })
    }

    /// Create a short-lived link token scoped to one user.
    pub async fn create_link_token(
        &self,
        client_user_id: &str,
    ) -> Result<String, PlaidError> {
        let payload = link_token_payload(client_user_id, &self.client_name);
        let response: LinkTokenCreateResponse =
            self.post_json("/link/token/create", payload).await?;
        Ok(response.link_token)
    }

    /// Exchange a public token for a durable access token and item ID.
    pub async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<TokenExchange, PlaidError> {
        self.post_json(
            "/item/public_token/exchange",
            json!({ "public_token": public_token }),
        )
        .await
    }

    /// Fetch the accounts attached to an access token.
    pub async fn get_accounts(
        &self,
        access_token: &str,
    ) -> Result<Vec<LinkedAccount>, PlaidError> {
        let response: AccountsGetResponse = self
            .post_json("/accounts/get", json!({ "access_token": access_token }))
            .await?;
        Ok(response.accounts)
    }

    /// Create a processor token scoped to the payment-rail provider.
    pub async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, PlaidError> {
        let response: ProcessorTokenCreateResponse = self
            .post_json(
                "/processor/token/create",
                json!({
                    "access_token": access_token,
                    "account_id": account_id,
                    "processor": PROCESSOR,
                }),
            )
            .await?;
        Ok(response.processor_token)
    }

    async fn post_json<T>(&self, path: &str, mut payload: Value) -> Result<T, PlaidError>
    where
        T: serde::de::DeserializeOwned,
    {
        // Credentials are body fields, not headers, on this API.
        let body = payload
            .as_object_mut()
            .ok_or_else(|| PlaidError::InvalidResponse("payload must be an object".to_string()))?;
        body.insert("client_id".to_string(), Value::String(self.client_id.clone()));
        body.insert("secret".to_string(), Value::String(self.secret.clone()));

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PlaidError::Request(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaidError::Rejected { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| PlaidError::InvalidResponse(format!("POST {path} invalid JSON: {e}")))
    }
}

/// Build the link-token request body: fixed product set, language, and
/// country codes, scoped to the given user.
fn link_token_payload(client_user_id: &str, client_name: &str) -> Value {
    json!({
        "user": { "client_user_id": client_user_id },
        "client_name": client_name,
        "products": LINK_PRODUCTS,
        "language": LINK_LANGUAGE,
        "country_codes": LINK_COUNTRY_CODES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_token_payload_has_fixed_product_scope() {
        let payload = link_token_payload("user_1", "Bankbridge");
        assert_eq!(
            payload.pointer("/user/client_user_id").and_then(Value::as_str),
            Some("user_1")
        );
        assert_eq!(payload["client_name"], "Bankbridge");
        assert_eq!(payload["products"], json!(["auth"]));
        assert_eq!(payload["language"], "en");
        assert_eq!(payload["country_codes"], json!(["US"]));
    }

    #[test]
    fn accounts_response_parses_first_account_fields() {
        let raw = json!({
            "accounts": [
                {
                    "account_id": "acc_1",
                    "name": "Checking",
                    "balances": { "available": 100.0, "current": 110.0 },
                    "type": "depository",
                    "subtype": "checking"
                },
                {
                    "account_id": "acc_2",
                    "name": "Savings",
                    "balances": { "available": null, "current": 250.5 },
                    "type": "depository",
                    "subtype": null
                }
            ]
        });

        let parsed: AccountsGetResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.accounts.len(), 2);
        assert_eq!(parsed.accounts[0].account_id, "acc_1");
        assert_eq!(parsed.accounts[0].name, "Checking");
        assert_eq!(parsed.accounts[0].balances.current, Some(110.0));
        assert_eq!(parsed.accounts[0].account_type, "depository");
        assert_eq!(parsed.accounts[1].balances.available, None);
        assert_eq!(parsed.accounts[1].subtype, None);
    }

    #[test]
    fn exchange_response_parses_token_and_item() {
        let raw = json!({
            "access_token": "access-sandbox-123",
            "item_id": "item_1",
            "request_id": "req_1"
        });
        let parsed: TokenExchange = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.access_token, "access-sandbox-123");
        assert_eq!(parsed.item_id, "item_1");
    }

    #[test]
    fn empty_account_list_parses_without_error() {
        let parsed: AccountsGetResponse =
            serde_json::from_value(json!({ "accounts": [] })).unwrap();
        assert!(parsed.accounts.is_empty());
    }
}
