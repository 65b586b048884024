// SPDX-License-Identifier: AGPL-3.0-or-later

//! Payment-rail provider client (Dwolla-compatible REST API).
//!
//! Authenticates with OAuth client credentials and creates customers and
//! funding sources. Created resources are identified by the `Location`
//! header of the 201 response, not the body.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::DwollaConfig;

const HAL_CONTENT_TYPE: &str = "application/vnd.dwolla.v1.hal+json";

// Jurisdiction-specific identity fields the signup form does not collect;
// the upstream sandbox accepts these static values for every customer.
const PLACEHOLDER_SSN: &str = "1234";
const PLACEHOLDER_STATE: &str = "TX";
const PLACEHOLDER_POSTAL_CODE: &str = "12345";
const CUSTOMER_TYPE: &str = "personal";

#[derive(Debug, thiserror::Error)]
pub enum DwollaError {
    #[error("payment rail auth failed: {0}")]
    Auth(String),

    #[error("payment rail request failed: {0}")]
    Request(String),

    #[error("payment rail rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("payment rail response was invalid: {0}")]
    InvalidResponse(String),
}

/// Identity fields for a new payment-rail customer.
pub struct NewCustomer<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub address1: &'a str,
    pub city: &'a str,
    pub date_of_birth: &'a str,
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct DwollaClient {
    base_url: String,
    key: String,
    secret: String,
    http: Client,
}

impl DwollaClient {
    pub fn new(config: &DwollaConfig) -> Result<Self, DwollaError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DwollaError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            secret: config.secret.clone(),
            http,
        })
    }

    /// Create a personal customer; returns the customer URL.
    pub async fn create_customer(&self, customer: NewCustomer<'_>) -> Result<String, DwollaError> {
        self.post_for_location("/customers", customer_payload(&customer))
            .await
    }

    /// Create a funding source from a processor token; returns the
    /// funding source URL.
    pub async fn create_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        bank_name: &str,
    ) -> Result<String, DwollaError> {
        let path = format!("/customers/{customer_id}/funding-sources");
        self.post_for_location(
            &path,
            json!({
                "plaidToken": processor_token,
                "name": bank_name,
            }),
        )
        .await
    }

    /// Soft-remove a funding source. Used as the compensating action when
    /// record persistence fails after the funding source was created.
    pub async fn remove_funding_source(
        &self,
        funding_source_url: &str,
    ) -> Result<(), DwollaError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(funding_source_url)
            .bearer_auth(token)
            .header("Content-Type", HAL_CONTENT_TYPE)
            .header("Accept", HAL_CONTENT_TYPE)
            .json(&json!({ "removed": true }))
            .send()
            .await
            .map_err(|e| DwollaError::Request(format!("funding source removal failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DwollaError::Rejected { status, body });
        }
        Ok(())
    }

    async fn access_token(&self) -> Result<String, DwollaError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .basic_auth(&self.key, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| DwollaError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DwollaError::Auth(format!(
                "token request returned {status}: {body}"
            )));
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| DwollaError::Auth(format!("invalid token response: {e}")))?;

        if token_response.access_token.trim().is_empty() {
            return Err(DwollaError::Auth(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(token_response.access_token)
    }

    /// POST a HAL payload and return the created resource's `Location`.
    async fn post_for_location(&self, path: &str, payload: Value) -> Result<String, DwollaError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("Content-Type", HAL_CONTENT_TYPE)
            .header("Accept", HAL_CONTENT_TYPE)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DwollaError::Request(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DwollaError::Rejected { status, body });
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                DwollaError::InvalidResponse(format!(
                    "POST {path} returned no Location header"
                ))
            })?;

        Ok(location)
    }
}

fn customer_payload(customer: &NewCustomer<'_>) -> Value {
    json!({
        "firstName": customer.first_name,
        "lastName": customer.last_name,
        "email": customer.email,
        "type": CUSTOMER_TYPE,
        "address1": customer.address1,
        "city": customer.city,
        "state": PLACEHOLDER_STATE,
        "postalCode": PLACEHOLDER_POSTAL_CODE,
        "dateOfBirth": customer.date_of_birth,
        "ssn": PLACEHOLDER_SSN,
    })
}

/// Extract the customer ID from a customer URL (the last path segment).
pub fn extract_customer_id_from_url(customer_url: &str) -> Option<String> {
    let parsed = url::Url::parse(customer_url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_payload_substitutes_placeholder_identity_fields() {
        let payload = customer_payload(&NewCustomer {
            first_name: "Ada",
            last_name: "Lovelace",
            email: "ada@example.com",
            address1: "1 Analytical Way",
            city: "London",
            date_of_birth: "1990-01-02",
        });

        assert_eq!(payload["firstName"], "Ada");
        assert_eq!(payload["type"], "personal");
        assert_eq!(payload["ssn"], "1234");
        assert_eq!(payload["state"], "TX");
        assert_eq!(payload["postalCode"], "12345");
        assert_eq!(payload["dateOfBirth"], "1990-01-02");
    }

    #[test]
    fn extract_customer_id_takes_last_path_segment() {
        assert_eq!(
            extract_customer_id_from_url(
                "https://api-sandbox.dwolla.com/customers/7d9c0c6b-3f3f-4a51"
            )
            .as_deref(),
            Some("7d9c0c6b-3f3f-4a51")
        );
        assert_eq!(
            extract_customer_id_from_url("https://api-sandbox.dwolla.com/customers/cust_1/")
                .as_deref(),
            Some("cust_1")
        );
    }

    #[test]
    fn extract_customer_id_rejects_malformed_urls() {
        assert_eq!(extract_customer_id_from_url(""), None);
        assert_eq!(extract_customer_id_from_url("not a url"), None);
        assert_eq!(extract_customer_id_from_url("https://api-sandbox.dwolla.com"), None);
    }
}
