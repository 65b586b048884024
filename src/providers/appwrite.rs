// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity provider and document store client (Appwrite-compatible REST
//! API).
//!
//! Two access modes, matching the upstream SDK's admin/session split:
//! admin calls carry the server API key; session calls carry the session
//! secret issued at sign-in. The user and bank-account directories are
//! remote collections — every read re-queries the provider, and
//! consistency is whatever the provider offers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::AppwriteConfig;
use crate::models::{BankAccount, NewBankAccount, User};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";
const SESSION_HEADER: &str = "X-Appwrite-Session";

// Account and document IDs are generated client-side; the provider
// accepts any unique ID within its character limits, and a UUID fits.
fn unique_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum AppwriteError {
    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("identity provider response was invalid: {0}")]
    InvalidResponse(String),
}

impl AppwriteError {
    /// True when the failure means the session/credentials are invalid,
    /// as opposed to a transport or server problem.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status == 401)
    }
}

/// An identity-provider account.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    pub name: String,
}

/// A provider session. The secret is only present on creation and becomes
/// the session cookie's value.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList<T> {
    documents: Vec<T>,
}

#[derive(Debug, Clone)]
pub struct AppwriteClient {
    endpoint: String,
    project_id: String,
    api_key: String,
    database_id: String,
    user_collection_id: String,
    bank_collection_id: String,
    http: Client,
}

impl AppwriteClient {
    pub fn new(config: &AppwriteConfig) -> Result<Self, AppwriteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppwriteError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            database_id: config.database_id.clone(),
            user_collection_id: config.user_collection_id.clone(),
            bank_collection_id: config.bank_collection_id.clone(),
            http,
        })
    }

    // -------------------------------------------------------------------------
    // Accounts & Sessions
    // -------------------------------------------------------------------------

    /// Create an identity-provider account.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, AppwriteError> {
        let request = self.admin(Method::POST, "/account").json(&json!({
            "userId": unique_id(),
            "email": email,
            "password": password,
            "name": name,
        }));
        send(request, "POST /account").await
    }

    /// Establish an email/password session. The returned secret is the
    /// session cookie value.
    pub async fn create_email_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppwriteError> {
        let request = self
            .admin(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }));
        send(request, "POST /account/sessions/email").await
    }

    /// Resolve a session secret to its account.
    pub async fn get_account(&self, session_secret: &str) -> Result<Account, AppwriteError> {
        let request = self.with_session(Method::GET, "/account", session_secret);
        send(request, "GET /account").await
    }

    /// Delete the session behind the given secret.
    pub async fn delete_current_session(
        &self,
        session_secret: &str,
    ) -> Result<(), AppwriteError> {
        let request =
            self.with_session(Method::DELETE, "/account/sessions/current", session_secret);
        send_no_content(request, "DELETE /account/sessions/current").await
    }

    // -------------------------------------------------------------------------
    // User Directory
    // -------------------------------------------------------------------------

    /// Create the directory record linking an identity account to its
    /// payment-rail customer.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_user_document(
        &self,
        identity_user_id: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        dwolla_customer_id: &str,
        dwolla_customer_url: &str,
    ) -> Result<User, AppwriteError> {
        let path = self.documents_path(&self.user_collection_id);
        let request = self.admin(Method::POST, &path).json(&json!({
            "documentId": unique_id(),
            "data": {
                "userId": identity_user_id,
                "email": email,
                "firstName": first_name,
                "lastName": last_name,
                "dwollaCustomerId": dwolla_customer_id,
                "dwollaCustomerUrl": dwolla_customer_url,
            },
        }));
        let document: Value = send(request, "POST user document").await?;
        parse_user_document(&document)
    }

    /// Look up the user record for an identity-provider user ID.
    pub async fn get_user_by_identity_id(
        &self,
        identity_user_id: &str,
    ) -> Result<Option<User>, AppwriteError> {
        let path = self.documents_path(&self.user_collection_id);
        let request = self
            .admin(Method::GET, &path)
            .query(&[("queries[]", equal_query("userId", identity_user_id))]);
        let list: DocumentList<Value> = send(request, "GET user documents").await?;
        list.documents
            .first()
            .map(parse_user_document)
            .transpose()
    }

    // -------------------------------------------------------------------------
    // Bank Account Directory
    // -------------------------------------------------------------------------

    /// Persist a bank-account record.
    pub async fn create_bank_document(
        &self,
        fields: &NewBankAccount,
    ) -> Result<BankAccount, AppwriteError> {
        let path = self.documents_path(&self.bank_collection_id);
        let request = self.admin(Method::POST, &path).json(&json!({
            "documentId": unique_id(),
            "data": {
                "userId": fields.user_id,
                "bankId": fields.bank_id,
                "accountId": fields.account_id,
                "accessToken": fields.access_token,
                "fundingSourceUrl": fields.funding_source_url,
                "shareableId": fields.shareable_id,
            },
        }));
        let document: Value = send(request, "POST bank document").await?;
        parse_bank_document(&document)
    }

    /// List the bank-account records owned by a user document.
    pub async fn list_banks_for_user(
        &self,
        user_document_id: &str,
    ) -> Result<Vec<BankAccount>, AppwriteError> {
        let path = self.documents_path(&self.bank_collection_id);
        let request = self
            .admin(Method::GET, &path)
            .query(&[("queries[]", equal_query("userId", user_document_id))]);
        let list: DocumentList<Value> = send(request, "GET bank documents").await?;
        list.documents.iter().map(parse_bank_document).collect()
    }

    /// Fetch one bank-account record by document ID.
    pub async fn get_bank_document(
        &self,
        document_id: &str,
    ) -> Result<BankAccount, AppwriteError> {
        let path = format!(
            "{}/{document_id}",
            self.documents_path(&self.bank_collection_id)
        );
        let request = self.admin(Method::GET, &path);
        let document: Value = send(request, "GET bank document").await?;
        parse_bank_document(&document)
    }

    fn documents_path(&self, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{collection_id}/documents",
            self.database_id
        )
    }

    fn admin(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .header(PROJECT_HEADER, &self.project_id)
            .header(KEY_HEADER, &self.api_key)
    }

    fn with_session(&self, method: Method, path: &str, session_secret: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .header(PROJECT_HEADER, &self.project_id)
            .header(SESSION_HEADER, session_secret)
    }
}

/// Serialized `equal` query for the document list endpoint.
fn equal_query(attribute: &str, value: &str) -> String {
    json!({
        "method": "equal",
        "attribute": attribute,
        "values": [value],
    })
    .to_string()
}

fn parse_user_document(document: &Value) -> Result<User, AppwriteError> {
    Ok(User {
        id: required_str(document, "$id")?,
        user_id: required_str(document, "userId")?,
        email: required_str(document, "email")?,
        first_name: required_str(document, "firstName")?,
        last_name: required_str(document, "lastName")?,
        dwolla_customer_id: required_str(document, "dwollaCustomerId")?,
        dwolla_customer_url: required_str(document, "dwollaCustomerUrl")?,
    })
}

fn parse_bank_document(document: &Value) -> Result<BankAccount, AppwriteError> {
    Ok(BankAccount {
        id: required_str(document, "$id")?,
        user_id: required_str(document, "userId")?,
        bank_id: required_str(document, "bankId")?,
        account_id: required_str(document, "accountId")?,
        access_token: required_str(document, "accessToken")?,
        funding_source_url: required_str(document, "fundingSourceUrl")?,
        shareable_id: required_str(document, "shareableId")?,
        created_at: required_datetime(document, "$createdAt")?,
    })
}

fn required_datetime(document: &Value, field: &str) -> Result<DateTime<Utc>, AppwriteError> {
    let raw = required_str(document, field)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| {
            AppwriteError::InvalidResponse(format!("document attribute `{field}` is invalid: {e}"))
        })
}

fn required_str(document: &Value, field: &str) -> Result<String, AppwriteError> {
    document
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AppwriteError::InvalidResponse(format!("document is missing attribute `{field}`"))
        })
}

async fn send<T>(request: RequestBuilder, context: &str) -> Result<T, AppwriteError>
where
    T: serde::de::DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|e| AppwriteError::Request(format!("{context} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(rejection(response, context).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppwriteError::InvalidResponse(format!("{context} invalid JSON: {e}")))
}

async fn send_no_content(request: RequestBuilder, context: &str) -> Result<(), AppwriteError> {
    let response = request
        .send()
        .await
        .map_err(|e| AppwriteError::Request(format!("{context} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(rejection(response, context).await);
    }
    Ok(())
}

async fn rejection(response: reqwest::Response, context: &str) -> AppwriteError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    // Provider errors carry a `message` field; fall back to the raw body.
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    AppwriteError::Rejected {
        status,
        message: format!("{context}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_query_serializes_method_attribute_values() {
        let query = equal_query("userId", "user_1");
        let parsed: Value = serde_json::from_str(&query).unwrap();
        assert_eq!(parsed["method"], "equal");
        assert_eq!(parsed["attribute"], "userId");
        assert_eq!(parsed["values"], json!(["user_1"]));
    }

    #[test]
    fn user_document_parses_flattened_attributes() {
        let document = json!({
            "$id": "doc_1",
            "$collectionId": "users",
            "userId": "identity_1",
            "email": "ada@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "dwollaCustomerId": "cust_1",
            "dwollaCustomerUrl": "https://api-sandbox.dwolla.com/customers/cust_1"
        });

        let user = parse_user_document(&document).unwrap();
        assert_eq!(user.id, "doc_1");
        assert_eq!(user.user_id, "identity_1");
        assert_eq!(user.dwolla_customer_id, "cust_1");
    }

    #[test]
    fn bank_document_parses_all_attributes() {
        let document = json!({
            "$id": "doc_1",
            "$createdAt": "2026-08-30T10:15:00.000+00:00",
            "userId": "user_1",
            "bankId": "item_1",
            "accountId": "acc_1",
            "accessToken": "access-sandbox-123",
            "fundingSourceUrl": "https://api-sandbox.dwolla.com/funding-sources/fs_1",
            "shareableId": "share_1"
        });

        let record = parse_bank_document(&document).unwrap();
        assert_eq!(record.id, "doc_1");
        assert_eq!(record.bank_id, "item_1");
        assert_eq!(record.access_token, "access-sandbox-123");
        assert_eq!(record.created_at.to_rfc3339(), "2026-08-30T10:15:00+00:00");
    }

    #[test]
    fn bank_document_with_missing_attribute_is_invalid() {
        let document = json!({
            "$id": "doc_1",
            "userId": "user_1",
            "bankId": "item_1",
            "accountId": "acc_1",
            "accessToken": "token",
            "fundingSourceUrl": "https://api-sandbox.dwolla.com/funding-sources/fs_1"
            // shareableId missing
        });

        let error = parse_bank_document(&document).unwrap_err();
        assert!(error.to_string().contains("shareableId"));
    }

    #[test]
    fn account_and_session_parse_provider_ids() {
        let account: Account = serde_json::from_value(json!({
            "$id": "identity_1",
            "email": "ada@example.com",
            "name": "Ada Lovelace"
        }))
        .unwrap();
        assert_eq!(account.id, "identity_1");

        let session: Session = serde_json::from_value(json!({
            "$id": "sess_1",
            "secret": "s3cret"
        }))
        .unwrap();
        assert_eq!(session.secret, "s3cret");
    }

    #[test]
    fn unauthorized_rejections_are_distinguishable() {
        let error = AppwriteError::Rejected {
            status: 401,
            message: "invalid session".to_string(),
        };
        assert!(error.is_unauthorized());

        let error = AppwriteError::Rejected {
            status: 500,
            message: "server error".to_string(),
        };
        assert!(!error.is_unauthorized());
    }
}
