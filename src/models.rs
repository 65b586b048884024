// SPDX-License-Identifier: AGPL-3.0-or-later

//! # API Data Models
//!
//! Request and response structures for the REST API, plus the two
//! directory records this service reads and writes through the remote
//! document store. All API-facing types derive `Serialize`/`Deserialize`
//! and `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! JSON field names use camelCase to match the document-store attribute
//! names (`userId`, `dwollaCustomerId`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Directory Records
// =============================================================================

/// A user directory record.
///
/// One record per user, keyed by the identity provider's user ID and
/// augmented with the payment-rail customer created at signup. The
/// customer ID is set exactly once, at signup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document ID in the user directory.
    pub id: String,
    /// Identity provider's user ID.
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Payment-rail customer ID extracted from the customer URL.
    pub dwolla_customer_id: String,
    /// Payment-rail customer URL.
    pub dwolla_customer_url: String,
}

/// A linked bank-account record.
///
/// Created on successful token exchange; there is no update or delete
/// path. The access token is a server-side secret and never appears in
/// client-facing responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    /// Document ID in the bank-account directory.
    pub id: String,
    /// Owning user's document ID.
    pub user_id: String,
    /// Aggregator item ID for the link.
    pub bank_id: String,
    /// Aggregator account ID.
    pub account_id: String,
    /// Durable aggregator access token.
    pub access_token: String,
    /// Payment-rail funding source URL.
    pub funding_source_url: String,
    /// One-way derived identifier safe to expose.
    pub shareable_id: String,
    /// Creation time reported by the document store.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new bank-account record, produced by the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBankAccount {
    pub user_id: String,
    pub bank_id: String,
    pub account_id: String,
    pub access_token: String,
    pub funding_source_url: String,
    pub shareable_id: String,
}

// =============================================================================
// Auth Models
// =============================================================================

/// Request to sign in with email and password.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Request to create a new user.
///
/// Jurisdiction-specific identity fields the client cannot supply (SSN,
/// state, postal code) are filled with static placeholder values when the
/// payment-rail customer is created.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub address1: String,
    pub city: String,
    /// Date of birth, `YYYY-MM-DD`.
    pub date_of_birth: String,
}

/// Client-facing view of a user record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub dwolla_customer_id: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            dwolla_customer_id: user.dwolla_customer_id,
        }
    }
}

// =============================================================================
// Linking Models
// =============================================================================

/// Response for link-token creation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkTokenResponse {
    /// Short-lived token the client uses to open the bank-selection UI.
    pub link_token: String,
}

/// Request to exchange a public token obtained from the link UI.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeTokenRequest {
    pub public_token: String,
}

/// Completion marker returned after a successful exchange.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeTokenResponse {
    /// Always `"complete"` on success.
    pub public_token_exchange: String,
}

// =============================================================================
// Bank Views
// =============================================================================

/// Client-facing view of a bank-account record (access token redacted).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountResponse {
    pub id: String,
    pub user_id: String,
    pub bank_id: String,
    pub account_id: String,
    pub funding_source_url: String,
    pub shareable_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<BankAccount> for BankAccountResponse {
    fn from(record: BankAccount) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            bank_id: record.bank_id,
            account_id: record.account_id,
            funding_source_url: record.funding_source_url,
            shareable_id: record.shareable_id,
            created_at: record.created_at,
        }
    }
}

/// List response for bank-account records.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BankAccountListResponse {
    pub banks: Vec<BankAccountResponse>,
    pub total: usize,
}

/// Display data for one linked account, joined with live aggregator data.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    /// Aggregator account ID.
    pub account_id: String,
    /// Display name reported by the aggregator.
    pub name: String,
    pub current_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_balance: Option<f64>,
    /// Account type tag (e.g. `depository`).
    pub account_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Owning bank-account record's document ID.
    pub bank_record_id: String,
    pub shareable_id: String,
}

/// List response for account views.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountListResponse {
    pub accounts: Vec<AccountView>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_account_response_redacts_access_token() {
        let record = BankAccount {
            id: "doc_1".to_string(),
            user_id: "user_1".to_string(),
            bank_id: "item_1".to_string(),
            account_id: "acc_1".to_string(),
            access_token: "access-sandbox-secret".to_string(),
            funding_source_url: "https://api-sandbox.dwolla.com/funding-sources/fs_1".to_string(),
            shareable_id: "share_1".to_string(),
            created_at: Utc::now(),
        };

        let response: BankAccountResponse = record.into();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("access-sandbox-secret"));
        assert!(!json.contains("accessToken"));
        assert!(json.contains(r#""accountId":"acc_1""#));
    }

    #[test]
    fn records_serialize_with_camel_case_attributes() {
        let user = User {
            id: "doc_1".to_string(),
            user_id: "identity_1".to_string(),
            email: "a@b.example".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            dwolla_customer_id: "cust_1".to_string(),
            dwolla_customer_url: "https://api-sandbox.dwolla.com/customers/cust_1".to_string(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], "identity_1");
        assert_eq!(json["dwollaCustomerId"], "cust_1");
        assert_eq!(json["firstName"], "Ada");
    }
}
