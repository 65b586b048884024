// SPDX-License-Identifier: AGPL-3.0-or-later

//! Read-side views over linked bank accounts.
//!
//! Records come from the remote bank-account directory; live balance data
//! is re-queried from the aggregator on every request. There is no local
//! cache.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::warn;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{
    AccountListResponse, AccountView, BankAccount, BankAccountListResponse, BankAccountResponse,
};
use crate::providers::appwrite::AppwriteError;
use crate::providers::plaid::PlaidClient;
use crate::state::AppState;

fn map_store_error(error: AppwriteError, not_found_message: &str) -> ApiError {
    match error {
        AppwriteError::Rejected { status: 404, .. } => ApiError::not_found(not_found_message),
        other => ApiError::bad_gateway(format!("bank directory request failed: {other}")),
    }
}

/// List the caller's bank-account records.
#[utoipa::path(
    get,
    path = "/v1/banks",
    tag = "Banks",
    responses(
        (status = 200, description = "Bank-account records", body = BankAccountListResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_banks(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<BankAccountListResponse>, ApiError> {
    let records = state
        .appwrite
        .list_banks_for_user(&user.id)
        .await
        .map_err(|e| map_store_error(e, "No bank accounts found"))?;

    let banks: Vec<BankAccountResponse> =
        records.into_iter().map(BankAccountResponse::from).collect();

    Ok(Json(BankAccountListResponse {
        total: banks.len(),
        banks,
    }))
}

/// Fetch one bank-account record, ownership-checked.
#[utoipa::path(
    get,
    path = "/v1/banks/{document_id}",
    tag = "Banks",
    params(
        ("document_id" = String, Path, description = "Bank-account record's document ID")
    ),
    responses(
        (status = 200, description = "Bank-account record", body = BankAccountResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Record belongs to another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_bank(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<BankAccountResponse>, ApiError> {
    let record = state
        .appwrite
        .get_bank_document(&document_id)
        .await
        .map_err(|e| map_store_error(e, "Bank account not found"))?;

    if record.user_id != user.id {
        return Err(ApiError::forbidden("You do not own this bank account"));
    }

    Ok(Json(record.into()))
}

/// List the caller's accounts with live aggregator data.
///
/// Each record triggers a fresh account fetch against the aggregator; a
/// record whose fetch fails is skipped with a warning rather than failing
/// the whole response.
#[utoipa::path(
    get,
    path = "/v1/accounts",
    tag = "Banks",
    responses(
        (status = 200, description = "Account display data", body = AccountListResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_accounts(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let records = state
        .appwrite
        .list_banks_for_user(&user.id)
        .await
        .map_err(|e| map_store_error(e, "No bank accounts found"))?;

    let mut accounts = Vec::with_capacity(records.len());
    for record in &records {
        match account_view(&state.plaid, record).await {
            Ok(Some(view)) => accounts.push(view),
            Ok(None) => warn!(
                bank_record_id = %record.id,
                account_id = %record.account_id,
                "aggregator no longer reports the linked account"
            ),
            Err(error) => warn!(
                bank_record_id = %record.id,
                error = %error,
                "skipping bank record: aggregator fetch failed"
            ),
        }
    }

    Ok(Json(AccountListResponse {
        total: accounts.len(),
        accounts,
    }))
}

async fn account_view(
    plaid: &PlaidClient,
    record: &BankAccount,
) -> Result<Option<AccountView>, crate::providers::plaid::PlaidError> {
    let accounts = plaid.get_accounts(&record.access_token).await?;
    Ok(accounts
        .into_iter()
        .find(|account| account.account_id == record.account_id)
        .map(|account| AccountView {
            account_id: account.account_id,
            name: account.name,
            current_balance: account.balances.current.unwrap_or(0.0),
            available_balance: account.balances.available,
            account_type: account.account_type,
            subtype: account.subtype,
            bank_record_id: record.id.clone(),
            shareable_id: record.shareable_id.clone(),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn missing_document_maps_to_not_found() {
        let error = map_store_error(
            AppwriteError::Rejected {
                status: 404,
                message: "document not found".to_string(),
            },
            "Bank account not found",
        );
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.message, "Bank account not found");
    }

    #[test]
    fn transport_failure_maps_to_bad_gateway() {
        let error = map_store_error(
            AppwriteError::Request("timed out".to_string()),
            "Bank account not found",
        );
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
    }
}
