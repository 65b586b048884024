// SPDX-License-Identifier: AGPL-3.0-or-later

//! Link-token issuance and public-token exchange.

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::exchange::{run_exchange, ExchangeError, ExchangeInput};
use crate::models::{ExchangeTokenRequest, ExchangeTokenResponse, LinkTokenResponse};
use crate::state::AppState;

const EXCHANGE_COMPLETE: &str = "complete";

fn map_exchange_error(error: ExchangeError) -> ApiError {
    match error {
        ExchangeError::NoAccounts => ApiError::unprocessable("Link returned no accounts"),
        other => ApiError::bad_gateway(other.to_string()),
    }
}

/// Issue a short-lived link token for the caller.
#[utoipa::path(
    post,
    path = "/v1/link/token",
    tag = "Linking",
    responses(
        (status = 200, description = "Link token issued", body = LinkTokenResponse),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "Aggregator rejected the request")
    )
)]
pub async fn create_link_token(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<LinkTokenResponse>, ApiError> {
    let link_token = state
        .plaid
        .create_link_token(&user.user_id)
        .await
        .map_err(|e| ApiError::bad_gateway(format!("link-token creation failed: {e}")))?;

    Ok(Json(LinkTokenResponse { link_token }))
}

/// Exchange a public token and persist the resulting bank-account record.
#[utoipa::path(
    post,
    path = "/v1/link/exchange",
    tag = "Linking",
    request_body = ExchangeTokenRequest,
    responses(
        (status = 200, description = "Exchange complete", body = ExchangeTokenResponse),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Link returned no accounts"),
        (status = 502, description = "A provider call failed")
    )
)]
pub async fn exchange_public_token(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ExchangeTokenRequest>,
) -> Result<Json<ExchangeTokenResponse>, ApiError> {
    let result = run_exchange(
        &state.plaid,
        &state.dwolla,
        &state.appwrite,
        ExchangeInput {
            public_token: &request.public_token,
            user_document_id: &user.id,
            dwolla_customer_id: &user.dwolla_customer_id,
            shareable_id_key: &state.config.shareable_id_key,
        },
    )
    .await;

    match result {
        Ok(_record) => Ok(Json(ExchangeTokenResponse {
            public_token_exchange: EXCHANGE_COMPLETE.to_string(),
        })),
        Err(error) => {
            warn!(user_id = %user.user_id, error = %error, "token exchange failed");
            Err(map_exchange_error(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::plaid::PlaidError;

    #[test]
    fn empty_link_maps_to_unprocessable() {
        let error = map_exchange_error(ExchangeError::NoAccounts);
        assert_eq!(error.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn aggregator_rejection_maps_to_bad_gateway_with_the_step() {
        let error = map_exchange_error(ExchangeError::Aggregator {
            step: crate::exchange::ExchangeStep::TokenExchange,
            source: PlaidError::Rejected {
                status: 400,
                body: "INVALID_PUBLIC_TOKEN".to_string(),
            },
        });
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert!(error.message.contains("token exchange"));
    }

    #[test]
    fn persistence_failure_maps_to_bad_gateway() {
        let error = map_exchange_error(ExchangeError::Persist {
            source: crate::providers::appwrite::AppwriteError::Request(
                "timed out".to_string(),
            ),
            compensated: true,
        });
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert!(error.message.contains("record persistence"));
    }
}
