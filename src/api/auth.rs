// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sign-up, sign-in, session resolution, and sign-out.
//!
//! Sign-up is a multi-step remote write with **no rollback**: the identity
//! account, payment-rail customer, and directory record are created in
//! order, and a later failure leaves the earlier resources in place. The
//! error names the step that failed so partial state is diagnosable.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use crate::auth::{clear_session_cookie, resolve_session, session_cookie};
use crate::error::ApiError;
use crate::models::{SignInRequest, SignUpRequest, UserResponse};
use crate::providers::appwrite::AppwriteError;
use crate::providers::dwolla::{extract_customer_id_from_url, NewCustomer};
use crate::state::AppState;

fn map_identity_error(error: AppwriteError, step: &str) -> ApiError {
    if error.is_unauthorized() {
        return ApiError::unauthorized("Invalid email or password");
    }
    match error {
        // Duplicate email on account creation; not a provider outage.
        AppwriteError::Rejected { status: 409, .. } => {
            ApiError::conflict("An account with this email already exists")
        }
        other => ApiError::bad_gateway(format!("{step} failed: {other}")),
    }
}

/// Create a user: identity account, payment-rail customer, directory
/// record, then a session.
#[utoipa::path(
    post,
    path = "/v1/auth/sign-up",
    tag = "Auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User created and signed in", body = UserResponse),
        (status = 409, description = "An account with this email already exists"),
        (status = 502, description = "A provider call failed; earlier steps are not rolled back")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> Result<(CookieJar, (StatusCode, Json<UserResponse>)), ApiError> {
    let name = format!("{} {}", request.first_name, request.last_name);

    let account = state
        .appwrite
        .create_account(&request.email, &request.password, &name)
        .await
        .map_err(|e| map_identity_error(e, "identity account creation"))?;

    let customer_url = state
        .dwolla
        .create_customer(NewCustomer {
            first_name: &request.first_name,
            last_name: &request.last_name,
            email: &request.email,
            address1: &request.address1,
            city: &request.city,
            date_of_birth: &request.date_of_birth,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "customer creation failed; identity account is not rolled back");
            ApiError::bad_gateway(format!("payment-rail customer creation failed: {e}"))
        })?;

    let customer_id = extract_customer_id_from_url(&customer_url).ok_or_else(|| {
        ApiError::bad_gateway("payment-rail customer URL had no customer ID")
    })?;

    let user = state
        .appwrite
        .create_user_document(
            &account.id,
            &request.email,
            &request.first_name,
            &request.last_name,
            &customer_id,
            &customer_url,
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "user record creation failed; earlier steps are not rolled back");
            map_identity_error(e, "user record creation")
        })?;

    let session = state
        .appwrite
        .create_email_session(&request.email, &request.password)
        .await
        .map_err(|e| map_identity_error(e, "session creation"))?;

    info!(user_id = %user.user_id, "user signed up");

    Ok((
        jar.add(session_cookie(session.secret)),
        (StatusCode::CREATED, Json(user.into())),
    ))
}

/// Establish an email/password session and set the session cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/sign-in",
    tag = "Auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "No directory record for this account")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    let session = state
        .appwrite
        .create_email_session(&request.email, &request.password)
        .await
        .map_err(|e| map_identity_error(e, "session creation"))?;

    let account = state
        .appwrite
        .get_account(&session.secret)
        .await
        .map_err(|e| map_identity_error(e, "session resolution"))?;

    let user = state
        .appwrite
        .get_user_by_identity_id(&account.id)
        .await
        .map_err(|e| map_identity_error(e, "user record lookup"))?
        .ok_or_else(|| ApiError::not_found("No directory record for this account"))?;

    Ok((jar.add(session_cookie(session.secret)), Json(user.into())))
}

/// Resolve the current session to a user record.
///
/// Responds `200` with JSON `null` — not an error status — when there is
/// no valid session, so clients can probe sign-in state cheaply.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user, or JSON null when signed out", body = UserResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Json<Option<UserResponse>> {
    match resolve_session(&state, &jar).await {
        Ok(user) => Json(user.map(UserResponse::from)),
        Err(error) => {
            warn!(error = %error.message, "session resolution failed; reporting signed out");
            Json(None)
        }
    }
}

/// Delete the provider session and clear the cookie.
///
/// Provider errors are swallowed: the cookie is cleared regardless and
/// the response is always `204`.
#[utoipa::path(
    post,
    path = "/v1/auth/sign-out",
    tag = "Auth",
    responses(
        (status = 204, description = "Signed out")
    )
)]
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(cookie) = jar.get(crate::auth::SESSION_COOKIE) {
        let secret = cookie.value().to_string();
        if !secret.is_empty() {
            if let Err(error) = state.appwrite.delete_current_session(&secret).await {
                warn!(error = %error, "session deletion failed; clearing cookie anyway");
            }
        }
    }
    (jar.add(clear_session_cookie()), StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_rejections_map_to_invalid_credentials() {
        let error = map_identity_error(
            AppwriteError::Rejected {
                status: 401,
                message: "invalid credentials".to_string(),
            },
            "session creation",
        );
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.message, "Invalid email or password");
    }

    #[test]
    fn duplicate_email_rejections_map_to_conflict() {
        let error = map_identity_error(
            AppwriteError::Rejected {
                status: 409,
                message: "user already exists".to_string(),
            },
            "identity account creation",
        );
        assert_eq!(error.status, StatusCode::CONFLICT);
        assert_eq!(error.message, "An account with this email already exists");
    }

    #[test]
    fn other_failures_map_to_bad_gateway_with_the_step() {
        let error = map_identity_error(
            AppwriteError::Request("connection refused".to_string()),
            "user record lookup",
        );
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert!(error.message.contains("user record lookup"));
    }
}
