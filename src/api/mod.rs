// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AccountListResponse, AccountView, BankAccountListResponse, BankAccountResponse,
        ExchangeTokenRequest, ExchangeTokenResponse, LinkTokenResponse, SignInRequest,
        SignUpRequest, UserResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod banks;
pub mod health;
pub mod linking;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/me", get(auth::me))
        .route("/link/token", post(linking::create_link_token))
        .route("/link/exchange", post(linking::exchange_public_token))
        .route("/banks", get(banks::list_banks))
        .route("/banks/{document_id}", get(banks::get_bank))
        .route("/accounts", get(banks::list_accounts))
        .with_state(state);

    // Request IDs are assigned before tracing so the span sees them, and
    // propagated back onto the response.
    Router::new()
        .nest("/v1", v1_routes)
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::sign_up,
        auth::sign_in,
        auth::sign_out,
        auth::me,
        linking::create_link_token,
        linking::exchange_public_token,
        banks::list_banks,
        banks::get_bank,
        banks::list_accounts,
        health::health
    ),
    components(
        schemas(
            SignUpRequest,
            SignInRequest,
            UserResponse,
            LinkTokenResponse,
            ExchangeTokenRequest,
            ExchangeTokenResponse,
            BankAccountResponse,
            BankAccountListResponse,
            AccountView,
            AccountListResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Sign-up, sign-in, and session resolution"),
        (name = "Linking", description = "Bank-account linking via the aggregator"),
        (name = "Banks", description = "Linked bank accounts and balances"),
        (name = "Health", description = "Liveness")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::config::AppConfig;

    fn test_state() -> AppState {
        let env = HashMap::from([
            ("APPWRITE_PROJECT_ID", "proj_1"),
            ("APPWRITE_API_KEY", "key_1"),
            ("APPWRITE_DATABASE_ID", "db_1"),
            ("APPWRITE_USER_COLLECTION_ID", "users"),
            ("APPWRITE_BANK_COLLECTION_ID", "banks"),
            ("PLAID_CLIENT_ID", "plaid_id"),
            ("PLAID_SECRET", "plaid_secret"),
            ("DWOLLA_KEY", "dwolla_key"),
            ("DWOLLA_SECRET", "dwolla_secret"),
            ("SHAREABLE_ID_KEY", "hmac_key"),
        ]);
        let config =
            AppConfig::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap();
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
