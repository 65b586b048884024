// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session cookie handling and the authenticated-user extractor.
//!
//! The session secret issued by the identity provider lives in an
//! HTTP-only, strict-same-site, secure cookie scoped to the whole site.
//! Resolving the current user always re-queries the provider: first the
//! account behind the session secret, then the user directory record for
//! that account.
//!
//! Use the `Auth` extractor in handlers that require a signed-in user:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is the caller's directory record
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Fixed name of the session cookie.
pub const SESSION_COOKIE: &str = "bankbridge-session";

/// Build the session cookie: `path=/`, `HttpOnly`, `SameSite=Strict`,
/// `Secure`.
pub fn session_cookie(secret: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, secret);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_secure(true);
    cookie
}

/// Build the removal cookie that clears the session on the client.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    cookie
}

/// Resolve the session cookie in `jar` to the caller's user record.
///
/// Returns `Ok(None)` — not an error — when the cookie is absent or the
/// provider no longer accepts the session. Other provider failures
/// propagate so callers can tell "signed out" from "provider down".
pub async fn resolve_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<Option<User>, ApiError> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let secret = cookie.value();
    if secret.is_empty() {
        return Ok(None);
    }

    let account = match state.appwrite.get_account(secret).await {
        Ok(account) => account,
        Err(error) if error.is_unauthorized() => {
            debug!("session cookie no longer valid");
            return Ok(None);
        }
        Err(error) => {
            return Err(ApiError::bad_gateway(format!(
                "failed to resolve session: {error}"
            )))
        }
    };

    let user = state
        .appwrite
        .get_user_by_identity_id(&account.id)
        .await
        .map_err(|error| {
            ApiError::bad_gateway(format!("failed to load user record: {error}"))
        })?;

    Ok(user)
}

/// Extractor requiring a signed-in user with a directory record.
pub struct Auth(pub User);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match resolve_session(state, &jar).await? {
            Some(user) => Ok(Auth(user)),
            None => Err(ApiError::unauthorized("Not signed in")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_sets_required_attributes() {
        let cookie = session_cookie("s3cret".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "s3cret");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn clear_cookie_expires_the_session() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        // A removal cookie must carry an expiry in the past.
        let expires = cookie.expires_datetime().expect("removal cookie expires");
        assert!(expires.year() < 2000);
    }
}
