//! Signing in and inspecting the signed in user.

use crate::infra::{
    error::ApiResult,
    extract::Json,
    security::{TokenKeys, User, UserStore},
    state::AppState,
};
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// The authentication API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/me", get(me))
}

/// Credentials for signing in.
#[derive(Clone, Deserialize, Serialize, ToSchema)]
pub struct SignIn {
    /// The user's name.
    #[schema(example = "admin")]
    pub username: String,
    /// The user's password.
    #[schema(example = "admin")]
    pub password: String,
}

impl std::fmt::Debug for SignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignIn")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// An access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Token {
    /// The token to send as `Authorization: Bearer <token>`.
    pub token: String,
    /// The token type, always `Bearer`.
    #[serde(rename = "type")]
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// The signed in user.
    pub username: String,
    /// The user's roles.
    pub roles: Vec<String>,
    /// Seconds until the token expires.
    pub expires_in: u64,
}

/// The signed in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Me {
    /// The user's name.
    pub username: String,
    /// The user's roles.
    pub roles: Vec<String>,
}

/// Exchanges a username and password for an access token.
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SignIn,
    responses(
        (status = 200, description = "Signed in", body = Token),
        (status = 401, description = "Unauthorized", body = ErrorBody),
    )
)]
#[instrument(skip(users, keys))]
pub async fn sign_in(
    State(users): State<Arc<UserStore>>,
    State(keys): State<TokenKeys>,
    Json(credentials): Json<SignIn>,
) -> ApiResult<Json<Token>> {
    let roles = users.authenticate(&credentials.username, &credentials.password)?;
    let token = keys.issue(&credentials.username, &roles)?;
    tracing::info!("User signed in");
    Ok(Json(Token {
        token,
        token_type: "Bearer".to_string(),
        username: credentials.username,
        roles,
        expires_in: keys.ttl().as_secs(),
    }))
}

/// Returns the user the token belongs to.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Success", body = Me),
        (status = 401, description = "Unauthorized", body = ErrorBody),
    )
)]
#[instrument]
pub async fn me(user: User) -> Json<Me> {
    Json(Me {
        username: user.username().to_string(),
        roles: user.roles().to_vec(),
    })
}
