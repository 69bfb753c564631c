//! Authentication and authorization.
//!
//! Handlers that take a [`User<R>`] only run for requests carrying a valid
//! bearer token whose roles satisfy `R`.

use super::{
    config::AuthConfig,
    error::{ApiError, ApiResult, ClientError, InternalError},
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    marker::PhantomData,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::instrument;

/// A requirement on the roles of a user.
pub trait Role {
    /// Whether a user with the given roles satisfies the requirement.
    fn is_satisfied(roles: &[&str]) -> bool;
}

/// Any authenticated user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Any;

impl Role for Any {
    fn is_satisfied(_: &[&str]) -> bool {
        true
    }
}

/// A user with the `ADMIN` role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admin;

impl Role for Admin {
    fn is_satisfied(roles: &[&str]) -> bool {
        roles.iter().any(|role| {
            let role = role.strip_prefix("ROLE_").unwrap_or(role);
            role.eq_ignore_ascii_case("admin")
        })
    }
}

/// An authenticated user whose roles satisfy `R`.
#[derive(Debug)]
pub struct User<R = Any> {
    username: String,
    roles: Vec<String>,
    role_type: PhantomData<R>,
}

impl<R> User<R> {
    /// The user's name.
    pub fn username(&self) -> &str {
        self.username.as_ref()
    }

    /// The user's roles.
    pub fn roles(&self) -> &[String] {
        self.roles.as_ref()
    }
}

#[async_trait]
impl<S, R> FromRequestParts<S> for User<R>
where
    TokenKeys: FromRef<S>,
    S: Send + Sync,
    R: Role,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Get authorization header
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ClientError::Unauthorized)?;

        // Validate token
        let claims = TokenKeys::from_ref(state).verify(bearer.token())?;

        // Check role
        let roles: Vec<&str> = claims.roles.iter().map(String::as_str).collect();
        if !R::is_satisfied(&roles) {
            tracing::info!("{} lacks the required role", claims.sub);
            return Err(ClientError::Forbidden.into());
        }

        Ok(User {
            username: claims.sub,
            roles: claims.roles,
            role_type: PhantomData,
        })
    }
}

/// The claims carried by an access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The username.
    pub sub: String,
    /// The user's roles.
    pub roles: Vec<String>,
    /// When the token was issued, in seconds since the epoch.
    pub iat: u64,
    /// When the token expires, in seconds since the epoch.
    pub exp: u64,
}

/// Keys for issuing and verifying HS256 access tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Creates keys from a shared secret.
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// How long issued tokens are valid.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for a user.
    pub fn issue(&self, username: &str, roles: &[String]) -> ApiResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| InternalError::Other(e.to_string()))?
            .as_secs();
        let claims = Claims {
            sub: username.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Verifies a token's signature and expiry.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::info!("Rejected token: {}", e);
                ClientError::Unauthorized
            })?;
        Ok(data.claims)
    }
}

struct StoredUser {
    password_hash: String,
    roles: Vec<String>,
}

/// The users that may sign in, with hashed passwords.
pub struct UserStore {
    users: HashMap<String, StoredUser>,
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl UserStore {
    /// Hashes the passwords of the configured users.
    pub fn from_config(config: &AuthConfig) -> Result<Self, bcrypt::BcryptError> {
        let mut users = HashMap::new();
        for user in &config.users {
            let password_hash = bcrypt::hash(&user.password, config.bcrypt_cost)?;
            users.insert(
                user.username.clone(),
                StoredUser {
                    password_hash,
                    roles: user.roles.clone(),
                },
            );
        }
        Ok(Self { users })
    }

    /// Validates a user's password, returning the user's roles.
    #[instrument(skip(self, password))]
    pub fn authenticate(&self, username: &str, password: &str) -> ApiResult<Vec<String>> {
        tracing::info!("Fetching {}'s password", username);
        let user = self.users.get(username).ok_or(ClientError::Unauthorized)?;

        tracing::info!("Verifying password");
        let password_is_ok = bcrypt::verify(password, &user.password_hash)?;
        if password_is_ok {
            Ok(user.roles.clone())
        } else {
            Err(ClientError::Unauthorized.into())
        }
    }
}
