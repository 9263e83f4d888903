//! Credentials and bearer tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are HS256 JWTs
//! carrying the [`Principal`] and an expiry; see [`TokenSigner`].

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

const MIN_PASSWORD_LEN: usize = 8;

/// The verified identity behind a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: Uuid,
    username: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, principal: &Principal) -> ResultEngine<String> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> ResultEngine<String> {
        let claims = Claims {
            user_id: principal.user_id,
            username: principal.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| EngineError::Internal(format!("failed to sign token: {err}")))
    }

    /// Check signature and expiry and rebuild the principal.
    pub fn verify(&self, token: &str) -> ResultEngine<Principal> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|err| EngineError::Unauthorized(err.to_string()))?;

        Ok(Principal {
            user_id: data.claims.user_id,
            username: data.claims.username,
        })
    }
}

/// Password policy for new accounts: at least 8 characters with an uppercase
/// letter, a lowercase letter, a digit and a symbol.
pub fn validate_password_strength(password: &str) -> ResultEngine<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(EngineError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(has_upper && has_lower && has_digit && has_symbol) {
        return Err(EngineError::WeakPassword(
            "password needs an uppercase letter, a lowercase letter, a digit and a symbol"
                .to_string(),
        ));
    }
    Ok(())
}

/// Hash a password on the blocking pool.
pub(crate) async fn hash_password(password: &str) -> ResultEngine<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| EngineError::Internal(format!("failed to hash password: {err}")))
    })
    .await
    .map_err(|err| EngineError::Internal(format!("hashing task failed: {err}")))?
}

/// Check a password against a stored PHC string on the blocking pool.
pub(crate) async fn verify_password(password: &str, stored_hash: &str) -> ResultEngine<()> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|err| EngineError::Internal(format!("corrupt password hash: {err}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| EngineError::WrongPassword)
    })
    .await
    .map_err(|err| EngineError::Internal(format!("verification task failed: {err}")))?
}
