//! Authentication service.
//!
//! Password credentials hashed with Argon2id, bearer tokens as HS256 JWTs
//! with the user's email as subject. The same token verification rule backs
//! both the HTTP extractors and the WebSocket handshake.

mod error;

pub use error::AuthError;

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use minimart_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{User, UserPatch};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// JWT claims carried by every access token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the user's email address.
    sub: String,
    /// Expiry as a unix timestamp.
    exp: i64,
}

/// HS256 signing and verification keys, derived once from the configured
/// secret and shared through application state.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    /// Build keys from the configured secret and token lifetime.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            ttl,
        }
    }

    /// Issue a signed access token for `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if signing fails.
    pub fn issue(&self, email: &Email) -> Result<String, AuthError> {
        let exp = Utc::now()
            + chrono::TimeDelta::from_std(self.ttl).unwrap_or(chrono::TimeDelta::hours(1));
        let claims = Claims {
            sub: email.as_str().to_owned(),
            exp: exp.timestamp(),
        };

        encode(&jsonwebtoken::Header::default(), &claims, &self.encoding)
            .map_err(|_| AuthError::TokenSigning)
    }

    /// Verify a token's signature and expiry and return its subject.
    ///
    /// Does not check that the subject still resolves to a user record;
    /// that is the service's job.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for expired tokens and
    /// `AuthError::TokenMalformed` for any other verification failure.
    pub fn verify(&self, token: &str) -> Result<Email, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            }
        })?;

        Email::parse(&data.claims.sub).map_err(|_| AuthError::TokenMalformed)
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    jwt: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt: &'a JwtKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt,
        }
    }

    /// Register a new user with email, name, and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password, returning the user and a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.jwt.issue(&user.email)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to a user record.
    ///
    /// This is the single credential validation rule: signature check,
    /// expiry check, then subject resolution against the user store. Both
    /// the HTTP auth extractor and the WebSocket handshake go through here.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` / `AuthError::TokenMalformed` for
    /// bad tokens and `AuthError::UnknownSubject` if the subject no longer
    /// resolves to a user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let email = self.jwt.verify(token)?;

        self.users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UnknownSubject)
    }

    /// Apply a profile patch for the given user. Only present fields are
    /// applied; a new password is re-hashed before storage.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password is too weak.
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn update_profile(&self, id: UserId, patch: &UserPatch) -> Result<User, AuthError> {
        let password_hash = match patch.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let user = self
            .users
            .update_profile(id, patch.name.as_deref(), password_hash.as_deref())
            .await?;

        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
