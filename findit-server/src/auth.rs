use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use argon2::Argon2;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use findit_core::{ProfileStore, ValidationError, validate_login, validate_registration};
use findit_persistence::repositories::{CredentialRepository, StoredCredential};
use findit_types::{AuthResponse, LoginRequest, RegisterRequest, UserId, UserProfile};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user id
    pub email: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String, // token id, used for sign-out
}

/// The caller behind a verified bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: String,
}

/// Email and password accounts with HS256 session tokens.
///
/// Passwords are stored as Argon2id PHC strings and hashed on the blocking
/// pool. Registration writes the credential and then the profile document as
/// two separate writes. Signing out revokes the token for the lifetime of this
/// process.
pub struct AuthService {
    credentials: Arc<CredentialRepository>,
    hasher: Argon2<'static>,
    profiles: Arc<dyn ProfileStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_seconds: u64,
    revoked: RwLock<HashMap<String, u64>>, // token id -> expiry
}

impl AuthService {
    pub fn new(
        credentials: Arc<CredentialRepository>,
        profiles: Arc<dyn ProfileStore>,
        secret: &str,
        token_ttl_seconds: u64,
    ) -> Self {
        Self {
            credentials,
            hasher: Argon2::default(),
            profiles,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_seconds,
            revoked: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        validate_registration(request)?;
        let email = normalize_email(&request.email);

        if self.credentials.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let user_id = Uuid::new_v4();
        let password_hash = self.hash_password(&request.password).await?;
        let created = self
            .credentials
            .create(&StoredCredential {
                user_id,
                email: email.clone(),
                password_hash,
            })
            .await?;
        // Another registration for the same email won the race
        if !created {
            return Err(AuthError::EmailInUse);
        }

        let profile = UserProfile::new(
            user_id,
            request.name.clone(),
            request.phone.clone(),
            email.clone(),
            chrono::Utc::now().to_rfc3339(),
        );
        if let Err(e) = self.profiles.create_profile(profile).await {
            tracing::error!("Account {} created but its profile could not be written: {}", user_id, e);
            return Err(AuthError::Backend(e));
        }

        tracing::info!("Registered user {}", user_id);
        self.issue_token(user_id, &email)
    }

    pub async fn sign_in(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        validate_login(request)?;
        let email = normalize_email(&request.email);

        let credential = self
            .credentials
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self
            .verify_password(&request.password, &credential.password_hash)
            .await?
        {
            tracing::debug!("Wrong password for {}", credential.user_id);
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_token(credential.user_id, &credential.email)
    }

    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.decode_claims(token)?;
        let now = unix_now();

        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expiry| *expiry > now);
        revoked.insert(claims.jti, claims.exp);
        Ok(())
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.decode_claims(token)?;

        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(AuthError::TokenRevoked);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
        })
    }

    /// Resolve an `Authorization` header value, with or without the `Bearer ` prefix
    pub async fn authenticate_header(
        &self,
        header: Option<&str>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header.strip_prefix("Bearer ").unwrap_or(header);
        self.validate_token(token).await
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut rand::thread_rng());
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow!("Failed to hash password: {}", e))
        })
        .await
        .map_err(|e| anyhow!("Password hashing task failed: {}", e))?
        .map_err(AuthError::Backend)
    }

    /// Constant-time check of `password` against a stored PHC string
    async fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| anyhow!("Stored password hash is unreadable: {}", e))?;
            match hasher.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(anyhow!("Failed to verify password: {}", e)),
            }
        })
        .await
        .map_err(|e| anyhow!("Password check task failed: {}", e))?
        .map_err(AuthError::Backend)
    }

    /// Minimal Argon2 cost so tests stay quick
    #[cfg(test)]
    pub(crate) fn with_fast_hashing(self) -> Self {
        let params = argon2::Params::new(8, 1, 1, None).expect("valid argon2 params");
        Self {
            hasher: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
            ..self
        }
    }

    fn issue_token(&self, user_id: UserId, email: &str) -> Result<AuthResponse, AuthError> {
        let iat = unix_now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat,
            exp: iat + self.token_ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to sign session token: {:?}", e);
                AuthError::InvalidToken
            })?;

        Ok(AuthResponse { token, user_id })
    }

    fn decode_claims(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::warn!("JWT token validation failed: {:?}", e);
                    AuthError::InvalidToken
                }
            })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("El correo electrónico ya está en uso.")]
    EmailInUse,
    #[error("Correo o contraseña incorrectos.")]
    InvalidCredentials,
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token revoked")]
    TokenRevoked,
    #[error("Identity backend failure: {0}")]
    Backend(#[from] anyhow::Error),
}
