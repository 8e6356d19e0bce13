//! Signed access and refresh tokens.
//!
//! Both kinds are HS256 JWTs with the payload
//! `{user: {id, role, company_id, associate_company_ids}, exp, jti}` and are
//! signed with separate secrets. Refresh tokens are also recorded server-side
//! by `jti` so they can be used once; revoked access tokens are blacklisted by
//! `jti` until their own expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use business_cart_core::{AccountId, Claims, Role};

use super::AuthError;
use crate::config::JwtConfig;
use crate::db::TokenRepository;
use crate::models::RefreshTokenRecord;

/// Access token lifetime.
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 72;

/// Refresh token lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Identity block of the token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserClaim {
    id: AccountId,
    role: Role,
    #[serde(default)]
    company_id: Option<AccountId>,
    #[serde(default)]
    associate_company_ids: Vec<AccountId>,
}

/// Wire payload of both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenPayload {
    user: UserClaim,
    exp: i64,
    jti: Uuid,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A verified refresh token.
#[derive(Debug, Clone)]
pub struct RefreshClaims {
    pub token_id: Uuid,
    pub claims: Claims,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &secrecy::SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }
}

/// Issues, verifies and revokes tokens.
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
    tokens: Arc<dyn TokenRepository>,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &JwtConfig, tokens: Arc<dyn TokenRepository>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            validation,
            tokens,
        }
    }

    /// Sign an access token valid for 72 hours.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue_access(
        &self,
        subject: AccountId,
        role: Role,
        company_id: Option<AccountId>,
        associated_company_ids: &[AccountId],
    ) -> Result<String, AuthError> {
        let expires_at = Utc::now() + Duration::hours(ACCESS_TOKEN_TTL_HOURS);
        let payload = payload(subject, role, company_id, associated_company_ids, expires_at);
        sign(&self.access, &payload)
    }

    /// Sign a refresh token valid for 7 days and record it server-side.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` or `AuthError::Repository`.
    pub async fn issue_refresh(
        &self,
        subject: AccountId,
        role: Role,
        company_id: Option<AccountId>,
        associated_company_ids: &[AccountId],
    ) -> Result<String, AuthError> {
        let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS);
        let payload = payload(subject, role, company_id, associated_company_ids, expires_at);
        let token = sign(&self.refresh, &payload)?;

        self.tokens
            .store_refresh(RefreshTokenRecord {
                token_id: payload.jti,
                account_id: subject,
                expires_at,
            })
            .await?;
        Ok(token)
    }

    /// Issue an access token and a recorded refresh token for the same claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` or `AuthError::Repository`.
    pub async fn issue_pair(
        &self,
        subject: AccountId,
        role: Role,
        company_id: Option<AccountId>,
        associated_company_ids: &[AccountId],
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject, role, company_id, associated_company_ids)?,
            refresh_token: self
                .issue_refresh(subject, role, company_id, associated_company_ids)
                .await?,
        })
    }

    /// Verify an access token and return its claims.
    ///
    /// # Errors
    ///
    /// `InvalidSignature`, `Expired`, `MalformedToken` or `Blacklisted`.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (jti, claims) = self.decode(&self.access, token)?;
        if self.tokens.is_blacklisted(jti).await? {
            return Err(AuthError::Blacklisted);
        }
        Ok(claims)
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// Does not consult the server-side record.
    ///
    /// # Errors
    ///
    /// `InvalidSignature`, `Expired` or `MalformedToken`.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let (token_id, claims) = self.decode(&self.refresh, token)?;
        Ok(RefreshClaims { token_id, claims })
    }

    /// Consume a refresh token: verify it and delete its record.
    ///
    /// # Errors
    ///
    /// `RefreshNotFound` if the token was already used or revoked, `Expired`
    /// if it is past its expiry.
    pub async fn consume_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let verified = self.verify_refresh(token)?;
        let record = self
            .tokens
            .take_refresh(verified.token_id)
            .await?
            .ok_or(AuthError::RefreshNotFound)?;

        if record.expires_at <= Utc::now() {
            return Err(AuthError::Expired);
        }
        if record.account_id != verified.claims.subject {
            return Err(AuthError::RefreshNotFound);
        }
        Ok(verified)
    }

    /// Blacklist an access token until its natural expiry.
    ///
    /// Revoking an already-expired token is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` or `MalformedToken` if the token is not ours.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        match self.decode(&self.access, token) {
            Ok((jti, claims)) => {
                self.tokens.blacklist(jti, claims.expires_at).await?;
                Ok(())
            }
            Err(AuthError::Expired) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn decode(&self, keys: &KeyPair, token: &str) -> Result<(Uuid, Claims), AuthError> {
        let data = jsonwebtoken::decode::<TokenPayload>(token, &keys.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        let payload = data.claims;
        let expires_at =
            DateTime::from_timestamp(payload.exp, 0).ok_or(AuthError::MalformedToken)?;
        let claims = Claims {
            subject: payload.user.id,
            role: payload.user.role,
            company_id: payload.user.company_id,
            associated_company_ids: payload.user.associate_company_ids,
            expires_at,
        };
        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::Expired);
        }
        Ok((payload.jti, claims))
    }
}

fn payload(
    subject: AccountId,
    role: Role,
    company_id: Option<AccountId>,
    associated_company_ids: &[AccountId],
    expires_at: DateTime<Utc>,
) -> TokenPayload {
    TokenPayload {
        user: UserClaim {
            id: subject,
            role,
            company_id,
            associate_company_ids: associated_company_ids.to_vec(),
        },
        exp: expires_at.timestamp(),
        jti: Uuid::new_v4(),
    }
}

fn sign(keys: &KeyPair, payload: &TokenPayload) -> Result<String, AuthError> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), payload, &keys.encoding)
        .map_err(AuthError::Signing)
}
