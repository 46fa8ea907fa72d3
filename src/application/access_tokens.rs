//! Bearer token issuance and authentication.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::reads::CachedReads;
use crate::application::repos::{AccessTokensRepo, CreateAccessTokenParams, RepoError};
use crate::domain::access_tokens::{AccessTokenRecord, TOKEN_PREFIX};
use crate::domain::permissions::Principal;

const MIN_SECRET_LEN: usize = 32;
const PREFIX_LEN: usize = 12;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing access token")]
    Missing,
    #[error("invalid access token")]
    Invalid,
    #[error("expired access token")]
    Expired,
    #[error("revoked access token")]
    Revoked,
    #[error("identity lookup failed: {0}")]
    Lookup(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub record: AccessTokenRecord,
    /// Shown once; only its hash is stored.
    pub token: String,
}

#[derive(Clone)]
pub struct AccessTokenService {
    repo: Arc<dyn AccessTokensRepo>,
    reads: CachedReads,
}

impl AccessTokenService {
    pub fn new(repo: Arc<dyn AccessTokensRepo>, reads: CachedReads) -> Self {
        Self { repo, reads }
    }

    pub async fn issue(
        &self,
        user_id: Uuid,
        name: &str,
        expires_at: Option<OffsetDateTime>,
    ) -> Result<IssuedToken, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "token name is required"));
        }

        let prefix = generate_prefix();
        let secret = generate_secret();
        let record = self
            .repo
            .create_token(CreateAccessTokenParams {
                user_id,
                name: name.to_string(),
                prefix: prefix.clone(),
                hashed_secret: hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(IssuedToken {
            record,
            token: format!("{TOKEN_PREFIX}_{prefix}_{secret}"),
        })
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<AccessTokenRecord>, ServiceError> {
        Ok(self.repo.list_for_user(principal.user_id).await?)
    }

    pub async fn revoke(&self, principal: &Principal, id: Uuid) -> Result<(), ServiceError> {
        let owned = self
            .repo
            .list_for_user(principal.user_id)
            .await?
            .into_iter()
            .any(|token| token.id == id);
        if !owned && !principal.is_admin() {
            return Err(ServiceError::NotFound("access token"));
        }
        self.repo
            .revoke_token(id, OffsetDateTime::now_utc())
            .await?;
        Ok(())
    }

    /// Resolves a bearer token to the principal it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let parsed = parse_token(token).ok_or(AuthError::Invalid)?;
        let record = self
            .repo
            .find_by_prefix(&parsed.prefix)
            .await?
            .ok_or(AuthError::Invalid)?;

        let now = OffsetDateTime::now_utc();
        if record.is_revoked() {
            return Err(AuthError::Revoked);
        }
        if record.is_expired_at(now) {
            return Err(AuthError::Expired);
        }
        if record.hashed_secret.ct_eq(&hash_secret(&parsed.secret)).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        let user = self
            .reads
            .user(record.user_id)
            .await?
            .ok_or(AuthError::Invalid)?;

        let repo = self.repo.clone();
        let token_id = record.id;
        tokio::spawn(async move {
            if let Err(err) = repo.update_last_used(token_id, now).await {
                debug!(target: "canvass::auth", token_id = %token_id, error = %err, "last_used update failed");
            }
        });

        Ok(Principal {
            user_id: user.id,
            role: user.role,
            token_id: Some(record.id),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.len() != PREFIX_LEN || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}

fn hash_secret(secret: &str) -> Vec<u8> {
    Sha256::digest(secret.as_bytes()).to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
