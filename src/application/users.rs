//! User profiles and role administration.

use std::sync::Arc;

use canvass_api_types::ProfileSyncRequest;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::reads::CachedReads;
use crate::application::repos::{UpsertUserParams, UsersRepo};
use crate::cache::CacheTrigger;
use crate::domain::entities::UserRecord;
use crate::domain::permissions::Principal;
use crate::domain::types::UserRole;

pub const EMAIL_MAX_CHARS: usize = 254;
pub const NAME_MAX_CHARS: usize = 100;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    reads: CachedReads,
    trigger: CacheTrigger,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>, reads: CachedReads, trigger: CacheTrigger) -> Self {
        Self {
            users,
            reads,
            trigger,
        }
    }

    pub async fn me(&self, principal: &Principal) -> Result<UserRecord, ServiceError> {
        self.reads
            .user(principal.user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<UserRecord>, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::Forbidden("list users"));
        }
        Ok(self.users.list_users().await?)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.user_id))]
    pub async fn update_role(
        &self,
        principal: &Principal,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<UserRecord, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::Forbidden("change user roles"));
        }
        if user_id == principal.user_id && role != UserRole::Admin {
            return Err(ServiceError::Conflict(
                "admins cannot remove their own admin role".to_string(),
            ));
        }

        let user = self.users.update_role(user_id, role).await?;
        self.trigger.user_updated(user.id);
        info!(target: "canvass::users", user_id = %user.id, role = %role, "User role updated");
        Ok(user)
    }

    /// Creates or refreshes a user from identity-provider data.
    ///
    /// New users start with `initial_role`; existing users keep their role.
    #[instrument(skip(self, profile))]
    pub async fn sync(
        &self,
        external_id: &str,
        profile: &ProfileSyncRequest,
        initial_role: UserRole,
    ) -> Result<UserRecord, ServiceError> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(ServiceError::validation(
                "external_id",
                "external id is required",
            ));
        }

        let user = self
            .users
            .upsert_user(UpsertUserParams {
                external_id: external_id.to_string(),
                email: normalize_email(&profile.email)?,
                first_name: normalize_name("first_name", profile.first_name.as_deref())?,
                last_name: normalize_name("last_name", profile.last_name.as_deref())?,
                initial_role,
            })
            .await?;
        self.trigger.user_updated(user.id);
        Ok(user)
    }

    /// Refreshes the caller's own profile.
    pub async fn sync_me(
        &self,
        principal: &Principal,
        profile: &ProfileSyncRequest,
    ) -> Result<UserRecord, ServiceError> {
        let current = self.me(principal).await?;
        self.sync(&current.external_id, profile, current.role).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ServiceError> {
        let email = normalize_email(email)?;
        Ok(self.users.find_by_email(&email).await?)
    }
}

fn normalize_email(raw: &str) -> Result<String, ServiceError> {
    let email = raw.trim().to_ascii_lowercase();
    let plausible = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !plausible || email.chars().count() > EMAIL_MAX_CHARS {
        return Err(ServiceError::validation("email", "a valid email is required"));
    }
    Ok(email)
}

fn normalize_name(field: &'static str, raw: Option<&str>) -> Result<Option<String>, ServiceError> {
    let Some(name) = raw.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(ServiceError::validation(
            field,
            format!("must be at most {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(Some(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_lowercased_and_checked() {
        assert_eq!(normalize_email(" Ada@Example.org ").unwrap(), "ada@example.org");
        assert!(normalize_email("ada").is_err());
        assert!(normalize_email("@example.org").is_err());
        assert!(normalize_email("ada@localhost").is_err());
    }

    #[test]
    fn blank_names_are_dropped() {
        assert_eq!(normalize_name("first_name", Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_name("first_name", Some(" Ada ")).unwrap().as_deref(),
            Some("Ada")
        );
    }
}
