//! Admin management of user accounts.

use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use shopfront_core::UserId;

use crate::db::{RepositoryError, UserRepository};
use crate::models::{Page, PageParams, User, UserFlagsUpdate};

/// Errors from admin user operations.
#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Invalid(&'static str),

    #[error("User still has orders and cannot be deleted")]
    InUse,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for UserAdminError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::InUse,
            other => Self::Repository(other),
        }
    }
}

/// Admin user service. `actor` is always the authenticated administrator.
pub struct UserAdminService<'a> {
    users: UserRepository<'a>,
}

impl<'a> UserAdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Users matching `search`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::Repository` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        params: PageParams,
    ) -> Result<Page<User>, UserAdminError> {
        let (users, total) = self.users.list(search, params).await?;
        Ok(Page::new(users, total, params))
    }

    /// A user by ID.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::NotFound` if the user does not exist.
    pub async fn get(&self, id: UserId) -> Result<User, UserAdminError> {
        self.users.get_by_id(id).await?.ok_or(UserAdminError::NotFound)
    }

    /// Change account flags.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::Forbidden` when a non-superuser touches the
    /// staff or superuser flags, or the active flag of another administrator,
    /// and `UserAdminError::Invalid` when an administrator would lock
    /// themselves out.
    pub async fn update_flags(
        &self,
        actor: &User,
        id: UserId,
        update: &UserFlagsUpdate,
    ) -> Result<User, UserAdminError> {
        let target = self.get(id).await?;
        check_flags_update(actor, &target, update)?;

        let user = self.users.update_flags(id, update).await?;
        info!(
            actor = %actor.id,
            user_id = %user.id,
            is_active = user.is_active,
            is_staff = user.is_staff,
            is_superuser = user.is_superuser,
            "User flags updated"
        );
        Ok(user)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::Forbidden` unless `actor` is a superuser and
    /// `UserAdminError::Invalid` when deleting oneself.
    pub async fn delete(&self, actor: &User, id: UserId) -> Result<(), UserAdminError> {
        check_delete(actor, id)?;

        self.users.delete(id).await?;
        info!(actor = %actor.id, user_id = %id, "User deleted");
        Ok(())
    }
}

fn check_flags_update(
    actor: &User,
    target: &User,
    update: &UserFlagsUpdate,
) -> Result<(), UserAdminError> {
    if update.changes_privileges() && !actor.is_superuser {
        return Err(UserAdminError::Forbidden(
            "Only superusers can change staff or superuser status",
        ));
    }
    if update.is_active.is_some()
        && (target.is_staff || target.is_superuser)
        && !actor.is_superuser
        && actor.id != target.id
    {
        return Err(UserAdminError::Forbidden(
            "Only superusers can activate or deactivate administrators",
        ));
    }
    if actor.id == target.id && (update.is_active == Some(false) || update.changes_privileges()) {
        return Err(UserAdminError::Invalid(
            "You cannot deactivate or change the roles of your own account",
        ));
    }
    Ok(())
}

fn check_delete(actor: &User, id: UserId) -> Result<(), UserAdminError> {
    if !actor.is_superuser {
        return Err(UserAdminError::Forbidden("Only superusers can delete users"));
    }
    if actor.id == id {
        return Err(UserAdminError::Invalid("You cannot delete your own account"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use shopfront_core::Email;

    use super::*;

    fn admin(id: i32, is_superuser: bool) -> User {
        User {
            is_staff: true,
            is_superuser,
            ..shopper(id)
        }
    }

    fn shopper(id: i32) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse("someone@example.com").unwrap(),
            first_name: None,
            last_name: None,
            phone: None,
            is_active: true,
            is_verified: true,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_staff_cannot_change_privileges() {
        let staff = admin(1, false);
        let promote = UserFlagsUpdate {
            is_staff: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            check_flags_update(&staff, &shopper(2), &promote),
            Err(UserAdminError::Forbidden(_))
        ));

        let deactivate = UserFlagsUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(check_flags_update(&staff, &shopper(2), &deactivate).is_ok());
    }

    #[test]
    fn test_staff_cannot_deactivate_administrators() {
        let staff = admin(1, false);
        let deactivate = UserFlagsUpdate {
            is_active: Some(false),
            ..Default::default()
        };

        assert!(matches!(
            check_flags_update(&staff, &admin(2, true), &deactivate),
            Err(UserAdminError::Forbidden(_))
        ));
        assert!(matches!(
            check_flags_update(&staff, &admin(3, false), &deactivate),
            Err(UserAdminError::Forbidden(_))
        ));
        assert!(check_flags_update(&admin(1, true), &admin(2, true), &deactivate).is_ok());
    }

    #[test]
    fn test_superuser_cannot_demote_self() {
        let root = admin(1, true);
        let demote = UserFlagsUpdate {
            is_superuser: Some(false),
            ..Default::default()
        };
        assert!(check_flags_update(&root, &admin(2, true), &demote).is_ok());
        assert!(matches!(
            check_flags_update(&root, &root, &demote),
            Err(UserAdminError::Invalid(_))
        ));
    }

    #[test]
    fn test_delete_rules() {
        assert!(matches!(
            check_delete(&admin(1, false), UserId::new(2)),
            Err(UserAdminError::Forbidden(_))
        ));
        assert!(matches!(
            check_delete(&admin(1, true), UserId::new(1)),
            Err(UserAdminError::Invalid(_))
        ));
        assert!(check_delete(&admin(1, true), UserId::new(2)).is_ok());
    }
}
