use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::models::{new_id, now_millis};

pub const EMAIL_MAX_LENGTH: usize = 128;
pub const USERNAME_MAX_LENGTH: usize = 64;

/// The versioned vocabulary of system-defined role tokens. Any role token a
/// user carries that is not in this list is a custom assignment and gets
/// dropped by `clear_all_custom_role_assignments`.
pub const SYSTEM_ROLES: &[&str] = &[
    "system_user",
    "system_admin",
    "system_post_all",
    "system_post_all_public",
    "system_user_access_token",
];

/// Identity record. `delete_at == 0` means the account is active; a non-empty
/// `auth_service` marks the account as federated to an external identity
/// provider, which restricts untrusted edits of email and username.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
    pub username: String,
    pub password: String,
    pub auth_data: Option<String>,
    pub auth_service: String,
    pub email: String,
    pub email_verified: bool,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: String,
    pub last_password_update: i64,
    pub last_picture_update: i64,
    pub failed_attempts: i32,
    pub mfa_active: bool,
    pub mfa_secret: String,
}

impl Default for User {
    fn default() -> Self {
        User {
            id: String::new(),
            create_at: 0,
            update_at: 0,
            delete_at: 0,
            username: String::new(),
            password: String::new(),
            auth_data: None,
            auth_service: String::new(),
            email: String::new(),
            email_verified: false,
            nickname: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            roles: String::new(),
            last_password_update: 0,
            last_picture_update: 0,
            failed_attempts: 0,
            mfa_active: false,
            mfa_secret: String::new(),
        }
    }
}

/// Outcome of an update: the row as persisted alongside the row it replaced,
/// so callers can diff what actually changed.
#[derive(Debug, Clone, Serialize)]
pub struct UserUpdate {
    pub new: User,
    pub old: User,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.delete_at == 0
    }

    pub fn is_federated(&self) -> bool {
        !self.auth_service.is_empty()
    }

    pub fn is_system_admin(&self) -> bool {
        self.roles.split_whitespace().any(|r| r == "system_admin")
    }

    /// Keeps only tokens from the system-role vocabulary, preserving their
    /// order. Returns None when nothing would change.
    pub fn strip_custom_roles(roles: &str) -> Option<String> {
        let kept: Vec<&str> = roles
            .split_whitespace()
            .filter(|r| SYSTEM_ROLES.contains(r))
            .collect();
        let stripped = kept.join(" ");
        if stripped == roles {
            None
        } else {
            Some(stripped)
        }
    }

    /// Normalizes and stamps a record about to be inserted: mints the id and,
    /// when absent, the username; lowercases identity fields; sets the birth
    /// timestamps. The id must be empty when this is called.
    pub fn pre_save(&mut self) {
        if self.id.is_empty() {
            self.id = new_id();
        }
        if self.username.is_empty() {
            self.username = new_id();
        }
        if matches!(self.auth_data.as_deref(), Some("")) {
            self.auth_data = None;
        }

        self.username = self.username.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();

        self.create_at = now_millis();
        self.update_at = self.create_at;
        self.last_password_update = self.create_at;
        self.mfa_active = false;
    }

    /// Normalizes a record about to replace an existing row.
    pub fn pre_update(&mut self) {
        self.username = self.username.trim().to_lowercase();
        self.email = self.email.trim().to_lowercase();
        if matches!(self.auth_data.as_deref(), Some("")) {
            self.auth_data = None;
        }
        self.update_at = now_millis();
    }

    /// Structural checks shared by save and update. Uniqueness is not checked
    /// here; that is settled by the storage engine at commit time.
    pub fn is_valid(&self) -> StoreResult<()> {
        if self.id.is_empty() {
            return Err(StoreError::Validation("user id is empty".to_string()));
        }
        if self.create_at == 0 {
            return Err(StoreError::Validation(
                "user create_at is not stamped".to_string(),
            ));
        }
        if self.username.is_empty() || self.username.len() > USERNAME_MAX_LENGTH {
            return Err(StoreError::Validation(format!(
                "invalid username: {:?}",
                self.username
            )));
        }
        if !self.email.is_empty() && (self.email.len() > EMAIL_MAX_LENGTH || !self.email.contains('@'))
        {
            return Err(StoreError::Validation(format!(
                "invalid email: {:?}",
                self.email
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(email: &str, username: &str) -> User {
        let mut user = User {
            email: email.to_string(),
            username: username.to_string(),
            ..Default::default()
        };
        user.pre_save();
        user
    }

    #[test]
    fn pre_save_mints_id_and_username() {
        let user = stamped("Bill@Example.COM", "");
        assert_eq!(user.id.len(), 32);
        assert_eq!(user.username.len(), 32);
        assert_eq!(user.email, "bill@example.com");
        assert_eq!(user.create_at, user.update_at);
        assert!(user.create_at > 0);
        assert!(!user.mfa_active);
    }

    #[test]
    fn pre_save_normalizes_empty_auth_data() {
        let mut user = User {
            auth_data: Some(String::new()),
            ..Default::default()
        };
        user.pre_save();
        assert_eq!(user.auth_data, None);
    }

    #[test]
    fn is_valid_rejects_malformed_email() {
        let mut user = stamped("not-an-email", "billy");
        assert!(matches!(
            user.is_valid(),
            Err(StoreError::Validation(_))
        ));

        user.email = "0123456789".repeat(20);
        assert!(user.is_valid().is_err());

        user.email = String::new();
        assert!(user.is_valid().is_ok(), "empty email is allowed");
    }

    #[test]
    fn is_valid_rejects_oversized_username() {
        let mut user = stamped("bill@example.com", "billy");
        assert!(user.is_valid().is_ok());
        user.username = "x".repeat(USERNAME_MAX_LENGTH + 1);
        assert!(user.is_valid().is_err());
    }

    #[test]
    fn strip_custom_roles_keeps_system_vocabulary() {
        assert_eq!(User::strip_custom_roles("system_user system_admin system_post_all"), None);
        assert_eq!(
            User::strip_custom_roles("system_user custom_role system_admin another_custom_role"),
            Some("system_user system_admin".to_string())
        );
        assert_eq!(User::strip_custom_roles("system_user"), None);
        assert_eq!(User::strip_custom_roles("custom_only"), Some(String::new()));
    }

    #[test]
    fn system_admin_detected_among_tokens() {
        let mut user = stamped("bill@example.com", "billy");
        user.roles = "system_user system_admin".to_string();
        assert!(user.is_system_admin());
        user.roles = "system_user".to_string();
        assert!(!user.is_system_admin());
        user.roles = "system_administrator".to_string();
        assert!(!user.is_system_admin());
    }
}
