use serde::{Deserialize, Serialize};

/// Cap applied to search results when the caller does not pick one.
pub const USER_SEARCH_DEFAULT_LIMIT: i64 = 100;

/// Field-scoping switches for user search. Username is always matched; the
/// other fields opt in per flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSearchOptions {
    /// Match against first name, last name and nickname.
    pub allow_full_names: bool,

    /// Match against email.
    pub allow_emails: bool,

    /// Include deactivated accounts (delete_at != 0).
    pub allow_inactive: bool,

    /// Maximum rows returned; values < 1 fall back to the default cap.
    pub limit: i64,
}

impl Default for UserSearchOptions {
    fn default() -> Self {
        UserSearchOptions {
            allow_full_names: false,
            allow_emails: false,
            allow_inactive: false,
            limit: USER_SEARCH_DEFAULT_LIMIT,
        }
    }
}

impl UserSearchOptions {
    pub(crate) fn effective_limit(&self) -> i64 {
        if self.limit < 1 {
            USER_SEARCH_DEFAULT_LIMIT
        } else {
            self.limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_applies() {
        let options = UserSearchOptions::default();
        assert_eq!(options.effective_limit(), USER_SEARCH_DEFAULT_LIMIT);

        let zero = UserSearchOptions { limit: 0, ..Default::default() };
        assert_eq!(zero.effective_limit(), USER_SEARCH_DEFAULT_LIMIT);

        let one = UserSearchOptions { limit: 1, ..Default::default() };
        assert_eq!(one.effective_limit(), 1);
    }
}
