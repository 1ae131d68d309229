//! Name search over user rows.
//!
//! A raw term is normalized into words: `*` characters become separators,
//! each word loses a leading `@`, and LIKE metacharacters are escaped so
//! they only ever match literally. Every word must prefix-match at least one
//! enabled field; which fields are enabled is decided per call through
//! [`UserSearchOptions`]. Matching is case-insensitive on both sides.

use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::{User, UserSearchOptions};
use crate::store::user_store::UserStore;
use crate::store::{dispatch, StoreHandle};

/// Escape character declared on every LIKE so `%` and `_` in the term stay
/// literal.
const LIKE_ESCAPE_CHAR: char = '*';

// Scope skeletons. Each carries a WHERE clause already, so the match clause,
// the activity filter and the ordering tail can all be appended uniformly.

const SEARCH_ALL_USERS: &str = "SELECT u.* FROM users u WHERE u.id <> ''";

const SEARCH_IN_TEAM: &str = "\
    SELECT u.* FROM users u \
    INNER JOIN team_members tm ON tm.user_id = u.id AND tm.team_id = $1 \
    WHERE u.id <> ''";

const SEARCH_IN_CHANNEL: &str = "\
    SELECT u.* FROM users u \
    INNER JOIN channel_members cm ON cm.user_id = u.id AND cm.channel_id = $1 \
    WHERE u.id <> ''";

const SEARCH_NOT_IN_CHANNEL_IN_TEAM: &str = "\
    SELECT u.* FROM users u \
    INNER JOIN team_members tm ON tm.user_id = u.id AND tm.team_id = $1 \
    LEFT JOIN channel_members cm ON cm.user_id = u.id AND cm.channel_id = $2 \
    WHERE cm.user_id IS NULL";

const SEARCH_NOT_IN_CHANNEL_ANY_TEAM: &str = "\
    SELECT u.* FROM users u \
    LEFT JOIN channel_members cm ON cm.user_id = u.id AND cm.channel_id = $1 \
    WHERE cm.user_id IS NULL";

const SEARCH_NOT_IN_TEAM: &str = "\
    SELECT u.* FROM users u \
    LEFT JOIN team_members tm ON tm.user_id = u.id AND tm.team_id = $1 \
    WHERE tm.user_id IS NULL";

const SEARCH_WITHOUT_TEAM: &str = "\
    SELECT u.* FROM users u \
    WHERE NOT EXISTS (SELECT 1 FROM team_members tm WHERE tm.user_id = u.id)";

/// Columns a term may match, per the caller's visibility flags.
fn enabled_fields(options: &UserSearchOptions) -> Vec<&'static str> {
    let mut fields = vec!["u.username"];
    if options.allow_full_names {
        fields.push("u.first_name");
        fields.push("u.last_name");
        fields.push("u.nickname");
    }
    if options.allow_emails {
        fields.push("u.email");
    }
    fields
}

/// Splits a raw term into escaped search words. `*` is a separator, a
/// leading `@` per word is dropped, and `%`/`_` are escaped to match
/// literally. An all-separator term yields no words.
fn normalize_term(term: &str) -> Vec<String> {
    let spaced = term.replace('*', " ");
    spaced
        .split_whitespace()
        .filter_map(|word| {
            let word = word.trim_start_matches('@');
            if word.is_empty() {
                None
            } else {
                Some(escape_like_word(word))
            }
        })
        .collect()
}

fn escape_like_word(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for ch in word.chars() {
        if ch == '%' || ch == '_' {
            escaped.push(LIKE_ESCAPE_CHAR);
        }
        escaped.push(ch);
    }
    escaped
}

/// Builds the conjunctive match clause and the bind patterns behind it.
/// Each word becomes one `$n` bound to `word%`, compared against every
/// enabled field; words are ANDed, fields within a word are ORed.
fn build_match_clause(
    words: &[String],
    options: &UserSearchOptions,
    first_param: usize,
) -> (String, Vec<String>) {
    let fields = enabled_fields(options);
    let mut clause = String::new();
    let mut patterns = Vec::with_capacity(words.len());

    for (word_idx, word) in words.iter().enumerate() {
        let param = first_param + word_idx;
        let alternatives: Vec<String> = fields
            .iter()
            .map(|field| {
                format!("lower({field}) LIKE lower(${param}) ESCAPE '{LIKE_ESCAPE_CHAR}'")
            })
            .collect();
        clause.push_str(&format!(" AND ({})", alternatives.join(" OR ")));
        patterns.push(format!("{word}%"));
    }

    (clause, patterns)
}

/// Appends match clause, activity filter, ordering and limit to a scope
/// skeleton. Returns the finished SQL and the word patterns to bind after
/// the skeleton's own scope parameters.
fn search_query(
    skeleton: &str,
    scope_params: usize,
    term: &str,
    options: &UserSearchOptions,
) -> (String, Vec<String>) {
    let words = normalize_term(term);
    let (clause, patterns) = build_match_clause(&words, options, scope_params + 1);

    let mut sql = String::from(skeleton);
    sql.push_str(&clause);
    if !options.allow_inactive {
        sql.push_str(" AND u.delete_at = 0");
    }
    let limit_param = scope_params + patterns.len() + 1;
    sql.push_str(&format!(
        " ORDER BY u.username ASC, u.id ASC LIMIT ${limit_param}"
    ));

    (sql, patterns)
}

async fn run_search(
    pool: &PgPool,
    sql: &str,
    scope: &[String],
    patterns: &[String],
    limit: i64,
) -> StoreResult<Vec<User>> {
    let mut query = sqlx::query_as::<_, User>(sql);
    for param in scope {
        query = query.bind(param.clone());
    }
    for pattern in patterns {
        query = query.bind(pattern.clone());
    }
    Ok(query.bind(limit).fetch_all(pool).await?)
}

impl UserStore {
    /// Searches members of a team; an empty team id spans every user.
    pub fn search(
        &self,
        team_id: &str,
        term: &str,
        options: &UserSearchOptions,
    ) -> StoreHandle<Vec<User>> {
        let pool = self.pool.clone();
        let team_id = team_id.to_string();
        let term = term.to_string();
        let options = options.clone();
        dispatch(async move {
            let (skeleton, scope) = if team_id.is_empty() {
                (SEARCH_ALL_USERS, Vec::new())
            } else {
                (SEARCH_IN_TEAM, vec![team_id])
            };
            let (sql, patterns) = search_query(skeleton, scope.len(), &term, &options);
            run_search(&pool, &sql, &scope, &patterns, options.effective_limit()).await
        })
    }

    pub fn search_in_channel(
        &self,
        channel_id: &str,
        term: &str,
        options: &UserSearchOptions,
    ) -> StoreHandle<Vec<User>> {
        let pool = self.pool.clone();
        let channel_id = channel_id.to_string();
        let term = term.to_string();
        let options = options.clone();
        dispatch(async move {
            let scope = vec![channel_id];
            let (sql, patterns) = search_query(SEARCH_IN_CHANNEL, scope.len(), &term, &options);
            run_search(&pool, &sql, &scope, &patterns, options.effective_limit()).await
        })
    }

    /// Searches users outside a channel. A non-empty team id restricts
    /// candidates to that team's members, so an unknown team matches nobody.
    pub fn search_not_in_channel(
        &self,
        team_id: &str,
        channel_id: &str,
        term: &str,
        options: &UserSearchOptions,
    ) -> StoreHandle<Vec<User>> {
        let pool = self.pool.clone();
        let team_id = team_id.to_string();
        let channel_id = channel_id.to_string();
        let term = term.to_string();
        let options = options.clone();
        dispatch(async move {
            let (skeleton, scope) = if team_id.is_empty() {
                (SEARCH_NOT_IN_CHANNEL_ANY_TEAM, vec![channel_id])
            } else {
                (SEARCH_NOT_IN_CHANNEL_IN_TEAM, vec![team_id, channel_id])
            };
            let (sql, patterns) = search_query(skeleton, scope.len(), &term, &options);
            run_search(&pool, &sql, &scope, &patterns, options.effective_limit()).await
        })
    }

    pub fn search_not_in_team(
        &self,
        team_id: &str,
        term: &str,
        options: &UserSearchOptions,
    ) -> StoreHandle<Vec<User>> {
        let pool = self.pool.clone();
        let team_id = team_id.to_string();
        let term = term.to_string();
        let options = options.clone();
        dispatch(async move {
            let scope = vec![team_id];
            let (sql, patterns) = search_query(SEARCH_NOT_IN_TEAM, scope.len(), &term, &options);
            run_search(&pool, &sql, &scope, &patterns, options.effective_limit()).await
        })
    }

    pub fn search_without_team(
        &self,
        term: &str,
        options: &UserSearchOptions,
    ) -> StoreHandle<Vec<User>> {
        let pool = self.pool.clone();
        let term = term.to_string();
        let options = options.clone();
        dispatch(async move {
            let (sql, patterns) = search_query(SEARCH_WITHOUT_TEAM, 0, &term, &options);
            run_search(&pool, &sql, &[], &patterns, options.effective_limit()).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_splits_on_whitespace_and_stars() {
        assert_eq!(normalize_term("jim bob"), vec!["jim", "bob"]);
        assert_eq!(normalize_term("jimb*"), vec!["jimb"]);
        assert_eq!(normalize_term("jim*bob"), vec!["jim", "bob"]);
        assert_eq!(normalize_term("  jim  "), vec!["jim"]);
    }

    #[test]
    fn normalize_drops_empty_terms() {
        assert!(normalize_term("").is_empty());
        assert!(normalize_term("   ").is_empty());
        assert!(normalize_term("*").is_empty());
        assert!(normalize_term("* *").is_empty());
        assert!(normalize_term("@").is_empty());
    }

    #[test]
    fn normalize_strips_leading_mention_sigil() {
        assert_eq!(normalize_term("@jim"), vec!["jim"]);
        assert_eq!(normalize_term("@jim @bob"), vec!["jim", "bob"]);
    }

    #[test]
    fn normalize_escapes_like_metacharacters() {
        assert_eq!(normalize_term("h%"), vec!["h*%"]);
        assert_eq!(normalize_term("h_"), vec!["h*_"]);
        assert_eq!(normalize_term("Du_"), vec!["Du*_"]);
        assert_eq!(normalize_term("_dE"), vec!["*_dE"]);
    }

    #[test]
    fn match_clause_defaults_to_username_only() {
        let words = normalize_term("jimb");
        let options = UserSearchOptions::default();
        let (clause, patterns) = build_match_clause(&words, &options, 2);
        assert_eq!(
            clause,
            " AND (lower(u.username) LIKE lower($2) ESCAPE '*')"
        );
        assert_eq!(patterns, vec!["jimb%"]);
    }

    #[test]
    fn match_clause_widens_with_visibility_flags() {
        let words = normalize_term("jim");
        let options = UserSearchOptions {
            allow_full_names: true,
            allow_emails: true,
            ..Default::default()
        };
        let (clause, patterns) = build_match_clause(&words, &options, 1);
        for field in [
            "u.username",
            "u.first_name",
            "u.last_name",
            "u.nickname",
            "u.email",
        ] {
            assert!(clause.contains(field), "missing {field} in {clause}");
        }
        assert_eq!(patterns, vec!["jim%"]);
    }

    #[test]
    fn match_clause_numbers_one_parameter_per_word() {
        let words = normalize_term("jim bob");
        let options = UserSearchOptions::default();
        let (clause, patterns) = build_match_clause(&words, &options, 3);
        assert!(clause.contains("lower($3)"));
        assert!(clause.contains("lower($4)"));
        assert_eq!(patterns, vec!["jim%", "bob%"]);
    }

    #[test]
    fn query_appends_activity_filter_and_ordering() {
        let options = UserSearchOptions::default();
        let (sql, patterns) = search_query(SEARCH_IN_TEAM, 1, "jimb", &options);
        assert!(sql.starts_with(SEARCH_IN_TEAM));
        assert!(sql.contains(" AND u.delete_at = 0"));
        assert!(sql.ends_with(" ORDER BY u.username ASC, u.id ASC LIMIT $3"));
        assert_eq!(patterns, vec!["jimb%"]);
    }

    #[test]
    fn query_keeps_inactive_rows_on_request() {
        let options = UserSearchOptions {
            allow_inactive: true,
            ..Default::default()
        };
        let (sql, _) = search_query(SEARCH_ALL_USERS, 0, "jim", &options);
        assert!(!sql.contains("delete_at"));
        assert!(sql.ends_with(" ORDER BY u.username ASC, u.id ASC LIMIT $2"));
    }

    #[test]
    fn empty_term_produces_unfiltered_scope_listing() {
        let options = UserSearchOptions::default();
        let (sql, patterns) = search_query(SEARCH_IN_CHANNEL, 1, "", &options);
        assert!(patterns.is_empty());
        assert!(!sql.contains("LIKE"));
        assert!(sql.ends_with(" ORDER BY u.username ASC, u.id ASC LIMIT $2"));
    }
}
