//! Credential cascade resolution
//!
//! Usernames and passwords for a hierarchical identity (team / project /
//! repo) are resolved from environment-style variables. Each non-empty
//! prefix of the hierarchy contributes one candidate key on top of the
//! global `CODING_USERNAME` / `CODING_PASSWORD` defaults, and the most
//! specific defined key wins. Username and password resolve independently,
//! so a per-project password can override while the team username still
//! applies.

/// Base environment key for the username cascade
pub const USERNAME_BASE: &str = "CODING_USERNAME";

/// Base environment key for the password cascade
pub const PASSWORD_BASE: &str = "CODING_PASSWORD";

/// Resolved credential pair; empty strings when nothing matched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Sanitize an identity part into an environment-key fragment
///
/// Upper-cases and replaces every non-alphanumeric character with `_`.
pub fn sanitize_env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Resolve credentials for an identity hierarchy
///
/// `lookup` is probed with candidate keys, most specific first; only
/// entries for which it returns a value count as defined.
pub fn resolve_credentials<F>(team: &str, project: &str, repo: &str, lookup: F) -> Credentials
where
    F: Fn(&str) -> Option<String>,
{
    let username = first_defined(&candidate_keys(team, project, repo, "USERNAME"), &lookup);
    let password = first_defined(&candidate_keys(team, project, repo, "PASSWORD"), &lookup);
    Credentials { username, password }
}

/// Build the ordered candidate-key list for one credential, most specific
/// first
fn candidate_keys(team: &str, project: &str, repo: &str, suffix: &str) -> Vec<String> {
    let mut parts = Vec::new();
    if !team.is_empty() {
        parts.push(sanitize_env_key(team));
        if !project.is_empty() {
            parts.push(sanitize_env_key(project));
            if !repo.is_empty() {
                parts.push(sanitize_env_key(repo));
            }
        }
    }

    let mut keys = vec![format!("CODING_{}", suffix)];
    for i in 0..parts.len() {
        keys.push(format!("CODING_{}_{}", parts[..=i].join("_"), suffix));
    }
    keys.reverse();
    keys
}

fn first_defined<F>(keys: &[String], lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            return value;
        }
    }
    String::new()
}
