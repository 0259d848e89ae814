//! Masking of secret-bearing tokens before they reach logs
//!
//! Archivers take the password inline (`-p<secret>`), so an argument vector
//! must never be logged as-is.

/// Replacement text for masked values.
pub const REDACTED: &str = "***";

/// Return a copy of `tokens` with password values masked.
///
/// A bare `-p` (prompt for password) is kept unchanged since it carries no secret.
#[must_use]
pub fn redact<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            let token = token.as_ref();
            match token.strip_prefix("-p") {
                Some(secret) if !secret.is_empty() => format!("-p{REDACTED}"),
                _ => token.to_string(),
            }
        })
        .collect()
}
