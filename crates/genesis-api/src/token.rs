//! Bearer token normalization and local validation.

const SCHEME: &str = "Bearer";
const MIN_TOKEN_LEN: usize = 10;

/// Reason a token was rejected before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token is required")]
    Missing,

    #[error("Token appears to be too short")]
    TooShort,

    #[error("Token contains invalid characters")]
    InvalidCharacters,
}

/// Strip surrounding whitespace and an optional case-insensitive `Bearer`
/// scheme label, returning the bare credential.
fn strip_scheme(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..SCHEME.len()) {
        Some(head) if head.eq_ignore_ascii_case(SCHEME) => {
            let rest = &trimmed[SCHEME.len()..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}

/// Normalize a raw credential into an `Authorization` header value.
///
/// Idempotent: formatting an already formatted token returns it unchanged.
pub fn format_token(raw: &str) -> String {
    format!("{SCHEME} {}", strip_scheme(raw))
}

/// Check a user-supplied token before it is submitted.
pub fn validate_token(raw: &str) -> Result<(), TokenError> {
    if raw.trim().is_empty() {
        return Err(TokenError::Missing);
    }

    let clean = strip_scheme(raw);

    if clean.chars().count() < MIN_TOKEN_LEN {
        return Err(TokenError::TooShort);
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if !clean.chars().all(allowed) {
        return Err(TokenError::InvalidCharacters);
    }

    Ok(())
}

/// Trim and collapse internal whitespace runs to a single space.
pub fn sanitize_input(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
