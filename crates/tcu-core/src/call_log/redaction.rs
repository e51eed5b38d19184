//! Masking of credentials before request bodies are persisted

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Replacement written in place of the session token
pub const MASK: &str = "***";

static SESSION_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches the token inside the credentials block only, so a caller field
/// that happens to be named `SessionToken` is logged as sent
fn session_token_regex() -> &'static Regex {
    SESSION_TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"(?s)(<UsernameToken>.*?<SessionToken>)(.*?)(</SessionToken>)")
            .unwrap_or_else(|e| panic!("invalid session token pattern: {e}"))
    })
}

/// Mask the credential `SessionToken` of an encoded request
pub fn redact_session_token(body: &str) -> Cow<'_, str> {
    session_token_regex().replacen(body, 1, format!("${{1}}{MASK}${{3}}"))
}
