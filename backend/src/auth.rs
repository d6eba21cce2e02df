//! Session tokens and API-key checks.
//!
//! The OAuth handshake happens outside this service. Once it succeeds the
//! caller receives a session token bound to the user's open id:
//!
//! ```text
//! {open_id}.{hex(sha256(secret ":" open_id))}
//! ```
//!
//! The token travels in the `app_session_id` cookie or a `Bearer`
//! authorization header.

use subtle::ConstantTimeEq;

use crate::db::sha256_hex;

pub const SESSION_COOKIE_NAME: &str = "app_session_id";

fn signature(secret: &str, open_id: &str) -> String {
    sha256_hex(&[secret.as_bytes(), &b":"[..], open_id.as_bytes()])
}

/// Byte-wise comparison whose duration does not depend on where the inputs differ.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Issue a session token for `open_id`.
pub fn issue_session_token(secret: &str, open_id: &str) -> String {
    format!("{}.{}", open_id, signature(secret, open_id))
}

/// The open id carried by a valid token, `None` for anything else.
pub fn verify_session_token(secret: &str, token: &str) -> Option<String> {
    // Open ids may themselves contain dots; the signature never does.
    let (open_id, provided) = token.rsplit_once('.')?;
    if open_id.is_empty() {
        return None;
    }
    constant_time_eq(provided, &signature(secret, open_id)).then(|| open_id.to_string())
}

/// Extract the session token from a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE_NAME && !value.is_empty()).then_some(value)
    })
}

/// Extract the token from an `Authorization: Bearer ...` header value.
pub fn token_from_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    (scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty()).then(|| token.trim())
}

/// `Set-Cookie` value that expires the session cookie.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_verifies() {
        let token = issue_session_token("secret", "user-42");
        assert_eq!(verify_session_token("secret", &token).as_deref(), Some("user-42"));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let token = issue_session_token("secret", "user-42");
        assert!(verify_session_token("other", &token).is_none());

        let forged = token.replacen("user-42", "admin", 1);
        assert!(verify_session_token("secret", &forged).is_none());
        assert!(verify_session_token("secret", "no-signature").is_none());
        assert!(verify_session_token("secret", ".abc").is_none());
    }

    #[test]
    fn test_open_id_with_dots() {
        let token = issue_session_token("secret", "google.1234");
        assert_eq!(
            verify_session_token("secret", &token).as_deref(),
            Some("google.1234")
        );
    }

    #[test]
    fn test_token_sources() {
        assert_eq!(
            token_from_cookie_header("theme=dark; app_session_id=abc.def"),
            Some("abc.def")
        );
        assert_eq!(token_from_cookie_header("theme=dark"), None);
        assert_eq!(token_from_authorization("Bearer abc.def"), Some("abc.def"));
        assert_eq!(token_from_authorization("Basic xyz"), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("key", "key"));
        assert!(!constant_time_eq("key", "kez"));
        assert!(!constant_time_eq("key", "keys"));
    }
}
