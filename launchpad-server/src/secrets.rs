//! Admin credential lookup and request authorization.

use http::HeaderMap;
use http::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};

use crate::ApiError;

/// Header carrying the admin password when `Authorization` is not used.
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// Supplies the admin password.
pub trait SecretProvider: Send + Sync {
    /// Current admin password, if one is configured.
    fn admin_password(&self) -> Option<SecretString>;
}

/// A password fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticSecret {
    password: Option<SecretString>,
}

impl StaticSecret {
    pub fn new(password: Option<SecretString>) -> Self {
        Self { password }
    }
}

impl SecretProvider for StaticSecret {
    fn admin_password(&self) -> Option<SecretString> {
        self.password.clone()
    }
}

/// Check the admin password carried by a request.
///
/// Accepts `Authorization: Bearer <password>` or `x-admin-password: <password>`.
/// Without a configured password every request is refused.
pub fn authorize(provider: &dyn SecretProvider, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = provider.admin_password() else {
        return Err(ApiError::Unauthorized(
            "admin access is not configured".to_string(),
        ));
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| {
            headers
                .get(ADMIN_PASSWORD_HEADER)
                .and_then(|v| v.to_str().ok())
        })
        .ok_or_else(|| ApiError::Unauthorized("admin password required".to_string()))?;

    if constant_time_eq(presented.trim(), expected.expose_secret()) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin password".to_string()))
    }
}

/// Constant-time string comparison (prevent timing attacks)
///
/// Runs over every byte of `presented`, so the time taken never depends on
/// the length of `expected`; a length mismatch is folded into the result.
fn constant_time_eq(presented: &str, expected: &str) -> bool {
    let expected = expected.as_bytes();

    presented
        .bytes()
        .enumerate()
        .fold(presented.len() ^ expected.len(), |acc, (i, x)| {
            acc | usize::from(x ^ expected.get(i).copied().unwrap_or(0))
        })
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn provider() -> StaticSecret {
        StaticSecret::new(Some(SecretString::from("hunter2hunter2".to_string())))
    }

    #[test]
    fn test_bearer_and_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer hunter2hunter2"));
        assert!(authorize(&provider(), &headers).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_PASSWORD_HEADER, HeaderValue::from_static("hunter2hunter2"));
        assert!(authorize(&provider(), &headers).is_ok());
    }

    #[test]
    fn test_rejections() {
        let mut wrong = HeaderMap::new();
        wrong.insert(ADMIN_PASSWORD_HEADER, HeaderValue::from_static("hunter3hunter3"));
        assert!(matches!(
            authorize(&provider(), &wrong),
            Err(ApiError::Unauthorized(_))
        ));

        assert!(authorize(&provider(), &HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_PASSWORD_HEADER, HeaderValue::from_static("anything"));
        assert!(authorize(&StaticSecret::default(), &headers).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("abcd", "abc"));
        assert!(!constant_time_eq("", "abc"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_length_mismatch_with_matching_prefix() {
        // zero padding must not turn a shorter secret into a match
        assert!(!constant_time_eq("abc\0", "abc"));
        assert!(!constant_time_eq("hunter2", "hunter2hunter2"));

        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_PASSWORD_HEADER, HeaderValue::from_static("hunter2"));
        assert!(authorize(&provider(), &headers).is_err());
    }
}
