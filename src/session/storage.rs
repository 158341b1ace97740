//! Cookie operations.
//!
//! The [`Cookie`] record is the interchange shape at the crate boundary:
//! a flat `{name, value, domain, path, expiry, secure, httpOnly}` record in
//! both directions. Translation to any host-native cookie object model is
//! the embedder's concern.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

use super::Session;

// ============================================================================
// Cookie
// ============================================================================

/// A browser cookie in flat interchange form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,

    /// Cookie value.
    pub value: String,

    /// Domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Expiration timestamp (seconds since epoch).
    #[serde(
        rename = "expires",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<f64>,

    /// Secure flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,

    /// HttpOnly flag.
    #[serde(rename = "httpOnly", default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
}

impl Cookie {
    /// Creates a new cookie with name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expiry: None,
            secure: None,
            http_only: None,
        }
    }

    /// Sets the domain.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the expiration timestamp.
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expiry: f64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the secure flag.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Sets the httpOnly flag.
    #[inline]
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }
}

// ============================================================================
// Session - Cookies
// ============================================================================

impl Session {
    /// Returns all cookies visible to the current page.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let result = self.call("Network.getCookies", Value::Null).await?;

        let cookies: Vec<Cookie> = result["cookies"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        debug!(count = cookies.len(), "Got cookies");
        Ok(cookies)
    }

    /// Sets a cookie.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use chrome_remote::Cookie;
    ///
    /// session
    ///     .set_cookie(Cookie::new("session", "abc123").with_domain("example.com"))
    ///     .await?;
    /// ```
    pub async fn set_cookie(&self, cookie: Cookie) -> Result<()> {
        debug!(name = %cookie.name, "Setting cookie");

        let args = serde_json::to_value(&cookie)?;
        self.call("Network.setCookie", args).await?;
        Ok(())
    }

    /// Deletes cookies matching a name, optionally scoped to a URL.
    pub async fn delete_cookie(&self, name: &str, url: Option<&str>) -> Result<()> {
        debug!(name, "Deleting cookie");

        let mut args = serde_json::json!({ "name": name });
        if let Some(url) = url {
            args["url"] = serde_json::json!(url);
        }

        self.call("Network.deleteCookies", args).await?;
        Ok(())
    }

    /// Clears all browser cookies.
    pub async fn clear_cookies(&self) -> Result<()> {
        debug!("Clearing all cookies");
        self.call("Network.clearBrowserCookies", Value::Null).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_builder() {
        let cookie = Cookie::new("session", "abc123")
            .with_domain("example.com")
            .with_path("/")
            .with_secure(true)
            .with_http_only(true)
            .with_expiry(1_900_000_000.0);

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.secure, Some(true));
    }

    #[test]
    fn test_cookie_serialization_skips_unset_fields() {
        let cookie = Cookie::new("a", "b");
        let json = serde_json::to_string(&cookie).expect("serialize");

        assert!(json.contains(r#""name":"a""#));
        assert!(!json.contains("domain"));
        assert!(!json.contains("httpOnly"));
    }

    #[test]
    fn test_cookie_deserialization_ignores_extra_fields() {
        let json = r#"{
            "name": "session",
            "value": "abc",
            "domain": "example.com",
            "path": "/",
            "expires": 1900000000.0,
            "size": 10,
            "httpOnly": true,
            "secure": false,
            "session": false
        }"#;

        let cookie: Cookie = serde_json::from_str(json).expect("deserialize");
        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.http_only, Some(true));
        assert_eq!(cookie.expiry, Some(1_900_000_000.0));
    }
}
