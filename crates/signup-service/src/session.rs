//! Session cookies carrying transaction tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use std::fmt;
use std::time::Duration;

/// Cookie holding the token of a transaction whose challenge is not yet verified.
pub const TRANSACTION_ID: &str = "TRANSACTION_ID";

/// Cookie holding the token of a verified (and later registered) transaction.
pub const VERIFIED_TRANSACTION_ID: &str = "VERIFIED_TRANSACTION_ID";

/// Mint a fresh opaque transaction token.
pub fn new_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A cookie to set (or expire) on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: &'static str,
    pub value: String,
    pub max_age: Duration,
}

impl SessionCookie {
    /// Bind a token to a cookie for `max_age`.
    pub fn issue(name: &'static str, token: impl Into<String>, max_age: Duration) -> Self {
        Self {
            name,
            value: token.into(),
            max_age,
        }
    }

    /// Expire a cookie immediately.
    pub fn expire(name: &'static str) -> Self {
        Self {
            name,
            value: String::new(),
            max_age: Duration::ZERO,
        }
    }

    pub fn is_expiry(&self) -> bool {
        self.max_age.is_zero()
    }

    /// Render as a `Set-Cookie` header value.
    pub fn header_value(&self, secure: bool) -> String {
        let mut header = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly",
            self.name,
            self.value,
            self.max_age.as_secs()
        );
        if secure {
            header.push_str("; Secure");
        }
        header
    }
}

impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value(true))
    }
}

/// Extract a named cookie from a `Cookie` request header.
pub fn read_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
