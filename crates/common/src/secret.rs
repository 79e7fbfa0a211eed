//! Secret wrapper for credentials and bearer tokens

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs
///
/// Wraps the OAuth client secret and both upstream tokens. Call sites
/// that genuinely need the raw value (Basic auth header, bearer header,
/// markup interpolation) go through [`expose`](Secret::expose).
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacts_debug_and_display() {
        let secret = Secret::new(String::from("embed-client-secret"));
        let debug = format!("{:?}", secret);
        let display = format!("{}", secret);
        assert_eq!(debug, "[REDACTED]");
        assert_eq!(display, "[REDACTED]");
        assert!(!debug.contains("embed-client-secret"));
    }

    #[test]
    fn test_secret_exposes_value() {
        let secret: Secret<String> = String::from("eyJhbGciOi.access").into();
        assert_eq!(secret.expose(), "eyJhbGciOi.access");
    }

    #[test]
    fn test_secret_clone_preserves_value() {
        let secret = Secret::new(String::from("tok"));
        let cloned = secret.clone();
        assert_eq!(cloned.expose(), secret.expose());
    }
}
