//! Device credentials.
//!
//! A [`Credential`] pairs a login identity with a secret that is never printed,
//! logged or serialized in clear text. Credentials are built once per device
//! (or once per batch when one login is reused across a target list) and live
//! only as long as the session attempt that consumes them.

use std::fmt;

use crate::error::{Error, Result};

/// A string whose value is redacted from `Display`, `Debug` and `Serialize`.
///
/// # Example
///
/// ```rust
/// use netfleet::credential::SensitiveString;
///
/// let password = SensitiveString::new("secret123");
///
/// // This prints "[REDACTED]" instead of "secret123"
/// assert_eq!(password.to_string(), "[REDACTED]");
///
/// // Access the actual value
/// assert_eq!(password.expose(), "secret123");
/// ```
#[derive(Clone)]
pub struct SensitiveString {
    value: String,
}

impl SensitiveString {
    /// Create a new sensitive string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Expose the underlying value.
    ///
    /// Only the transport should call this, at the moment it authenticates.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Check if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED])")
    }
}

impl From<String> for SensitiveString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SensitiveString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq for SensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for SensitiveString {}

impl serde::Serialize for SensitiveString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

/// Login material for one device session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identity: String,
    secret: SensitiveString,
}

impl Credential {
    /// Build a credential from a plaintext secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIdentity`] for an empty user and
    /// [`Error::MissingSecret`] for an empty secret. A missing secret is never
    /// defaulted.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::from_secured(identity, SensitiveString::new(secret))
    }

    /// Build a credential from an already-secured secret.
    pub fn from_secured(identity: impl Into<String>, secret: SensitiveString) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(Error::MissingIdentity);
        }
        if secret.is_empty() {
            return Err(Error::MissingSecret(identity));
        }
        Ok(Self { identity, secret })
    }

    /// The login name.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The secured secret.
    pub fn secret(&self) -> &SensitiveString {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &self.secret)
            .finish()
    }
}
