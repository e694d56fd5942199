//! Source identity and the combined `ip:hostname` token.

use alloc::format;
use alloc::string::String;
use core::fmt;

/// Separator between the ip and hostname halves of a source token.
pub const TOKEN_SEPARATOR: char = ':';

/// The origin of an observation.
///
/// Sources are keyed by their combined token (`ip:hostname`), not by this
/// structured pair. Parsing is lossy: a token that does not split into
/// exactly two parts yields empty fields.
///
/// # Example
///
/// ```rust
/// use netlog_types::SourceIdentity;
///
/// let id = SourceIdentity::parse("10.0.0.1:podA");
/// assert_eq!(id, SourceIdentity::new("10.0.0.1", "podA"));
///
/// // IPv6 addresses contain the separator and degrade to an empty identity
/// assert!(SourceIdentity::parse("fe80::1:podA").is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceIdentity {
    /// Source IP address.
    pub ip: String,
    /// Source hostname (pod or host name as reported by the sniffer).
    pub hostname: String,
}

impl SourceIdentity {
    /// Create an identity from its parts.
    pub fn new(ip: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.into(),
        }
    }

    /// Split a combined token into its ip and hostname.
    ///
    /// Empty tokens, and tokens with zero or more than one separator, resolve
    /// to an identity whose fields are both empty.
    pub fn parse(token: &str) -> Self {
        if token.is_empty() {
            return Self::default();
        }

        let mut parts = token.split(TOKEN_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ip), Some(hostname), None) => Self::new(ip, hostname),
            _ => Self::default(),
        }
    }

    /// Build the combined token by concatenation.
    ///
    /// Round-tripping through [`SourceIdentity::parse`] is only lossless when
    /// neither part contains the separator.
    pub fn token(&self) -> String {
        join_token(&self.ip, &self.hostname)
    }

    /// True when both fields are empty (the degraded form of a bad token).
    pub fn is_empty(&self) -> bool {
        self.ip.is_empty() && self.hostname.is_empty()
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ip, TOKEN_SEPARATOR, self.hostname)
    }
}

impl From<&str> for SourceIdentity {
    fn from(token: &str) -> Self {
        Self::parse(token)
    }
}

/// Concatenate an ip and hostname into a source token.
pub fn join_token(ip: &str, hostname: &str) -> String {
    format!("{}{}{}", ip, TOKEN_SEPARATOR, hostname)
}
