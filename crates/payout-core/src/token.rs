//! Opaque bearer credential.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Personal access token for the trading API.
///
/// The value is never parsed. It is redacted from `Debug`/`Display`
/// and wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token. Surrounding whitespace is trimmed; an empty
    /// result is rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyToken);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Raw value, for building the outgoing request only.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Token::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(Token::new(""), Err(CoreError::EmptyToken)));
        assert!(matches!(Token::new("   "), Err(CoreError::EmptyToken)));
    }

    #[test]
    fn test_token_trimmed() {
        let token = Token::new("  a1-secret \n").unwrap();
        assert_eq!(token.expose(), "a1-secret");
    }

    #[test]
    fn test_token_never_printed() {
        let token = Token::new("a1-secret").unwrap();
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.to_string(), "***");
    }

    #[test]
    fn test_token_serde() {
        let token: Token = serde_json::from_str(r#""a1-secret""#).unwrap();
        assert_eq!(serde_json::to_string(&token).unwrap(), r#""a1-secret""#);
        assert!(serde_json::from_str::<Token>(r#""""#).is_err());
    }
}
