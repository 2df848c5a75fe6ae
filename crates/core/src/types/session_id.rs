//! Opaque session token.

use core::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Number of random bytes behind a freshly generated token (256 bits).
const TOKEN_BYTES: usize = 32;

/// An opaque session identifier.
///
/// The token has no decodable structure: its only properties are
/// unguessability and equality. Fresh tokens are 32 bytes from `rand`'s
/// thread-local CSPRNG (periodically reseeded from the operating system),
/// encoded as unpadded URL-safe base64 so they can travel in a cookie value
/// without escaping.
///
/// `Debug` only prints a short prefix so tokens don't end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session token.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::random();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a token received from a client.
    ///
    /// No validation is performed: an unknown or malformed token simply never
    /// matches a stored session.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionId({prefix}…)")
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for SessionId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SessionId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for SessionId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let tokens: HashSet<SessionId> = (0..256).map(|_| SessionId::generate()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_generated_token_is_cookie_safe() {
        let token = SessionId::generate();
        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(token.as_str().len(), 43);
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let token = SessionId::from_token("abcdefghijklmnop");
        let debug = format!("{token:?}");
        assert!(debug.starts_with("SessionId(abcdef"));
        assert!(!debug.contains("ghijklmnop"));
    }

    #[test]
    fn test_from_token_equality() {
        assert_eq!(SessionId::from_token("x"), SessionId::from_token("x"));
        assert_ne!(SessionId::from_token("x"), SessionId::from_token("y"));
    }
}
