//! Opaque cursor encoding.
//!
//! A cursor is the JSON form of an ordering key, encoded as unpadded
//! URL-safe base64 so it can travel in query strings without escaping.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failures raised while encoding or decoding a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The cursor text is not valid URL-safe base64.
    #[error("cursor is not valid base64")]
    Encoding,
    /// The decoded payload does not describe the expected key.
    #[error("cursor payload is malformed")]
    Payload,
    /// The key could not be serialised.
    #[error("cursor key could not be serialised: {message}")]
    Serialise {
        /// Serialiser error text.
        message: String,
    },
}

/// Ordering key wrapped for transport.
///
/// # Examples
///
/// ```
/// use pagination::Cursor;
///
/// let encoded = Cursor::new((42_i64, "b".to_owned())).encode().expect("encodes");
/// let decoded: Cursor<(i64, String)> = Cursor::decode(&encoded).expect("decodes");
/// assert_eq!(decoded.into_key(), (42, "b".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap an ordering key.
    pub const fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the wrapped key.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Consume the cursor and return the key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K: Serialize> Cursor<K> {
    /// Encode the key as an opaque string.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Serialise`] when the key cannot be written as
    /// JSON.
    pub fn encode(&self) -> Result<String, CursorError> {
        let json = serde_json::to_vec(&self.key).map_err(|err| CursorError::Serialise {
            message: err.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl<K: DeserializeOwned> Cursor<K> {
    /// Decode an opaque string produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Encoding`] for invalid base64 and
    /// [`CursorError::Payload`] when the JSON does not match `K`.
    pub fn decode(raw: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|_| CursorError::Encoding)?;
        let key = serde_json::from_slice(&bytes).map_err(|_| CursorError::Payload)?;
        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn encoded_cursor_is_query_safe() {
        let encoded = Cursor::new(("é?&=".to_owned(), 7_u64))
            .encode()
            .expect("encodes");
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[rstest]
    #[case("not base64!", CursorError::Encoding)]
    #[case("bm90LWpzb24", CursorError::Payload)]
    fn rejects_bad_cursors(#[case] raw: &str, #[case] expected: CursorError) {
        let err = Cursor::<(i64, String)>::decode(raw).expect_err("must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn rejects_key_shape_mismatch() {
        let encoded = Cursor::new("plain").encode().expect("encodes");
        let err = Cursor::<(i64, String)>::decode(&encoded).expect_err("shape differs");
        assert_eq!(err, CursorError::Payload);
    }
}
