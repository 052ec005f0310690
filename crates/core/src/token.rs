//! Opaque pagination tokens.
//!
//! A token is the base64url encoding (no padding) of the compact JSON array
//! `[paging, [sort values...], id]`. It carries everything needed to seek to
//! the next page, so the server keeps no session state.

use crate::{Error, Result};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt::Display, str::FromStr};

/// The direction a token pages in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Paging {
    /// The records after the seek position.
    Next,

    /// The records before the seek position.
    Prev,
}

/// A decoded pagination token: a seek position in the result order.
///
/// # Examples
///
/// ```
/// use stac_search::{Cursor, Paging};
/// use serde_json::json;
///
/// let cursor = Cursor::new(Paging::Next, vec![json!("2023-01-01T00:00:00.000000Z")], "an-id");
/// let token = cursor.encode();
/// assert_eq!(Cursor::decode(&token).unwrap(), cursor);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// The direction to page.
    pub paging: Paging,

    /// The sort values of the record at the seek position, one per non-id sort field.
    pub keys: Vec<Value>,

    /// The id of the record at the seek position.
    pub id: String,
}

#[derive(Serialize, Deserialize)]
struct Wire(Paging, Vec<Value>, String);

impl Cursor {
    /// Creates a new cursor.
    pub fn new(paging: Paging, keys: Vec<Value>, id: impl ToString) -> Cursor {
        Cursor {
            paging,
            keys,
            id: id.to_string(),
        }
    }

    /// Encodes this cursor as an opaque, URL-safe token.
    pub fn encode(&self) -> String {
        let wire = Wire(self.paging, self.keys.clone(), self.id.clone());
        // Serializing plain JSON values into a Vec can't fail.
        let bytes = serde_json::to_vec(&wire).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Decodes a token.
    ///
    /// Anything that isn't a token produced by [Cursor::encode] is an
    /// [Error::InvalidCursor].
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Cursor, ErrorKind};
    ///
    /// let error = Cursor::decode("not a token").unwrap_err();
    /// assert_eq!(error.kind(), ErrorKind::InvalidCursorError);
    /// ```
    pub fn decode(token: &str) -> Result<Cursor> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|err| Error::InvalidCursor(err.to_string()))?;
        let Wire(paging, keys, id) = serde_json::from_slice(&bytes)
            .map_err(|err| Error::InvalidCursor(err.to_string()))?;
        if keys.iter().any(|key| key.is_object() || key.is_array()) {
            return Err(Error::InvalidCursor(
                "sort values must be scalars".to_string(),
            ));
        }
        Ok(Cursor { paging, keys, id })
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Cursor> {
        Cursor::decode(s)
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cursor, Paging};
    use crate::ErrorKind;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case(Paging::Next, vec![], "a")]
    #[case(Paging::Prev, vec![json!("2023-01-01T00:00:00.000000Z")], "item/with?odd&chars")]
    #[case(Paging::Next, vec![json!(0.1), Value::Null, json!(-42), json!(true)], "")]
    #[case(Paging::Next, vec![json!(1.0e-300), json!(u64::MAX)], "ünïcödé")]
    fn round_trip(#[case] paging: Paging, #[case] keys: Vec<Value>, #[case] id: &str) {
        let cursor = Cursor::new(paging, keys, id);
        let token = cursor.encode();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[rstest]
    #[case("")]
    #[case("!!!")]
    #[case("bm90IGpzb24")]
    #[case("WyJzaWRld2F5cyIsW10sImEiXQ")]
    #[case("WyJuZXh0IiwgW1sxXV0sICJhIl0")]
    #[case("WyJuZXh0IiwgW10sIDFd")]
    fn invalid(#[case] token: &str) {
        let error = Cursor::decode(token).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidCursorError);
    }

    #[test]
    fn wire_format() {
        let token = Cursor::new(Paging::Prev, vec![json!(1)], "a").encode();
        let bytes = URL_SAFE_NO_PAD.decode(token).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"["prev",[1],"a"]"#);
    }
}
