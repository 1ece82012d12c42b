//! Typed string identifiers: `resp_`, `item_`, `call_`, `msg_` followed by 24
//! random alphanumeric characters. Each kind is its own newtype so a
//! `ResponseId` can never be passed where an `ItemId` is expected.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const ID_LEN: usize = 24;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

/// Error returned when a string does not match a typed ID's expected prefix.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} id: {value:?} (expected prefix {prefix:?})")]
pub struct IdParseError {
    pub kind: &'static str,
    pub prefix: &'static str,
    pub value: String,
}

macro_rules! typed_id {
    ($name:ident, $prefix:literal, $kind:literal) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Mints a new, random id with this kind's prefix.
            pub fn new() -> Self {
                Self(format!("{}{}", $prefix, random_suffix()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.starts_with($prefix) && s.len() > $prefix.len() {
                    Ok(Self(s.to_string()))
                } else {
                    Err(IdParseError {
                        kind: $kind,
                        prefix: $prefix,
                        value: s.to_string(),
                    })
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdParseError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                if s.starts_with($prefix) && s.len() > $prefix.len() {
                    Ok(Self(s))
                } else {
                    Err(IdParseError {
                        kind: $kind,
                        prefix: $prefix,
                        value: s,
                    })
                }
            }
        }
    };
}

typed_id!(ResponseId, "resp_", "response");
typed_id!(ItemId, "item_", "item");
typed_id!(CallId, "call_", "tool call");
typed_id!(MsgId, "msg_", "message");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn mints_id_with_expected_prefix_and_length() {
        let id = ResponseId::new();
        assert!(id.as_str().starts_with("resp_"));
        assert_eq!(id.as_str().len(), "resp_".len() + ID_LEN);
    }

    #[test]
    fn mints_unique_ids() {
        let a = ItemId::new();
        let b = ItemId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn parses_valid_prefixed_string() {
        let parsed = CallId::from_str("call_abc123").unwrap();
        assert_eq!(parsed.as_str(), "call_abc123");
    }

    #[test]
    fn rejects_wrong_prefix() {
        let err = ResponseId::from_str("item_abc123").unwrap_err();
        assert_eq!(err.kind, "response");
    }

    #[test]
    fn rejects_bare_prefix_with_no_suffix() {
        assert!(MsgId::from_str("msg_").is_err());
    }

    #[test]
    fn serde_roundtrip_is_transparent_string() {
        let id = ItemId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
