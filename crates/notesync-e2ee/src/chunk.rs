//! Encrypted chunk: a nonce stored alongside its ciphertext.
//!
//! JSON form: `{"iv": "<base64 nonce>", "ct": "<base64 ciphertext+tag>"}`

use serde::{Deserialize, Serialize};

use crate::error::E2eeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedChunk {
    /// Nonce the chunk was sealed with.
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    /// Ciphertext followed by the GCM tag.
    #[serde(with = "base64_bytes")]
    pub ct: Vec<u8>,
}

impl EncryptedChunk {
    pub fn to_json(&self) -> Result<String, E2eeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, E2eeError> {
        Ok(serde_json::from_str(json)?)
    }
}

mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_base64_fields() {
        let chunk = EncryptedChunk {
            iv: vec![0, 1, 2],
            ct: vec![0xff, 0xfe],
        };
        let json = chunk.to_json().unwrap();
        assert_eq!(json, r#"{"iv":"AAEC","ct":"//4="}"#);
        assert_eq!(EncryptedChunk::from_json(&json).unwrap(), chunk);
    }

    #[test]
    fn rejects_bad_base64() {
        let err = EncryptedChunk::from_json(r#"{"iv":"***","ct":""}"#).unwrap_err();
        assert!(matches!(err, E2eeError::Json(_)));
    }

    #[test]
    fn rejects_missing_field() {
        assert!(EncryptedChunk::from_json(r#"{"iv":"AAEC"}"#).is_err());
    }
}
