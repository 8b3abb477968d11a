//! The `{type, data}` message envelope.

use crate::ProtocolError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A raw message as it travels over the socket.
///
/// `data` is kept opaque until the `type` is known, so unknown messages can
/// be skipped without failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind: kind.into(), data }
    }

    /// Parse an envelope from a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Deserialize the payload into a typed struct.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(T::deserialize(&self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Point {
        x: f32,
        y: f32,
    }

    #[test]
    fn test_decode_with_payload() {
        let env = Envelope::decode(r#"{"type":"move-target","data":{"x":1.5,"y":-2}}"#).unwrap();
        assert_eq!(env.kind, "move-target");
        let p: Point = env.payload().unwrap();
        assert_eq!(p.x, 1.5);
        assert_eq!(p.y, -2.0);
    }

    #[test]
    fn test_missing_data_is_null() {
        let env = Envelope::decode(r#"{"type":"fire"}"#).unwrap();
        assert!(env.data.is_null());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = Envelope::decode("not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
