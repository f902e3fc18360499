//! Wire format between the in-container shim and the orchestrator.
//!
//! The shim prints a single JSON array on stdout:
//!
//! ```json
//! [{"type": "text", "data": "hello\n"},
//!  {"type": "error", "data": "NameError: name 'x' is not defined"},
//!  {"type": "image", "data": "iVBORw0KGgo..."}]
//! ```
//!
//! Image payloads are base64-encoded PNG bytes on the wire and raw bytes in
//! memory.

use serde::{Deserialize, Serialize};

pub const PNG_MIME: &str = "image/png";

/// One typed unit of captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutputRecord {
    Text(String),
    Error(String),
    Image(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl OutputRecord {
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            OutputRecord::Image(_) => Some(PNG_MIME),
            OutputRecord::Text(_) | OutputRecord::Error(_) => None,
        }
    }
}

/// Serialize records as the single-line array the shim emits.
pub fn encode(records: &[OutputRecord]) -> serde_json::Result<String> {
    serde_json::to_string(records)
}

/// Parse shim stdout. Fails on anything that is not an array of known records.
pub fn decode(raw: &str) -> serde_json::Result<Vec<OutputRecord>> {
    serde_json::from_str(raw.trim())
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}
