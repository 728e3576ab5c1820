use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Response body as handed back by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Binary(Bytes),
}

impl Payload {
    /// Decodes structured data from either shape.
    ///
    /// Binary bodies are read as UTF-8 JSON text; this is the only place the
    /// two shapes are reconciled.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Payload::Json(value) => T::deserialize(value),
            Payload::Binary(bytes) => serde_json::from_slice(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are stored lowercase
    pub headers: BTreeMap<String, String>,
    pub payload: Payload,
}

impl ApiResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            payload: Payload::Json(value),
        }
    }

    pub fn binary(status: u16, bytes: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            payload: Payload::Binary(bytes.into()),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        self.payload.decode_json()
    }
}
