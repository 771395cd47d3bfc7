use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

/// Raw binary field contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesValue {
    data: Bytes,
}

impl BytesValue {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn from_base64(encoded: &str) -> Option<Self> {
        BASE64
            .decode(encoded)
            .ok()
            .map(|decoded| Self::new(decoded))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip() {
        let value = BytesValue::new(vec![1u8, 2, 3]);
        let encoded = value.to_base64();
        assert_eq!(BytesValue::from_base64(&encoded), Some(value));
    }
}
