//! Unpadded Base64URL (RFC 4648 §5) used throughout for keys, JWTs, and topics.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::error::InvalidBase64Url;

/// Encodes bytes as unpadded Base64URL.
pub fn encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes unpadded Base64URL, failing on malformed input.
pub fn decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>, InvalidBase64Url> {
    URL_SAFE_NO_PAD.decode(input).map_err(|_| InvalidBase64Url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        for len in 0..40 {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 37 % 251) as u8).collect();
            let encoded = encode(&bytes);
            assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert!(!encoded.contains('='));
            assert_eq!(decode(&encoded).unwrap(), bytes);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(decode("not valid base64!!").is_err());
    }
}
