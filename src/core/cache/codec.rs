//! Value encoding for byte-oriented backends
//!
//! Raw strings and byte buffers are stored as-is; every other type goes
//! through bincode.

use super::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value that can be stored in any cache backend
///
/// The default methods encode with bincode. Implementing the trait for a
/// serde type is a one-liner:
///
/// ```
/// use authgate::cache::Cacheable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Session {
///     id: u64,
/// }
///
/// impl Cacheable for Session {}
/// ```
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn encode(&self) -> CacheResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn decode(bytes: &[u8]) -> CacheResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl Cacheable for Vec<u8> {
    fn encode(&self) -> CacheResult<Vec<u8>> {
        Ok(self.clone())
    }

    fn decode(bytes: &[u8]) -> CacheResult<Self> {
        Ok(bytes.to_vec())
    }
}

impl Cacheable for String {
    fn encode(&self) -> CacheResult<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }

    /// Bytes that are not UTF-8 are a type mismatch, never a lossy read
    fn decode(bytes: &[u8]) -> CacheResult<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|_| CacheError::TypeMismatch {
            key: String::new(),
            stored: "bytes",
            requested: "String",
        })
    }
}

impl Cacheable for u64 {}
impl Cacheable for i64 {}
impl Cacheable for bool {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    impl Cacheable for Sample {}

    #[test]
    fn test_raw_payloads_pass_through() {
        assert_eq!("hello".to_string().encode().unwrap(), b"hello".to_vec());
        assert_eq!(vec![0u8, 255, 7].encode().unwrap(), vec![0u8, 255, 7]);
        assert_eq!(String::decode(b"plain").unwrap(), "plain");
    }

    #[test]
    fn test_invalid_utf8_is_not_a_string() {
        let err = String::decode(&[0xff, 0xfe, b'a']).unwrap_err();
        assert!(err.is_miss());
        assert!(matches!(
            err,
            CacheError::TypeMismatch {
                requested: "String",
                ..
            }
        ));

        // bincode bytes of another type are not read back as text
        let bytes = 255u64.encode().unwrap();
        assert!(std::str::from_utf8(&bytes).is_err());
        assert!(String::decode(&bytes).unwrap_err().is_miss());
    }

    #[test]
    fn test_structured_value_uses_binary_codec() {
        let sample = Sample {
            name: "a".to_string(),
            tags: vec!["x".to_string()],
        };
        let bytes = sample.encode().unwrap();
        assert_eq!(bytes, bincode::serialize(&sample).unwrap());
        assert_eq!(Sample::decode(&bytes).unwrap(), sample);
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let err = Sample::decode(&[1, 2]).unwrap_err();
        assert!(!err.is_miss());
    }
}
