//! DAG-CBOR record codec

use crate::{Result, StoreError};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

/// Encode a record for storage
pub fn encode_record<T: Serialize>(record: &T) -> Result<Bytes> {
    let bytes = serde_ipld_dagcbor::to_vec(record)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(Bytes::from(bytes))
}

/// Decode a stored record
pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Header {
        name: String,
        exts: Vec<String>,
    }

    #[test]
    fn test_decode_encoded() {
        let header = Header {
            name: "zlib".to_string(),
            exts: vec![".c".to_string(), ".h".to_string()],
        };
        let bytes = encode_record(&header).unwrap();
        let decoded: Header = decode_record(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<Header> = decode_record(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(StoreError::Deserialization(_))));
    }
}
