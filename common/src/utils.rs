use anyhow::Result;
use bytes::Bytes;

/// Interpret a payload as UTF-8.
pub fn string_from_bytes(bytes: Bytes) -> Result<String> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Borrow a payload as UTF-8.
pub fn str_from_bytes(bytes: &[u8]) -> Result<&str> {
    Ok(std::str::from_utf8(bytes)?)
}
