//! Stored reference codec.
//!
//! The persisted value is `"{bucket},{key}"`. Neither component may be empty
//! or contain the delimiter, so a valid reference always splits into exactly
//! two parts.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("store identifier must not be empty")]
    EmptyBucket,

    #[error("object key must not be empty")]
    EmptyKey,

    #[error("'{0}' contains the reserved delimiter ','")]
    ContainsDelimiter(String),

    #[error("stored reference '{0}' does not split into exactly two non-empty parts")]
    Malformed(String),
}

/// Rejects store identifiers that could never be encoded into a reference.
pub fn validate_bucket(bucket: &str) -> Result<(), ReferenceError> {
    if bucket.is_empty() {
        return Err(ReferenceError::EmptyBucket);
    }
    if bucket.contains(DELIMITER) {
        return Err(ReferenceError::ContainsDelimiter(bucket.to_string()));
    }
    Ok(())
}

/// Address of a stored object: store identifier plus object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReference {
    bucket: String,
    key: String,
}

impl StoredReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, ReferenceError> {
        let bucket = bucket.into();
        let key = key.into();

        validate_bucket(&bucket)?;
        if key.is_empty() {
            return Err(ReferenceError::EmptyKey);
        }
        if key.contains(DELIMITER) {
            return Err(ReferenceError::ContainsDelimiter(key));
        }

        Ok(Self { bucket, key })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(value: &str) -> Result<Self, ReferenceError> {
        let mut parts = value.split(DELIMITER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(bucket), Some(key), None) if !bucket.is_empty() && !key.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(ReferenceError::Malformed(value.to_string())),
        }
    }
}

impl fmt::Display for StoredReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.bucket, DELIMITER, self.key)
    }
}

impl FromStr for StoredReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
