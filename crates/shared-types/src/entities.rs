//! # Core Domain Entities
//!
//! Identity and identifier primitives used by the registry and its
//! collaborators.
//!
//! - **Identity**: `Address` (20-byte account identifier)
//! - **Records**: `FileId` (engine-assigned, sequential, never reused)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTITY
// =============================================================================

/// Errors produced while parsing an `Address` from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// Input did not start with `0x`.
    #[error("address must start with 0x: {0:?}")]
    MissingPrefix(String),

    /// Wrong number of hex digits after the prefix.
    #[error("address must have 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// Non-hex character in the digits.
    #[error("address contains non-hex characters: {0:?}")]
    InvalidHex(String),
}

/// A 20-byte account identity.
///
/// Rendered as `0x` followed by 40 lowercase hex digits. Serialized as that
/// string so request payloads and journals stay human readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid operand identity.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Full lowercase hex form, `0x`-prefixed.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(s.to_string()))?;

        if digits.len() != 40 {
            return Err(AddressParseError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| AddressParseError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_hex()
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// =============================================================================
// RECORD IDENTIFIERS
// =============================================================================

/// Errors produced while parsing a `FileId` from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileIdParseError {
    /// Not a decimal unsigned integer.
    #[error("file id is not a number: {0:?}")]
    NotANumber(String),

    /// Zero is below the first assignable id.
    #[error("file id 0 is never assigned")]
    Zero,
}

/// Identifier of a registered file record.
///
/// Assigned by the engine starting at [`FileId::FIRST`]; retired ids are
/// never handed out again.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl FileId {
    /// The first id the engine assigns.
    pub const FIRST: Self = Self(1);

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Ids below [`FileId::FIRST`] are structurally invalid.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::FIRST.0
    }
}

impl FromStr for FileId {
    type Err = FileIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| FileIdParseError::NotANumber(s.to_string()))?;
        if value == 0 {
            return Err(FileIdParseError::Zero);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FileId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_roundtrip() {
        let text = "0x00000000000000000000000000000000000000aa";
        let addr: Address = text.parse().unwrap();
        assert_eq!(addr.as_bytes()[19], 0xaa);
        assert_eq!(addr.to_string(), text);
    }

    #[test]
    fn test_address_parse_mixed_case() {
        let addr: Address = "0xAbCdEf0000000000000000000000000000000001".parse().unwrap();
        assert_eq!(addr.as_bytes()[0], 0xab);
        assert_eq!(addr.as_bytes()[2], 0xef);
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!(matches!(
            "abcdef".parse::<Address>(),
            Err(AddressParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(AddressParseError::InvalidLength(4))
        ));
        assert!(matches!(
            "0xzz00000000000000000000000000000000000000".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::new([0x11; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x1111111111111111111111111111111111111111\"");

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        assert!(serde_json::from_str::<Address>("\"0x11\"").is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1; 20]).is_zero());
    }

    #[test]
    fn test_file_id_parse() {
        assert_eq!("42".parse::<FileId>(), Ok(FileId(42)));
        assert_eq!(" 7 ".parse::<FileId>(), Ok(FileId(7)));
        assert_eq!("0".parse::<FileId>(), Err(FileIdParseError::Zero));
        assert!(matches!(
            "-1".parse::<FileId>(),
            Err(FileIdParseError::NotANumber(_))
        ));
    }

    #[test]
    fn test_file_id_ordering() {
        assert!(FileId::FIRST.is_valid());
        assert!(!FileId(0).is_valid());
        assert_eq!(FileId::FIRST.next(), FileId(2));
    }
}
