use std::fmt;
use thiserror::Error;

pub const ROOM_ID_LEN: usize = 6;
pub const ROOM_ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Room identifier. Always stored uppercase so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(value: &str) -> Result<Self, RoomIdError> {
        let normalized = value.trim().to_ascii_uppercase();
        if normalized.len() != ROOM_ID_LEN {
            return Err(RoomIdError::InvalidLength {
                expected: ROOM_ID_LEN,
                found: normalized.len(),
            });
        }
        for (index, ch) in normalized.chars().enumerate() {
            if !ROOM_ID_ALPHABET.contains(ch) {
                return Err(RoomIdError::InvalidCharacter { ch, index });
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RoomId {
    type Err = RoomIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomIdError {
    #[error("room id must be {expected} chars, got {found}")]
    InvalidLength { expected: usize, found: usize },
    #[error("invalid character '{ch}' at position {index}")]
    InvalidCharacter { ch: char, index: usize },
}
