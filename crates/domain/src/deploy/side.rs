use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// One face of a dual-sided display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    A,
    B,
}

impl Face {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which faces a deploy writes.
///
/// Wire codes: `0` both (A then B), `1` A only, `2` B only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum DeploySide {
    Both,
    A,
    B,
}

impl DeploySide {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Both),
            1 => Ok(Self::A),
            2 => Ok(Self::B),
            other => Err(DomainError::Validation(format!(
                "Side must be 0 (both), 1 (A) or 2 (B), got {other}"
            ))),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Both => 0,
            Self::A => 1,
            Self::B => 2,
        }
    }

    /// Faces in transmission order
    pub fn faces(&self) -> &'static [Face] {
        match self {
            Self::Both => &[Face::A, Face::B],
            Self::A => &[Face::A],
            Self::B => &[Face::B],
        }
    }
}

impl Default for DeploySide {
    fn default() -> Self {
        Self::B
    }
}

impl TryFrom<i32> for DeploySide {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self> {
        Self::from_code(value)
    }
}

impl From<DeploySide> for i32 {
    fn from(value: DeploySide) -> Self {
        value.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(DeploySide::from_code(0).unwrap(), DeploySide::Both);
        assert_eq!(DeploySide::from_code(1).unwrap(), DeploySide::A);
        assert_eq!(DeploySide::from_code(2).unwrap(), DeploySide::B);
        assert!(DeploySide::from_code(3).is_err());
        assert!(DeploySide::from_code(-1).is_err());
    }

    #[test]
    fn test_default_is_b() {
        assert_eq!(DeploySide::default(), DeploySide::B);
    }

    #[test]
    fn test_both_transmits_a_then_b() {
        assert_eq!(DeploySide::Both.faces(), &[Face::A, Face::B]);
        assert_eq!(DeploySide::B.faces(), &[Face::B]);
    }
}
