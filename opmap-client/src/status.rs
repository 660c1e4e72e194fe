//! Status descriptors and response status resolution.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One entry of an operation's declared `statusCodes` list.
///
/// Serialized the way the generated registry writes it: `200`, `"4XX"` or
/// `"default"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusDescriptor {
    /// An exact status code.
    Code(u16),
    /// A hundred-range class pattern; holds the leading digit (1..=5).
    Class(u8),
    /// The `"default"` catch-all.
    Default,
}

impl StatusDescriptor {
    /// Build a class pattern from its leading digit.
    ///
    /// Returns `None` unless `digit` is in `1..=5`.
    pub fn class(digit: u8) -> Option<Self> {
        (1..=5).contains(&digit).then_some(Self::Class(digit))
    }

    /// Whether this entry is a class pattern covering `status`.
    pub fn covers(&self, status: u16) -> bool {
        match self {
            Self::Class(digit) => status / 100 == u16::from(*digit),
            _ => false,
        }
    }

    /// The numeric code, if this is an exact entry.
    pub fn as_code(&self) -> Option<u16> {
        match self {
            Self::Code(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for StatusDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Class(digit) => write!(f, "{digit}XX"),
            Self::Default => f.write_str("default"),
        }
    }
}

impl From<u16> for StatusDescriptor {
    fn from(code: u16) -> Self {
        Self::Code(code)
    }
}

impl PartialEq<u16> for StatusDescriptor {
    fn eq(&self, other: &u16) -> bool {
        self.as_code() == Some(*other)
    }
}

impl PartialEq<&str> for StatusDescriptor {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Self::Code(_) => false,
            _ => self.to_string() == *other,
        }
    }
}

/// Error returned when a string is not a valid status descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid status descriptor `{}` (expected a code, \"default\" or \"1XX\"..\"5XX\")",
            self.0
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for StatusDescriptor {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(Self::Default);
        }
        let bytes = s.as_bytes();
        if bytes.len() == 3 && &bytes[1..] == b"XX" {
            return (bytes[0] as char)
                .to_digit(10)
                .and_then(|d| Self::class(d as u8))
                .ok_or_else(|| ParseStatusError(s.to_string()));
        }
        s.parse::<u16>()
            .map(Self::Code)
            .map_err(|_| ParseStatusError(s.to_string()))
    }
}

impl Serialize for StatusDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Code(code) => serializer.serialize_u16(*code),
            other => serializer.collect_str(other),
        }
    }
}

impl<'de> Deserialize<'de> for StatusDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusVisitor;

        impl Visitor<'_> for StatusVisitor {
            type Value = StatusDescriptor;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a status code, \"default\" or a class pattern like \"4XX\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                u16::try_from(v)
                    .map(StatusDescriptor::Code)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u16::try_from(v)
                    .map(StatusDescriptor::Code)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

/// Map an actual HTTP status to the best declared entry.
///
/// Exact codes win over everything. Otherwise the list is scanned in
/// declaration order and the first class pattern covering `status` or the
/// first `"default"` wins, whichever comes first. An undeclared list or an
/// unmatched status yields `Code(status)`.
pub fn resolve_status(declared: Option<&[StatusDescriptor]>, status: u16) -> StatusDescriptor {
    let Some(declared) = declared else {
        return StatusDescriptor::Code(status);
    };

    if declared.iter().any(|d| *d == status) {
        return StatusDescriptor::Code(status);
    }

    declared
        .iter()
        .find(|d| d.covers(status) || **d == StatusDescriptor::Default)
        .copied()
        .unwrap_or(StatusDescriptor::Code(status))
}
