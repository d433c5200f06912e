use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Strongly typed invocation correlation identifier backed by ULID.
///
/// The invocation runtime (or a telemetry layer sitting in front of it) may
/// annotate each invocation with a correlation id; the dispatcher records it
/// on the dispatch span and otherwise passes it through untouched.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct CorrelationId(pub ulid::Ulid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn from_ulid(id: ulid::Ulid) -> Self {
        Self(id)
    }

    /// Attempt to parse from a telemetry annotation; if absent or invalid,
    /// generate a new one.
    pub fn from_annotation_or_new(annotation: Option<&str>) -> Self {
        annotation
            .and_then(|s| s.parse::<CorrelationId>().ok())
            .unwrap_or_default()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(CorrelationId(id))
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<CorrelationId>()
            .map_err(|_| serde::de::Error::custom("invalid correlation id"))
    }
}
