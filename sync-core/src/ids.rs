//! Identity types for ticket sync.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when constructing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Ticket identifier was empty or whitespace.
    #[error("ticket id must not be empty")]
    EmptyTicketId,

    /// Partition key was empty or whitespace.
    #[error("partition key must not be empty")]
    EmptyPartition,
}

/// Opaque identifier of a ticket as issued by the registrations API.
///
/// The remote may encode ids as JSON strings or integers; both decode to
/// the same textual form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Create a TicketId, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::EmptyTicketId);
        }
        Ok(Self(id))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TicketId({})", self.0)
    }
}

/// A ticket id exactly as the remote sent it, before validation.
///
/// Strings and integers are both accepted; a blank string survives
/// decoding so callers can skip the one ticket instead of the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawTicketId {
    /// JSON string id.
    Text(String),
    /// JSON integer id.
    Number(u64),
}

impl RawTicketId {
    /// Validate into a [`TicketId`].
    pub fn into_ticket_id(self) -> Result<TicketId, IdError> {
        match self {
            Self::Text(s) => TicketId::new(s),
            Self::Number(n) => TicketId::new(n.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for TicketId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawTicketId::deserialize(deserializer)?
            .into_ticket_id()
            .map_err(serde::de::Error::custom)
    }
}

/// Logical grouping key for local records (one conference edition).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition(String);

impl Partition {
    /// Create a Partition, rejecting blank values.
    pub fn new(key: impl Into<String>) -> Result<Self, IdError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(IdError::EmptyPartition);
        }
        Ok(Self(key))
    }

    /// Get the partition key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Partition({})", self.0)
    }
}
