//! Common type definitions.
//!
//! # ID Types
//!
//! Entity IDs are store-assigned 64-bit integers wrapped in type aliases:
//!
//! - [`MemberId`]: Member identifier
//! - [`TeamId`]: Team identifier
//!
//! # Actors
//!
//! Every write is attributed to an [`Actor`], which the store layer records in the audit columns.

use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for IDs
pub type MemberId = i64;
pub type TeamId = i64;

/// The identity performing a write. Passed explicitly to every mutating store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a member's team is loaded when the member is read.
///
/// `Lazy` returns only the foreign key; `Eager` joins the team row in the same query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeamLoading {
    #[default]
    Lazy,
    Eager,
}

impl TeamLoading {
    pub fn is_eager(self) -> bool {
        matches!(self, TeamLoading::Eager)
    }
}
