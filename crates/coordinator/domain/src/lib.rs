//! Domain types for the settlement coordinator.
//!
//! This crate provides the core domain models for gating the flow of money
//! between an employer and a gig worker: the contract signature state machine,
//! the escrow ledger entities, the risk bucketing used for display and policy
//! input, and the hash-chained audit log entry schema. All state transitions
//! are expressed as pure operations on these types; persistence and policy
//! enforcement live in the store and engine crates.

#![no_std]

extern crate alloc;

pub mod audit;
pub mod contract;
pub mod escrow;
pub mod money;
pub mod risk;

use core::fmt;

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timestamp metadata for tracking entity creation and modification times.
///
/// This struct is commonly used as auxiliary data (`AUX`) in other domain types
/// to track when entities were created and last updated.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamps {
    /// The timestamp when the entity was created.
    created_at: DateTime<Utc>,
    /// The timestamp when the entity was last updated.
    updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns a copy with the update timestamp advanced to `at`.
    pub fn touched(&self, at: DateTime<Utc>) -> Self {
        Self { created_at: self.created_at, updated_at: at }
    }
}

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(Uuid);

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from($name(uuid): $name) -> Self {
                uuid
            }
        }

        impl From<&$name> for Uuid {
            fn from($name(uuid): &$name) -> Self {
                *uuid
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// A unique identifier for a settlement contract.
    ///
    /// This is a wrapper around a UUID that provides type safety and
    /// seamless conversion to/from UUID values.
    ContractId
}

uuid_id! {
    /// A unique identifier for an escrow account.
    EscrowAccountId
}

uuid_id! {
    /// A unique identifier for an escrow milestone.
    MilestoneId
}

uuid_id! {
    /// A unique identifier for a platform user (employer or gig worker).
    UserId
}

uuid_id! {
    /// A unique identifier for the job or accepted bid a contract settles.
    JobId
}
