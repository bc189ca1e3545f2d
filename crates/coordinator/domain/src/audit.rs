//! Immutable audit log entry schema.
//!
//! Every state-changing action in the settlement core appends exactly one
//! [`AuditEntry`]. Entries are hash-chained: each carries the
//! `hash_signature` of the entry immediately preceding it in global write
//! order as its `previous_hash`, and its own `hash_signature` is computed
//! over the canonical serialization of all other fields plus that
//! `previous_hash`. Entries are write-once; the store never updates or
//! deletes them.

use alloc::string::String;

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of state change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "UPPERCASE"))]
pub enum AuditAction {
    /// A record was created.
    Create,
    /// A record was mutated.
    Update,
    /// A record was removed. Unused by the settlement core (cancellation is
    /// a status change), kept for compliance tooling parity.
    Delete,
}

/// The logical table an audit entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum AuditTable {
    /// Settlement contracts.
    Contracts,
    /// Captured contract signatures.
    ContractSignatures,
    /// Escrow accounts.
    EscrowAccounts,
    /// Escrow milestones.
    EscrowMilestones,
}

/// Whether an action was taken by a platform user or by the system itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ActorKind {
    /// A platform user (employer, gig worker, operator).
    User,
    /// The settlement core itself (e.g. automatic release).
    System,
}

/// The identity and request provenance of whoever triggered an action.
///
/// Shared by signature capture and audit entries.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActorContext {
    /// The acting identity.
    actor_id: Uuid,

    /// Whether the actor is a user or the system.
    actor_kind: ActorKind,

    /// The originating IP address, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    ip_address: Option<String>,

    /// The originating user agent, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    user_agent: Option<String>,

    /// The originating session, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    session_id: Option<String>,
}

impl ActorContext {
    /// A context for actions the settlement core takes on its own.
    pub fn system() -> Self {
        Self {
            actor_id: Uuid::nil(),
            actor_kind: ActorKind::System,
            ip_address: None,
            user_agent: None,
            session_id: None,
        }
    }

    /// Returns the acting identity.
    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    /// Returns whether the actor is a user or the system.
    pub fn actor_kind(&self) -> ActorKind {
        self.actor_kind
    }

    /// Returns the originating IP address, when known.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Returns the originating user agent, when known.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the originating session, when known.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// One immutable, hash-chained audit log entry.
///
/// `seq` is the position in global write order; `previous_hash` is the
/// `hash_signature` of entry `seq - 1` (empty for the very first entry).
/// Old/new value snapshots are canonical JSON strings of the affected record
/// before and after the change.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditEntry {
    /// Position in global write order, starting at 0.
    seq: u64,

    /// The logical table the entry is about.
    table: AuditTable,

    /// The id of the affected record.
    record_id: Uuid,

    /// The kind of state change.
    action: AuditAction,

    /// Canonical JSON snapshot of the record before the change.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    old_values: Option<String>,

    /// Canonical JSON snapshot of the record after the change.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    new_values: Option<String>,

    /// Free-form context for the change (e.g. released milestone id).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    metadata: Option<String>,

    /// The acting identity.
    actor_id: Uuid,

    /// Whether the actor was a user or the system.
    actor_kind: ActorKind,

    /// The originating IP address, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    ip_address: Option<String>,

    /// The originating user agent, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    user_agent: Option<String>,

    /// The originating session, when known.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    session_id: Option<String>,

    /// The `hash_signature` of the immediately preceding entry; empty for
    /// the very first entry.
    previous_hash: String,

    /// SHA-256 hex digest over the canonical serialization of all other
    /// fields plus `previous_hash`.
    hash_signature: String,

    /// When the entry was written.
    created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Returns the position in global write order.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the logical table the entry is about.
    pub fn table(&self) -> AuditTable {
        self.table
    }

    /// Returns the id of the affected record.
    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Returns the kind of state change.
    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns the before-change snapshot, when one exists.
    pub fn old_values(&self) -> Option<&str> {
        self.old_values.as_deref()
    }

    /// Returns the after-change snapshot, when one exists.
    pub fn new_values(&self) -> Option<&str> {
        self.new_values.as_deref()
    }

    /// Returns the free-form change context, when present.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Returns the acting identity.
    pub fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    /// Returns whether the actor was a user or the system.
    pub fn actor_kind(&self) -> ActorKind {
        self.actor_kind
    }

    /// Returns the originating IP address, when known.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Returns the originating user agent, when known.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the originating session, when known.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns the preceding entry's hash signature.
    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Returns this entry's hash signature.
    pub fn hash_signature(&self) -> &str {
        &self.hash_signature
    }

    /// Returns when the entry was written.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
