//! The append-only, hash-linked audit log.
//!
//! Each entry's `hash_signature` is `SHA256(canonical_json(entry fields
//! excluding hash_signature) || previous_hash)`, where `previous_hash` is the
//! `hash_signature` of the entry immediately preceding it in global write
//! order (empty for the very first entry). Canonical JSON here means the
//! fixed field order of [`EntryDigest`], serialized as UTF-8.
//!
//! Because each entry only embeds the *previous* entry's hash, tampering
//! with an old entry is caught by re-deriving hashes forward from that entry
//! (a full-chain scan), not by any cascading invalidation of later entries.

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use serde::Serialize;
use settlement_coordinator_domain::audit::{
    ActorContext, ActorContextDissolved, ActorKind, AuditAction, AuditEntry, AuditTable,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A verification failure in the audit chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChainDefect {
    /// Recomputing an entry's hash over its stored fields did not reproduce
    /// the stored `hash_signature`.
    #[error("entry {seq} hash signature mismatch")]
    HashMismatch {
        /// The offending entry's position in write order.
        seq: u64,
    },

    /// An entry's `previous_hash` does not equal the prior entry's
    /// `hash_signature`.
    #[error("entry {seq} does not link to its predecessor")]
    BrokenLink {
        /// The offending entry's position in write order.
        seq: u64,
    },

    /// An entry could not be canonicalized for hashing.
    #[error("entry {seq} could not be canonicalized")]
    Unverifiable {
        /// The offending entry's position in write order.
        seq: u64,
    },

    /// The chain was halted by an earlier failed verification and refuses
    /// further writes.
    #[error("audit chain halted after a failed verification")]
    Halted,
}

/// The fields an audit entry is hashed over, in canonical order.
///
/// Everything except `hash_signature`; `previous_hash` is appended to the
/// serialized bytes separately so the genesis entry hashes cleanly over an
/// empty string.
#[derive(Serialize)]
struct EntryDigest<'a> {
    seq: u64,
    table: AuditTable,
    record_id: Uuid,
    action: AuditAction,
    old_values: Option<&'a str>,
    new_values: Option<&'a str>,
    metadata: Option<&'a str>,
    actor_id: Uuid,
    actor_kind: ActorKind,
    ip_address: Option<&'a str>,
    user_agent: Option<&'a str>,
    session_id: Option<&'a str>,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a AuditEntry> for EntryDigest<'a> {
    fn from(entry: &'a AuditEntry) -> Self {
        Self {
            seq: entry.seq(),
            table: entry.table(),
            record_id: entry.record_id(),
            action: entry.action(),
            old_values: entry.old_values(),
            new_values: entry.new_values(),
            metadata: entry.metadata(),
            actor_id: entry.actor_id(),
            actor_kind: entry.actor_kind(),
            ip_address: entry.ip_address(),
            user_agent: entry.user_agent(),
            session_id: entry.session_id(),
            created_at: entry.created_at(),
        }
    }
}

/// Recomputes the hash signature an entry should carry.
pub fn entry_hash(entry: &AuditEntry) -> Result<String, ChainDefect> {
    let canonical = serde_json::to_vec(&EntryDigest::from(entry))
        .map_err(|_| ChainDefect::Unverifiable { seq: entry.seq() })?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hasher.update(entry.previous_hash().as_bytes());

    Ok(hex::encode(hasher.finalize()))
}

/// Verifies a single entry against its own stored fields and
/// `previous_hash`.
///
/// This validates one link only; it cannot detect that the *predecessor* was
/// rewritten wholesale. Use [`verify_entries`] for a full-chain scan.
pub fn verify_entry(entry: &AuditEntry) -> Result<(), ChainDefect> {
    if entry_hash(entry)? != entry.hash_signature() {
        return Err(ChainDefect::HashMismatch { seq: entry.seq() });
    }

    Ok(())
}

/// Full-chain scan: verifies every entry's hash and every link to its
/// predecessor, in write order.
pub fn verify_entries(entries: &[AuditEntry]) -> Result<(), ChainDefect> {
    let mut expected_previous = String::new();

    for entry in entries {
        if entry.previous_hash() != expected_previous {
            return Err(ChainDefect::BrokenLink { seq: entry.seq() });
        }

        verify_entry(entry)?;

        expected_previous = entry.hash_signature().to_owned();
    }

    Ok(())
}

/// Everything needed to append one entry; the log itself assigns `seq`,
/// `previous_hash` and the hash signature.
#[derive(Debug, Builder, Dissolve)]
pub struct AuditDraft {
    /// The logical table the entry is about.
    table: AuditTable,

    /// The id of the affected record.
    record_id: Uuid,

    /// The kind of state change.
    action: AuditAction,

    /// Canonical JSON snapshot of the record before the change.
    old_values: Option<String>,

    /// Canonical JSON snapshot of the record after the change.
    new_values: Option<String>,

    /// Free-form context for the change.
    metadata: Option<String>,

    /// The identity and request provenance of whoever triggered the change.
    actor: ActorContext,
}

/// The in-memory audit log. Appends are totally ordered by the store's audit
/// lock; entries are never mutated or removed once pushed.
#[derive(Debug, Default)]
pub(crate) struct AuditLog {
    entries: Vec<AuditEntry>,
    halted: bool,
}

impl AuditLog {
    /// Fails if a previous verification poisoned the chain.
    pub(crate) fn ensure_writable(&self) -> Result<(), ChainDefect> {
        if self.halted { Err(ChainDefect::Halted) } else { Ok(()) }
    }

    pub(crate) fn append(
        &mut self,
        draft: AuditDraft,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry, ChainDefect> {
        self.ensure_writable()?;

        let AuditDraftDissolved {
            table,
            record_id,
            action,
            old_values,
            new_values,
            metadata,
            actor,
        } = draft.dissolve();

        let ActorContextDissolved { actor_id, actor_kind, ip_address, user_agent, session_id } =
            actor.dissolve();

        let previous_hash = self
            .entries
            .last()
            .map(|entry| entry.hash_signature().to_owned())
            .unwrap_or_default();

        let seq = self.entries.len() as u64;

        let unhashed = AuditEntry::builder()
            .seq(seq)
            .table(table)
            .record_id(record_id)
            .action(action)
            .maybe_old_values(old_values)
            .maybe_new_values(new_values)
            .maybe_metadata(metadata)
            .actor_id(actor_id)
            .actor_kind(actor_kind)
            .maybe_ip_address(ip_address)
            .maybe_user_agent(user_agent)
            .maybe_session_id(session_id)
            .previous_hash(previous_hash)
            .hash_signature(String::new())
            .created_at(at)
            .build();

        let hash_signature = entry_hash(&unhashed)?;

        // entries are write-once: the hash is baked in before the push
        let entry = {
            let dissolved = unhashed.dissolve();

            AuditEntry::builder()
                .seq(dissolved.seq)
                .table(dissolved.table)
                .record_id(dissolved.record_id)
                .action(dissolved.action)
                .maybe_old_values(dissolved.old_values)
                .maybe_new_values(dissolved.new_values)
                .maybe_metadata(dissolved.metadata)
                .actor_id(dissolved.actor_id)
                .actor_kind(dissolved.actor_kind)
                .maybe_ip_address(dissolved.ip_address)
                .maybe_user_agent(dissolved.user_agent)
                .maybe_session_id(dissolved.session_id)
                .previous_hash(dissolved.previous_hash)
                .hash_signature(hash_signature)
                .created_at(dissolved.created_at)
                .build()
        };

        self.entries.push(entry.clone());

        Ok(entry)
    }

    pub(crate) fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub(crate) fn entry(&self, seq: u64) -> Option<&AuditEntry> {
        usize::try_from(seq).ok().and_then(|idx| self.entries.get(idx))
    }

    /// Full-chain scan; a defect halts the log against further writes.
    pub(crate) fn verify(&mut self) -> Result<u64, ChainDefect> {
        if let Err(defect) = verify_entries(&self.entries) {
            self.halted = true;
            return Err(defect);
        }

        Ok(self.entries.len() as u64)
    }

    /// Halts the log against further writes after an externally detected
    /// defect.
    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use settlement_coordinator_domain::audit::ActorContext;

    use super::*;

    fn draft(metadata: &str) -> AuditDraft {
        AuditDraft::builder()
            .table(AuditTable::Contracts)
            .record_id(Uuid::from_u128(1))
            .action(AuditAction::Update)
            .metadata(metadata.to_owned())
            .actor(ActorContext::system())
            .build()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn rebuild(
        entry: &AuditEntry,
        metadata: Option<&str>,
        hash_signature: Option<&str>,
    ) -> AuditEntry {
        let dissolved = entry.clone().dissolve();

        AuditEntry::builder()
            .seq(dissolved.seq)
            .table(dissolved.table)
            .record_id(dissolved.record_id)
            .action(dissolved.action)
            .maybe_old_values(dissolved.old_values)
            .maybe_new_values(dissolved.new_values)
            .maybe_metadata(metadata.map(str::to_owned).or(dissolved.metadata))
            .actor_id(dissolved.actor_id)
            .actor_kind(dissolved.actor_kind)
            .maybe_ip_address(dissolved.ip_address)
            .maybe_user_agent(dissolved.user_agent)
            .maybe_session_id(dissolved.session_id)
            .previous_hash(dissolved.previous_hash)
            .hash_signature(
                hash_signature.map(str::to_owned).unwrap_or(dissolved.hash_signature),
            )
            .created_at(dissolved.created_at)
            .build()
    }

    fn forge_metadata(entry: &AuditEntry, metadata: &str) -> AuditEntry {
        rebuild(entry, Some(metadata), None)
    }

    #[test]
    fn genesis_entry_has_empty_previous_hash() {
        let mut log = AuditLog::default();

        let entry = log.append(draft("first"), at(1)).unwrap();

        assert_eq!(entry.seq(), 0);
        assert_eq!(entry.previous_hash(), "");
        assert_eq!(entry.hash_signature(), entry_hash(&entry).unwrap());
    }

    #[test]
    fn each_entry_links_to_its_predecessor() {
        let mut log = AuditLog::default();

        let first = log.append(draft("first"), at(1)).unwrap();
        let second = log.append(draft("second"), at(2)).unwrap();

        assert_eq!(second.seq(), 1);
        assert_eq!(second.previous_hash(), first.hash_signature());
        assert_eq!(log.verify().unwrap(), 2);
    }

    #[test]
    fn identical_payloads_hash_differently_through_the_chain() {
        let mut log = AuditLog::default();

        let first = log.append(draft("same"), at(1)).unwrap();
        let second = log.append(draft("same"), at(1)).unwrap();

        assert_ne!(first.hash_signature(), second.hash_signature());
    }

    #[test]
    fn tampered_field_is_detected_by_full_chain_scan() {
        let mut log = AuditLog::default();

        log.append(draft("first"), at(1)).unwrap();
        log.append(draft("second"), at(2)).unwrap();
        log.append(draft("third"), at(3)).unwrap();

        let mut entries = log.entries().to_vec();
        entries[1] = forge_metadata(&entries[1], "forged");

        assert_eq!(verify_entries(&entries), Err(ChainDefect::HashMismatch { seq: 1 }));

        // per-entry verification catches it too: the hash covers the fields
        assert_eq!(
            verify_entry(&entries[1]),
            Err(ChainDefect::HashMismatch { seq: 1 })
        );
    }

    #[test]
    fn rewritten_predecessor_breaks_the_successor_link() {
        let mut log = AuditLog::default();

        log.append(draft("first"), at(1)).unwrap();
        log.append(draft("second"), at(2)).unwrap();

        // replace entry 0 wholesale with a self-consistent forgery
        let mut entries = log.entries().to_vec();
        let forged = forge_metadata(&entries[0], "forged");
        let hash = entry_hash(&forged).unwrap();
        entries[0] = rebuild(&forged, None, Some(&hash));

        // entry 0 now verifies in isolation, but entry 1 no longer links to it
        assert_eq!(verify_entry(&entries[0]), Ok(()));
        assert_eq!(verify_entries(&entries), Err(ChainDefect::BrokenLink { seq: 1 }));
    }

    #[test]
    fn halted_log_refuses_appends() {
        let mut log = AuditLog::default();

        log.append(draft("first"), at(1)).unwrap();
        log.halt();

        assert_eq!(log.ensure_writable(), Err(ChainDefect::Halted));
        assert!(matches!(log.append(draft("second"), at(2)), Err(ChainDefect::Halted)));
    }

    #[test]
    fn verify_halts_the_log_on_a_defect() {
        let mut log = AuditLog::default();

        log.append(draft("first"), at(1)).unwrap();
        log.entries[0] = forge_metadata(&log.entries[0], "forged");

        assert!(log.verify().is_err());
        assert_eq!(log.ensure_writable(), Err(ChainDefect::Halted));
    }
}
