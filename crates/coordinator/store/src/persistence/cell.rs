//! Per-entity storage cells.
//!
//! Each cell is guarded by its own `tokio::sync::Mutex`, giving the
//! row-level mutual exclusion the settlement invariants require: two
//! concurrent signatures for one contract, or two concurrent releases on one
//! escrow account, always serialize against each other and exactly one wins.

use settlement_coordinator_domain::{
    contract::{Contract, ContractSignature},
    escrow::{EscrowAccount, Milestone},
};

/// A contract together with its captured signatures (at most one per role).
#[derive(Debug)]
pub(crate) struct ContractCell {
    pub(crate) contract: Contract,
    pub(crate) signatures: Vec<ContractSignature>,
}

/// An escrow account together with its ordered milestone sequence.
#[derive(Debug)]
pub(crate) struct EscrowCell {
    pub(crate) account: EscrowAccount,
    pub(crate) milestones: Vec<Milestone>,
}
