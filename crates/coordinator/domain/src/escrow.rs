//! Escrow ledger domain models: accounts, milestones, freezes and the
//! release arithmetic.
//!
//! All monetary fields are fixed-point [`Decimal`] values with 2 decimal
//! digits; every release is validated against the remaining balance before it
//! is applied, so float accumulation can never drive an account negative.

use alloc::{string::String, vec::Vec};

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use rust_decimal::Decimal;
use strum::{Display, EnumString, IntoStaticStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{ContractId, EscrowAccountId, MilestoneId, Timestamps, risk::RiskLevel};

/// The lifecycle status of an escrow account.
///
/// "Frozen" is not a status of its own: it is `Disputed` combined with a
/// [`FreezeMarker`] in the account terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum EscrowStatus {
    /// Funds are held and releases are permitted.
    Active,
    /// The account is under dispute; combined with a freeze marker it blocks
    /// all releases.
    Disputed,
    /// All funds were released. Terminal.
    Released,
    /// Funds were returned to the employer. Terminal.
    Refunded,
    /// The account expired without settlement. Terminal.
    Expired,
}

/// The lifecycle status of an escrow milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum MilestoneStatus {
    /// The milestone has not been released yet.
    Pending,
    /// The milestone was released and its share paid out.
    Completed,
}

/// Rejections produced by the escrow ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A release would exceed the remaining unreleased balance.
    #[error("insufficient escrow balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount the release asked for.
        requested: Decimal,
        /// The unreleased balance still held.
        available: Decimal,
    },

    /// A release or freeze was attempted while the account is frozen.
    #[error("freeze violation: the account is frozen pending dispute resolution")]
    Frozen,

    /// The account is not in the `active` status required by the operation.
    #[error("escrow account is not active (status: {0})")]
    NotActive(EscrowStatus),

    /// The milestone is not in the `pending` status required for release.
    #[error("milestone is not pending (status: {0})")]
    MilestoneNotPending(MilestoneStatus),

    /// Milestones were already attached to this account.
    #[error("milestones already defined for this account")]
    MilestonesAlreadyDefined,

    /// The milestone amounts exceed the unreleased balance.
    #[error("milestone amounts sum to {sum}, exceeding the available {available}")]
    MilestoneSumExceedsBalance {
        /// Sum of all milestone amounts.
        sum: Decimal,
        /// The unreleased balance still held.
        available: Decimal,
    },

    /// A monetary amount was zero, negative or finer than 2 decimal digits.
    #[error("invalid monetary amount: {0}")]
    InvalidAmount(Decimal),
}

/// The marker recorded in account terms when an account is frozen.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FreezeMarker {
    /// Why the account was frozen.
    reason: String,

    /// When the freeze took effect.
    frozen_at: DateTime<Utc>,
}

impl FreezeMarker {
    /// Returns the freeze reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns when the freeze took effect.
    pub fn frozen_at(&self) -> DateTime<Utc> {
        self.frozen_at
    }
}

/// Typed escrow account terms.
///
/// Previously free-form JSON in the source system; modeled as a record so the
/// freeze marker and resolution notes are validated at the boundary.
#[derive(Debug, Clone, Default, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EscrowTerms {
    /// Present while the account is frozen.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    freeze: Option<FreezeMarker>,

    /// Notes appended by the external dispute-resolution process.
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    resolution_notes: Vec<String>,
}

impl EscrowTerms {
    /// Returns the freeze marker, if the account is frozen.
    pub fn freeze(&self) -> Option<&FreezeMarker> {
        self.freeze.as_ref()
    }

    /// Returns the dispute-resolution notes.
    pub fn resolution_notes(&self) -> &[String] {
        &self.resolution_notes
    }
}

/// A custodial balance holding funds for one project until release
/// conditions are met.
///
/// Invariant: `available_amount` never exceeds `total_amount - platform_fee`;
/// the released amount is always `total_amount - available_amount`.
///
/// # Type Parameters
///
/// * `AUX` - Auxiliary data type, defaults to [`Timestamps`] for tracking metadata.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EscrowAccount<AUX = Timestamps> {
    /// The unique identifier for this account.
    id: EscrowAccountId,

    /// The fully-signed contract whose settlement this account funds.
    contract_id: ContractId,

    /// The total funded amount.
    total_amount: Decimal,

    /// The platform's fee, withheld from the funded amount.
    platform_fee: Decimal,

    /// The unreleased balance still held.
    available_amount: Decimal,

    /// Whether funds release per milestone rather than in one final payout.
    milestone_based: bool,

    /// Whether the final release runs automatically once every milestone
    /// is completed.
    automatic_release: bool,

    /// Whether the employer purchased fraud insurance for this project.
    fraud_insurance: bool,

    /// Whether releases additionally require a counter-signature.
    multi_signature: bool,

    /// Fraud-risk score for this account, normalized to `0.0..=1.0`.
    risk_score: f64,

    /// The current lifecycle status.
    status: EscrowStatus,

    /// Typed account terms, including the freeze marker.
    terms: EscrowTerms,

    /// Auxiliary metadata associated with this account.
    aux: AUX,
}

impl<AUX> EscrowAccount<AUX> {
    /// Returns the account id.
    pub fn id(&self) -> EscrowAccountId {
        self.id
    }

    /// Returns the funded contract's id.
    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    /// Returns the total funded amount.
    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Returns the platform fee.
    pub fn platform_fee(&self) -> Decimal {
        self.platform_fee
    }

    /// Returns the unreleased balance still held.
    pub fn available_amount(&self) -> Decimal {
        self.available_amount
    }

    /// Returns the amount released so far (`total_amount - available_amount`).
    pub fn released_amount(&self) -> Decimal {
        self.total_amount - self.available_amount
    }

    /// Returns whether funds release per milestone.
    pub fn milestone_based(&self) -> bool {
        self.milestone_based
    }

    /// Returns whether the final release runs automatically.
    pub fn automatic_release(&self) -> bool {
        self.automatic_release
    }

    /// Returns whether fraud insurance was purchased.
    pub fn fraud_insurance(&self) -> bool {
        self.fraud_insurance
    }

    /// Returns whether releases require a counter-signature.
    pub fn multi_signature(&self) -> bool {
        self.multi_signature
    }

    /// Returns the normalized fraud-risk score.
    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    /// Returns the current lifecycle status.
    pub fn status(&self) -> EscrowStatus {
        self.status
    }

    /// Returns the typed account terms.
    pub fn terms(&self) -> &EscrowTerms {
        &self.terms
    }

    /// Returns a reference to the auxiliary metadata.
    pub fn aux(&self) -> &AUX {
        &self.aux
    }

    /// Replaces the auxiliary data with a new value, returning both the
    /// updated account and the old auxiliary data.
    pub fn with_aux<AUX2>(self, aux: AUX2) -> (EscrowAccount<AUX2>, AUX) {
        let account = EscrowAccount {
            id: self.id,
            contract_id: self.contract_id,
            total_amount: self.total_amount,
            platform_fee: self.platform_fee,
            available_amount: self.available_amount,
            milestone_based: self.milestone_based,
            automatic_release: self.automatic_release,
            fraud_insurance: self.fraud_insurance,
            multi_signature: self.multi_signature,
            risk_score: self.risk_score,
            status: self.status,
            terms: self.terms,
            aux,
        };

        (account, self.aux)
    }

    /// Returns `true` iff the account status is `disputed` and a freeze
    /// marker is present in the terms.
    pub fn is_frozen(&self) -> bool {
        self.status == EscrowStatus::Disputed && self.terms.freeze.is_some()
    }

    /// Returns the display bucket for this account's risk score.
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }

    /// Decrements the unreleased balance by `amount`.
    ///
    /// The account must be active and not frozen, and `amount` must be a
    /// positive 2-decimal value not exceeding the remaining balance.
    pub fn release(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if self.is_frozen() {
            return Err(LedgerError::Frozen);
        }

        if self.status != EscrowStatus::Active {
            return Err(LedgerError::NotActive(self.status));
        }

        if !crate::money::is_positive_amount(amount) {
            return Err(LedgerError::InvalidAmount(amount));
        }

        if amount > self.available_amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.available_amount,
            });
        }

        self.available_amount -= amount;

        Ok(())
    }

    /// Freezes the account: status becomes `disputed` and a freeze marker is
    /// recorded in the terms. Blocks all further releases until lifted by the
    /// external dispute-resolution process.
    pub fn freeze(&mut self, reason: String, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.is_frozen() {
            return Err(LedgerError::Frozen);
        }

        if self.status != EscrowStatus::Active {
            return Err(LedgerError::NotActive(self.status));
        }

        self.status = EscrowStatus::Disputed;
        self.terms.freeze = Some(FreezeMarker { reason, frozen_at: at });

        Ok(())
    }

    /// Marks the account fully released. Terminal.
    ///
    /// Only valid for an active, unfrozen account.
    pub fn mark_released(&mut self) -> Result<(), LedgerError> {
        if self.is_frozen() {
            return Err(LedgerError::Frozen);
        }

        if self.status != EscrowStatus::Active {
            return Err(LedgerError::NotActive(self.status));
        }

        self.status = EscrowStatus::Released;

        Ok(())
    }

    /// Pure automatic-release predicate, re-evaluated after every milestone
    /// completion.
    ///
    /// True iff automatic release is configured, the account is active and
    /// not frozen, and every one of its (at least one) milestones is
    /// completed.
    pub fn can_auto_release(&self, milestones: &[Milestone]) -> bool {
        self.automatic_release
            && self.status == EscrowStatus::Active
            && !self.is_frozen()
            && !milestones.is_empty()
            && milestones.iter().all(|m| m.status() == MilestoneStatus::Completed)
    }
}

/// An ordered, independently releasable portion of escrowed funds tied to a
/// deliverable.
#[derive(Debug, Clone, Builder, Dissolve)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Milestone {
    /// The unique identifier for this milestone.
    id: MilestoneId,

    /// The escrow account the milestone belongs to.
    account_id: EscrowAccountId,

    /// What must be delivered for this milestone.
    description: String,

    /// The share of escrowed funds released when this milestone completes.
    amount: Decimal,

    /// Position in the account's ordered milestone sequence, starting at 0.
    order_index: u32,

    /// The current lifecycle status.
    status: MilestoneStatus,

    /// When the milestone was completed, if it has been.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    /// Returns the milestone id.
    pub fn id(&self) -> MilestoneId {
        self.id
    }

    /// Returns the owning escrow account id.
    pub fn account_id(&self) -> EscrowAccountId {
        self.account_id
    }

    /// Returns the deliverable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the milestone's share of escrowed funds.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the position in the ordered milestone sequence.
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    /// Returns the current lifecycle status.
    pub fn status(&self) -> MilestoneStatus {
        self.status
    }

    /// Returns when the milestone completed, if it has.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Marks the milestone completed at `at`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != MilestoneStatus::Pending {
            return Err(LedgerError::MilestoneNotPending(self.status));
        }

        self.status = MilestoneStatus::Completed;
        self.completed_at = Some(at);

        Ok(())
    }
}

/// Completed milestone count over total milestone count, as a percentage.
///
/// Returns `0.0` for an empty slice.
pub fn completion_percentage(milestones: &[Milestone]) -> f64 {
    if milestones.is_empty() {
        return 0.0;
    }

    let completed =
        milestones.iter().filter(|m| m.status() == MilestoneStatus::Completed).count();

    completed as f64 / milestones.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    fn account(automatic_release: bool) -> EscrowAccount<()> {
        EscrowAccount::builder()
            .id(Uuid::from_u128(10).into())
            .contract_id(Uuid::from_u128(1).into())
            .total_amount(Decimal::new(10_000_00, 2))
            .platform_fee(Decimal::new(500_00, 2))
            .available_amount(Decimal::new(9_500_00, 2))
            .milestone_based(true)
            .automatic_release(automatic_release)
            .fraud_insurance(false)
            .multi_signature(false)
            .risk_score(0.1)
            .status(EscrowStatus::Active)
            .terms(EscrowTerms::default())
            .aux(())
            .build()
    }

    fn milestone(idx: u32, amount: Decimal, status: MilestoneStatus) -> Milestone {
        Milestone::builder()
            .id(Uuid::from_u128(100 + u128::from(idx)).into())
            .account_id(Uuid::from_u128(10).into())
            .description("deliverable".to_string())
            .amount(amount)
            .order_index(idx)
            .status(status)
            .build()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn release_decrements_available_and_tracks_released() {
        let mut account = account(false);

        account.release(Decimal::new(5_000_00, 2)).unwrap();

        assert_eq!(account.available_amount(), Decimal::new(4_500_00, 2));
        assert_eq!(account.released_amount(), Decimal::new(5_500_00, 2));
    }

    #[test]
    fn release_exceeding_balance_is_rejected() {
        let mut account = account(false);

        let err = account.release(Decimal::new(9_500_01, 2)).unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                requested: Decimal::new(9_500_01, 2),
                available: Decimal::new(9_500_00, 2),
            }
        );
        assert_eq!(account.available_amount(), Decimal::new(9_500_00, 2));
    }

    #[test]
    fn frozen_account_rejects_releases() {
        let mut account = account(false);
        account.freeze("dispute opened".to_string(), at(1)).unwrap();

        assert!(account.is_frozen());
        assert_eq!(account.status(), EscrowStatus::Disputed);
        assert_eq!(account.release(Decimal::ONE), Err(LedgerError::Frozen));
    }

    #[test]
    fn auto_release_requires_all_four_conditions() {
        let done = vec![
            milestone(0, Decimal::new(5_000_00, 2), MilestoneStatus::Completed),
            milestone(1, Decimal::new(4_500_00, 2), MilestoneStatus::Completed),
        ];

        assert!(account(true).can_auto_release(&done));

        // automatic_release off
        assert!(!account(false).can_auto_release(&done));

        // one milestone still pending
        let half_done = vec![
            milestone(0, Decimal::new(5_000_00, 2), MilestoneStatus::Completed),
            milestone(1, Decimal::new(4_500_00, 2), MilestoneStatus::Pending),
        ];
        assert!(!account(true).can_auto_release(&half_done));

        // frozen
        let mut frozen = account(true);
        frozen.freeze("dispute".to_string(), at(1)).unwrap();
        assert!(!frozen.can_auto_release(&done));

        // no milestones at all
        assert!(!account(true).can_auto_release(&[]));
    }

    #[test]
    fn completion_percentage_handles_empty_and_partial_sets() {
        assert_eq!(completion_percentage(&[]), 0.0);

        let half = vec![
            milestone(0, Decimal::ONE, MilestoneStatus::Completed),
            milestone(1, Decimal::ONE, MilestoneStatus::Pending),
        ];
        assert_eq!(completion_percentage(&half), 50.0);
    }
}
