//! Response types for settlement engine operations.

use dissolve_derive::Dissolve;
use settlement_coordinator_domain::{
    contract::{Contract, ContractSignature},
    escrow::{EscrowAccount, Milestone},
};

/// Response from initiating a contract.
#[derive(Debug, Dissolve)]
pub struct InitiateContractResponse {
    /// The persisted contract, awaiting the employer's signature
    contract: Contract,
}

/// Response from recording a signature.
#[derive(Debug, Dissolve)]
pub struct SignContractResponse {
    /// The contract after the signature was applied
    contract: Contract,

    /// The captured signature
    signature: ContractSignature,
}

/// Response from cancelling a contract.
#[derive(Debug, Dissolve)]
pub struct CancelContractResponse {
    /// The cancelled contract
    contract: Contract,
}

/// Response from funding an escrow account.
#[derive(Debug, Dissolve)]
pub struct FundEscrowResponse {
    /// The persisted escrow account
    account: EscrowAccount,
}

/// Response from defining milestones.
#[derive(Debug, Dissolve)]
pub struct DefineMilestonesResponse {
    /// The persisted milestones, in release order
    milestones: Vec<Milestone>,
}

/// Response from releasing a milestone.
#[derive(Debug, Dissolve)]
pub struct ReleaseMilestoneResponse {
    /// The account after the release (and the automatic final release, if it
    /// fired)
    account: EscrowAccount,

    /// The released milestone
    milestone: Milestone,

    /// Whether the automatic final release fired as part of this operation
    auto_released: bool,
}

impl std::fmt::Debug for ReleaseMilestoneResponseDissolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseMilestoneResponseDissolved")
            .field("account", &self.account)
            .field("milestone", &self.milestone)
            .field("auto_released", &self.auto_released)
            .finish()
    }
}

/// Response from freezing an escrow account.
#[derive(Debug, Dissolve)]
pub struct FreezeEscrowResponse {
    /// The frozen account
    account: EscrowAccount,
}

/// Response from retrieving a contract.
#[derive(Debug, Dissolve)]
pub struct GetContractResponse {
    /// The contract if found, `None` otherwise
    contract: Option<Contract>,

    /// The captured signatures, in signing order
    signatures: Vec<ContractSignature>,
}

/// Response from retrieving an escrow account.
#[derive(Debug, Dissolve)]
pub struct GetEscrowAccountResponse {
    /// The account if found, `None` otherwise
    account: Option<EscrowAccount>,

    /// The account's milestones, in release order
    milestones: Vec<Milestone>,

    /// Completed milestone count over total milestone count, as a percentage
    completion_percentage: f64,
}

#[bon::bon]
impl InitiateContractResponse {
    #[builder]
    pub(crate) fn new(contract: Contract) -> Self {
        Self { contract }
    }
}

#[bon::bon]
impl SignContractResponse {
    #[builder]
    pub(crate) fn new(contract: Contract, signature: ContractSignature) -> Self {
        Self { contract, signature }
    }
}

#[bon::bon]
impl CancelContractResponse {
    #[builder]
    pub(crate) fn new(contract: Contract) -> Self {
        Self { contract }
    }
}

#[bon::bon]
impl FundEscrowResponse {
    #[builder]
    pub(crate) fn new(account: EscrowAccount) -> Self {
        Self { account }
    }
}

#[bon::bon]
impl DefineMilestonesResponse {
    #[builder]
    pub(crate) fn new(milestones: Vec<Milestone>) -> Self {
        Self { milestones }
    }
}

#[bon::bon]
impl ReleaseMilestoneResponse {
    #[builder]
    pub(crate) fn new(account: EscrowAccount, milestone: Milestone, auto_released: bool) -> Self {
        Self { account, milestone, auto_released }
    }
}

#[bon::bon]
impl FreezeEscrowResponse {
    #[builder]
    pub(crate) fn new(account: EscrowAccount) -> Self {
        Self { account }
    }
}

#[bon::bon]
impl GetContractResponse {
    #[builder]
    pub(crate) fn new(contract: Option<Contract>, signatures: Vec<ContractSignature>) -> Self {
        Self { contract, signatures }
    }
}

#[bon::bon]
impl GetEscrowAccountResponse {
    #[builder]
    pub(crate) fn new(
        account: Option<EscrowAccount>,
        milestones: Vec<Milestone>,
        completion_percentage: f64,
    ) -> Self {
        Self { account, milestones, completion_percentage }
    }
}
