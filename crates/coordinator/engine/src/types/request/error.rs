use rust_decimal::Decimal;

/// Top-level error for request validation.
///
/// This enum wraps all possible request validation errors.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Error validating a contract initiation request.
    #[error("initiate contract error: {0}")]
    InitiateContract(#[from] InitiateContractRequestError),

    /// Error validating a signature request.
    #[error("sign contract error: {0}")]
    SignContract(#[from] SignContractRequestError),

    /// Error validating a cancellation request.
    #[error("cancel contract error: {0}")]
    CancelContract(#[from] CancelContractRequestError),

    /// Error validating an escrow funding request.
    #[error("fund escrow error: {0}")]
    FundEscrow(#[from] FundEscrowRequestError),

    /// Error validating a milestone definition request.
    #[error("define milestones error: {0}")]
    DefineMilestones(#[from] DefineMilestonesRequestError),

    /// Error validating a freeze request.
    #[error("freeze escrow error: {0}")]
    FreezeEscrow(#[from] FreezeEscrowRequestError),
}

/// Errors that can occur when validating a contract initiation request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InitiateContractRequestError {
    /// The employer and gig worker are the same user
    #[error("same party error: employer and gig worker must be distinct users")]
    SameParty,

    /// The total amount is zero, negative or finer than 2 decimal digits
    #[error("invalid amount error: {0}")]
    InvalidAmount(Decimal),

    /// The contract terms are empty
    #[error("empty terms error")]
    EmptyTerms,
}

/// Errors that can occur when validating a signature request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignContractRequestError {
    /// The typed full name is empty
    #[error("empty full name error")]
    EmptyFullName,
}

/// Errors that can occur when validating a cancellation request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CancelContractRequestError {
    /// The cancellation reason is empty
    #[error("empty reason error")]
    EmptyReason,
}

/// Errors that can occur when validating an escrow funding request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FundEscrowRequestError {
    /// The total amount is zero, negative or finer than 2 decimal digits
    #[error("invalid total amount error: {0}")]
    InvalidTotalAmount(Decimal),

    /// The platform fee is negative or finer than 2 decimal digits
    #[error("invalid platform fee error: {0}")]
    InvalidPlatformFee(Decimal),

    /// The platform fee is at least the total amount
    #[error("fee exceeds total error: fee {platform_fee} >= total {total_amount}")]
    FeeExceedsTotal {
        /// The rejected fee.
        platform_fee: Decimal,
        /// The funded total.
        total_amount: Decimal,
    },
}

/// Errors that can occur when validating a milestone definition request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DefineMilestonesRequestError {
    /// No milestones were supplied
    #[error("no milestones error")]
    NoMilestones,

    /// A milestone description is empty
    #[error("empty description error")]
    EmptyDescription,

    /// A milestone amount is zero, negative or finer than 2 decimal digits
    #[error("invalid amount error: {0}")]
    InvalidAmount(Decimal),
}

/// Errors that can occur when validating a freeze request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FreezeEscrowRequestError {
    /// The freeze reason is empty
    #[error("empty reason error")]
    EmptyReason,
}
