//! Test utilities for settlement coordinator components.
//!
//! This crate provides in-memory stand-ins for the engine's external
//! collaborators: a scriptable fraud oracle, recording payment and
//! notification fakes, and a deterministic id generator. They let
//! integration tests drive full settlement flows and assert on the side
//! effects without any external systems running.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use settlement_coordinator_domain::UserId;
use settlement_coordinator_engine::{
    CollaboratorError, FraudOracle, IdGenerator, NotificationEvent, NotificationService,
    PaymentGateway,
};
use uuid::Uuid;

/// A scriptable [`FraudOracle`].
///
/// Starts with every user scoring `default_score` and nobody watchlisted;
/// tests override per-user scores and flip the outage switch to exercise the
/// risk gate's failure paths.
#[derive(Debug)]
pub struct StubFraudOracle {
    default_score: f64,
    scores: Mutex<Vec<(UserId, f64)>>,
    watchlist: Mutex<HashSet<Uuid>>,
    unavailable: AtomicBool,
}

impl StubFraudOracle {
    /// An oracle scoring every user at `default_score`.
    pub fn new(default_score: f64) -> Self {
        Self {
            default_score,
            scores: Mutex::new(Vec::new()),
            watchlist: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Overrides the score reported for `user`.
    pub fn set_score(&self, user: UserId, score: f64) {
        self.scores.lock().unwrap().push((user, score));
    }

    /// Puts `user` on the watchlist.
    pub fn watchlist(&self, user: UserId) {
        self.watchlist.lock().unwrap().insert(user.into());
    }

    /// Makes every oracle call fail until re-enabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("fraud oracle unavailable"));
        }

        Ok(())
    }
}

impl Default for StubFraudOracle {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[async_trait]
impl FraudOracle for StubFraudOracle {
    async fn score(&self, user: UserId) -> Result<f64, CollaboratorError> {
        self.ensure_available()?;

        let scores = self.scores.lock().unwrap();

        Ok(scores
            .iter()
            .rev()
            .find(|(scored, _)| *scored == user)
            .map(|(_, score)| *score)
            .unwrap_or(self.default_score))
    }

    async fn is_watchlisted(&self, user: UserId) -> Result<bool, CollaboratorError> {
        self.ensure_available()?;

        Ok(self.watchlist.lock().unwrap().contains(&Uuid::from(user)))
    }
}

/// A [`PaymentGateway`] that records every payout it is asked to dispatch.
#[derive(Debug, Default)]
pub struct RecordingPaymentGateway {
    payouts: Mutex<Vec<(UserId, Decimal)>>,
    failing: AtomicBool,
}

impl RecordingPaymentGateway {
    /// A gateway that accepts every payout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every payout fail until re-enabled.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every recorded payout, in dispatch order.
    pub fn payouts(&self) -> Vec<(UserId, Decimal)> {
        self.payouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn payout(&self, recipient: UserId, amount: Decimal) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("payment rail rejected the payout"));
        }

        self.payouts.lock().unwrap().push((recipient, amount));

        Ok(())
    }
}

/// A [`NotificationService`] that records every delivered event.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    /// A notifier that accepts every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event, in delivery order.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), CollaboratorError> {
        self.events.lock().unwrap().push(event);

        Ok(())
    }
}

/// An [`IdGenerator`] handing out predictable sequential ids, so tests can
/// name the entities they are about to create.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// A generator starting at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: AtomicU64::new(first) }
    }

    /// The id the generator will hand out `offset` calls from now.
    pub fn peek(&self, offset: u64) -> Uuid {
        Uuid::from_u128(u128::from(self.next.load(Ordering::SeqCst) + offset))
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}
