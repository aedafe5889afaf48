//! Explicitly constructed planning service.
//!
//! Owns one ledger and the repository it is persisted through. Mutations are
//! committed to the repository before they become visible, then fanned out to
//! subscribed observers. Nothing is recomputed implicitly: callers ask for a
//! plan, projection or milestone scan when they want one.

use chrono::NaiveDate;
use tracing::debug;

use crate::debt::{Debt, PaymentRecord};
use crate::ledger::{Ledger, LedgerEvent, PaymentOutcome};
use crate::projection::{generate_projection, ProjectionOutput};
use crate::repository::LedgerRepository;
use crate::strategy::PayoffStrategy;
use crate::summary::{summarize, PortfolioSummary};
use crate::types::{Money, SimulationLimits};
use crate::waterfall::{build_plan, PayoffPlan, PlanInput};
use crate::PayoffResult;

#[cfg(feature = "milestones")]
use crate::milestones::{evaluate_milestones, Milestone};
#[cfg(feature = "milestones")]
use std::collections::BTreeSet;

#[cfg(feature = "recommendations")]
use crate::recommendations::{
    generate_recommendations, RecommendationInput, RecommendationOutput,
    RecommendationThresholds,
};

/// Receives ledger events and newly achieved milestones.
pub trait PayoffObserver {
    fn on_ledger_event(&mut self, event: &LedgerEvent);

    #[cfg(feature = "milestones")]
    fn on_milestone(&mut self, _milestone: &Milestone) {}
}

pub struct PayoffService<R: LedgerRepository> {
    ledger: Ledger,
    repository: R,
    observers: Vec<Box<dyn PayoffObserver>>,
    limits: SimulationLimits,
}

impl<R: LedgerRepository> PayoffService<R> {
    /// Load the ledger from `repository` and wrap it.
    pub fn new(repository: R) -> PayoffResult<Self> {
        let ledger = Ledger::from_snapshot(repository.load()?)?;
        Ok(Self {
            ledger,
            repository,
            observers: Vec::new(),
            limits: SimulationLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: SimulationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn PayoffObserver>) {
        self.observers.push(observer);
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    // -- Mutations ---------------------------------------------------------

    pub fn add_debt(&mut self, debt: Debt) -> PayoffResult<()> {
        let event = self.commit(|ledger| ledger.add_debt(debt))?;
        self.publish(&[event]);
        Ok(())
    }

    pub fn update_debt(&mut self, debt: Debt) -> PayoffResult<()> {
        let event = self.commit(|ledger| ledger.update_debt(debt))?;
        self.publish(&[event]);
        Ok(())
    }

    pub fn delete_debt(&mut self, id: &str) -> PayoffResult<()> {
        let event = self.commit(|ledger| ledger.delete_debt(id))?;
        self.publish(&[event]);
        Ok(())
    }

    pub fn record_payment(
        &mut self,
        debt_id: &str,
        amount: Money,
        date: NaiveDate,
        notes: Option<String>,
    ) -> PayoffResult<PaymentRecord> {
        let outcome: PaymentOutcome =
            self.commit(|ledger| ledger.record_payment(debt_id, amount, date, notes))?;
        self.publish(&outcome.events);
        Ok(outcome.record)
    }

    // -- Derived views -------------------------------------------------------

    pub fn plan(
        &self,
        strategy: &PayoffStrategy,
        extra_monthly_payment: Money,
        as_of: NaiveDate,
    ) -> PayoffResult<PayoffPlan> {
        build_plan(
            self.ledger.debts(),
            strategy,
            extra_monthly_payment,
            as_of,
            &self.limits,
        )
    }

    pub fn projection(
        &self,
        strategy: &PayoffStrategy,
        extra_monthly_payment: Money,
        as_of: NaiveDate,
    ) -> PayoffResult<ProjectionOutput> {
        let input = PlanInput {
            debts: self.ledger.debts().to_vec(),
            strategy: strategy.clone(),
            extra_monthly_payment,
            as_of,
            limits: self.limits.clone(),
        };
        Ok(generate_projection(&input)?.result)
    }

    /// Scan for milestones not yet in `achieved_ids` and notify observers.
    #[cfg(feature = "milestones")]
    pub fn milestones(
        &mut self,
        achieved_ids: &BTreeSet<String>,
        as_of: NaiveDate,
    ) -> Vec<Milestone> {
        let found = evaluate_milestones(
            self.ledger.debts(),
            self.ledger.payments(),
            achieved_ids,
            as_of,
        );
        for milestone in &found {
            for observer in self.observers.iter_mut() {
                observer.on_milestone(milestone);
            }
        }
        found
    }

    #[cfg(feature = "recommendations")]
    pub fn recommendations(
        &self,
        strategy: &PayoffStrategy,
        extra_monthly_payment: Money,
        as_of: NaiveDate,
        thresholds: RecommendationThresholds,
    ) -> PayoffResult<RecommendationOutput> {
        let input = RecommendationInput {
            debts: self.ledger.debts().to_vec(),
            strategy: strategy.clone(),
            extra_monthly_payment,
            as_of,
            limits: self.limits.clone(),
            thresholds,
        };
        Ok(generate_recommendations(&input)?.result)
    }

    pub fn summary(&self) -> PortfolioSummary {
        summarize(self.ledger.debts(), self.ledger.payments())
    }

    // -- Internals -----------------------------------------------------------

    /// Apply `change` to a copy of the ledger, persist it, then swap it in.
    /// A failed save leaves the live ledger untouched.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Ledger) -> PayoffResult<T>,
    ) -> PayoffResult<T> {
        let mut next = self.ledger.clone();
        let value = change(&mut next)?;
        self.repository.save(&next.snapshot())?;
        self.ledger = next;
        Ok(value)
    }

    fn publish(&mut self, events: &[LedgerEvent]) {
        debug!(events = events.len(), observers = self.observers.len(), "publishing ledger events");
        for event in events {
            for observer in self.observers.iter_mut() {
                observer.on_ledger_event(event);
            }
        }
    }
}
