use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use common::{Contestant, ContestantId};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::MatchingConfig;
use crate::error::{AdmissionError, ConfigError, LifecycleError, WithdrawalError};
use crate::events::{MatchEvent, MatchNotifier};
use crate::matchmaking::{RoundSummary, run_matchmaking_loop, run_round};
use crate::pool::{MatchPool, QueueStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    New,
    Started,
    Stopped,
    Destroyed,
}

struct EngineInner {
    state: EngineState,
    pool: MatchPool,
    /// Cancels the running tick task, if one is armed
    ticker: Option<CancellationToken>,
}

/// Matching engine owning both queues and the contestant registry.
///
/// Lifecycle, admission and rounds share one lock, so a round never observes
/// a half-applied admission or withdrawal. Clones share the same engine.
///
/// The notifier is called with the lock held and must not call back into the
/// engine.
///
/// The tick task only holds a weak handle. Dropping the last `MatchEngine`
/// ends it at the next tick, but hosts should still call `stop` or `destroy`
/// first so shutdown is reported to the notifier.
#[derive(Clone)]
pub struct MatchEngine {
    config: Arc<MatchingConfig>,
    inner: Arc<Mutex<EngineInner>>,
    notifier: Arc<dyn MatchNotifier>,
}

impl MatchEngine {
    pub fn new(config: MatchingConfig, notifier: Arc<dyn MatchNotifier>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(EngineInner {
                state: EngineState::New,
                pool: MatchPool::new(),
                ticker: None,
            })),
            notifier,
        })
    }

    /// Engine reporting into an unbounded channel
    pub fn with_channel(
        config: MatchingConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MatchEvent>), ConfigError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self::new(config, Arc::new(tx))?;
        Ok((engine, rx))
    }

    pub(crate) fn downgrade(&self) -> WeakMatchEngine {
        WeakMatchEngine {
            config: self.config.clone(),
            inner: Arc::downgrade(&self.inner),
            notifier: self.notifier.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start (or resume) periodic matching. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state == EngineState::Destroyed {
            return Err(self.reject_start(LifecycleError::Destroyed));
        }
        let Ok(handle) = Handle::try_current() else {
            return Err(self.reject_start(LifecycleError::NoRuntime));
        };

        inner.state = EngineState::Started;
        let armed = inner.ticker.as_ref().is_some_and(|token| !token.is_cancelled());
        if !armed {
            let token = CancellationToken::new();
            inner.ticker = Some(token.clone());
            handle.spawn(run_matchmaking_loop(self.downgrade(), token));
        }

        info!(name = %self.config.name, "Matching engine started");
        self.notifier.notify(MatchEvent::StartSucceeded);
        Ok(())
    }

    fn reject_start(&self, reason: LifecycleError) -> LifecycleError {
        warn!(name = %self.config.name, %reason, "Matching engine start rejected");
        self.notifier.notify(MatchEvent::StartRejected { reason: reason.to_string() });
        reason
    }

    /// Halt periodic matching, keeping every queued contestant. A round that
    /// is already running completes.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state == EngineState::Destroyed {
            return Err(LifecycleError::Destroyed);
        }
        inner.state = EngineState::Stopped;
        if let Some(token) = inner.ticker.take() {
            token.cancel();
        }

        info!(name = %self.config.name, "Matching engine stopped");
        self.notifier.notify(MatchEvent::StopSucceeded);
        Ok(())
    }

    /// Tear the engine down for good, dropping all pending contestants
    pub fn destroy(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state == EngineState::Destroyed {
            return Err(LifecycleError::Destroyed);
        }
        inner.state = EngineState::Destroyed;
        if let Some(token) = inner.ticker.take() {
            token.cancel();
        }
        let dropped = inner.pool.len();
        inner.pool.clear();

        info!(name = %self.config.name, dropped, "Matching engine destroyed");
        self.notifier.notify(MatchEvent::DestroySucceeded);
        Ok(())
    }

    /// Queue a contestant for matching. A pending id is overwritten.
    pub fn add_contestant(&self, mut contestant: Contestant) -> Result<(), AdmissionError> {
        let mut inner = self.lock();
        let admissible = match inner.state {
            EngineState::Started => self.validate(&contestant),
            EngineState::Destroyed => Err(AdmissionError::Destroyed),
            EngineState::New | EngineState::Stopped => Err(AdmissionError::NotStarted),
        };

        if let Err(reason) = admissible {
            warn!(id = %contestant.id, %reason, "Contestant rejected");
            self.notifier.notify(MatchEvent::AdmissionRejected {
                id: contestant.id,
                reason: reason.to_string(),
            });
            return Err(reason);
        }

        contestant.wait_rounds = 0;
        let id = contestant.id.clone();
        debug!(
            id = %id,
            skill_rating = contestant.skill_rating,
            member_count = contestant.member_count,
            "Contestant joined matching"
        );
        inner.pool.insert(contestant);
        self.notifier.notify(MatchEvent::AdmissionSucceeded { id });
        Ok(())
    }

    fn validate(&self, contestant: &Contestant) -> Result<(), AdmissionError> {
        let capacity = self.config.side_capacity();
        if !contestant.id.is_valid() {
            return Err(AdmissionError::InvalidId);
        }
        if contestant.member_count == 0 {
            return Err(AdmissionError::EmptyRoster);
        }
        if contestant.member_count > capacity {
            return Err(AdmissionError::RosterTooLarge {
                member_count: contestant.member_count,
                capacity,
            });
        }
        if !contestant.skill_rating.is_finite() {
            return Err(AdmissionError::InvalidRating);
        }
        if !contestant.tolerance.is_finite() || contestant.tolerance < 0.0 {
            return Err(AdmissionError::InvalidTolerance);
        }
        Ok(())
    }

    /// Withdraw a pending contestant from matching
    pub fn remove_contestant(&self, id: &ContestantId) -> Result<Contestant, WithdrawalError> {
        let mut inner = self.lock();
        let removed = if inner.state == EngineState::Destroyed {
            Err(WithdrawalError::Destroyed)
        } else {
            inner.pool.remove(id).ok_or_else(|| WithdrawalError::NotFound(id.clone()))
        };

        match removed {
            Ok(contestant) => {
                debug!(id = %id, "Contestant left matching");
                self.notifier.notify(MatchEvent::WithdrawalSucceeded { id: id.clone() });
                Ok(contestant)
            }
            Err(reason) => {
                warn!(id = %id, %reason, "Withdrawal rejected");
                self.notifier.notify(MatchEvent::WithdrawalRejected {
                    id: id.clone(),
                    reason: reason.to_string(),
                });
                Err(reason)
            }
        }
    }

    /// Run one matching round now if the engine is started
    pub fn run_round(&self) -> RoundSummary {
        let mut inner = self.lock();
        if inner.state != EngineState::Started {
            return RoundSummary::default();
        }
        self.round(&mut inner)
    }

    /// Scheduled round; skipped once the ticker that fired it was disarmed
    pub(crate) fn tick(&self, ticker: &CancellationToken) -> RoundSummary {
        let mut inner = self.lock();
        if ticker.is_cancelled() || inner.state != EngineState::Started {
            return RoundSummary::default();
        }
        self.round(&mut inner)
    }

    fn round(&self, inner: &mut EngineInner) -> RoundSummary {
        let summary = run_round(&mut inner.pool, &self.config, self.notifier.as_ref());
        trace!(
            name = %self.config.name,
            team_matches = summary.team_matches,
            single_matches = summary.single_matches,
            queued = ?inner.pool.stats(),
            "Matching round finished"
        );
        summary
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.lock().pool.stats()
    }

    pub fn contains(&self, id: &ContestantId) -> bool {
        self.lock().pool.contains(id)
    }

    pub fn wait_rounds(&self, id: &ContestantId) -> Option<u32> {
        self.lock().pool.get(id).map(|contestant| contestant.wait_rounds)
    }
}

/// Engine handle that does not keep the queues alive
#[derive(Clone)]
pub(crate) struct WeakMatchEngine {
    config: Arc<MatchingConfig>,
    inner: Weak<Mutex<EngineInner>>,
    notifier: Arc<dyn MatchNotifier>,
}

impl WeakMatchEngine {
    pub(crate) fn upgrade(&self) -> Option<MatchEngine> {
        Some(MatchEngine {
            config: self.config.clone(),
            inner: self.inner.upgrade()?,
            notifier: self.notifier.clone(),
        })
    }

    pub(crate) fn config(&self) -> &MatchingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (MatchEngine, mpsc::UnboundedReceiver<MatchEvent>) {
        MatchEngine::with_channel(MatchingConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MatchingConfig { fighter_num: 3, ..Default::default() };
        assert!(matches!(
            MatchEngine::with_channel(config),
            Err(ConfigError::InvalidFighterNum(3))
        ));
    }

    #[test]
    fn test_admission_before_start_is_rejected() {
        let (engine, mut rx) = engine();

        let err = engine.add_contestant(Contestant::solo("a", 1000.0, 10.0)).unwrap_err();

        assert_eq!(err, AdmissionError::NotStarted);
        assert_eq!(
            rx.try_recv().unwrap(),
            MatchEvent::AdmissionRejected { id: "a".into(), reason: "engine is not started".to_string() }
        );
        assert_eq!(engine.queue_stats(), QueueStats::default());
    }

    #[test]
    fn test_start_without_runtime_is_rejected() {
        let (engine, mut rx) = engine();

        assert_eq!(engine.start(), Err(LifecycleError::NoRuntime));
        assert!(matches!(rx.try_recv().unwrap(), MatchEvent::StartRejected { .. }));
        assert_eq!(engine.state(), EngineState::New);
    }

    #[test]
    fn test_withdrawal_of_unknown_id() {
        let (engine, mut rx) = engine();

        let err = engine.remove_contestant(&"ghost".into()).unwrap_err();

        assert_eq!(err, WithdrawalError::NotFound("ghost".into()));
        assert!(matches!(rx.try_recv().unwrap(), MatchEvent::WithdrawalRejected { .. }));
    }

    #[test]
    fn test_lifecycle_after_destroy() {
        let (engine, mut rx) = engine();

        engine.destroy().unwrap();
        assert_eq!(rx.try_recv().unwrap(), MatchEvent::DestroySucceeded);
        assert_eq!(engine.state(), EngineState::Destroyed);

        assert_eq!(engine.destroy(), Err(LifecycleError::Destroyed));
        assert_eq!(engine.stop(), Err(LifecycleError::Destroyed));
        assert_eq!(engine.start(), Err(LifecycleError::Destroyed));
        assert!(matches!(rx.try_recv().unwrap(), MatchEvent::StartRejected { .. }));
        assert_eq!(
            engine.add_contestant(Contestant::solo("a", 1000.0, 10.0)),
            Err(AdmissionError::Destroyed)
        );
        assert_eq!(engine.remove_contestant(&"a".into()), Err(WithdrawalError::Destroyed));
    }

    #[test]
    fn test_run_round_is_noop_unless_started() {
        let (engine, _rx) = engine();
        assert_eq!(engine.run_round(), RoundSummary::default());
        engine.stop().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.run_round(), RoundSummary::default());
    }
}
