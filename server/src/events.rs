use chrono::{DateTime, Utc};
use common::{Candidate, ContestantId};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// A roster entry: a real contestant or a robot seat-filler
pub type Seat = Candidate<ContestantId>;

/// Two balanced rosters produced by one matching attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProducedMatch {
    pub match_id: Uuid,
    pub red: Vec<Seat>,
    pub blue: Vec<Seat>,
    pub used_robot: bool,
    pub produced_at: DateTime<Utc>,
}

impl ProducedMatch {
    pub fn new(red: Vec<Seat>, blue: Vec<Seat>, used_robot: bool) -> Self {
        Self {
            match_id: Uuid::new_v4(),
            red,
            blue,
            used_robot,
            produced_at: Utc::now(),
        }
    }

    /// Ids of every real contestant on both sides
    pub fn contestant_ids(&self) -> impl Iterator<Item = &ContestantId> {
        self.red.iter().chain(self.blue.iter()).filter_map(|seat| seat.real())
    }
}

/// Signals reported by the engine to its host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MatchEvent {
    StartSucceeded,
    StartRejected { reason: String },
    StopSucceeded,
    DestroySucceeded,
    AdmissionSucceeded { id: ContestantId },
    AdmissionRejected { id: ContestantId, reason: String },
    WithdrawalSucceeded { id: ContestantId },
    WithdrawalRejected { id: ContestantId, reason: String },
    TimeoutReached { id: ContestantId },
    MatchProduced(ProducedMatch),
}

/// Sink for engine events. The engine never assumes a particular transport.
pub trait MatchNotifier: Send + Sync {
    fn notify(&self, event: MatchEvent);
}

impl MatchNotifier for mpsc::UnboundedSender<MatchEvent> {
    fn notify(&self, event: MatchEvent) {
        // Receiver dropped means nobody is listening anymore
        let _ = self.send(event);
    }
}

impl MatchNotifier for broadcast::Sender<MatchEvent> {
    fn notify(&self, event: MatchEvent) {
        let _ = self.send(event);
    }
}

/// Discards every event
pub struct NoopNotifier;

impl MatchNotifier for NoopNotifier {
    fn notify(&self, _event: MatchEvent) {}
}
