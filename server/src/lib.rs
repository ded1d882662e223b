pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod matchmaking;
pub mod pool;
pub mod round;
pub mod search;

pub use config::MatchingConfig;
pub use engine::{EngineState, MatchEngine};
pub use events::{MatchEvent, MatchNotifier, NoopNotifier, ProducedMatch, Seat};
