/// Default engine instance label
pub const DEFAULT_ENGINE_NAME: &str = "moba-matching";

/// Default interval between matching rounds in milliseconds
pub const DEFAULT_MATCHING_DELAY_MS: u64 = 5000;

/// Default bound on how many queue entries a candidate search inspects
pub const DEFAULT_MAX_SEARCH: usize = 10_000;

/// Default cap on matches produced per queue per round
pub const DEFAULT_MAX_PRODUCTION: usize = 10_000;

/// Teams only pair with other teams by default (solo backfill still applies)
pub const DEFAULT_TEAM_MUST_MATCH_TEAM: bool = true;

/// Default number of wait rounds before a timeout is reported
pub const DEFAULT_TIMEOUT_LOOP: u32 = 5;

/// Default total seats per match, both sides included
pub const DEFAULT_FIGHTER_NUM: u32 = 4;

/// Factor applied to a contestant's tolerance once it has waited a round
pub const RELAXED_TOLERANCE_FACTOR: f64 = 2.0;
