use common::{Candidate, RELAXED_TOLERANCE_FACTOR, TeamSide};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MatchingConfig;
use crate::engine::WeakMatchEngine;
use crate::events::{MatchEvent, MatchNotifier, ProducedMatch, Seat};
use crate::pool::MatchPool;
use crate::round::{AttemptedSeeds, RoundOutcome, RoundParams, bump_wait_rounds, match_once};
use crate::search::search_near;

/// Matches produced by one round, per queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub team_matches: usize,
    pub single_matches: usize,
}

impl RoundSummary {
    pub fn total(&self) -> usize {
        self.team_matches + self.single_matches
    }
}

/// Drive matching rounds every `matching_delay` until the token is cancelled
/// or the engine is dropped. The first round runs immediately.
pub(crate) async fn run_matchmaking_loop(engine: WeakMatchEngine, cancellation_token: CancellationToken) {
    let name = engine.config().name.clone();
    info!(name = %name, "Starting matching loop");

    let mut tick_interval = interval(engine.config().matching_delay());
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!(name = %name, "Matching loop received shutdown signal");
                break;
            }
            _ = tick_interval.tick() => {
                let Some(engine) = engine.upgrade() else {
                    info!(name = %name, "Matching engine dropped, ending matching loop");
                    break;
                };
                engine.tick(&cancellation_token);
            }
        }
    }
}

/// One full round: the team queue first, then the solo queue
pub fn run_round(pool: &mut MatchPool, config: &MatchingConfig, notifier: &dyn MatchNotifier) -> RoundSummary {
    let team_matches = team_matching(pool, config, notifier);
    let single_matches = single_matching(pool, config, notifier);
    RoundSummary { team_matches, single_matches }
}

/// Pair teams against teams, then top up both sides from the solo queue
pub fn team_matching(pool: &mut MatchPool, config: &MatchingConfig, notifier: &dyn MatchNotifier) -> usize {
    let capacity = config.side_capacity();
    let attempts = pool.team_queue.len().min(config.max_production);
    let params = RoundParams {
        search_window: config.max_search,
        group_size: 2,
        strict_only: config.team_must_match_team,
        allow_robot_only: true,
        timeout_loop: config.timeout_loop,
    };

    let mut attempted = AttemptedSeeds::new();
    let mut produced = 0;
    for _ in 0..attempts {
        let group = match match_once(&mut pool.team_queue, &mut pool.registry, &params, &mut attempted, notifier) {
            RoundOutcome::Stop => break,
            RoundOutcome::Retry => continue,
            RoundOutcome::Group(group) => group,
        };

        let mut group = group.into_iter();
        let Some(Candidate::Real(red_id)) = group.next() else {
            continue;
        };
        let blue_id = group.next().and_then(|seat| seat.real().cloned());

        let Some(red) = pool.registry.get(&red_id) else {
            continue;
        };
        let (reference, tolerance, red_members) = (red.skill_rating, red.tolerance, red.member_count);
        let blue_members = blue_id
            .as_ref()
            .and_then(|id| pool.registry.get(id))
            .map_or(0, |blue| blue.member_count);

        let mut sides = SideBuilder::default();
        sides.push(TeamSide::Red, Candidate::Real(red_id.clone()), red_members);
        if let Some(blue_id) = &blue_id {
            sides.push(TeamSide::Blue, Candidate::Real(blue_id.clone()), blue_members);
        }

        let shortfall = capacity.saturating_sub(red_members) + capacity.saturating_sub(blue_members);
        if shortfall > 0 {
            let window = pool.single_queue.len().min(config.max_search);
            let slots = search_near(
                reference,
                tolerance * RELAXED_TOLERANCE_FACTOR,
                &pool.single_queue,
                window,
                &pool.registry,
                shortfall as usize,
            );

            if blue_id.is_none() && slots.iter().all(Candidate::is_robot) {
                debug!(id = %red_id, "No opposing team and no solo backfill, team keeps waiting");
                bump_wait_rounds(&mut pool.registry, &red_id, config.timeout_loop, notifier);
                pool.team_queue.push_front(red_id.clone());
                attempted.insert(red_id);
                continue;
            }

            let backfill: Vec<Seat> = slots
                .iter()
                .map(|slot| slot.map(|idx| pool.single_queue[idx].clone()))
                .collect();
            let mut picked: Vec<usize> = slots.iter().filter_map(|slot| slot.real().copied()).collect();
            picked.sort_unstable_by(|a, b| b.cmp(a));
            for idx in picked {
                pool.single_queue.remove(idx);
            }

            for seat in backfill {
                if let Candidate::Real(id) = &seat {
                    pool.registry.remove(id);
                }
                sides.push_balanced(seat);
            }
        }

        pool.registry.remove(&red_id);
        if let Some(blue_id) = &blue_id {
            pool.registry.remove(blue_id);
        }

        let produced_match = sides.finish();
        info!(
            match_id = %produced_match.match_id,
            red = produced_match.red.len(),
            blue = produced_match.blue.len(),
            used_robot = produced_match.used_robot,
            "Team match produced"
        );
        notifier.notify(MatchEvent::MatchProduced(produced_match));
        produced += 1;
    }

    produced
}

/// Group solo contestants into full matches
pub fn single_matching(pool: &mut MatchPool, config: &MatchingConfig, notifier: &dyn MatchNotifier) -> usize {
    let attempts = pool.single_queue.len().min(config.max_production);
    let params = RoundParams {
        search_window: config.max_search,
        group_size: config.fighter_num as usize,
        strict_only: false,
        allow_robot_only: false,
        timeout_loop: config.timeout_loop,
    };

    let mut attempted = AttemptedSeeds::new();
    let mut produced = 0;
    for _ in 0..attempts {
        let group = match match_once(&mut pool.single_queue, &mut pool.registry, &params, &mut attempted, notifier) {
            RoundOutcome::Stop => break,
            RoundOutcome::Retry => continue,
            RoundOutcome::Group(group) => group,
        };

        let mut sides = SideBuilder::default();
        for seat in group {
            if let Candidate::Real(id) = &seat {
                pool.registry.remove(id);
            }
            sides.push_balanced(seat);
        }

        let produced_match = sides.finish();
        info!(
            match_id = %produced_match.match_id,
            used_robot = produced_match.used_robot,
            "Solo match produced"
        );
        notifier.notify(MatchEvent::MatchProduced(produced_match));
        produced += 1;
    }

    produced
}

/// Accumulates the two rosters of a match, tracking occupied seats per side
#[derive(Debug, Default)]
struct SideBuilder {
    red: Vec<Seat>,
    blue: Vec<Seat>,
    red_seats: u32,
    blue_seats: u32,
    used_robot: bool,
}

impl SideBuilder {
    fn push(&mut self, side: TeamSide, seat: Seat, seats: u32) {
        self.used_robot |= seat.is_robot();
        match side {
            TeamSide::Red => {
                self.red.push(seat);
                self.red_seats += seats;
            }
            TeamSide::Blue => {
                self.blue.push(seat);
                self.blue_seats += seats;
            }
        }
    }

    /// One-seat entry on whichever side has fewer seats, red on ties
    fn push_balanced(&mut self, seat: Seat) {
        let side = if self.blue_seats < self.red_seats { TeamSide::Blue } else { TeamSide::Red };
        self.push(side, seat, 1);
    }

    fn finish(self) -> ProducedMatch {
        ProducedMatch::new(self.red, self.blue, self.used_robot)
    }
}
