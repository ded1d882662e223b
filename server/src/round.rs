use std::collections::HashSet;

use common::{Candidate, ContestantId, RELAXED_TOLERANCE_FACTOR};
use tracing::{debug, trace, warn};

use crate::events::{MatchEvent, MatchNotifier, Seat};
use crate::pool::{IdQueue, Registry};
use crate::search::{search_most_near, search_near};

/// Result of a single production attempt against one queue
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Nothing more can be produced from this queue this round
    Stop,
    /// The seed found no suitable partners; other seeds may still succeed
    Retry,
    /// Seed first, then its partners. Partners are already dequeued but still
    /// registered.
    Group(Vec<Seat>),
}

#[derive(Debug, Clone, Copy)]
pub struct RoundParams {
    /// Upper bound of the candidate search window
    pub search_window: usize,
    /// Participants needed to complete a group, seed included
    pub group_size: usize,
    /// Use the nearest policy even for seeds that already waited
    pub strict_only: bool,
    /// Accept a relaxed result made of robots only
    pub allow_robot_only: bool,
    pub timeout_loop: u32,
}

/// Seeds that already failed during the current round
pub type AttemptedSeeds = HashSet<ContestantId>;

/// Pop the newest contestant from `queue` and try to group it with partners
/// from the front of the same queue.
///
/// Failed seeds go back to the head and are recorded in `attempted`, so every
/// contestant seeds at most once per round.
pub fn match_once(
    queue: &mut IdQueue,
    registry: &mut Registry,
    params: &RoundParams,
    attempted: &mut AttemptedSeeds,
    notifier: &dyn MatchNotifier,
) -> RoundOutcome {
    let Some(seed_id) = queue.pop_back() else {
        return RoundOutcome::Stop;
    };
    if attempted.contains(&seed_id) {
        // failed seeds collect at the head, everything left was tried already
        queue.push_back(seed_id);
        return RoundOutcome::Stop;
    }
    let Some(seed) = registry.get(&seed_id) else {
        warn!(id = %seed_id, "Dropping queued id without a registry entry");
        return RoundOutcome::Stop;
    };
    let (wait_rounds, rating, tolerance) = (seed.wait_rounds, seed.skill_rating, seed.tolerance);

    let size = queue.len().min(params.search_window);
    let need = params.group_size.saturating_sub(1);

    if wait_rounds == 0 && size < need {
        trace!(id = %seed_id, size, need, "Not enough candidates, seed goes back to the head");
        queue.push_front(seed_id);
        let window: Vec<ContestantId> = queue.iter().take(size + 1).cloned().collect();
        for id in &window {
            bump_wait_rounds(registry, id, params.timeout_loop, notifier);
        }
        return RoundOutcome::Stop;
    }

    let slots = if wait_rounds == 0 || params.strict_only {
        search_most_near(rating, tolerance, queue, size, registry, need)
            .map(|picked| picked.into_iter().map(Candidate::Real).collect::<Vec<_>>())
    } else {
        let slots = search_near(
            rating,
            tolerance * RELAXED_TOLERANCE_FACTOR,
            queue,
            size,
            registry,
            need,
        );
        if !params.allow_robot_only && need > 0 && slots.iter().all(Candidate::is_robot) {
            None
        } else {
            Some(slots)
        }
    };

    let Some(slots) = slots else {
        debug!(id = %seed_id, wait_rounds, "No suitable partners this attempt");
        bump_wait_rounds(registry, &seed_id, params.timeout_loop, notifier);
        queue.push_front(seed_id.clone());
        attempted.insert(seed_id);
        return RoundOutcome::Retry;
    };

    let mut group = Vec::with_capacity(slots.len() + 1);
    group.push(Candidate::Real(seed_id));
    for slot in &slots {
        group.push(slot.map(|idx| queue[idx].clone()));
    }

    // Highest index first so earlier indices stay valid
    let mut picked: Vec<usize> = slots.iter().filter_map(|slot| slot.real().copied()).collect();
    picked.sort_unstable_by(|a, b| b.cmp(a));
    for idx in picked {
        queue.remove(idx);
    }

    RoundOutcome::Group(group)
}

/// Count one more failed round for `id`, reporting a timeout when the count
/// reaches `timeout_loop`.
pub(crate) fn bump_wait_rounds(
    registry: &mut Registry,
    id: &ContestantId,
    timeout_loop: u32,
    notifier: &dyn MatchNotifier,
) {
    let Some(contestant) = registry.get_mut(id) else {
        return;
    };
    contestant.wait_rounds = contestant.wait_rounds.saturating_add(1);
    if contestant.wait_rounds == timeout_loop {
        warn!(id = %id, wait_rounds = contestant.wait_rounds, "Contestant reached matching timeout");
        notifier.notify(MatchEvent::TimeoutReached { id: id.clone() });
    }
}
