//! Candidate search over a fixed window at the front of a queue.
//!
//! Both policies are read-only: they return indices into the queue as it
//! stands and leave removal to the caller.

use common::Candidate;

use crate::pool::{IdQueue, Registry};

/// Queue index of a selected partner, or a robot seat
pub type Slot = Candidate<usize>;

/// Proximity policy: first-fit scan of `0..window`, accepting every entry
/// within `tolerance` of `reference` until `out_num` are found. Missing
/// partners are padded with robots, so the result always has `out_num` slots.
pub fn search_near(
    reference: f64,
    tolerance: f64,
    queue: &IdQueue,
    window: usize,
    registry: &Registry,
    out_num: usize,
) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(out_num);
    if out_num == 0 {
        return slots;
    }

    for (idx, id) in queue.iter().take(window).enumerate() {
        let Some(contestant) = registry.get(id) else {
            continue;
        };
        if contestant.distance_to(reference) > tolerance {
            continue;
        }
        slots.push(Candidate::Real(idx));
        if slots.len() == out_num {
            return slots;
        }
    }

    slots.resize(out_num, Candidate::Robot);
    slots
}

/// Nearest policy: collects every entry of the window within `tolerance` and
/// returns the `out_num` closest, ties kept in scan order. Returns `None` when
/// fewer than `out_num` qualify; never pads with robots.
pub fn search_most_near(
    reference: f64,
    tolerance: f64,
    queue: &IdQueue,
    window: usize,
    registry: &Registry,
    out_num: usize,
) -> Option<Vec<usize>> {
    let mut qualifying: Vec<(usize, f64)> = queue
        .iter()
        .take(window)
        .enumerate()
        .filter_map(|(idx, id)| {
            let distance = registry.get(id)?.distance_to(reference);
            (distance <= tolerance).then_some((idx, distance))
        })
        .collect();

    if qualifying.len() < out_num {
        return None;
    }

    // sort_by is stable
    qualifying.sort_by(|a, b| a.1.total_cmp(&b.1));
    Some(qualifying.into_iter().take(out_num).map(|(idx, _)| idx).collect())
}
