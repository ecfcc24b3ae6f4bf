use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::offer::{OfferPool, RideOffer};
use crate::random::RandomSource;

/// Redraws allowed per pick before falling back to the first eligible entry.
/// Keeps rejection sampling terminating under a pathological source.
pub const MAX_REJECTIONS_PER_DRAW: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("offer pool exhausted: requested {requested}, {available} non-conflicting candidates")]
    PoolExhausted { requested: usize, available: usize },
}

/// Draws a batch of `min_count..=max_count` offers without repeating an
/// index or a destination, in draw order.
///
/// The count is capped at the number of distinct destinations in `pool`.
pub fn sample_batch(
    pool: &OfferPool,
    min_count: usize,
    max_count: usize,
    rng: &mut dyn RandomSource,
) -> Vec<RideOffer> {
    if pool.is_empty() {
        return Vec::new();
    }

    let (low, high) = if min_count <= max_count {
        (min_count, max_count)
    } else {
        (max_count, min_count)
    };
    let requested = rng.between(low, high);
    let count = requested.min(pool.distinct_destinations());
    if count < requested {
        debug!(requested, count, "batch size capped by pool");
    }

    let mut picked: Vec<usize> = Vec::with_capacity(count);
    let mut destinations: HashSet<&str> = HashSet::with_capacity(count);

    while picked.len() < count {
        let index = draw_index(pool, rng, |i, offer| {
            !picked.contains(&i) && !destinations.contains(offer.destination())
        });
        let Some(index) = index else { break };
        picked.push(index);
        if let Some(offer) = pool.get(index) {
            destinations.insert(offer.destination());
        }
    }

    picked
        .into_iter()
        .filter_map(|i| pool.get(i).cloned())
        .collect()
}

/// Draws `add_count` offers whose destinations appear neither in
/// `existing_destinations` nor among each other.
///
/// All or nothing: fails with [`SamplingError::PoolExhausted`] when the pool
/// cannot supply `add_count` non-conflicting destinations.
pub fn sample_replacement<'a>(
    pool: &OfferPool,
    existing_destinations: impl IntoIterator<Item = &'a str>,
    add_count: usize,
    rng: &mut dyn RandomSource,
) -> Result<Vec<RideOffer>, SamplingError> {
    let mut excluded: HashSet<String> = existing_destinations
        .into_iter()
        .map(str::to_owned)
        .collect();

    let available = pool
        .offers()
        .iter()
        .map(RideOffer::destination)
        .filter(|d| !excluded.contains(*d))
        .collect::<HashSet<_>>()
        .len();

    if add_count > available {
        return Err(SamplingError::PoolExhausted {
            requested: add_count,
            available,
        });
    }

    let mut drawn = Vec::with_capacity(add_count);
    for _ in 0..add_count {
        let index = draw_index(pool, rng, |_, offer| !excluded.contains(offer.destination()));
        // `available` guarantees an eligible entry for every draw.
        let Some(offer) = index.and_then(|i| pool.get(i)) else {
            return Err(SamplingError::PoolExhausted {
                requested: add_count,
                available: drawn.len(),
            });
        };
        excluded.insert(offer.destination().to_owned());
        drawn.push(offer.clone());
    }

    Ok(drawn)
}

/// Rejection sampling over pool indices: redraw while `eligible` says no.
fn draw_index<F>(pool: &OfferPool, rng: &mut dyn RandomSource, eligible: F) -> Option<usize>
where
    F: Fn(usize, &RideOffer) -> bool,
{
    for _ in 0..MAX_REJECTIONS_PER_DRAW {
        let index = rng.index(pool.len());
        if let Some(offer) = pool.get(index) {
            if eligible(index, offer) {
                return Some(index);
            }
        }
    }

    let fallback = pool
        .offers()
        .iter()
        .enumerate()
        .find(|(i, offer)| eligible(*i, *offer))
        .map(|(i, _)| i);
    warn!(?fallback, "rejection sampling gave up, using first eligible offer");
    fallback
}
