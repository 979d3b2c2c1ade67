//! Rating aggregation
//!
//! Collapses the (much larger) per-user ratings table into the
//! `avg_rating` / `rating_count` / `rating_std` columns carried by each
//! catalog row.

use crate::{WineId, WineRecord};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Lowest valid rating on the 1-5 scale
pub const MIN_RATING: f64 = 1.0;
/// Highest valid rating on the 1-5 scale
pub const MAX_RATING: f64 = 5.0;

/// A single user rating of a wine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingEntry {
    pub wine_id: WineId,
    pub rating: f64,
}

/// Aggregated rating statistics for one wine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingStats {
    pub avg_rating: f64,
    pub rating_count: u64,
    pub rating_std: f64,
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    sum: f64,
    sum_sq: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate raw ratings into per-wine statistics.
///
/// Ratings outside `[1, 5]` (or non-finite) are discarded. The standard
/// deviation is the sample deviation; a wine with a single rating gets 0.
/// All statistics are rounded to two decimals.
pub fn aggregate_ratings(entries: &[RatingEntry]) -> AHashMap<WineId, RatingStats> {
    let mut accumulators: AHashMap<WineId, Accumulator> = AHashMap::new();
    let mut discarded = 0usize;

    for entry in entries {
        if !entry.rating.is_finite() || entry.rating < MIN_RATING || entry.rating > MAX_RATING {
            discarded += 1;
            continue;
        }
        let acc = accumulators.entry(entry.wine_id).or_default();
        acc.count += 1;
        acc.sum += entry.rating;
        acc.sum_sq += entry.rating * entry.rating;
    }

    if discarded > 0 {
        tracing::debug!(discarded, "discarded out-of-range ratings");
    }

    accumulators
        .into_iter()
        .map(|(id, acc)| {
            let n = acc.count as f64;
            let mean = acc.sum / n;
            let std = if acc.count > 1 {
                let variance = (acc.sum_sq - n * mean * mean) / (n - 1.0);
                variance.max(0.0).sqrt()
            } else {
                0.0
            };
            (
                id,
                RatingStats {
                    avg_rating: round2(mean),
                    rating_count: acc.count,
                    rating_std: round2(std),
                },
            )
        })
        .collect()
}

/// Copy aggregated statistics onto catalog rows; unrated wines are zero-filled
pub fn attach_ratings(records: &mut [WineRecord], stats: &AHashMap<WineId, RatingStats>) {
    for record in records.iter_mut() {
        let s = stats.get(&record.wine_id).copied().unwrap_or_default();
        record.avg_rating = s.avg_rating;
        record.rating_count = s.rating_count;
        record.rating_std = s.rating_std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, rating: f64) -> RatingEntry {
        RatingEntry {
            wine_id: WineId(id),
            rating,
        }
    }

    #[test]
    fn test_aggregate_mean_count_std() {
        let stats = aggregate_ratings(&[entry(1, 4.0), entry(1, 5.0), entry(1, 3.0), entry(2, 4.5)]);

        let s1 = stats[&WineId(1)];
        assert_eq!(s1.rating_count, 3);
        assert_eq!(s1.avg_rating, 4.0);
        assert_eq!(s1.rating_std, 1.0);

        let s2 = stats[&WineId(2)];
        assert_eq!(s2.rating_count, 1);
        assert_eq!(s2.avg_rating, 4.5);
        assert_eq!(s2.rating_std, 0.0);
    }

    #[test]
    fn test_out_of_range_ratings_dropped() {
        let stats = aggregate_ratings(&[entry(1, 0.0), entry(1, 6.0), entry(1, f64::NAN)]);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_rounding() {
        let stats = aggregate_ratings(&[entry(1, 4.0), entry(1, 4.5), entry(1, 4.5)]);
        // mean 4.3333.. -> 4.33
        assert_eq!(stats[&WineId(1)].avg_rating, 4.33);
    }

    #[test]
    fn test_attach_zero_fills_unrated() {
        let mut records = vec![
            WineRecord::new(1u64, "a", "France", "Red").with_ratings(9.0, 9, 9.0),
            WineRecord::new(2u64, "b", "France", "Red"),
        ];
        let stats = aggregate_ratings(&[entry(2, 3.0)]);
        attach_ratings(&mut records, &stats);

        assert_eq!(records[0].rating_count, 0);
        assert_eq!(records[0].avg_rating, 0.0);
        assert_eq!(records[1].rating_count, 1);
        assert_eq!(records[1].avg_rating, 3.0);
    }
}
