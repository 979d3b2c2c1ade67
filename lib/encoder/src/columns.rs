//! Column encoding strategies
//!
//! Plain functions for the closed set of strategies a [`FeatureBlock`] can
//! name. Fitting helpers learn block parameters from catalog values;
//! encoding helpers append a block's columns to an output row.
//!
//! [`FeatureBlock`]: crate::FeatureBlock

use ahash::AHashMap;
use std::collections::BTreeSet;

/// Distinct non-empty values, sorted
pub fn sorted_categories<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The `n` most frequent values; ties are broken by name so fitting is deterministic.
///
/// A value is counted once per wine even if a wine lists it twice.
pub fn top_n_by_frequency<'a, I>(lists: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for list in lists {
        let distinct: BTreeSet<&str> = list
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        for value in distinct {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(value, _)| value.to_string())
        .collect()
}

/// Median of the finite values, `None` if there are none.
///
/// Even-length inputs average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Min and max of a column after imputation: `(min, max)`, `(0, 0)` if empty
pub fn imputed_range(values: &[f64], median: f64) -> (f64, f64) {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .map(|(lo, hi)| (lo.min(median), hi.max(median)))
        .unwrap_or((median, median))
}

/// Append one-hot columns; unknown or missing values leave all zeros
#[inline]
pub fn one_hot(value: Option<&str>, categories: &[String], out: &mut Vec<f32>) {
    let position = value
        .map(str::trim)
        .and_then(|v| categories.iter().position(|c| c == v));
    out.extend((0..categories.len()).map(|i| if Some(i) == position { 1.0 } else { 0.0 }));
}

/// Append multi-hot columns; values outside the vocabulary are dropped
#[inline]
pub fn multi_hot(values: &[String], vocabulary: &[String], out: &mut Vec<f32>) {
    out.extend(vocabulary.iter().map(|term| {
        if values.iter().any(|v| v.trim() == term) {
            1.0
        } else {
            0.0
        }
    }));
}

/// Level position, substituting `fallback` for missing or unrecognised values
#[inline]
pub fn ordinal(value: Option<&str>, levels: &[String], fallback: &str) -> f32 {
    let lookup = |v: &str| levels.iter().position(|l| l == v);
    value
        .map(str::trim)
        .and_then(lookup)
        .or_else(|| lookup(fallback))
        .unwrap_or(0) as f32
}

/// Median-impute then min-max scale. A constant column scales to 0;
/// values outside the fitted range are not clipped, but saturate at the
/// largest finite `f32`.
#[inline]
pub fn min_max(value: Option<f64>, median: f64, min: f64, max: f64) -> f32 {
    let value = value.filter(|v| v.is_finite()).unwrap_or(median);
    let span = max - min;
    if span > 0.0 {
        let limit = f64::from(f32::MAX);
        ((value - min) / span).clamp(-limit, limit) as f32
    } else {
        0.0
    }
}
