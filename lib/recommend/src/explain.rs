//! Explainability for characteristics results
//!
//! Cosine similarity decomposes over column blocks: each block contributes
//! its partial dot product divided by the full norm product, and the
//! contributions sum to the overall similarity.

use crate::engine::{RecommendationSet, Recommender};
use serde::Serialize;
use sommelier_core::{Error, Result, WineId};
use sommelier_encoder::FeatureSchema;
use std::collections::BTreeMap;

/// A result with its per-field similarity breakdown
#[derive(Debug, Clone, Serialize)]
pub struct ExplainedRecommendation {
    pub wine_id: WineId,
    pub name: String,
    /// Overall similarity
    pub similarity: f64,
    /// Contribution of each field block; sums to `similarity`
    pub explain: BTreeMap<String, f64>,
}

/// Per-block share of the cosine similarity between two encoded vectors
pub fn field_contributions(schema: &FeatureSchema, query: &[f32], row: &[f32]) -> BTreeMap<String, f64> {
    let q_sq: f64 = query.iter().map(|v| f64::from(*v) * f64::from(*v)).sum();
    let r_sq: f64 = row.iter().map(|v| f64::from(*v) * f64::from(*v)).sum();
    let norm = (q_sq * r_sq).sqrt();

    schema
        .block_ranges()
        .into_iter()
        .map(|(field, range)| {
            let contribution = if norm == 0.0 {
                0.0
            } else {
                let dot: f64 = query[range.clone()]
                    .iter()
                    .zip(&row[range])
                    .map(|(a, b)| f64::from(*a) * f64::from(*b))
                    .sum();
                dot / norm
            };
            (field.name().to_string(), contribution)
        })
        .collect()
}

impl Recommender {
    /// Break each result's similarity down by feature block, against the
    /// query vector the set was ranked with
    pub fn explain(&self, set: &RecommendationSet) -> Result<Vec<ExplainedRecommendation>> {
        let Some(query) = &set.query else {
            return Ok(Vec::new());
        };
        let model = self.model()?;
        let schema = model.encoder().schema();

        set.results
            .iter()
            .map(|r| {
                let row = model.index().row(r.row).ok_or_else(|| {
                    Error::InvalidConfig(format!("row {} is not in the index", r.row))
                })?;
                Ok(ExplainedRecommendation {
                    wine_id: r.wine.wine_id,
                    name: r.wine.name.clone(),
                    similarity: r.similarity.unwrap_or(0.0),
                    explain: field_contributions(schema, query.as_slice(), row),
                })
            })
            .collect()
    }
}

/// Summary statistics for a characteristics query
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationStats {
    /// Neighbors fetched before filtering
    pub candidates_count: usize,
    pub results_count: usize,
    pub avg_similarity: f64,
    pub best_similarity: f64,
    /// Field that contributed most to the best result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_contributing_field: Option<String>,
}

impl RecommendationStats {
    pub fn compute(set: &RecommendationSet, explained: &[ExplainedRecommendation]) -> Self {
        let scores: Vec<f64> = set.results.iter().filter_map(|r| r.similarity).collect();
        if scores.is_empty() {
            return Self {
                candidates_count: set.candidates_considered,
                results_count: set.len(),
                avg_similarity: 0.0,
                best_similarity: 0.0,
                top_contributing_field: None,
            };
        }

        let avg_similarity = scores.iter().sum::<f64>() / scores.len() as f64;
        // Results are sorted
        let best_similarity = scores[0];

        let top_contributing_field = explained.first().and_then(|best| {
            best.explain
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(name, _)| name.clone())
        });

        Self {
            candidates_count: set.candidates_considered,
            results_count: set.len(),
            avg_similarity,
            best_similarity,
            top_contributing_field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{QueryRequest, RecommenderConfig};
    use crate::geocode::{Coordinates, Geocoder};
    use sommelier_core::{Catalog, WineProfile, WineRecord};
    use sommelier_encoder::EncoderConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Resolves only the first lookup
    struct Once {
        used: AtomicBool,
    }

    impl Geocoder for Once {
        fn geocode(&self, _region: &str) -> Option<Coordinates> {
            (!self.used.swap(true, Ordering::SeqCst)).then(|| Coordinates::new(50.0, 8.0))
        }
    }

    fn engine() -> Recommender {
        let catalog = Catalog::new(vec![
            WineRecord::new(1u64, "Malbec", "Argentina", "Red")
                .with_grapes(["Malbec"])
                .with_body("Full-bodied")
                .with_abv(14.0),
            WineRecord::new(2u64, "Riesling", "Germany", "White")
                .with_grapes(["Riesling"])
                .with_body("Light-bodied")
                .with_abv(11.0),
        ])
        .unwrap();
        Recommender::fit(catalog, &EncoderConfig::default(), RecommenderConfig::default()).unwrap()
    }

    #[test]
    fn test_contributions_sum_to_similarity() {
        let engine = engine();
        let request = QueryRequest::new(
            WineProfile::new()
                .with_type("Red")
                .with_grapes(["Malbec"])
                .with_body("Full-bodied"),
        )
        .with_n(2);
        let set = engine.recommend_by_characteristics(&request).unwrap();
        let explained = engine.explain(&set).unwrap();

        assert_eq!(explained.len(), 2);
        for e in &explained {
            let total: f64 = e.explain.values().sum();
            assert!((total - e.similarity).abs() < 1e-9);
        }
        assert_eq!(explained[0].wine_id, WineId(1));
        assert!(explained[1].explain["type"] == 0.0);

        let stats = RecommendationStats::compute(&set, &explained);
        assert_eq!(stats.results_count, 2);
        assert_eq!(stats.best_similarity, set.results[0].similarity.unwrap());
        assert!(stats.top_contributing_field.is_some());
    }

    #[test]
    fn test_explains_the_ranked_query() {
        let catalog = Catalog::new(vec![
            WineRecord::new(1u64, "Rheingau", "Germany", "White")
                .with_region("Rheingau")
                .with_coordinates(50.0, 8.0)
                .with_abv(11.5),
            WineRecord::new(2u64, "Mendoza", "Argentina", "Red")
                .with_region("Mendoza")
                .with_coordinates(-33.0, -68.8)
                .with_abv(14.0),
        ])
        .unwrap();
        let engine = Recommender::fit(catalog, &EncoderConfig::default(), RecommenderConfig::default())
            .unwrap()
            .with_geocoder(Arc::new(Once {
                used: AtomicBool::new(false),
            }));

        let request = QueryRequest::new(WineProfile::new().with_region("Somewhere")).with_n(2);
        let set = engine.recommend_by_characteristics(&request).unwrap();
        assert_ne!(engine.encode_query(&request).unwrap(), *set.query.as_ref().unwrap());

        let explained = engine.explain(&set).unwrap();
        assert_eq!(explained.len(), 2);
        for e in &explained {
            let total: f64 = e.explain.values().sum();
            assert!((total - e.similarity).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_set_explains_nothing() {
        let set = RecommendationSet::empty(crate::engine::CountryFilterOutcome::NotRequested);
        assert!(engine().explain(&set).unwrap().is_empty());
    }

    #[test]
    fn test_zero_vector_contributes_nothing() {
        let schema = engine().model().unwrap().encoder().schema().clone();
        let zeros = vec![0.0f32; schema.width()];
        let ones = vec![1.0f32; schema.width()];
        assert!(field_contributions(&schema, &zeros, &ones).values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_empty_stats() {
        let stats = RecommendationStats::compute(
            &RecommendationSet::empty(crate::engine::CountryFilterOutcome::NotRequested),
            &[],
        );
        assert_eq!(stats.results_count, 0);
        assert_eq!(stats.best_similarity, 0.0);
        assert!(stats.top_contributing_field.is_none());
    }
}
