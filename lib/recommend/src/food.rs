//! Food-pairing recommendation
//!
//! A reverse lookup over the catalog's harmonize tags. Unlike the
//! characteristics path there is no index involved and no fallback: every
//! filter is a hard conjunction and an empty match is returned as empty.

use crate::engine::{Recommendation, Recommender, DEFAULT_RECOMMENDATIONS};
use serde::{Deserialize, Serialize};
use sommelier_core::{parse_grapes, Filter, FilterCondition, Result, WineFilter};

/// Optional characteristic filters for a food query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FoodFilters {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub wine_type: Option<String>,
    /// Matches wines containing any of these grapes; entries may be comma separated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grapes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FoodFilters {
    /// Filter conditions for every supplied, non-blank field
    pub fn conditions(&self) -> Vec<FilterCondition> {
        let mut conditions = Vec::new();
        if let Some(v) = present(&self.wine_type) {
            conditions.push(FilterCondition::TypeIs(v));
        }
        let grapes: Vec<String> = self.grapes.iter().flat_map(|g| parse_grapes(g)).collect();
        if !grapes.is_empty() {
            conditions.push(FilterCondition::HasAnyGrape(grapes));
        }
        if let Some(v) = present(&self.body) {
            conditions.push(FilterCondition::BodyIs(v));
        }
        if let Some(v) = present(&self.acidity) {
            conditions.push(FilterCondition::AcidityIs(v));
        }
        if let Some(v) = present(&self.country) {
            conditions.push(FilterCondition::CountryIs(v));
        }
        if let Some(v) = present(&self.region) {
            conditions.push(FilterCondition::RegionIs(v));
        }
        conditions
    }
}

/// A "wines for this dish" request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodQuery {
    pub food: String,
    #[serde(flatten)]
    pub filters: FoodFilters,
    /// Only match whole harmonize tags, not substrings
    #[serde(default)]
    pub exact_match_only: bool,
    #[serde(default = "default_recommendations")]
    pub n_recommendations: usize,
}

fn default_recommendations() -> usize {
    DEFAULT_RECOMMENDATIONS
}

impl FoodQuery {
    pub fn new(food: impl Into<String>) -> Self {
        Self {
            food: food.into(),
            filters: FoodFilters::default(),
            exact_match_only: false,
            n_recommendations: DEFAULT_RECOMMENDATIONS,
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FoodFilters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn exact(mut self, exact_match_only: bool) -> Self {
        self.exact_match_only = exact_match_only;
        self
    }

    #[must_use]
    pub fn with_n(mut self, n: usize) -> Self {
        self.n_recommendations = n;
        self
    }

    /// Trimmed, lowercased food term; `None` if blank
    pub fn normalized_food(&self) -> Option<String> {
        let food = self.food.trim().to_lowercase();
        (!food.is_empty()).then_some(food)
    }

    /// The full filter: food match AND every characteristic filter
    pub fn filter(&self) -> Option<WineFilter> {
        let food = self.normalized_food()?;
        let food_condition = if self.exact_match_only {
            FilterCondition::PairsWith(food)
        } else {
            FilterCondition::PairsWithLoose(food)
        };

        let mut conditions = vec![food_condition];
        conditions.extend(self.filters.conditions());
        Some(WineFilter::all(conditions))
    }
}

impl Recommender {
    /// Wines that pair with a food, best rated first.
    ///
    /// Results carry no similarity score. A blank food matches nothing.
    pub fn recommend_by_food(&self, query: &FoodQuery) -> Result<Vec<Recommendation>> {
        let catalog = self.catalog()?;

        let Some(filter) = query.filter() else {
            tracing::debug!("blank food term, nothing to match");
            return Ok(Vec::new());
        };
        if query.n_recommendations == 0 {
            return Ok(Vec::new());
        }

        let mut matches: Vec<(usize, f64)> = catalog
            .iter()
            .enumerate()
            .filter(|(_, wine)| filter.matches(wine))
            .map(|(row, wine)| (row, wine.avg_rating))
            .collect();

        if matches.is_empty() {
            tracing::debug!(food = %query.food, "no wines match food query");
            return Ok(Vec::new());
        }

        // stable: equal ratings keep catalog order
        matches.sort_by(|a, b| b.1.total_cmp(&a.1));
        matches.truncate(query.n_recommendations);

        Ok(matches
            .into_iter()
            .filter_map(|(row, _)| {
                catalog.get(row).map(|wine| Recommendation {
                    wine: wine.clone(),
                    similarity: None,
                    row,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecommenderConfig;
    use sommelier_core::{Catalog, Error, WineRecord};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            WineRecord::new(1u64, "Grill Red", "Argentina", "Red")
                .with_grapes(["Malbec"])
                .with_harmonize(["Grilled Meat", "Beef"])
                .with_ratings(3.9, 12, 0.4),
            WineRecord::new(2u64, "Meat Red", "France", "Red")
                .with_grapes(["Merlot"])
                .with_harmonize(["Meat"])
                .with_ratings(3.5, 8, 0.3),
            WineRecord::new(3u64, "Fish White", "Portugal", "White")
                .with_grapes(["Alvarinho"])
                .with_harmonize(["Shellfish", "Lean Fish"])
                .with_ratings(4.4, 20, 0.2),
            WineRecord::new(4u64, "Beef Red", "Argentina", "Red")
                .with_grapes(["Malbec", "Bonarda"])
                .with_body("Full-bodied")
                .with_harmonize(["beef"])
                .with_ratings(4.1, 30, 0.5),
        ])
        .unwrap()
    }

    fn engine() -> Recommender {
        Recommender::new(Some(catalog()), None, RecommenderConfig::default()).unwrap()
    }

    fn ids(results: &[Recommendation]) -> Vec<u64> {
        results.iter().map(|r| r.wine.wine_id.0).collect()
    }

    #[test]
    fn test_exact_vs_loose() {
        let engine = engine();

        let exact = engine.recommend_by_food(&FoodQuery::new("Meat").exact(true)).unwrap();
        assert_eq!(ids(&exact), vec![2]);

        let loose = engine.recommend_by_food(&FoodQuery::new("Meat")).unwrap();
        assert_eq!(ids(&loose), vec![1, 2]);
    }

    #[test]
    fn test_sorted_by_rating() {
        let results = engine().recommend_by_food(&FoodQuery::new("  BEEF ")).unwrap();
        assert_eq!(ids(&results), vec![4, 1]);
        assert!(results.iter().all(|r| r.similarity.is_none()));
    }

    #[test]
    fn test_filters_are_conjunctive_without_fallback() {
        let engine = engine();
        let filters = FoodFilters {
            country: Some("Argentina".into()),
            body: Some("Full-bodied".into()),
            ..Default::default()
        };
        let results = engine
            .recommend_by_food(&FoodQuery::new("beef").with_filters(filters))
            .unwrap();
        assert_eq!(ids(&results), vec![4]);

        let filters = FoodFilters {
            wine_type: Some("White".into()),
            ..Default::default()
        };
        let results = engine
            .recommend_by_food(&FoodQuery::new("beef").with_filters(filters))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_grape_filter_matches_any() {
        let filters = FoodFilters {
            grapes: vec!["Bonarda".into(), "Syrah".into()],
            ..Default::default()
        };
        let results = engine()
            .recommend_by_food(&FoodQuery::new("beef").with_filters(filters))
            .unwrap();
        assert_eq!(ids(&results), vec![4]);
    }

    #[test]
    fn test_comma_separated_grapes() {
        let filters = FoodFilters {
            grapes: vec!["Syrah, Merlot".into(), " ,Malbec".into()],
            ..Default::default()
        };
        assert_eq!(
            filters.conditions(),
            vec![FilterCondition::HasAnyGrape(vec![
                "Syrah".into(),
                "Merlot".into(),
                "Malbec".into()
            ])]
        );

        let results = engine()
            .recommend_by_food(&FoodQuery::new("meat").with_filters(filters))
            .unwrap();
        assert_eq!(ids(&results), vec![1, 2]);
    }

    #[test]
    fn test_blank_food_and_limits() {
        let engine = engine();
        assert!(engine.recommend_by_food(&FoodQuery::new("   ")).unwrap().is_empty());
        assert!(engine.recommend_by_food(&FoodQuery::new("fish").with_n(0)).unwrap().is_empty());
        assert_eq!(engine.recommend_by_food(&FoodQuery::new("e").with_n(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_requires_catalog() {
        let engine = Recommender::new(None, None, RecommenderConfig::default()).unwrap();
        assert!(matches!(
            engine.recommend_by_food(&FoodQuery::new("beef")),
            Err(Error::CatalogNotLoaded)
        ));
    }
}
