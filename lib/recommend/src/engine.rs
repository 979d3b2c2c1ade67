//! Characteristics-based recommendation
//!
//! A [`Recommender`] owns an immutable catalog and trained model. Queries are
//! encoded with the fitted encoder, answered by the cosine index, then passed
//! through the country filter policy and ranked by similarity.

use crate::geocode::{resolve_with_timeout, Coordinates, Geocoder};
use crate::model::TrainedModel;
use serde::{Deserialize, Serialize};
use sommelier_core::{
    Catalog, Error, FeatureVector, Neighbor, NeighborSearch, Result, WineProfile, WineRecord,
};
use sommelier_encoder::EncoderConfig;
use std::sync::Arc;
use std::time::Duration;

/// Default number of results per query
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

/// Recommendation policy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Neighbors fetched per requested result when a country filter is set
    pub over_fetch_factor: usize,
    /// Lower bound on neighbors fetched when a country filter is set
    pub min_over_fetch: usize,
    /// Upper bound on a single geocoding call
    pub geocode_timeout_ms: u64,
    /// Coordinates used when a query region cannot be resolved
    pub default_coordinates: Coordinates,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            over_fetch_factor: 3,
            min_over_fetch: 20,
            geocode_timeout_ms: 2000,
            default_coordinates: Coordinates::ORIGIN,
        }
    }
}

impl RecommenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.over_fetch_factor == 0 {
            return Err(Error::InvalidConfig(
                "over_fetch_factor must be at least 1".to_string(),
            ));
        }
        let Coordinates {
            latitude,
            longitude,
        } = self.default_coordinates;
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(Error::InvalidConfig(
                "default_coordinates must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }

    /// Number of neighbors to fetch for `n` results
    pub fn fetch_size(&self, n: usize, country_filtered: bool) -> usize {
        if country_filtered {
            n.saturating_mul(self.over_fetch_factor).max(self.min_over_fetch)
        } else {
            n
        }
    }
}

/// A "wines like this" request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    /// Desired characteristics; anything may be missing
    #[serde(flatten)]
    pub profile: WineProfile,
    /// Preferred country, applied after the neighbor search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default = "default_recommendations")]
    pub n_recommendations: usize,
}

fn default_recommendations() -> usize {
    DEFAULT_RECOMMENDATIONS
}

impl QueryRequest {
    pub fn new(profile: WineProfile) -> Self {
        Self {
            profile,
            country: None,
            n_recommendations: DEFAULT_RECOMMENDATIONS,
        }
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    #[must_use]
    pub fn with_n(mut self, n: usize) -> Self {
        self.n_recommendations = n;
        self
    }

    /// The country filter, ignoring blank values
    pub fn country_filter(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// How the country filter was applied to a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryFilterOutcome {
    /// No country was requested
    NotRequested,
    /// Results are restricted to the requested country
    Honored,
    /// No candidate matched, so results ignore the country
    FellBack,
}

/// A recommended wine
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub wine: WineRecord,
    /// `1 - cosine distance`; `None` for food-pairing results
    pub similarity: Option<f64>,
    /// Catalog row of the wine
    #[serde(skip)]
    pub row: usize,
}

impl Recommendation {
    pub(crate) fn from_neighbor(catalog: &Catalog, neighbor: Neighbor) -> Option<Self> {
        catalog.get(neighbor.row).map(|wine| Self {
            wine: wine.clone(),
            similarity: Some(neighbor.similarity()),
            row: neighbor.row,
        })
    }
}

/// Ordered results of a characteristics query
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSet {
    pub results: Vec<Recommendation>,
    pub country_filter: CountryFilterOutcome,
    /// Neighbors fetched from the index before filtering
    pub candidates_considered: usize,
    /// Encoded query the results were ranked against
    #[serde(skip)]
    pub query: Option<FeatureVector>,
}

impl RecommendationSet {
    pub fn empty(country_filter: CountryFilterOutcome) -> Self {
        Self {
            results: Vec::new(),
            country_filter,
            candidates_considered: 0,
            query: None,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Recommended wines, best first
    pub fn wines(&self) -> impl Iterator<Item = &WineRecord> {
        self.results.iter().map(|r| &r.wine)
    }
}

/// Immutable recommendation engine; share it as `Arc<Recommender>`
pub struct Recommender {
    catalog: Option<Catalog>,
    model: Option<TrainedModel>,
    geocoder: Option<Arc<dyn Geocoder>>,
    config: RecommenderConfig,
    mean_rating: f64,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("catalog_rows", &self.catalog.as_ref().map(Catalog::len))
            .field("model_rows", &self.model.as_ref().map(TrainedModel::rows))
            .field("geocoder", &self.geocoder.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Recommender {
    /// Assemble a recommender. When both are present, the model must index
    /// exactly the catalog's rows.
    pub fn new(
        catalog: Option<Catalog>,
        model: Option<TrainedModel>,
        config: RecommenderConfig,
    ) -> Result<Self> {
        config.validate()?;

        if let (Some(catalog), Some(model)) = (&catalog, &model) {
            if catalog.len() != model.rows() {
                return Err(Error::InvalidConfig(format!(
                    "catalog has {} rows but the index was built from {}",
                    catalog.len(),
                    model.rows()
                )));
            }
        }

        let mean_rating = catalog.as_ref().map(Catalog::mean_rating).unwrap_or(0.0);

        Ok(Self {
            catalog,
            model,
            geocoder: None,
            config,
            mean_rating,
        })
    }

    /// Fit a fresh model over `catalog`
    pub fn fit(
        catalog: Catalog,
        encoder_config: &EncoderConfig,
        config: RecommenderConfig,
    ) -> Result<Self> {
        let model = TrainedModel::fit(&catalog, encoder_config)?;
        Self::new(Some(catalog), Some(model), config)
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn catalog(&self) -> Result<&Catalog> {
        self.catalog.as_ref().ok_or(Error::CatalogNotLoaded)
    }

    pub fn model(&self) -> Result<&TrainedModel> {
        self.model.as_ref().ok_or(Error::ModelNotLoaded)
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Neutral rating given to query wines
    pub fn mean_rating(&self) -> f64 {
        self.mean_rating
    }

    /// Resolve a region through the geocoder, bounded by the configured timeout
    pub fn resolve_region(&self, region: &str) -> Option<Coordinates> {
        let geocoder = self.geocoder.as_ref()?;
        resolve_with_timeout(geocoder, region, self.config.geocode_timeout())
    }

    /// The profile actually encoded for a request.
    ///
    /// Query wines have no ratings of their own: they are given the catalog
    /// mean rating with zero count and spread. A named region is geocoded
    /// unless the request already carries coordinates; an unresolved region
    /// gets the default coordinates.
    pub fn query_profile(&self, request: &QueryRequest) -> WineProfile {
        let mut profile = request.profile.clone();

        let has_coordinates = profile.latitude.is_some_and(f64::is_finite)
            && profile.longitude.is_some_and(f64::is_finite);
        if !has_coordinates {
            if let Some(region) = profile.region.as_deref().filter(|r| !r.trim().is_empty()) {
                let coordinates = self.resolve_region(region).unwrap_or_else(|| {
                    tracing::debug!(region, "region not resolved, using default coordinates");
                    self.config.default_coordinates
                });
                profile.latitude = Some(coordinates.latitude);
                profile.longitude = Some(coordinates.longitude);
            }
        }

        profile.avg_rating = Some(self.mean_rating);
        profile.rating_count = Some(0.0);
        profile.rating_std = Some(0.0);
        profile
    }

    /// Encode a request with the fitted encoder
    pub fn encode_query(&self, request: &QueryRequest) -> Result<FeatureVector> {
        let model = self.model()?;
        model.encoder().transform_one(&self.query_profile(request))
    }

    /// Wines most similar to the requested characteristics, best first.
    ///
    /// With a country filter the index is over-fetched so filtering does not
    /// starve the result; if no candidate matches the country, the unfiltered
    /// candidates are returned and the outcome says so.
    pub fn recommend_by_characteristics(&self, request: &QueryRequest) -> Result<RecommendationSet> {
        let model = self.model()?;
        let catalog = self.catalog()?;

        let n = request.n_recommendations;
        if n == 0 {
            return Ok(RecommendationSet::empty(CountryFilterOutcome::NotRequested));
        }

        let country = request.country_filter();
        let query = self.encode_query(request)?;
        let k = self.config.fetch_size(n, country.is_some());
        let neighbors = model.index().query(&query, k)?;
        let candidates_considered = neighbors.len();

        let (selected, country_filter) = match country {
            None => (neighbors, CountryFilterOutcome::NotRequested),
            Some(country) => {
                let matching: Vec<Neighbor> = neighbors
                    .iter()
                    .copied()
                    .filter(|n| catalog.get(n.row).is_some_and(|w| w.country == country))
                    .collect();
                if matching.is_empty() {
                    tracing::warn!(
                        country,
                        candidates = candidates_considered,
                        "no candidates match country filter, returning unfiltered results"
                    );
                    (neighbors, CountryFilterOutcome::FellBack)
                } else {
                    (matching, CountryFilterOutcome::Honored)
                }
            }
        };

        let mut results: Vec<Recommendation> = selected
            .into_iter()
            .filter_map(|n| Recommendation::from_neighbor(catalog, n))
            .collect();
        results.sort_by(|a, b| {
            let a = a.similarity.unwrap_or(f64::NEG_INFINITY);
            let b = b.similarity.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        });
        results.truncate(n);

        tracing::debug!(
            k,
            returned = results.len(),
            outcome = ?country_filter,
            "characteristics query answered"
        );

        Ok(RecommendationSet {
            results,
            country_filter,
            candidates_considered,
            query: Some(query),
        })
    }
}
