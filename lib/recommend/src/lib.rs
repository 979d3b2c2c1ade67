//! # Sommelier Recommend
//!
//! The recommendation engine on top of the encoder and cosine index.
//!
//! Two query paths:
//! - **characteristics**: encode a partial wine description, search the
//!   index, apply the country policy (over-fetch, then fall back to the
//!   unfiltered candidates if nothing matches) and rank by similarity
//! - **food pairing**: filter the catalog's harmonize tags with hard
//!   conjunctive filters and rank by average rating
//!
//! ## Example
//!
//! ```rust
//! use sommelier_core::{Catalog, WineProfile, WineRecord};
//! use sommelier_encoder::EncoderConfig;
//! use sommelier_recommend::{QueryRequest, Recommender, RecommenderConfig};
//!
//! let catalog = Catalog::new(vec![
//!     WineRecord::new(1u64, "Reserva", "Argentina", "Red").with_grapes(["Malbec"]),
//!     WineRecord::new(2u64, "Kabinett", "Germany", "White").with_grapes(["Riesling"]),
//! ]).unwrap();
//!
//! let engine = Recommender::fit(catalog, &EncoderConfig::default(), RecommenderConfig::default()).unwrap();
//! let request = QueryRequest::new(WineProfile::new().with_type("Red").with_grapes(["Malbec"])).with_n(1);
//! let set = engine.recommend_by_characteristics(&request).unwrap();
//! assert_eq!(set.results[0].wine.name, "Reserva");
//! ```

pub mod engine;
pub mod explain;
pub mod food;
pub mod geocode;
pub mod model;

pub use engine::{
    CountryFilterOutcome, QueryRequest, Recommendation, RecommendationSet, Recommender,
    RecommenderConfig, DEFAULT_RECOMMENDATIONS,
};
pub use explain::{field_contributions, ExplainedRecommendation, RecommendationStats};
pub use food::{FoodFilters, FoodQuery};
pub use geocode::{
    resolve_with_timeout, CachedGeocoder, CatalogGeocoder, Coordinates, Geocoder, NoGeocoder,
};
pub use model::TrainedModel;
