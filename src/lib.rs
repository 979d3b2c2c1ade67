//! # Sommelier
//!
//! A content-based wine recommendation engine.
//!
//! Sommelier turns heterogeneous, partially missing wine attributes into a
//! fixed-width feature space, indexes the catalog for cosine nearest-neighbor
//! search and answers two kinds of query: "wines like this description" and
//! "wines for this dish".
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! sommelier fit --catalog wines.jsonl --ratings ratings.jsonl --data-dir ./data
//! sommelier recommend --catalog wines.jsonl --data-dir ./data --type Red --grape Malbec -n 5
//! sommelier food --catalog wines.jsonl --food beef --country Argentina
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use sommelier::prelude::*;
//!
//! let catalog = Catalog::new(vec![
//!     WineRecord::new(1u64, "Malbec Reserva", "Argentina", "Red")
//!         .with_grapes(["Malbec"])
//!         .with_body("Full-bodied")
//!         .with_harmonize(["Beef"]),
//!     WineRecord::new(2u64, "Riesling Kabinett", "Germany", "White")
//!         .with_grapes(["Riesling"])
//!         .with_body("Light-bodied")
//!         .with_harmonize(["Shellfish"]),
//! ]).unwrap();
//!
//! let engine = Recommender::fit(catalog, &EncoderConfig::default(), RecommenderConfig::default()).unwrap();
//!
//! let request = QueryRequest::new(WineProfile::new().with_type("Red").with_grapes(["Malbec"])).with_n(1);
//! let similar = engine.recommend_by_characteristics(&request).unwrap();
//! assert_eq!(similar.results[0].wine.name, "Malbec Reserva");
//!
//! let pairings = engine.recommend_by_food(&FoodQuery::new("shellfish")).unwrap();
//! assert_eq!(pairings[0].wine.name, "Riesling Kabinett");
//! ```
//!
//! ## Crate Structure
//!
//! - `sommelier-core` - Wine records, catalog, feature vectors, cosine index, filters
//! - `sommelier-encoder` - Declared feature schema and encoder
//! - `sommelier-recommend` - Characteristics and food-pairing engines, geocoding
//! - `sommelier-storage` - Model artifacts, catalog files, live model store

pub mod settings;

// Re-export core types
pub use sommelier_core::{
    Catalog, Error, FeatureVector, Filter, FilterCondition, IndexState, Neighbor, NeighborSearch,
    RatingEntry, Result, WineFilter, WineId, WineProfile, WineRecord,
};

// Re-export encoder
pub use sommelier_encoder::{EncoderConfig, EncoderState, FeatureEncoder, FeatureSchema};

// Re-export engine
pub use sommelier_recommend::{
    CountryFilterOutcome, FoodFilters, FoodQuery, QueryRequest, Recommendation,
    RecommendationSet, Recommender, RecommenderConfig, TrainedModel,
};

// Re-export storage
pub use sommelier_storage::ModelStore;

pub use settings::Settings;

/// Commonly used types
pub mod prelude {
    pub use sommelier_core::{
        Catalog, Error, FeatureVector, NeighborSearch, Result, WineId, WineProfile, WineRecord,
    };
    pub use sommelier_encoder::{EncoderConfig, FeatureEncoder};
    pub use sommelier_recommend::{
        CountryFilterOutcome, FoodFilters, FoodQuery, QueryRequest, Recommender,
        RecommenderConfig,
    };
    pub use sommelier_storage::ModelStore;
}
