//! # Sommelier Encoder
//!
//! Turns heterogeneous wine attributes into fixed-width numeric vectors.
//!
//! The encoder is driven by a declared [`FeatureSchema`]: an ordered list of
//! [`FeatureBlock`]s, each applying one strategy (one-hot, top-N multi-hot,
//! ordinal, min-max) to one field. The schema is learned once from the
//! catalog and fingerprinted, so a persisted index can be checked against
//! the encoder that produced it.
//!
//! ## Example
//!
//! ```rust
//! use sommelier_core::{WineProfile, WineRecord};
//! use sommelier_encoder::{EncoderConfig, FeatureEncoder};
//!
//! let catalog = vec![
//!     WineRecord::new(1u64, "Reserva", "Chile", "Red").with_abv(13.5),
//!     WineRecord::new(2u64, "Blanc", "France", "White").with_abv(12.0),
//! ];
//!
//! let state = FeatureEncoder::new(EncoderConfig::default()).fit(&catalog).unwrap();
//! let query = state.transform_one(&WineProfile::new().with_type("Red")).unwrap();
//! assert_eq!(query.dim(), state.width());
//! ```

pub mod columns;
pub mod encoder;
pub mod schema;

pub use encoder::{EncoderConfig, EncoderState, FeatureEncoder, DEFAULT_TOP_N_GRAPES};
pub use schema::{
    FeatureBlock, FeatureField, FeatureSchema, SchemaError, ACIDITY_FALLBACK, ACIDITY_LEVELS,
    BODY_FALLBACK, BODY_LEVELS, SCHEMA_VERSION,
};
