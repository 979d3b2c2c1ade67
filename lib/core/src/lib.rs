//! # Sommelier Core
//!
//! Core library for the Sommelier wine recommender.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`WineRecord`] / [`WineProfile`] - Catalog rows and partial query descriptions
//! - [`Catalog`] - Read-only wine table addressed by row position
//! - [`FeatureVector`] - Dense encoded feature vector with cosine operations
//! - [`IndexState`] - Exhaustive cosine k-NN index behind [`NeighborSearch`]
//! - [`WineFilter`] - Hard attribute filters over catalog rows
//!
//! ## Example
//!
//! ```rust
//! use sommelier_core::{FeatureVector, IndexState, NeighborSearch};
//!
//! let matrix = vec![
//!     FeatureVector::new(vec![1.0, 0.0, 0.0]),
//!     FeatureVector::new(vec![0.0, 1.0, 0.0]),
//! ];
//! let index = IndexState::build(&matrix).unwrap();
//!
//! let hits = index.query(&FeatureVector::new(vec![1.0, 0.1, 0.0]), 10).unwrap();
//! assert_eq!(hits.len(), 2);
//! assert_eq!(hits[0].row, 0);
//! ```

pub mod catalog;
pub mod error;
pub mod filter;
pub mod index;
pub mod ratings;
pub mod vector;
pub mod wine;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use filter::{Filter, FilterCondition, WineFilter};
pub use index::{IndexState, Neighbor, NeighborSearch};
pub use ratings::{aggregate_ratings, attach_ratings, RatingEntry, RatingStats};
pub use vector::FeatureVector;
pub use wine::{parse_grapes, WineAttributes, WineId, WineProfile, WineRecord};
