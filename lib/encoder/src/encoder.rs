//! Feature encoder
//!
//! Fits a [`FeatureSchema`] from the catalog and turns wines into fixed-width
//! [`FeatureVector`]s. Catalog rows and query profiles go through the same
//! [`EncoderState::transform_one`] path.

use crate::columns;
use crate::schema::{
    FeatureBlock, FeatureField, FeatureSchema, ACIDITY_FALLBACK, ACIDITY_LEVELS, BODY_FALLBACK,
    BODY_LEVELS,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sommelier_core::{Error, FeatureVector, Result, WineAttributes};

/// Default number of grape columns
pub const DEFAULT_TOP_N_GRAPES: usize = 60;

/// Encoder hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Number of most frequent grapes kept as binary columns
    pub top_n_grapes: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            top_n_grapes: DEFAULT_TOP_N_GRAPES,
        }
    }
}

impl EncoderConfig {
    pub fn with_top_n_grapes(mut self, n: usize) -> Self {
        self.top_n_grapes = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n_grapes == 0 {
            return Err(Error::InvalidConfig(
                "top_n_grapes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Learns encoder state from a catalog
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    config: EncoderConfig,
}

impl FeatureEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Fit the schema on the full catalog.
    ///
    /// Blocks, in column order:
    /// - wine type one-hot, categories sorted
    /// - top-N grapes multi-hot, by frequency then name
    /// - body and acidity ordinals with fixed level orders
    /// - abv, latitude, longitude, avg_rating, rating_count, rating_std:
    ///   median-imputed and min-max scaled
    ///
    /// An empty catalog fits an all-zero schema with no type or grape columns.
    pub fn fit<A: WineAttributes>(&self, catalog: &[A]) -> Result<EncoderState> {
        self.config.validate()?;

        let mut blocks = Vec::with_capacity(4 + FeatureField::NUMERIC.len());

        blocks.push(FeatureBlock::OneHot {
            field: FeatureField::Type,
            categories: columns::sorted_categories(catalog.iter().filter_map(|w| w.wine_type())),
        });

        blocks.push(FeatureBlock::TopN {
            field: FeatureField::Grapes,
            vocabulary: columns::top_n_by_frequency(
                catalog.iter().map(|w| w.grapes()),
                self.config.top_n_grapes,
            ),
        });

        blocks.push(FeatureBlock::Ordinal {
            field: FeatureField::Body,
            levels: BODY_LEVELS.iter().map(|s| s.to_string()).collect(),
            fallback: BODY_FALLBACK.to_string(),
        });
        blocks.push(FeatureBlock::Ordinal {
            field: FeatureField::Acidity,
            levels: ACIDITY_LEVELS.iter().map(|s| s.to_string()).collect(),
            fallback: ACIDITY_FALLBACK.to_string(),
        });

        for field in FeatureField::NUMERIC {
            let values: Vec<f64> = catalog.iter().filter_map(|w| field.numeric(w)).collect();
            let median = columns::median(&values).unwrap_or(0.0);
            let (min, max) = columns::imputed_range(&values, median);
            if min == max {
                tracing::debug!(field = field.name(), "constant numeric column scales to zero");
            }
            blocks.push(FeatureBlock::MinMax {
                field,
                median,
                min,
                max,
            });
        }

        let state = EncoderState::from_schema(FeatureSchema::new(blocks), catalog.len())?;

        tracing::info!(
            rows = catalog.len(),
            width = state.width(),
            fingerprint = %state.fingerprint(),
            "fitted feature encoder"
        );

        Ok(state)
    }
}

/// Fitted encoder: the schema plus its fingerprint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderState {
    schema: FeatureSchema,
    fingerprint: String,
    fitted_rows: usize,
}

impl EncoderState {
    /// Wrap a schema, validating it and fixing its fingerprint
    pub fn from_schema(schema: FeatureSchema, fitted_rows: usize) -> Result<Self> {
        schema
            .validate()
            .map_err(|e| Error::Encoding(e.to_string()))?;
        let fingerprint = schema.fingerprint();
        Ok(Self {
            schema,
            fingerprint,
            fitted_rows,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Ordered column names
    pub fn column_names(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn width(&self) -> usize {
        self.schema.width()
    }

    /// Schema fingerprint recorded at fit time
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of catalog rows the encoder was fitted on
    pub fn fitted_rows(&self) -> usize {
        self.fitted_rows
    }

    /// Check that the schema is consistent and still matches its fingerprint
    pub fn validate(&self) -> Result<()> {
        self.schema
            .validate()
            .map_err(|e| Error::Encoding(e.to_string()))?;
        let actual = self.schema.fingerprint();
        if actual != self.fingerprint {
            return Err(Error::Encoding(
                crate::SchemaError::FingerprintMismatch {
                    expected: self.fingerprint.clone(),
                    actual,
                }
                .to_string(),
            ));
        }
        Ok(())
    }

    /// Encode one wine or query profile.
    ///
    /// Missing categoricals encode as zeros, missing ordinals use their
    /// fallback level and missing numerics use the fitted median.
    pub fn transform_one<A: WineAttributes + ?Sized>(&self, wine: &A) -> Result<FeatureVector> {
        let vector = self.encode(wine);
        if vector.dim() != self.width() {
            return Err(Error::Encoding(format!(
                "encoded {} columns, schema declares {}",
                vector.dim(),
                self.width()
            )));
        }
        Ok(vector)
    }

    /// Encode many wines in parallel, preserving input order
    pub fn transform<A: WineAttributes + Sync>(&self, wines: &[A]) -> Result<Vec<FeatureVector>> {
        wines.par_iter().map(|w| self.transform_one(w)).collect()
    }

    fn encode<A: WineAttributes + ?Sized>(&self, wine: &A) -> FeatureVector {
        let mut out = Vec::with_capacity(self.width());
        for block in self.schema.blocks() {
            match block {
                FeatureBlock::OneHot { field, categories } => {
                    columns::one_hot(field.categorical(wine), categories, &mut out);
                }
                FeatureBlock::TopN { field, vocabulary } => {
                    columns::multi_hot(field.multi(wine), vocabulary, &mut out);
                }
                FeatureBlock::Ordinal {
                    field,
                    levels,
                    fallback,
                } => {
                    out.push(columns::ordinal(field.categorical(wine), levels, fallback));
                }
                FeatureBlock::MinMax {
                    field,
                    median,
                    min,
                    max,
                } => {
                    out.push(columns::min_max(field.numeric(wine), *median, *min, *max));
                }
            }
        }
        FeatureVector::new(out)
    }
}
