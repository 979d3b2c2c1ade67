use serde::{Deserialize, Serialize};
use sommelier_core::{Catalog, Error, IndexState, NeighborSearch, Result};
use sommelier_encoder::{EncoderConfig, EncoderState, FeatureEncoder};

/// A fitted encoder paired with the index built from its output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainedModel {
    encoder: EncoderState,
    index: IndexState,
}

impl TrainedModel {
    /// Pair an encoder with an index, rejecting a width mismatch
    pub fn new(encoder: EncoderState, index: IndexState) -> Result<Self> {
        if index.dim() != encoder.width() {
            return Err(Error::InvalidDimension {
                expected: encoder.width(),
                actual: index.dim(),
            });
        }
        Ok(Self { encoder, index })
    }

    /// Fit the encoder on the catalog and index every row
    pub fn fit(catalog: &Catalog, config: &EncoderConfig) -> Result<Self> {
        let encoder = FeatureEncoder::new(config.clone()).fit(catalog.records())?;
        let matrix = encoder.transform(catalog.records())?;
        let index = IndexState::build_with_dim(encoder.width(), &matrix)?;

        tracing::info!(
            rows = index.len(),
            columns = encoder.width(),
            "trained recommendation model"
        );

        Self::new(encoder, index)
    }

    pub fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    pub fn index(&self) -> &IndexState {
        &self.index
    }

    /// Number of indexed catalog rows
    pub fn rows(&self) -> usize {
        self.index.len()
    }

    pub fn into_parts(self) -> (EncoderState, IndexState) {
        (self.encoder, self.index)
    }

    /// Full consistency check, used after deserialization
    pub fn validate(&self) -> Result<()> {
        self.encoder.validate()?;
        self.index.validate()?;
        if self.index.dim() != self.encoder.width() {
            return Err(Error::InvalidDimension {
                expected: self.encoder.width(),
                actual: self.index.dim(),
            });
        }
        Ok(())
    }
}
