//! Feature schema definitions
//!
//! The schema is the declared, ordered list of feature blocks learned at fit
//! time. Column order is stored, never re-derived: the same schema must be
//! used to encode the catalog and every query, otherwise cosine distances
//! silently lose their meaning.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sommelier_core::WineAttributes;

/// Current schema layout version
pub const SCHEMA_VERSION: u32 = 1;

/// Ordered body levels, lightest first
pub const BODY_LEVELS: [&str; 5] = [
    "Very light-bodied",
    "Light-bodied",
    "Medium-bodied",
    "Full-bodied",
    "Very full-bodied",
];

/// Ordered acidity levels
pub const ACIDITY_LEVELS: [&str; 3] = ["Low", "Medium", "High"];

/// Substitute for a missing or unrecognised body
pub const BODY_FALLBACK: &str = "Medium-bodied";

/// Substitute for a missing or unrecognised acidity
pub const ACIDITY_FALLBACK: &str = "Medium";

/// A wine attribute the encoder reads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeatureField {
    Type,
    Grapes,
    Body,
    Acidity,
    Abv,
    Latitude,
    Longitude,
    AvgRating,
    RatingCount,
    RatingStd,
}

impl FeatureField {
    /// Numeric fields in column order
    pub const NUMERIC: [FeatureField; 6] = [
        FeatureField::Abv,
        FeatureField::Latitude,
        FeatureField::Longitude,
        FeatureField::AvgRating,
        FeatureField::RatingCount,
        FeatureField::RatingStd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureField::Type => "type",
            FeatureField::Grapes => "grape",
            FeatureField::Body => "body",
            FeatureField::Acidity => "acidity",
            FeatureField::Abv => "abv",
            FeatureField::Latitude => "latitude",
            FeatureField::Longitude => "longitude",
            FeatureField::AvgRating => "avg_rating",
            FeatureField::RatingCount => "rating_count",
            FeatureField::RatingStd => "rating_std",
        }
    }

    /// Single-valued categorical attribute, `None` for other field kinds
    pub fn categorical<'a, A: WineAttributes + ?Sized>(&self, wine: &'a A) -> Option<&'a str> {
        match self {
            FeatureField::Type => wine.wine_type(),
            FeatureField::Body => wine.body(),
            FeatureField::Acidity => wine.acidity(),
            _ => None,
        }
    }

    /// Multi-valued categorical attribute, empty for other field kinds
    pub fn multi<'a, A: WineAttributes + ?Sized>(&self, wine: &'a A) -> &'a [String] {
        match self {
            FeatureField::Grapes => wine.grapes(),
            _ => &[],
        }
    }

    /// Numeric attribute, `None` when missing or for other field kinds
    pub fn numeric<A: WineAttributes + ?Sized>(&self, wine: &A) -> Option<f64> {
        match self {
            FeatureField::Abv => wine.abv(),
            FeatureField::Latitude => wine.latitude(),
            FeatureField::Longitude => wine.longitude(),
            FeatureField::AvgRating => wine.avg_rating(),
            FeatureField::RatingCount => wine.rating_count(),
            FeatureField::RatingStd => wine.rating_std(),
            _ => None,
        }
    }
}

/// One encoding strategy applied to one field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FeatureBlock {
    /// One column per category; unknown values encode as all zeros
    OneHot {
        field: FeatureField,
        categories: Vec<String>,
    },
    /// One binary column per retained value; values outside the vocabulary are dropped
    TopN {
        field: FeatureField,
        vocabulary: Vec<String>,
    },
    /// Single column holding the level position; unknown values use the fallback
    Ordinal {
        field: FeatureField,
        levels: Vec<String>,
        fallback: String,
    },
    /// Single column, median-imputed then min-max scaled
    MinMax {
        field: FeatureField,
        median: f64,
        min: f64,
        max: f64,
    },
}

impl FeatureBlock {
    pub fn field(&self) -> FeatureField {
        match self {
            FeatureBlock::OneHot { field, .. }
            | FeatureBlock::TopN { field, .. }
            | FeatureBlock::Ordinal { field, .. }
            | FeatureBlock::MinMax { field, .. } => *field,
        }
    }

    /// Number of columns this block contributes
    pub fn width(&self) -> usize {
        match self {
            FeatureBlock::OneHot { categories, .. } => categories.len(),
            FeatureBlock::TopN { vocabulary, .. } => vocabulary.len(),
            FeatureBlock::Ordinal { .. } | FeatureBlock::MinMax { .. } => 1,
        }
    }

    /// Column names in output order
    pub fn column_names(&self) -> Vec<String> {
        let prefix = self.field().name();
        match self {
            FeatureBlock::OneHot { categories, .. } => {
                categories.iter().map(|c| format!("{}_{}", prefix, c)).collect()
            }
            FeatureBlock::TopN { vocabulary, .. } => {
                vocabulary.iter().map(|v| format!("{}_{}", prefix, v)).collect()
            }
            FeatureBlock::Ordinal { .. } | FeatureBlock::MinMax { .. } => vec![prefix.to_string()],
        }
    }
}

/// Ordered, versioned feature layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSchema {
    /// Schema version for future compatibility
    pub version: u32,
    blocks: Vec<FeatureBlock>,
    /// Column names as fixed at fit time
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema, fixing the column list from the blocks
    pub fn new(blocks: Vec<FeatureBlock>) -> Self {
        let columns = blocks.iter().flat_map(FeatureBlock::column_names).collect();
        Self {
            version: SCHEMA_VERSION,
            blocks,
            columns,
        }
    }

    pub fn blocks(&self) -> &[FeatureBlock] {
        &self.blocks
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Total vector width
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column range of each block, in order
    pub fn block_ranges(&self) -> Vec<(FeatureField, std::ops::Range<usize>)> {
        let mut start = 0;
        self.blocks
            .iter()
            .map(|block| {
                let range = start..start + block.width();
                start = range.end;
                (block.field(), range)
            })
            .collect()
    }

    /// SHA-256 over the version and ordered column names
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Check that the stored columns agree with the blocks and parameters are usable
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion(self.version));
        }
        if self.blocks.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        let derived: Vec<String> = self.blocks.iter().flat_map(FeatureBlock::column_names).collect();
        if derived != self.columns {
            return Err(SchemaError::ColumnMismatch {
                declared: self.columns.len(),
                derived: derived.len(),
            });
        }

        for block in &self.blocks {
            match block {
                FeatureBlock::Ordinal { field, levels, fallback } => {
                    if !levels.iter().any(|l| l == fallback) {
                        return Err(SchemaError::InvalidFallback(field.name().to_string()));
                    }
                }
                FeatureBlock::MinMax { field, median, min, max } => {
                    if !(median.is_finite() && min.is_finite() && max.is_finite()) || min > max {
                        return Err(SchemaError::InvalidScaler(field.name().to_string()));
                    }
                }
                FeatureBlock::OneHot { .. } | FeatureBlock::TopN { .. } => {}
            }
        }

        Ok(())
    }
}

/// Errors that can occur during schema validation
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SchemaError {
    #[error("Schema cannot be empty")]
    EmptySchema,

    #[error("Unsupported schema version {0}")]
    UnsupportedVersion(u32),

    #[error("Declared columns ({declared}) do not match block layout ({derived})")]
    ColumnMismatch { declared: usize, derived: usize },

    #[error("Ordinal field '{0}' has a fallback outside its levels")]
    InvalidFallback(String),

    #[error("Numeric field '{0}' has invalid scaler parameters")]
    InvalidScaler(String),

    #[error("Fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },
}
