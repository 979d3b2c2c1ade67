use serde::{Deserialize, Serialize};

/// Stable catalog identifier of a wine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WineId(pub u64);

impl std::fmt::Display for WineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WineId {
    fn from(id: u64) -> Self {
        WineId(id)
    }
}

/// Read access to the wine attributes the feature encoder consumes.
///
/// Implemented by full catalog rows and by partial query profiles so both
/// go through the exact same encoding path.
pub trait WineAttributes {
    fn wine_type(&self) -> Option<&str>;
    fn grapes(&self) -> &[String];
    fn body(&self) -> Option<&str>;
    fn acidity(&self) -> Option<&str>;
    fn abv(&self) -> Option<f64>;
    fn latitude(&self) -> Option<f64>;
    fn longitude(&self) -> Option<f64>;
    fn avg_rating(&self) -> Option<f64>;
    fn rating_count(&self) -> Option<f64>;
    fn rating_std(&self) -> Option<f64>;
}

/// A cleaned catalog row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WineRecord {
    pub wine_id: WineId,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub winery: Option<String>,
    #[serde(rename = "type")]
    pub wine_type: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub acidity: Option<String>,
    #[serde(default)]
    pub abv: Option<f64>,
    #[serde(default)]
    pub grapes: Vec<String>,
    #[serde(default)]
    pub harmonize: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub avg_rating: f64,
    #[serde(default)]
    pub rating_count: u64,
    #[serde(default)]
    pub rating_std: f64,
}

impl WineRecord {
    /// Create a record with the mandatory descriptive fields; everything else empty
    #[must_use]
    pub fn new(
        wine_id: impl Into<WineId>,
        name: impl Into<String>,
        country: impl Into<String>,
        wine_type: impl Into<String>,
    ) -> Self {
        Self {
            wine_id: wine_id.into(),
            name: name.into(),
            country: country.into(),
            region: None,
            winery: None,
            wine_type: wine_type.into(),
            body: None,
            acidity: None,
            abv: None,
            grapes: Vec::new(),
            harmonize: Vec::new(),
            latitude: None,
            longitude: None,
            avg_rating: 0.0,
            rating_count: 0,
            rating_std: 0.0,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_acidity(mut self, acidity: impl Into<String>) -> Self {
        self.acidity = Some(acidity.into());
        self
    }

    #[must_use]
    pub fn with_abv(mut self, abv: f64) -> Self {
        self.abv = Some(abv);
        self
    }

    #[must_use]
    pub fn with_grapes<I, S>(mut self, grapes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grapes = grapes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_harmonize<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.harmonize = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    #[must_use]
    pub fn with_ratings(mut self, avg_rating: f64, rating_count: u64, rating_std: f64) -> Self {
        self.avg_rating = avg_rating;
        self.rating_count = rating_count;
        self.rating_std = rating_std;
        self
    }

    /// True if the wine has at least one aggregated rating
    #[inline]
    pub fn is_rated(&self) -> bool {
        self.rating_count > 0
    }
}

#[inline]
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl WineAttributes for WineRecord {
    fn wine_type(&self) -> Option<&str> {
        Some(self.wine_type.as_str())
    }

    fn grapes(&self) -> &[String] {
        &self.grapes
    }

    fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    fn acidity(&self) -> Option<&str> {
        self.acidity.as_deref()
    }

    fn abv(&self) -> Option<f64> {
        finite(self.abv)
    }

    fn latitude(&self) -> Option<f64> {
        finite(self.latitude)
    }

    fn longitude(&self) -> Option<f64> {
        finite(self.longitude)
    }

    fn avg_rating(&self) -> Option<f64> {
        finite(Some(self.avg_rating))
    }

    fn rating_count(&self) -> Option<f64> {
        Some(self.rating_count as f64)
    }

    fn rating_std(&self) -> Option<f64> {
        finite(Some(self.rating_std))
    }
}

/// A partial wine description; any attribute may be missing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WineProfile {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub wine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grapes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_std: Option<f64>,
}

impl WineProfile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, wine_type: impl Into<String>) -> Self {
        self.wine_type = Some(wine_type.into());
        self
    }

    #[must_use]
    pub fn with_grapes<I, S>(mut self, grapes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grapes = grapes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_acidity(mut self, acidity: impl Into<String>) -> Self {
        self.acidity = Some(acidity.into());
        self
    }

    #[must_use]
    pub fn with_abv(mut self, abv: f64) -> Self {
        self.abv = Some(abv);
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

impl From<&WineRecord> for WineProfile {
    fn from(record: &WineRecord) -> Self {
        Self {
            wine_type: Some(record.wine_type.clone()),
            grapes: record.grapes.clone(),
            body: record.body.clone(),
            acidity: record.acidity.clone(),
            abv: record.abv,
            region: record.region.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            avg_rating: Some(record.avg_rating),
            rating_count: Some(record.rating_count as f64),
            rating_std: Some(record.rating_std),
        }
    }
}

impl WineAttributes for WineProfile {
    fn wine_type(&self) -> Option<&str> {
        self.wine_type.as_deref()
    }

    fn grapes(&self) -> &[String] {
        &self.grapes
    }

    fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    fn acidity(&self) -> Option<&str> {
        self.acidity.as_deref()
    }

    fn abv(&self) -> Option<f64> {
        finite(self.abv)
    }

    fn latitude(&self) -> Option<f64> {
        finite(self.latitude)
    }

    fn longitude(&self) -> Option<f64> {
        finite(self.longitude)
    }

    fn avg_rating(&self) -> Option<f64> {
        finite(self.avg_rating)
    }

    fn rating_count(&self) -> Option<f64> {
        finite(self.rating_count)
    }

    fn rating_std(&self) -> Option<f64> {
        finite(self.rating_std)
    }
}

/// Split a comma separated grape list, e.g. `"Malbec, Merlot"`
pub fn parse_grapes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}
