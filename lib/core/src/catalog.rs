use crate::{Error, Result, WineId, WineRecord};
use ahash::AHashMap;
use std::sync::Arc;

/// The read-only wine table, one row per wine.
///
/// Row order is significant: the similarity index refers to wines by row
/// position, so a catalog must be paired with the index built from it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Arc<Vec<WineRecord>>,
    by_id: AHashMap<WineId, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate wine ids
    pub fn new(records: Vec<WineRecord>) -> Result<Self> {
        let mut by_id = AHashMap::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            if by_id.insert(record.wine_id, row).is_some() {
                return Err(Error::InvalidConfig(format!(
                    "duplicate wine id {} in catalog",
                    record.wine_id
                )));
            }
        }

        tracing::debug!(rows = records.len(), "catalog loaded");

        Ok(Self {
            records: Arc::new(records),
            by_id,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get a wine by row position
    #[inline]
    pub fn get(&self, row: usize) -> Option<&WineRecord> {
        self.records.get(row)
    }

    /// Row position of a wine id
    #[inline]
    pub fn row_of(&self, id: WineId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Get a wine by its id
    pub fn get_by_id(&self, id: WineId) -> Option<&WineRecord> {
        self.row_of(id).and_then(|row| self.get(row))
    }

    #[inline]
    pub fn records(&self) -> &[WineRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &WineRecord> {
        self.records.iter()
    }

    /// Mean of `avg_rating` over rated wines, 0 if nothing is rated.
    ///
    /// Used as the neutral rating for query wines, which have no ratings.
    pub fn mean_rating(&self) -> f64 {
        let (sum, count) = self
            .records
            .iter()
            .filter(|r| r.is_rated() && r.avg_rating.is_finite())
            .fold((0.0f64, 0usize), |(sum, count), r| (sum + r.avg_rating, count + 1));

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wine(id: u64, country: &str) -> WineRecord {
        WineRecord::new(id, format!("Wine {}", id), country, "Red")
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::new(vec![wine(10, "Italy"), wine(20, "Spain")]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.row_of(WineId(20)), Some(1));
        assert_eq!(catalog.get_by_id(WineId(10)).unwrap().country, "Italy");
        assert!(catalog.get(2).is_none());
        assert!(catalog.get_by_id(WineId(30)).is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Catalog::new(vec![wine(1, "Italy"), wine(1, "Spain")]);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_mean_rating_ignores_unrated() {
        let catalog = Catalog::new(vec![
            wine(1, "Italy").with_ratings(4.0, 10, 0.5),
            wine(2, "Italy").with_ratings(3.0, 2, 0.1),
            wine(3, "Italy"),
        ])
        .unwrap();
        assert!((catalog.mean_rating() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.mean_rating(), 0.0);
    }
}
