// Hard attribute filters over catalog rows
use crate::WineRecord;

pub trait Filter {
    fn matches(&self, wine: &WineRecord) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    TypeIs(String),
    BodyIs(String),
    AcidityIs(String),
    CountryIs(String),
    RegionIs(String),
    /// Wine contains at least one of the listed grapes
    HasAnyGrape(Vec<String>),
    /// Food term equals a harmonize tag (case-insensitive)
    PairsWith(String),
    /// Food term equals or is a substring of a harmonize tag (case-insensitive)
    PairsWithLoose(String),
}

/// Conjunction of conditions; an empty filter matches everything
pub struct WineFilter {
    conditions: Vec<FilterCondition>,
}

impl WineFilter {
    pub fn new(condition: FilterCondition) -> Self {
        Self::all(vec![condition])
    }

    pub fn all(conditions: Vec<FilterCondition>) -> Self {
        Self { conditions }
    }

    fn matches_condition(condition: &FilterCondition, wine: &WineRecord) -> bool {
        match condition {
            FilterCondition::TypeIs(value) => wine.wine_type == *value,
            FilterCondition::BodyIs(value) => wine.body.as_deref() == Some(value.as_str()),
            FilterCondition::AcidityIs(value) => wine.acidity.as_deref() == Some(value.as_str()),
            FilterCondition::CountryIs(value) => wine.country == *value,
            FilterCondition::RegionIs(value) => wine.region.as_deref() == Some(value.as_str()),
            FilterCondition::HasAnyGrape(grapes) => {
                grapes.iter().any(|g| wine.grapes.iter().any(|w| w == g))
            }
            FilterCondition::PairsWith(food) => {
                let food = food.to_lowercase();
                wine.harmonize.iter().any(|tag| tag.to_lowercase() == food)
            }
            FilterCondition::PairsWithLoose(food) => {
                let food = food.to_lowercase();
                wine.harmonize.iter().any(|tag| tag.to_lowercase().contains(&food))
            }
        }
    }
}

impl Filter for WineFilter {
    fn matches(&self, wine: &WineRecord) -> bool {
        self.conditions
            .iter()
            .all(|c| Self::matches_condition(c, wine))
    }
}
