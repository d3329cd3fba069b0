//! Static registry of the species the hatchery raises.

use crate::{validate_species, FishSpecies, HatcheryError, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Read-only species registry in fixed declaration order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    species: Vec<FishSpecies>,
}

fn species(
    name: &str,
    fertilizer_ml: i64,
    feed: i64,
    salt: i64,
    maintenance_tenths: i64,
    demand: u32,
    price: i64,
) -> FishSpecies {
    FishSpecies {
        name: name.to_string(),
        // ml per fish, stored in litres
        fertilizer: Decimal::new(fertilizer_ml, 3),
        feed: Decimal::new(feed, 0),
        salt: Decimal::new(salt, 0),
        maintenance_days: Decimal::new(maintenance_tenths, 1),
        demand,
        price: Decimal::new(price, 0),
    }
}

impl Catalog {
    /// Build a catalog from custom species, validating each and rejecting
    /// duplicate names.
    pub fn new(species: Vec<FishSpecies>) -> Result<Self, ValidationError> {
        let mut seen = BTreeSet::new();
        for s in &species {
            validate_species(s)?;
            if !seen.insert(s.name.as_str()) {
                return Err(ValidationError::DuplicateSpecies(s.name.clone()));
            }
        }
        Ok(Self { species })
    }

    /// The six species every hatchery is seeded with.
    pub fn standard() -> Self {
        Self {
            species: vec![
                species("Clef Fins", 100, 12, 2, 20, 25, 250),
                species("Timpani Snapper", 50, 9, 2, 10, 10, 350),
                species("Andalusian Brim", 90, 6, 2, 5, 15, 250),
                species("Plagal Cod", 100, 10, 2, 20, 20, 400),
                species("Fugue Flounder", 200, 12, 2, 25, 30, 550),
                species("Modal Bass", 300, 12, 6, 30, 50, 500),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Result<&FishSpecies, HatcheryError> {
        self.species
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| HatcheryError::species_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.species.iter().any(|s| s.name == name)
    }

    /// Species in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FishSpecies> {
        self.species.iter()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
