//! Sale allocation: check a request against materials and labor, then commit
//! it in full or not at all.

use hatch_core::{Constraint, FishSpecies, HatcheryError, Resource, Shortfall, Stocks};
use hatch_econ::{LaborPool, Ledger, ResourcePool};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Hatchery;

/// Requirements of a sale compared with what is currently available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleQuote {
    /// Species being quoted.
    pub species: String,
    /// Units requested.
    pub quantity: u32,
    /// Material needed per resource.
    pub required: Stocks,
    /// Labor-weeks needed.
    pub required_weeks: Decimal,
    /// Material on hand across both warehouses.
    pub available: Stocks,
    /// Labor-weeks left this quarter.
    pub available_weeks: Decimal,
    /// Cash the sale would bring in.
    pub revenue: Decimal,
    /// Constraints whose requirement strictly exceeds availability.
    pub shortfalls: Vec<Shortfall>,
}

impl SaleQuote {
    pub fn is_feasible(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

/// Outcome of one sale attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub species: String,
    pub requested: u32,
    /// True when the full request was sold.
    pub accepted: bool,
    /// Units sold: the request when accepted, zero otherwise.
    pub quantity_sold: u32,
    pub cash_delta: Decimal,
    /// Quarter's committed labor-weeks after this attempt.
    pub weeks_worked: Decimal,
    /// Why the request was refused, when it was.
    pub shortfall: Option<Vec<Shortfall>>,
}

/// An accepted sale, kept for the quarter report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub species: String,
    pub quantity: u32,
    pub revenue: Decimal,
    /// Labor-weeks the sale used.
    pub labor_weeks: Decimal,
}

/// Compare the needs of selling `quantity` units against current stock and
/// the labor left after `weeks_worked`.
///
/// Requirements that overflow saturate at [`Decimal::MAX`] and so always
/// show up as shortfalls.
pub fn quote(
    species: &FishSpecies,
    quantity: u32,
    resources: &ResourcePool,
    labor: &LaborPool,
    weeks_worked: Decimal,
) -> SaleQuote {
    let units = Decimal::from(quantity);
    let mut required = Stocks::default();
    let mut available = Stocks::default();
    let mut shortfalls = Vec::new();
    for r in Resource::ALL {
        let need = species.requirement(r).saturating_mul(units);
        let have = resources.available(r);
        *required.get_mut(r) = need;
        *available.get_mut(r) = have;
        if need > have {
            shortfalls.push(Shortfall {
                constraint: Constraint::Material(r),
                required: need,
                available: have,
            });
        }
    }
    let required_weeks = species.labor_weeks(quantity);
    let available_weeks = labor.available_weeks(weeks_worked);
    if required_weeks > available_weeks {
        shortfalls.push(Shortfall {
            constraint: Constraint::LaborWeeks,
            required: required_weeks,
            available: available_weeks,
        });
    }
    SaleQuote {
        species: species.name.clone(),
        quantity,
        required,
        required_weeks,
        available,
        available_weeks,
        revenue: species.price.saturating_mul(units),
        shortfalls,
    }
}

/// Sell `quantity` units if every requirement fits, returning the new
/// `weeks_worked` total. On any shortfall nothing is consumed or credited.
pub fn sell(
    species: &FishSpecies,
    quantity: u32,
    resources: &mut ResourcePool,
    labor: &LaborPool,
    ledger: &mut Ledger,
    weeks_worked: Decimal,
) -> Result<Decimal, HatcheryError> {
    let q = quote(species, quantity, resources, labor, weeks_worked);
    if !q.is_feasible() {
        for s in &q.shortfalls {
            warn!(species = %species.name, quantity, constraint = %s.constraint, required = %s.required, available = %s.available, "insufficient");
        }
        return Err(HatcheryError::InsufficientResources(q.shortfalls));
    }
    ledger.credit(q.revenue);
    for r in Resource::ALL {
        resources.consume(r, q.required.get(r));
    }
    info!(species = %species.name, demand = species.demand, quantity, revenue = %q.revenue, "sold");
    Ok(weeks_worked + q.required_weeks)
}

/// Largest quantity in `0..=limit` that [`sell`] would accept right now.
///
/// Requirements grow linearly with quantity, so feasibility is monotone and
/// a binary search suffices.
pub fn max_sellable(
    species: &FishSpecies,
    limit: u32,
    resources: &ResourcePool,
    labor: &LaborPool,
    weeks_worked: Decimal,
) -> u32 {
    let fits = |q| quote(species, q, resources, labor, weeks_worked).is_feasible();
    let (mut lo, mut hi) = (0u32, limit);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

impl Hatchery {
    /// Units of `species` still sellable this quarter under its demand cap.
    pub fn remaining_demand(&self, species: &str) -> Result<u32, HatcheryError> {
        let s = self.catalog.get(species)?;
        Ok(s.demand.saturating_sub(self.quarter.sold(species)))
    }

    fn check_quantity(&self, species: &FishSpecies, quantity: u32) -> Result<(), HatcheryError> {
        let max = species.demand.saturating_sub(self.quarter.sold(&species.name));
        if quantity > max {
            return Err(HatcheryError::InvalidQuantity {
                species: species.name.clone(),
                quantity,
                max,
            });
        }
        Ok(())
    }

    /// Evaluate a sale without changing anything.
    pub fn quote_sale(&self, species: &str, quantity: u32) -> Result<SaleQuote, HatcheryError> {
        let s = self.catalog.get(species)?;
        self.check_quantity(s, quantity)?;
        Ok(quote(
            s,
            quantity,
            &self.resources,
            &self.labor,
            self.quarter.weeks_worked,
        ))
    }

    /// Largest quantity of `species` that would be accepted now.
    pub fn max_sellable(&self, species: &str) -> Result<u32, HatcheryError> {
        let s = self.catalog.get(species)?;
        let limit = s.demand.saturating_sub(self.quarter.sold(species));
        Ok(max_sellable(
            s,
            limit,
            &self.resources,
            &self.labor,
            self.quarter.weeks_worked,
        ))
    }

    /// Attempt one sale. A shortfall is reported in the receipt rather than
    /// as an error, so callers can retry with a smaller quantity.
    ///
    /// The first attempt of a quarter closes the roster-change phase.
    pub fn attempt_sale(
        &mut self,
        species: &str,
        quantity: u32,
    ) -> Result<SaleReceipt, HatcheryError> {
        self.check_can_sell()?;
        self.check_quantity(self.catalog.get(species)?, quantity)?;
        self.ensure_selling()?;
        let s = self.catalog.get(species)?;
        let before = self.ledger.balance();
        let weeks_before = self.quarter.weeks_worked;
        match sell(
            s,
            quantity,
            &mut self.resources,
            &self.labor,
            &mut self.ledger,
            weeks_before,
        ) {
            Ok(weeks_worked) => {
                let cash_delta = self.ledger.balance() - before;
                self.quarter.weeks_worked = weeks_worked;
                self.quarter.sales.push(SaleRecord {
                    species: s.name.clone(),
                    quantity,
                    revenue: cash_delta,
                    labor_weeks: weeks_worked - weeks_before,
                });
                Ok(SaleReceipt {
                    species: s.name.clone(),
                    requested: quantity,
                    accepted: true,
                    quantity_sold: quantity,
                    cash_delta,
                    weeks_worked,
                    shortfall: None,
                })
            }
            Err(HatcheryError::InsufficientResources(shortfalls)) => Ok(SaleReceipt {
                species: s.name.clone(),
                requested: quantity,
                accepted: false,
                quantity_sold: 0,
                cash_delta: Decimal::ZERO,
                weeks_worked: weeks_before,
                shortfall: Some(shortfalls),
            }),
            Err(e) => Err(e),
        }
    }
}
