#![deny(warnings)]

//! Simulation runtime: the hatchery aggregate, sale allocation and the
//! quarter lifecycle.
//!
//! A [`Hatchery`] owns every piece of mutable state. Orchestrators drive it
//! through one quarter at a time:
//!
//! 1. roster changes ([`Hatchery::hire`], [`Hatchery::release`],
//!    [`Hatchery::apply_roster_change`])
//! 2. sales, one call per attempted quantity ([`Hatchery::attempt_sale`])
//! 3. [`Hatchery::close_quarter`] for settlement, depreciation, restocking
//!    and the solvency check
//!
//! Every failing call leaves the hatchery exactly as it was.

use chrono::{Months, NaiveDate};
use hatch_core::{
    validate_config, Catalog, HatcheryConfig, HatcheryError, QuarterPhase, Stocks, Technician,
    MONTHS_PER_QUARTER,
};
use hatch_econ::{LaborPool, Ledger, ResourcePool};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod allocation;
pub mod quarter;

pub use allocation::{SaleQuote, SaleReceipt, SaleRecord};
pub use quarter::{
    DepreciationBreakdown, NewHire, PayrollBreakdown, Quarter, QuarterReport, RestockOutcome,
    RosterChange,
};

/// Start date of quarter `number` (1-based).
pub fn quarter_start(first: NaiveDate, number: u32) -> NaiveDate {
    let months = MONTHS_PER_QUARTER.saturating_mul(number.saturating_sub(1));
    first
        .checked_add_months(Months::new(months))
        .unwrap_or(first)
}

/// Read-only view of the hatchery for renderers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HatcherySnapshot {
    /// Hatchery display name.
    pub name: String,
    /// Current quarter, 1-based.
    pub quarter: u32,
    /// Quarters configured for the run.
    pub quarters_total: u32,
    /// Start date of the current quarter.
    pub date: NaiveDate,
    pub phase: QuarterPhase,
    pub cash: Decimal,
    /// Primary warehouse contents.
    pub primary: Stocks,
    /// Auxiliary warehouse contents.
    pub auxiliary: Stocks,
    pub primary_capacity: Stocks,
    pub auxiliary_capacity: Stocks,
    /// Roster in hiring order.
    pub technicians: Vec<Technician>,
    /// Labor-weeks committed to sales this quarter.
    pub weeks_worked: Decimal,
    /// Labor-weeks still free this quarter.
    pub available_weeks: Decimal,
}

/// The hatchery aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hatchery {
    config: HatcheryConfig,
    catalog: Catalog,
    resources: ResourcePool,
    labor: LaborPool,
    ledger: Ledger,
    quarter: Quarter,
}

impl Default for Hatchery {
    fn default() -> Self {
        Self::build(HatcheryConfig::default(), Catalog::standard())
    }
}

impl Hatchery {
    /// Build a hatchery with the standard catalog.
    pub fn configure(config: HatcheryConfig) -> Result<Self, HatcheryError> {
        Self::with_catalog(config, Catalog::standard())
    }

    pub fn with_catalog(config: HatcheryConfig, catalog: Catalog) -> Result<Self, HatcheryError> {
        validate_config(&config)?;
        Ok(Self::build(config, catalog))
    }

    fn build(config: HatcheryConfig, catalog: Catalog) -> Self {
        let resources = ResourcePool::new(&config.primary, &config.auxiliary);
        let ledger = Ledger::new(config.initial_cash);
        let quarter = Quarter::first(config.start_date);
        Self {
            config,
            catalog,
            resources,
            labor: LaborPool::new(),
            ledger,
            quarter,
        }
    }

    pub fn config(&self) -> &HatcheryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    pub fn labor(&self) -> &LaborPool {
        &self.labor
    }

    pub fn quarter(&self) -> &Quarter {
        &self.quarter
    }

    pub fn phase(&self) -> QuarterPhase {
        self.quarter.phase
    }

    pub fn cash(&self) -> Decimal {
        self.ledger.balance()
    }

    /// True once the hatchery went bankrupt or completed every quarter.
    pub fn is_finished(&self) -> bool {
        self.quarter.phase.is_terminal()
    }

    /// Labor-weeks still allocatable this quarter.
    pub fn available_weeks(&self) -> Decimal {
        self.labor.available_weeks(self.quarter.weeks_worked)
    }

    pub fn snapshot(&self) -> HatcherySnapshot {
        HatcherySnapshot {
            name: self.config.name.clone(),
            quarter: self.quarter.number,
            quarters_total: self.config.quarters,
            date: self.quarter.start_date,
            phase: self.quarter.phase,
            cash: self.ledger.balance(),
            primary: self.resources.primary(),
            auxiliary: self.resources.auxiliary(),
            primary_capacity: Stocks::primary_capacity(),
            auxiliary_capacity: Stocks::auxiliary_capacity(),
            technicians: self.labor.roster().to_vec(),
            weeks_worked: self.quarter.weeks_worked,
            available_weeks: self.available_weeks(),
        }
    }

    fn save_label(&self) -> String {
        format!(
            "{} quarter {} ({})",
            self.config.name, self.quarter.number, self.quarter.phase
        )
    }

    /// Save the whole aggregate as JSON.
    pub fn save_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        persistence::save_json(path, &self.save_label(), self)
    }

    /// Resume a hatchery saved with [`Hatchery::save_to`].
    pub fn resume_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(persistence::load_json::<Self>(path)?.state)
    }

    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        persistence::to_bytes(&self.save_label(), self)
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(persistence::from_bytes::<Self>(bytes)?.state)
    }
}
