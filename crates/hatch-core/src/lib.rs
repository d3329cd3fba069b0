#![deny(warnings)]

//! Core domain models and invariants for the fish hatchery simulation.
//!
//! This crate defines the serializable types shared by the engine crates,
//! the static species catalog, the error kinds surfaced to orchestrators and
//! validation helpers guarding configuration invariants.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod catalog;

pub use catalog::Catalog;

const fn whole(n: u32) -> Decimal {
    Decimal::from_parts(n, 0, 0, false, 0)
}

/// Hard upper bound on the technician roster.
pub const MAX_TECHNICIANS: usize = 5;
/// The roster may never shrink below this many technicians.
pub const MIN_TECHNICIANS: usize = 1;
/// Labor-weeks contributed per quarter by a technician without a specialty.
pub const GENERALIST_WEEKS: Decimal = whole(9);
/// Labor-weeks contributed per quarter by a specialist (2/3 of a generalist).
pub const SPECIALIST_WEEKS: Decimal = whole(6);
/// Paid weeks in one quarter.
pub const WEEKS_PER_QUARTER: Decimal = whole(12);
/// Working days in one labor-week.
pub const DAYS_PER_LABOR_WEEK: Decimal = whole(5);
/// Fixed rent and utilities charge per quarter.
pub const RENT_AND_UTILITIES: Decimal = whole(1500);
/// Weekly rate paid to every hire unless configured otherwise.
pub const DEFAULT_WEEKLY_RATE: Decimal = whole(500);
/// Starting cash.
pub const DEFAULT_CASH: Decimal = whole(10_000);
/// Number of quarters simulated by default.
pub const DEFAULT_QUARTERS: u32 = 8;
/// Months between consecutive quarter start dates.
pub const MONTHS_PER_QUARTER: u32 = 3;
/// Ceiling on any per-unit value of a species multiplied by its full
/// demand (10^18).
pub const MAX_SPECIES_TOTAL: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Material supplies held in the warehouses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Fertilizer, in litres.
    Fertilizer,
    /// Feed, in kilograms.
    Feed,
    /// Salt, in kilograms.
    Salt,
}

impl Resource {
    /// All resources in ledger order.
    pub const ALL: [Resource; 3] = [Resource::Fertilizer, Resource::Feed, Resource::Salt];

    /// Fraction of stock lost to spoilage at the end of each quarter.
    pub fn decay_rate(self) -> Decimal {
        match self {
            Resource::Fertilizer => Decimal::new(4, 1),
            Resource::Feed => Decimal::new(1, 1),
            Resource::Salt => Decimal::ZERO,
        }
    }

    /// Quarterly holding cost per unit kept in either warehouse.
    ///
    /// Feed and salt are billed per gram at 0.001 with 1000 grams per unit,
    /// so the effective rate is 1.0 per kilogram.
    pub fn holding_cost_per_unit(self) -> Decimal {
        match self {
            Resource::Fertilizer => Decimal::new(10, 2),
            Resource::Feed | Resource::Salt => Decimal::new(1, 3) * Decimal::new(1000, 0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Fertilizer => "fertilizer",
            Resource::Feed => "feed",
            Resource::Salt => "salt",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One quantity per resource, used for warehouse contents, capacities and
/// per-resource money breakdowns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stocks {
    /// Fertilizer, litres (or money attributed to fertilizer).
    pub fertilizer: Decimal,
    /// Feed, kilograms (or money attributed to feed).
    pub feed: Decimal,
    /// Salt, kilograms (or money attributed to salt).
    pub salt: Decimal,
}

impl Stocks {
    pub const fn new(fertilizer: Decimal, feed: Decimal, salt: Decimal) -> Self {
        Self {
            fertilizer,
            feed,
            salt,
        }
    }

    /// Full-restock capacity of the primary warehouse.
    pub const fn primary_capacity() -> Self {
        Self::new(whole(20), whole(400), whole(200))
    }

    /// Full-restock capacity of the auxiliary warehouse.
    pub const fn auxiliary_capacity() -> Self {
        Self::new(whole(10), whole(200), whole(100))
    }

    pub fn get(&self, resource: Resource) -> Decimal {
        match resource {
            Resource::Fertilizer => self.fertilizer,
            Resource::Feed => self.feed,
            Resource::Salt => self.salt,
        }
    }

    pub fn get_mut(&mut self, resource: Resource) -> &mut Decimal {
        match resource {
            Resource::Fertilizer => &mut self.fertilizer,
            Resource::Feed => &mut self.feed,
            Resource::Salt => &mut self.salt,
        }
    }

    /// Sum over all three resources.
    pub fn total(&self) -> Decimal {
        self.fertilizer + self.feed + self.salt
    }
}

/// A fish species with per-unit requirements, quarterly demand and price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FishSpecies {
    /// Unique species name.
    pub name: String,
    /// Fertilizer per fish, litres.
    pub fertilizer: Decimal,
    /// Feed per fish, kilograms.
    pub feed: Decimal,
    /// Salt per fish, kilograms.
    pub salt: Decimal,
    /// Technician maintenance per fish, days.
    pub maintenance_days: Decimal,
    /// Maximum units sellable per quarter.
    pub demand: u32,
    /// Sale price per fish.
    pub price: Decimal,
}

impl FishSpecies {
    /// Per-unit requirement of a material resource.
    pub fn requirement(&self, resource: Resource) -> Decimal {
        match resource {
            Resource::Fertilizer => self.fertilizer,
            Resource::Feed => self.feed,
            Resource::Salt => self.salt,
        }
    }

    /// Labor-weeks needed to raise `quantity` fish.
    pub fn labor_weeks(&self, quantity: u32) -> Decimal {
        self.maintenance_days.saturating_mul(Decimal::from(quantity)) / DAYS_PER_LABOR_WEEK
    }
}

/// An employed technician.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    /// Unique within the roster.
    pub name: String,
    /// Pay per week, fixed at hire time.
    pub weekly_rate: Decimal,
    /// Species the technician specializes in, if any.
    pub specialty: Option<String>,
}

impl Technician {
    pub fn is_specialist(&self) -> bool {
        self.specialty.is_some()
    }

    /// Labor-weeks this technician contributes to a quarter.
    pub fn quarterly_weeks(&self) -> Decimal {
        if self.is_specialist() {
            SPECIALIST_WEEKS
        } else {
            GENERALIST_WEEKS
        }
    }

    /// Wage owed for one quarter.
    pub fn quarterly_pay(&self) -> Decimal {
        self.weekly_rate * WEEKS_PER_QUARTER
    }
}

/// Supply vendors, each with a fixed per-unit price sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    /// Vendor 1.
    SlipperyLakes,
    /// Vendor 2.
    ScalyWholesaler,
}

impl Vendor {
    pub const ALL: [Vendor; 2] = [Vendor::SlipperyLakes, Vendor::ScalyWholesaler];

    /// Per-unit restock prices.
    pub fn prices(self) -> Stocks {
        match self {
            Vendor::SlipperyLakes => {
                Stocks::new(Decimal::new(30, 2), Decimal::new(10, 2), Decimal::new(5, 2))
            }
            Vendor::ScalyWholesaler => {
                Stocks::new(Decimal::new(20, 2), Decimal::new(40, 2), Decimal::new(25, 2))
            }
        }
    }

    /// Menu number used by orchestrators.
    pub fn number(self) -> u8 {
        match self {
            Vendor::SlipperyLakes => 1,
            Vendor::ScalyWholesaler => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Vendor::SlipperyLakes => "Slippery Lakes",
            Vendor::ScalyWholesaler => "Scaly Wholesaler",
        }
    }
}

impl TryFrom<u8> for Vendor {
    type Error = HatcheryError;

    fn try_from(choice: u8) -> Result<Self, Self::Error> {
        match choice {
            1 => Ok(Vendor::SlipperyLakes),
            2 => Ok(Vendor::ScalyWholesaler),
            other => Err(HatcheryError::InvalidVendor(other)),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.name())
    }
}

/// Lifecycle phase of the current quarter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarterPhase {
    /// Technicians may be hired or let go.
    RosterChange,
    /// Sale requests are processed.
    Selling,
    /// Wages, rent and warehouse costs are being paid.
    Settlement,
    /// Supplies are being repurchased.
    Restocking,
    /// Terminal: every configured quarter completed with non-negative cash.
    Solvent,
    /// Terminal: cash was negative after a quarter closed.
    Bankrupt,
}

impl QuarterPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, QuarterPhase::Solvent | QuarterPhase::Bankrupt)
    }
}

impl fmt::Display for QuarterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuarterPhase::RosterChange => "roster change",
            QuarterPhase::Selling => "selling",
            QuarterPhase::Settlement => "settlement",
            QuarterPhase::Restocking => "restocking",
            QuarterPhase::Solvent => "solvent",
            QuarterPhase::Bankrupt => "bankrupt",
        };
        f.write_str(s)
    }
}

/// Starting parameters of a hatchery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatcheryConfig {
    /// Display name of the hatchery.
    pub name: String,
    /// Cash on hand at the start of quarter 1.
    pub initial_cash: Decimal,
    /// Opening contents of the primary warehouse.
    pub primary: Stocks,
    /// Opening contents of the auxiliary warehouse.
    pub auxiliary: Stocks,
    /// Weekly rate for new hires.
    pub weekly_rate: Decimal,
    /// Number of quarters to simulate.
    pub quarters: u32,
    /// First day of quarter 1.
    pub start_date: NaiveDate,
}

impl Default for HatcheryConfig {
    fn default() -> Self {
        Self {
            name: "Eastaboga".to_string(),
            initial_cash: DEFAULT_CASH,
            primary: Stocks::primary_capacity(),
            auxiliary: Stocks::auxiliary_capacity(),
            weekly_rate: DEFAULT_WEEKLY_RATE,
            quarters: DEFAULT_QUARTERS,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

/// Which kind of entity a failed lookup was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    Technician,
    Species,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Technician => f.write_str("technician"),
            LookupKind::Species => f.write_str("species"),
        }
    }
}

/// A capacity a sale draws on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    Material(Resource),
    LaborWeeks,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Material(r) => r.fmt(f),
            Constraint::LaborWeeks => f.write_str("labor-weeks"),
        }
    }
}

/// A constraint whose requirement exceeded what was available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// The capacity that ran short.
    pub constraint: Constraint,
    /// Amount the request needed.
    pub required: Decimal,
    /// Amount there was.
    pub available: Decimal,
}

impl Shortfall {
    /// How much more would have been needed.
    pub fn deficit(&self) -> Decimal {
        self.required - self.available
    }
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} needed {}, available {}",
            self.constraint, self.required, self.available
        )
    }
}

fn join_shortfalls(list: &[Shortfall]) -> String {
    list.iter()
        .map(Shortfall::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Recoverable failures of engine operations. None of them mutates state.
#[derive(Debug, Error, PartialEq)]
pub enum HatcheryError {
    #[error("cannot hire more than {max} technicians")]
    RosterFull { max: usize },
    #[error("there must be at least one technician at all times")]
    RosterEmpty,
    #[error("a technician named {0:?} already exists")]
    DuplicateName(String),
    #[error("{kind} {name:?} not found")]
    NotFound { kind: LookupKind, name: String },
    #[error("insufficient resources: {}", join_shortfalls(.0))]
    InsufficientResources(Vec<Shortfall>),
    #[error("insufficient funds: needed {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },
    #[error("quantity {quantity} for {species} must be between 0 and {max}")]
    InvalidQuantity {
        species: String,
        quantity: u32,
        max: u32,
    },
    #[error("invalid vendor choice {0}, expected 1 or 2")]
    InvalidVendor(u8),
    #[error("operation requires the {expected} phase but the quarter is in {found}")]
    OutOfPhase {
        expected: QuarterPhase,
        found: QuarterPhase,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl HatcheryError {
    pub fn technician_not_found(name: &str) -> Self {
        HatcheryError::NotFound {
            kind: LookupKind::Technician,
            name: name.to_string(),
        }
    }

    pub fn species_not_found(name: &str) -> Self {
        HatcheryError::NotFound {
            kind: LookupKind::Species,
            name: name.to_string(),
        }
    }
}

/// Validation errors for configuration and catalog invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Cash, prices and rates must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Stock must lie within [0, capacity].
    #[error("{resource} stock {quantity} outside [0, {capacity}]")]
    StockOutOfRange {
        resource: Resource,
        quantity: Decimal,
        capacity: Decimal,
    },
    /// Per-unit requirements must be non-negative.
    #[error("negative requirement for {0}")]
    NegativeRequirement(String),
    /// Names must contain non-whitespace characters.
    #[error("name must not be empty")]
    EmptyName,
    /// Species names are catalog keys.
    #[error("duplicate species: {0}")]
    DuplicateSpecies(String),
    /// At least one quarter must be simulated.
    #[error("quarter count must be > 0")]
    ZeroQuarters,
    /// A per-unit value times the species' demand exceeds [`MAX_SPECIES_TOTAL`].
    #[error("totals for {0} at full demand are out of range")]
    TotalOutOfRange(String),
}

/// Validate a warehouse's contents against its capacity.
pub fn validate_stocks(stocks: &Stocks, capacity: &Stocks) -> Result<(), ValidationError> {
    for r in Resource::ALL {
        let quantity = stocks.get(r);
        let cap = capacity.get(r);
        if quantity < Decimal::ZERO || quantity > cap {
            return Err(ValidationError::StockOutOfRange {
                resource: r,
                quantity,
                capacity: cap,
            });
        }
    }
    Ok(())
}

/// Validate a fish species definition.
pub fn validate_species(s: &FishSpecies) -> Result<(), ValidationError> {
    if s.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let requirements = [s.fertilizer, s.feed, s.salt, s.maintenance_days];
    if requirements.iter().any(|q| *q < Decimal::ZERO) {
        return Err(ValidationError::NegativeRequirement(s.name.clone()));
    }
    if s.price < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    let demand = Decimal::from(s.demand);
    for per_unit in [s.fertilizer, s.feed, s.salt, s.maintenance_days, s.price] {
        match per_unit.checked_mul(demand) {
            Some(total) if total <= MAX_SPECIES_TOTAL => {}
            _ => return Err(ValidationError::TotalOutOfRange(s.name.clone())),
        }
    }
    Ok(())
}

/// Validate hatchery starting parameters.
pub fn validate_config(c: &HatcheryConfig) -> Result<(), ValidationError> {
    if c.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if c.initial_cash < Decimal::ZERO || c.weekly_rate < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if c.quarters == 0 {
        return Err(ValidationError::ZeroQuarters);
    }
    validate_stocks(&c.primary, &Stocks::primary_capacity())?;
    validate_stocks(&c.auxiliary, &Stocks::auxiliary_capacity())?;
    Ok(())
}
