//! Quarter lifecycle: roster change, selling, settlement, depreciation,
//! restocking and the solvency check.

use chrono::NaiveDate;
use hatch_core::{
    HatcheryError, QuarterPhase, Resource, Stocks, Technician, ValidationError, Vendor,
    MAX_TECHNICIANS, MIN_TECHNICIANS, RENT_AND_UTILITIES,
};
use hatch_econ::{PayLine, RestockQuote, WarehouseCosts};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::{quarter_start, Hatchery, SaleRecord};

/// State of the quarter in progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quarter {
    /// 1-based quarter number.
    pub number: u32,
    pub start_date: NaiveDate,
    pub phase: QuarterPhase,
    /// Labor-weeks committed by accepted sales so far this quarter.
    pub weeks_worked: Decimal,
    /// Accepted sales so far this quarter.
    pub sales: Vec<SaleRecord>,
}

impl Quarter {
    pub fn first(start_date: NaiveDate) -> Self {
        Self {
            number: 1,
            start_date,
            phase: QuarterPhase::RosterChange,
            weeks_worked: Decimal::ZERO,
            sales: Vec::new(),
        }
    }

    /// Units of `species` sold so far this quarter.
    pub fn sold(&self, species: &str) -> u32 {
        self.sales
            .iter()
            .filter(|s| s.species == species)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn revenue(&self) -> Decimal {
        self.sales.iter().map(|s| s.revenue).sum()
    }
}

/// A technician to hire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHire {
    pub name: String,
    /// Species the hire specializes in.
    #[serde(default)]
    pub specialty: Option<String>,
}

impl NewHire {
    pub fn new(name: impl Into<String>, specialty: Option<&str>) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.map(str::to_string),
        }
    }
}

/// A signed change to the roster, applied as one batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterChange {
    Hire(Vec<NewHire>),
    Release(Vec<String>),
}

impl RosterChange {
    /// Net change in roster size.
    pub fn delta(&self) -> i64 {
        match self {
            RosterChange::Hire(list) => list.len() as i64,
            RosterChange::Release(list) => -(list.len() as i64),
        }
    }
}

/// Wages and rent paid at settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayrollBreakdown {
    /// One line per technician.
    pub lines: Vec<PayLine>,
    pub rent: Decimal,
    /// Wages plus rent.
    pub total: Decimal,
}

/// Available stock around the depreciation step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepreciationBreakdown {
    pub before: Stocks,
    pub after: Stocks,
}

/// Result of the restocking step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestockOutcome {
    pub quote: RestockQuote,
    /// False when cash could not cover the quote and stock was left as is.
    pub completed: bool,
}

/// Everything that happened when a quarter closed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuarterReport {
    /// Number of the quarter that closed.
    pub quarter: u32,
    /// Its start date.
    pub date: NaiveDate,
    /// Accepted sales in the order they were made.
    pub sales: Vec<SaleRecord>,
    /// Sum of sale revenue.
    pub revenue: Decimal,
    pub payroll: PayrollBreakdown,
    pub warehouse: WarehouseCosts,
    pub depreciation: DepreciationBreakdown,
    pub restock: RestockOutcome,
    /// Cash after restocking.
    pub cash_after: Decimal,
    /// True when cash was negative at the solvency check.
    pub bankrupt: bool,
    /// Phase the hatchery is in after this quarter.
    pub next_phase: QuarterPhase,
}

fn available_stocks(h: &Hatchery) -> Stocks {
    let mut s = Stocks::default();
    for r in Resource::ALL {
        *s.get_mut(r) = h.resources.available(r);
    }
    s
}

impl Hatchery {
    fn expect_phase(&self, expected: QuarterPhase) -> Result<(), HatcheryError> {
        if self.quarter.phase != expected {
            return Err(HatcheryError::OutOfPhase {
                expected,
                found: self.quarter.phase,
            });
        }
        Ok(())
    }

    fn check_specialty(&self, specialty: Option<&str>) -> Result<(), HatcheryError> {
        match specialty {
            Some(s) if !self.catalog.contains(s) => Err(HatcheryError::species_not_found(s)),
            _ => Ok(()),
        }
    }

    /// Hire one technician at the configured weekly rate.
    pub fn hire(
        &mut self,
        name: &str,
        specialty: Option<&str>,
    ) -> Result<Technician, HatcheryError> {
        self.expect_phase(QuarterPhase::RosterChange)?;
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.check_specialty(specialty)?;
        let tech = self.labor.hire(
            name,
            self.config.weekly_rate,
            specialty.map(str::to_string),
        )?;
        Ok(tech.clone())
    }

    /// Let one technician go. The last technician cannot be released.
    pub fn release(&mut self, name: &str) -> Result<Technician, HatcheryError> {
        self.expect_phase(QuarterPhase::RosterChange)?;
        if !self.labor.contains(name) {
            return Err(HatcheryError::technician_not_found(name));
        }
        if self.labor.len() <= MIN_TECHNICIANS {
            return Err(HatcheryError::RosterEmpty);
        }
        self.labor.release(name)
    }

    /// Apply a whole batch of hires or releases, or none of it.
    pub fn apply_roster_change(
        &mut self,
        change: &RosterChange,
    ) -> Result<Vec<Technician>, HatcheryError> {
        self.expect_phase(QuarterPhase::RosterChange)?;
        let projected = self.labor.len() as i64 + change.delta();
        let mut seen = BTreeSet::new();
        match change {
            RosterChange::Hire(hires) => {
                if projected > MAX_TECHNICIANS as i64 {
                    return Err(HatcheryError::RosterFull {
                        max: MAX_TECHNICIANS,
                    });
                }
                for h in hires {
                    if h.name.trim().is_empty() {
                        return Err(ValidationError::EmptyName.into());
                    }
                    if self.labor.contains(&h.name) || !seen.insert(h.name.as_str()) {
                        return Err(HatcheryError::DuplicateName(h.name.clone()));
                    }
                    self.check_specialty(h.specialty.as_deref())?;
                }
                hires
                    .iter()
                    .map(|h| self.hire(&h.name, h.specialty.as_deref()))
                    .collect()
            }
            RosterChange::Release(names) => {
                if names.is_empty() {
                    return Ok(Vec::new());
                }
                if projected < MIN_TECHNICIANS as i64 {
                    return Err(HatcheryError::RosterEmpty);
                }
                for n in names {
                    if !self.labor.contains(n) {
                        return Err(HatcheryError::technician_not_found(n));
                    }
                    if !seen.insert(n.as_str()) {
                        return Err(HatcheryError::DuplicateName(n.clone()));
                    }
                }
                names.iter().map(|n| self.labor.release(n)).collect()
            }
        }
    }

    /// Error unless sales may be attempted now.
    pub(crate) fn check_can_sell(&self) -> Result<(), HatcheryError> {
        match self.quarter.phase {
            QuarterPhase::Selling => Ok(()),
            QuarterPhase::RosterChange if self.labor.len() < MIN_TECHNICIANS => {
                Err(HatcheryError::RosterEmpty)
            }
            QuarterPhase::RosterChange => Ok(()),
            found => Err(HatcheryError::OutOfPhase {
                expected: QuarterPhase::Selling,
                found,
            }),
        }
    }

    /// Close the roster-change phase and reset the quarter's labor counter.
    pub fn start_selling(&mut self) -> Result<(), HatcheryError> {
        self.expect_phase(QuarterPhase::RosterChange)?;
        self.check_can_sell()?;
        self.quarter.phase = QuarterPhase::Selling;
        self.quarter.weeks_worked = Decimal::ZERO;
        self.quarter.sales.clear();
        info!(
            quarter = self.quarter.number,
            technicians = self.labor.len(),
            weeks = %self.labor.capacity_weeks(),
            "selling"
        );
        Ok(())
    }

    pub(crate) fn ensure_selling(&mut self) -> Result<(), HatcheryError> {
        if self.quarter.phase == QuarterPhase::Selling {
            return Ok(());
        }
        self.start_selling()
    }

    /// Price a restock without buying anything.
    pub fn quote_restock(&self, vendor: Vendor) -> RestockQuote {
        self.resources.quote_restock(vendor)
    }

    /// Settle the quarter, depreciate stock, restock from `vendor` and check
    /// solvency. Afterwards the hatchery is either in the next quarter's
    /// roster-change phase or in a terminal phase.
    pub fn close_quarter(&mut self, vendor: Vendor) -> Result<QuarterReport, HatcheryError> {
        self.check_can_sell()?;
        self.ensure_selling()?;
        let number = self.quarter.number;

        self.quarter.phase = QuarterPhase::Settlement;
        let lines = self.labor.payroll();
        for line in &lines {
            self.ledger.debit(line.amount);
            info!(name = %line.name, weekly_rate = %line.weekly_rate, amount = %line.amount, "paid technician");
        }
        self.ledger.debit(RENT_AND_UTILITIES);
        let wages: Decimal = lines.iter().map(|l| l.amount).sum();
        let payroll = PayrollBreakdown {
            lines,
            rent: RENT_AND_UTILITIES,
            total: wages + RENT_AND_UTILITIES,
        };
        info!(rent = %RENT_AND_UTILITIES, cash = %self.ledger.balance(), "paid rent and utilities");

        let warehouse = self.resources.warehouse_costs();
        self.ledger.debit(warehouse.total);
        info!(cost = %warehouse.total, cash = %self.ledger.balance(), "paid warehouse costs");

        let before = available_stocks(self);
        self.resources.depreciate();
        let depreciation = DepreciationBreakdown {
            before,
            after: available_stocks(self),
        };

        self.quarter.phase = QuarterPhase::Restocking;
        let restock = match self.resources.restock(vendor, &mut self.ledger) {
            Ok(quote) => RestockOutcome {
                quote,
                completed: true,
            },
            Err(HatcheryError::InsufficientFunds { .. }) => RestockOutcome {
                quote: self.resources.quote_restock(vendor),
                completed: false,
            },
            Err(e) => return Err(e),
        };

        let cash_after = self.ledger.balance();
        let bankrupt = self.ledger.is_negative();
        let revenue = self.quarter.revenue();
        let sales = std::mem::take(&mut self.quarter.sales);
        let date = self.quarter.start_date;
        let next_phase = if bankrupt {
            warn!(quarter = number, cash = %cash_after, "bankrupt");
            QuarterPhase::Bankrupt
        } else if number >= self.config.quarters {
            info!(quarter = number, cash = %cash_after, "simulation complete");
            QuarterPhase::Solvent
        } else {
            QuarterPhase::RosterChange
        };

        if next_phase == QuarterPhase::RosterChange {
            self.quarter = Quarter {
                number: number + 1,
                start_date: quarter_start(self.config.start_date, number + 1),
                phase: QuarterPhase::RosterChange,
                weeks_worked: Decimal::ZERO,
                sales: Vec::new(),
            };
        } else {
            self.quarter.phase = next_phase;
            self.quarter.weeks_worked = Decimal::ZERO;
        }
        info!(quarter = number, cash = %cash_after, next = %next_phase, "quarter closed");

        Ok(QuarterReport {
            quarter: number,
            date,
            sales,
            revenue,
            payroll,
            warehouse,
            depreciation,
            restock,
            cash_after,
            bankrupt,
            next_phase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatch_core::HatcheryConfig;
    use proptest::prelude::*;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn staffed(names: &[&str]) -> Hatchery {
        let mut h = Hatchery::default();
        let hires = names.iter().map(|n| NewHire::new(*n, None)).collect();
        h.apply_roster_change(&RosterChange::Hire(hires)).unwrap();
        h
    }

    #[test]
    fn roster_batch_is_atomic() {
        let mut h = staffed(&["a", "b", "c", "d"]);
        let err = h
            .apply_roster_change(&RosterChange::Hire(vec![
                NewHire::new("e", None),
                NewHire::new("f", None),
            ]))
            .unwrap_err();
        assert_eq!(err, HatcheryError::RosterFull { max: 5 });
        assert_eq!(h.labor().len(), 4);

        let err = h
            .apply_roster_change(&RosterChange::Hire(vec![NewHire::new(
                "e",
                Some("Sturgeon"),
            )]))
            .unwrap_err();
        assert!(matches!(err, HatcheryError::NotFound { .. }));
        assert_eq!(h.labor().len(), 4);

        let err = h
            .apply_roster_change(&RosterChange::Release(vec!["a".into(), "zz".into()]))
            .unwrap_err();
        assert_eq!(err, HatcheryError::technician_not_found("zz"));
        assert_eq!(h.labor().len(), 4);

        let err = h
            .apply_roster_change(&RosterChange::Release(vec![
                "a".into(),
                "b".into(),
                "c".into(),
                "d".into(),
            ]))
            .unwrap_err();
        assert_eq!(err, HatcheryError::RosterEmpty);

        let gone = h
            .apply_roster_change(&RosterChange::Release(vec!["a".into(), "b".into()]))
            .unwrap();
        assert_eq!(gone.len(), 2);
        assert_eq!(h.labor().len(), 2);
    }

    #[test]
    fn last_technician_cannot_leave() {
        let mut h = staffed(&["a"]);
        assert_eq!(h.release("a"), Err(HatcheryError::RosterEmpty));
        assert_eq!(h.release("b"), Err(HatcheryError::technician_not_found("b")));
        assert_eq!(
            h.hire("a", None),
            Err(HatcheryError::DuplicateName("a".to_string()))
        );
        assert_eq!(
            h.hire(" ", None),
            Err(HatcheryError::Invalid(ValidationError::EmptyName))
        );
    }

    #[test]
    fn cannot_sell_without_staff() {
        let mut h = Hatchery::default();
        assert_eq!(
            h.attempt_sale("Clef Fins", 1),
            Err(HatcheryError::RosterEmpty)
        );
        assert_eq!(
            h.close_quarter(Vendor::SlipperyLakes),
            Err(HatcheryError::RosterEmpty)
        );
        assert_eq!(h.phase(), QuarterPhase::RosterChange);
    }

    #[test]
    fn roster_is_frozen_while_selling() {
        let mut h = staffed(&["a"]);
        h.attempt_sale("Clef Fins", 1).unwrap();
        assert_eq!(
            h.hire("b", None),
            Err(HatcheryError::OutOfPhase {
                expected: QuarterPhase::RosterChange,
                found: QuarterPhase::Selling
            })
        );
    }

    #[test]
    fn idle_quarter_settlement() {
        let mut h = staffed(&["a"]);
        let report = h.close_quarter(Vendor::SlipperyLakes).unwrap();
        // 10000 - 6000 wages - 1500 rent - 903 warehouse = 1597
        assert_eq!(report.payroll.total, d(7500));
        assert_eq!(report.warehouse.total, d(903));
        // decay leaves 12/360/200 primary: 8*0.30 + 40*0.10 + 0
        assert_eq!(report.restock.quote.total, Decimal::new(64, 1));
        assert!(report.restock.completed);
        assert_eq!(report.cash_after, Decimal::new(15906, 1));
        assert!(!report.bankrupt);
        assert_eq!(report.next_phase, QuarterPhase::RosterChange);
        assert_eq!(h.quarter().number, 2);
        assert_eq!(
            h.quarter().start_date,
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
        );
        assert_eq!(h.resources().primary(), Stocks::primary_capacity());
        assert_eq!(h.resources().auxiliary(), Stocks::auxiliary_capacity());
    }

    #[test]
    fn sale_then_close_reports_sales_and_depreciation() {
        let mut h = staffed(&["a"]);
        h.attempt_sale("Clef Fins", 10).unwrap();
        let report = h.close_quarter(Vendor::ScalyWholesaler).unwrap();
        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.revenue, d(2500));
        // post-sale stock: fertilizer 19 + 10, feed 280 + 200, salt 180 + 100
        assert_eq!(report.depreciation.before, Stocks::new(d(29), d(480), d(280)));
        // ceil(19 * 0.6) = 12, ceil(10 * 0.6) = 6, 252 + 180
        assert_eq!(report.depreciation.after, Stocks::new(d(18), d(432), d(280)));
        assert!(h.quarter().sales.is_empty());
        assert_eq!(h.quarter().weeks_worked, Decimal::ZERO);
    }

    #[test]
    fn bankruptcy_is_terminal() {
        let config = HatcheryConfig {
            initial_cash: d(100),
            ..HatcheryConfig::default()
        };
        let mut h = Hatchery::configure(config).unwrap();
        h.hire("a", None).unwrap();
        let report = h.close_quarter(Vendor::SlipperyLakes).unwrap();
        assert!(report.bankrupt);
        assert!(!report.restock.completed);
        assert_eq!(report.next_phase, QuarterPhase::Bankrupt);
        assert!(h.is_finished());
        // stock keeps its decayed level when restock is refused
        assert_eq!(h.resources().primary().fertilizer, d(12));
        assert!(matches!(
            h.attempt_sale("Clef Fins", 1),
            Err(HatcheryError::OutOfPhase { .. })
        ));
        assert!(matches!(
            h.close_quarter(Vendor::SlipperyLakes),
            Err(HatcheryError::OutOfPhase { .. })
        ));
    }

    #[test]
    fn solvent_after_configured_quarters() {
        let config = HatcheryConfig {
            quarters: 2,
            ..HatcheryConfig::default()
        };
        let mut h = Hatchery::configure(config).unwrap();
        h.hire("a", None).unwrap();
        for _ in 0..2 {
            for name in ["Clef Fins", "Andalusian Brim"] {
                let n = h.max_sellable(name).unwrap();
                h.attempt_sale(name, n).unwrap();
            }
            h.close_quarter(Vendor::SlipperyLakes).unwrap();
        }
        assert_eq!(h.phase(), QuarterPhase::Solvent);
        assert_eq!(h.quarter().number, 2);
        assert!(h.cash() > Decimal::ZERO);
    }

    #[test]
    fn restock_refused_but_still_solvent() {
        let config = HatcheryConfig {
            initial_cash: d(8_404),
            ..HatcheryConfig::default()
        };
        let mut h = Hatchery::configure(config).unwrap();
        h.hire("a", None).unwrap();
        // 8404 - 7500 - 903 = 1 left, restock needs 6.4
        let report = h.close_quarter(Vendor::SlipperyLakes).unwrap();
        assert!(!report.restock.completed);
        assert_eq!(report.cash_after, d(1));
        assert!(!report.bankrupt);
        assert_eq!(h.phase(), QuarterPhase::RosterChange);
    }

    #[test]
    fn roster_change_delta_is_signed() {
        let hire = RosterChange::Hire(vec![NewHire::new("a", None), NewHire::new("b", None)]);
        assert_eq!(hire.delta(), 2);
        assert_eq!(RosterChange::Release(vec!["a".into()]).delta(), -1);
        assert_eq!(RosterChange::Release(Vec::new()).delta(), 0);
    }

    proptest! {
        #[test]
        fn roster_stays_within_bounds(ops in proptest::collection::vec((any::<bool>(), 0u8..8), 0..40)) {
            let mut h = staffed(&["t0"]);
            for (hire, id) in ops {
                let name = format!("t{id}");
                let before = h.labor().len();
                let result = if hire {
                    h.hire(&name, None).map(|_| ())
                } else {
                    h.release(&name).map(|_| ())
                };
                let after = h.labor().len();
                prop_assert!((MIN_TECHNICIANS..=MAX_TECHNICIANS).contains(&after));
                if result.is_err() {
                    prop_assert_eq!(after, before);
                }
            }
        }
    }
}
