use hatch_core::{HatcheryError, Technician, MAX_TECHNICIANS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One technician's wage for a quarter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayLine {
    pub name: String,
    pub weekly_rate: Decimal,
    pub amount: Decimal,
}

/// The technician roster.
///
/// A plain data holder: it enforces the upper bound and unique names, while
/// the lower bound of one technician is a business rule enforced by the
/// quarter controller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborPool {
    roster: Vec<Technician>,
}

impl LaborPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hire(
        &mut self,
        name: &str,
        weekly_rate: Decimal,
        specialty: Option<String>,
    ) -> Result<&Technician, HatcheryError> {
        if self.roster.len() >= MAX_TECHNICIANS {
            return Err(HatcheryError::RosterFull {
                max: MAX_TECHNICIANS,
            });
        }
        if self.contains(name) {
            return Err(HatcheryError::DuplicateName(name.to_string()));
        }
        info!(name, %weekly_rate, ?specialty, "hired technician");
        self.roster.push(Technician {
            name: name.to_string(),
            weekly_rate,
            specialty,
        });
        let idx = self.roster.len() - 1;
        Ok(&self.roster[idx])
    }

    pub fn release(&mut self, name: &str) -> Result<Technician, HatcheryError> {
        let idx = self
            .roster
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| HatcheryError::technician_not_found(name))?;
        let tech = self.roster.remove(idx);
        info!(name, weekly_rate = %tech.weekly_rate, "let go technician");
        Ok(tech)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roster.iter().any(|t| t.name == name)
    }

    pub fn roster(&self) -> &[Technician] {
        &self.roster
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Labor-weeks the roster contributes to a full quarter.
    pub fn capacity_weeks(&self) -> Decimal {
        self.roster.iter().map(Technician::quarterly_weeks).sum()
    }

    /// Labor-weeks still allocatable after `weeks_worked`, floored at zero.
    pub fn available_weeks(&self, weeks_worked: Decimal) -> Decimal {
        (self.capacity_weeks() - weeks_worked).max(Decimal::ZERO)
    }

    /// Quarterly wages, in roster order.
    pub fn payroll(&self) -> Vec<PayLine> {
        self.roster
            .iter()
            .map(|t| PayLine {
                name: t.name.clone(),
                weekly_rate: t.weekly_rate,
                amount: t.quarterly_pay(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatch_core::DEFAULT_WEEKLY_RATE;
    use proptest::prelude::*;

    fn pool_of(names: &[&str]) -> LaborPool {
        let mut pool = LaborPool::new();
        for n in names {
            pool.hire(n, DEFAULT_WEEKLY_RATE, None).unwrap();
        }
        pool
    }

    #[test]
    fn hire_rejects_sixth_and_duplicates() {
        let mut pool = pool_of(&["a", "b", "c", "d", "e"]);
        assert_eq!(
            pool.hire("f", DEFAULT_WEEKLY_RATE, None),
            Err(HatcheryError::RosterFull { max: 5 })
        );
        pool.release("e").unwrap();
        assert_eq!(
            pool.hire("a", DEFAULT_WEEKLY_RATE, None),
            Err(HatcheryError::DuplicateName("a".to_string()))
        );
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn release_missing_is_not_found() {
        let mut pool = pool_of(&["a"]);
        assert_eq!(
            pool.release("z"),
            Err(HatcheryError::technician_not_found("z"))
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn available_weeks_mixes_specialists_and_clamps() {
        let mut pool = pool_of(&["gen"]);
        pool.hire("bass", DEFAULT_WEEKLY_RATE, Some("Modal Bass".to_string()))
            .unwrap();
        assert_eq!(pool.available_weeks(Decimal::ZERO), Decimal::new(15, 0));
        assert_eq!(pool.available_weeks(Decimal::new(4, 0)), Decimal::new(11, 0));
        assert_eq!(pool.available_weeks(Decimal::new(40, 0)), Decimal::ZERO);
        assert_eq!(LaborPool::new().available_weeks(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn payroll_is_twelve_weeks_each() {
        let pool = pool_of(&["a", "b"]);
        let lines = pool.payroll();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.amount == Decimal::new(6000, 0)));
    }

    proptest! {
        #[test]
        fn roster_never_exceeds_max(ops in proptest::collection::vec((any::<bool>(), 0u8..8), 0..40)) {
            let mut pool = LaborPool::new();
            for (hire, id) in ops {
                let name = format!("t{id}");
                let before = pool.len();
                let res = if hire {
                    pool.hire(&name, DEFAULT_WEEKLY_RATE, None).map(|_| ())
                } else {
                    pool.release(&name).map(|_| ())
                };
                if res.is_err() {
                    prop_assert_eq!(pool.len(), before);
                }
                prop_assert!(pool.len() <= MAX_TECHNICIANS);
            }
        }
    }
}
