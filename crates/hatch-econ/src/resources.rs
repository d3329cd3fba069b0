use hatch_core::{HatcheryError, Resource, Stocks, Vendor};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Ledger;

/// Quantity of one resource held in the primary and auxiliary warehouses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePair {
    pub primary: Decimal,
    pub auxiliary: Decimal,
}

impl StorePair {
    pub fn total(&self) -> Decimal {
        self.primary + self.auxiliary
    }
}

/// Cost of refilling the primary warehouse from one vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockQuote {
    pub vendor: Vendor,
    /// Per-resource cost of the primary shortfall.
    pub costs: Stocks,
    pub total: Decimal,
}

/// Quarterly holding costs per warehouse and resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseCosts {
    pub primary: Stocks,
    pub auxiliary: Stocks,
    pub total: Decimal,
}

/// Supplies split across the two warehouses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    fertilizer: StorePair,
    feed: StorePair,
    salt: StorePair,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new(&Stocks::primary_capacity(), &Stocks::auxiliary_capacity())
    }
}

/// Survivors of decay are rounded up to whole units, but never above the
/// quantity that was there before.
fn decayed(quantity: Decimal, rate: Decimal) -> Decimal {
    (quantity * (Decimal::ONE - rate)).ceil().min(quantity)
}

impl ResourcePool {
    pub fn new(primary: &Stocks, auxiliary: &Stocks) -> Self {
        let pair = |r| StorePair {
            primary: primary.get(r),
            auxiliary: auxiliary.get(r),
        };
        Self {
            fertilizer: pair(Resource::Fertilizer),
            feed: pair(Resource::Feed),
            salt: pair(Resource::Salt),
        }
    }

    pub fn store(&self, resource: Resource) -> StorePair {
        match resource {
            Resource::Fertilizer => self.fertilizer,
            Resource::Feed => self.feed,
            Resource::Salt => self.salt,
        }
    }

    fn store_mut(&mut self, resource: Resource) -> &mut StorePair {
        match resource {
            Resource::Fertilizer => &mut self.fertilizer,
            Resource::Feed => &mut self.feed,
            Resource::Salt => &mut self.salt,
        }
    }

    /// Primary plus auxiliary quantity.
    pub fn available(&self, resource: Resource) -> Decimal {
        self.store(resource).total()
    }

    pub fn primary(&self) -> Stocks {
        let mut s = Stocks::default();
        for r in Resource::ALL {
            *s.get_mut(r) = self.store(r).primary;
        }
        s
    }

    pub fn auxiliary(&self) -> Stocks {
        let mut s = Stocks::default();
        for r in Resource::ALL {
            *s.get_mut(r) = self.store(r).auxiliary;
        }
        s
    }

    /// Draw `amount` from the primary store, then the auxiliary store.
    ///
    /// Unconditional: the caller checks `amount <= available(resource)`.
    /// Overdrawing drives the auxiliary store negative.
    pub fn consume(&mut self, resource: Resource, amount: Decimal) {
        let store = self.store_mut(resource);
        if amount <= store.primary {
            store.primary -= amount;
        } else {
            let remaining = amount - store.primary;
            store.primary = Decimal::ZERO;
            store.auxiliary -= remaining;
        }
        debug!(%resource, %amount, primary = %store.primary, auxiliary = %store.auxiliary, "consumed");
    }

    /// Apply quarterly decay to every store.
    pub fn depreciate(&mut self) {
        for r in Resource::ALL {
            let rate = r.decay_rate();
            if rate.is_zero() {
                continue;
            }
            let store = self.store_mut(r);
            let before = store.total();
            store.primary = decayed(store.primary, rate);
            store.auxiliary = decayed(store.auxiliary, rate);
            debug!(resource = %r, %before, after = %store.total(), "depreciated");
        }
    }

    /// Holding costs for everything currently stored.
    pub fn warehouse_costs(&self) -> WarehouseCosts {
        let mut primary = Stocks::default();
        let mut auxiliary = Stocks::default();
        for r in Resource::ALL {
            let rate = r.holding_cost_per_unit();
            let store = self.store(r);
            *primary.get_mut(r) = store.primary * rate;
            *auxiliary.get_mut(r) = store.auxiliary * rate;
        }
        WarehouseCosts {
            primary,
            auxiliary,
            total: primary.total() + auxiliary.total(),
        }
    }

    /// Price the primary warehouse's shortfall at `vendor`'s rates.
    pub fn quote_restock(&self, vendor: Vendor) -> RestockQuote {
        let capacity = Stocks::primary_capacity();
        let prices = vendor.prices();
        let mut costs = Stocks::default();
        for r in Resource::ALL {
            *costs.get_mut(r) = (capacity.get(r) - self.store(r).primary) * prices.get(r);
        }
        RestockQuote {
            vendor,
            costs,
            total: costs.total(),
        }
    }

    /// Refill both warehouses to capacity and debit the quote, or change
    /// nothing when the ledger cannot cover it.
    pub fn restock(
        &mut self,
        vendor: Vendor,
        ledger: &mut Ledger,
    ) -> Result<RestockQuote, HatcheryError> {
        let quote = self.quote_restock(vendor);
        if quote.total > ledger.balance() {
            warn!(vendor = vendor.name(), needed = %quote.total, available = %ledger.balance(), "cannot restock");
            return Err(HatcheryError::InsufficientFunds {
                required: quote.total,
                available: ledger.balance(),
            });
        }
        ledger.debit(quote.total);
        *self = Self::default();
        info!(vendor = vendor.name(), cost = %quote.total, "restocked");
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn consume_drains_primary_then_auxiliary() {
        let mut pool = ResourcePool::new(
            &Stocks::new(d(5), d(400), d(200)),
            &Stocks::auxiliary_capacity(),
        );
        pool.consume(Resource::Fertilizer, d(8));
        assert_eq!(
            pool.store(Resource::Fertilizer),
            StorePair {
                primary: d(0),
                auxiliary: d(7)
            }
        );
    }

    #[test]
    fn consume_within_primary_leaves_auxiliary() {
        let mut pool = ResourcePool::default();
        pool.consume(Resource::Feed, d(120));
        assert_eq!(pool.store(Resource::Feed).primary, d(280));
        assert_eq!(pool.store(Resource::Feed).auxiliary, d(200));
    }

    #[test]
    fn depreciation_rounds_survivors_up() {
        let mut pool = ResourcePool::new(
            &Stocks::new(d(1), d(3), d(7)),
            &Stocks::new(d(10), d(200), d(100)),
        );
        pool.depreciate();
        // ceil(1 * 0.6) = 1, ceil(3 * 0.9) = 3
        assert_eq!(pool.store(Resource::Fertilizer).primary, d(1));
        assert_eq!(pool.store(Resource::Feed).primary, d(3));
        assert_eq!(pool.store(Resource::Fertilizer).auxiliary, d(6));
        assert_eq!(pool.store(Resource::Feed).auxiliary, d(180));
        assert_eq!(pool.store(Resource::Salt).primary, d(7));
        assert_eq!(pool.store(Resource::Salt).auxiliary, d(100));
    }

    #[test]
    fn depreciation_of_full_default_stock() {
        let mut pool = ResourcePool::default();
        pool.depreciate();
        assert_eq!(pool.primary(), Stocks::new(d(12), d(360), d(200)));
        assert_eq!(pool.auxiliary(), Stocks::new(d(6), d(180), d(100)));
    }

    #[test]
    fn warehouse_costs_of_full_stock() {
        let costs = ResourcePool::default().warehouse_costs();
        assert_eq!(costs.primary, Stocks::new(d(2), d(400), d(200)));
        assert_eq!(costs.auxiliary, Stocks::new(d(1), d(200), d(100)));
        assert_eq!(costs.total, d(903));
    }

    #[test]
    fn restock_refills_and_debits_quote() {
        let mut pool = ResourcePool::new(
            &Stocks::new(d(10), d(300), d(150)),
            &Stocks::new(d(2), d(50), d(60)),
        );
        let mut ledger = Ledger::new(d(1000));
        let quote = pool.restock(Vendor::SlipperyLakes, &mut ledger).unwrap();
        // 10 * 0.30 + 100 * 0.10 + 50 * 0.05
        assert_eq!(quote.total, Decimal::new(155, 1));
        assert_eq!(ledger.balance(), Decimal::new(9845, 1));
        assert_eq!(pool, ResourcePool::default());
    }

    #[test]
    fn restock_without_funds_changes_nothing() {
        let mut pool = ResourcePool::new(
            &Stocks::new(d(0), d(0), d(0)),
            &Stocks::new(d(1), d(1), d(1)),
        );
        let before = pool.clone();
        let mut ledger = Ledger::new(d(10));
        let err = pool.restock(Vendor::ScalyWholesaler, &mut ledger).unwrap_err();
        assert_eq!(
            err,
            HatcheryError::InsufficientFunds {
                required: d(214),
                available: d(10)
            }
        );
        assert_eq!(pool, before);
        assert_eq!(ledger.balance(), d(10));
    }

    proptest! {
        #[test]
        fn consume_reduces_available_exactly(p in 0i64..=20, a in 0i64..=10, take in 0i64..=30) {
            prop_assume!(take <= p + a);
            let mut pool = ResourcePool::new(
                &Stocks::new(d(p), d(400), d(200)),
                &Stocks::new(d(a), d(200), d(100)),
            );
            pool.consume(Resource::Fertilizer, d(take));
            let store = pool.store(Resource::Fertilizer);
            prop_assert_eq!(store.total(), d(p + a - take));
            if take > p {
                prop_assert_eq!(store.primary, Decimal::ZERO);
            } else {
                prop_assert_eq!(store.auxiliary, d(a));
            }
        }

        #[test]
        fn depreciation_never_increases(fert in 0i64..=200, feed in 0i64..=4000, salt in 0i64..=200) {
            // tenths, so fractional stock is covered too
            let primary = Stocks::new(Decimal::new(fert, 1), Decimal::new(feed, 1), Decimal::new(salt, 0));
            let mut pool = ResourcePool::new(&primary, &Stocks::auxiliary_capacity());
            let before = pool.clone();
            pool.depreciate();
            prop_assert!(pool.available(Resource::Fertilizer) <= before.available(Resource::Fertilizer));
            prop_assert!(pool.available(Resource::Feed) <= before.available(Resource::Feed));
            prop_assert_eq!(pool.available(Resource::Salt), before.available(Resource::Salt));
        }

        #[test]
        fn restock_is_all_or_nothing(fert in 0i64..=20, cash in 0i64..200) {
            let mut pool = ResourcePool::new(
                &Stocks::new(d(fert), d(100), d(100)),
                &Stocks::new(d(0), d(0), d(0)),
            );
            let before = pool.clone();
            let quote = pool.quote_restock(Vendor::SlipperyLakes);
            let mut ledger = Ledger::new(d(cash));
            match pool.restock(Vendor::SlipperyLakes, &mut ledger) {
                Ok(q) => {
                    prop_assert_eq!(q, quote);
                    prop_assert_eq!(ledger.balance(), d(cash) - quote.total);
                    prop_assert_eq!(&pool, &ResourcePool::default());
                }
                Err(_) => {
                    prop_assert_eq!(ledger.balance(), d(cash));
                    prop_assert_eq!(&pool, &before);
                }
            }
        }
    }
}
