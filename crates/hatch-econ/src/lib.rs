#![deny(warnings)]

//! Economic state of a hatchery: cash, warehoused supplies and labor.
//!
//! This crate provides the effect-applying pools the engine composes:
//! - [`Ledger`]: the cash balance, allowed to go negative
//! - [`ResourcePool`]: primary/auxiliary stores with consumption, decay,
//!   holding costs and restocking
//! - [`LaborPool`]: the technician roster and its remaining labor-weeks

mod labor;
mod ledger;
mod resources;

pub use labor::{LaborPool, PayLine};
pub use ledger::Ledger;
pub use resources::{ResourcePool, RestockQuote, StorePair, WarehouseCosts};
