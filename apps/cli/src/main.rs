#![deny(warnings)]

//! Headless CLI that drives a hatchery through scripted quarters.

use anyhow::{Context, Result};
use hatch_core::{HatcheryConfig, QuarterPhase, Resource, Vendor};
use hatch_runtime::{Hatchery, NewHire, QuarterReport, RosterChange};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Decisions for one quarter.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct QuarterPlan {
    hire: Vec<NewHire>,
    release: Vec<String>,
    /// Requested quantity per species; species left out sell their full
    /// remaining demand.
    sales: BTreeMap<String, u32>,
    /// Vendor number, 1 or 2.
    vendor: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Scenario {
    config: HatcheryConfig,
    quarters: Vec<QuarterPlan>,
}

impl Scenario {
    fn builtin() -> Self {
        Self {
            config: HatcheryConfig::default(),
            quarters: vec![QuarterPlan {
                hire: vec![NewHire::new("Technician 1", None)],
                ..QuarterPlan::default()
            }],
        }
    }

    /// Plan for quarter `number`; past the scripted quarters the last plan's
    /// sales and vendor repeat without roster changes.
    fn plan_for(&self, number: u32) -> QuarterPlan {
        let idx = number.saturating_sub(1) as usize;
        match self.quarters.get(idx) {
            Some(plan) => plan.clone(),
            None => self
                .quarters
                .last()
                .map(|last| QuarterPlan {
                    hire: vec![],
                    release: vec![],
                    ..last.clone()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    scenario: Option<PathBuf>,
    quarters: Option<u32>,
    save: Option<PathBuf>,
    resume: Option<PathBuf>,
    json: bool,
    version: bool,
}

/// Value of `--save`/`--resume`, or the default save path when the flag is
/// last or followed by another flag.
fn path_or_default<I: Iterator<Item = String>>(it: &mut Peekable<I>) -> PathBuf {
    match it.next_if(|v| !v.starts_with("--")) {
        Some(v) => PathBuf::from(v),
        None => PathBuf::from(persistence::default_save_path()),
    }
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Args {
    let mut args = Args::default();
    let mut it = raw.into_iter().peekable();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--quarters" => args.quarters = it.next().and_then(|s| s.parse().ok()),
            "--save" => args.save = Some(path_or_default(&mut it)),
            "--resume" => args.resume = Some(path_or_default(&mut it)),
            "--json" => args.json = true,
            "--version" => args.version = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_scenario(path: Option<&PathBuf>) -> Result<Scenario> {
    let Some(path) = path else {
        return Ok(Scenario::builtin());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))
}

/// Scenario hires with blank specialties treated as generalists.
fn normalized_hires(plan: &QuarterPlan) -> Vec<NewHire> {
    plan.hire
        .iter()
        .map(|h| NewHire {
            name: h.name.clone(),
            specialty: h
                .specialty
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
        .collect()
}

fn apply_roster(hatchery: &mut Hatchery, plan: &QuarterPlan) -> Result<()> {
    if hatchery.phase() != QuarterPhase::RosterChange {
        return Ok(());
    }
    if !plan.release.is_empty() {
        let change = RosterChange::Release(plan.release.clone());
        hatchery
            .apply_roster_change(&change)
            .context("releasing technicians")?;
    }
    if !plan.hire.is_empty() {
        let change = RosterChange::Hire(normalized_hires(plan));
        hatchery
            .apply_roster_change(&change)
            .context("hiring technicians")?;
    }
    Ok(())
}

/// Sell every species in catalog order, retrying a rejected request once
/// with the largest quantity that fits.
fn sell_all(hatchery: &mut Hatchery, plan: &QuarterPlan) -> Result<()> {
    let names: Vec<String> = hatchery.catalog().iter().map(|s| s.name.clone()).collect();
    for name in names {
        let remaining = hatchery.remaining_demand(&name)?;
        let requested = plan
            .sales
            .get(&name)
            .map_or(remaining, |q| (*q).min(remaining));
        let receipt = hatchery.attempt_sale(&name, requested)?;
        if receipt.accepted {
            continue;
        }
        for s in receipt.shortfall.iter().flatten() {
            println!("  {name}: {s}");
        }
        let fallback = hatchery.max_sellable(&name)?;
        if fallback > 0 {
            let retry = hatchery.attempt_sale(&name, fallback)?;
            info!(species = %name, requested, sold = retry.quantity_sold, "retried smaller quantity");
        }
    }
    Ok(())
}

fn print_vendors() {
    for v in Vendor::ALL {
        let p = v.prices();
        println!(
            "Vendor {v}: fertilizer {} | feed {} | salt {}",
            p.fertilizer, p.feed, p.salt
        );
    }
}

fn print_report(r: &QuarterReport) {
    println!("====== QUARTER {} ({}) ======", r.quarter, r.date);
    for s in &r.sales {
        println!("Sold {} x {} for {}", s.quantity, s.species, s.revenue);
    }
    for line in &r.payroll.lines {
        println!(
            "Paid {}, weekly rate={}, amount {:.2}",
            line.name, line.weekly_rate, line.amount
        );
    }
    println!("Paid rent/utilities {}", r.payroll.rent);
    for res in Resource::ALL {
        println!(
            "Warehouse {}: main {:.2} | auxiliary {:.2}",
            res,
            r.warehouse.primary.get(res),
            r.warehouse.auxiliary.get(res)
        );
    }
    println!("Total warehouse costs: {:.2}", r.warehouse.total);
    if r.restock.completed {
        println!(
            "Restocked from {} for {:.2}",
            r.restock.quote.vendor, r.restock.quote.total
        );
    } else {
        println!(
            "Can't restock from {}: needed {:.2}",
            r.restock.quote.vendor, r.restock.quote.total
        );
    }
    println!(
        "KPI | revenue: {:.2} | costs: {:.2} | cash: {:.2}",
        r.revenue,
        r.payroll.total + r.warehouse.total,
        r.cash_after
    );
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args(std::env::args().skip(1));
    if args.version {
        println!(
            "hatchery {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(scenario = ?args.scenario, quarters = ?args.quarters, "starting CLI");

    let scenario = load_scenario(args.scenario.as_ref())?;
    let mut hatchery = match &args.resume {
        Some(path) => Hatchery::resume_from(path)?,
        None => {
            let mut config = scenario.config.clone();
            if let Some(q) = args.quarters {
                config.quarters = q;
            }
            Hatchery::configure(config)?
        }
    };

    if !args.json {
        print_vendors();
    }
    while !hatchery.is_finished() {
        let plan = scenario.plan_for(hatchery.quarter().number);
        apply_roster(&mut hatchery, &plan)?;
        sell_all(&mut hatchery, &plan)?;
        let vendor = Vendor::try_from(plan.vendor.unwrap_or(1))?;
        let report = hatchery.close_quarter(vendor)?;
        print_report(&report);
        if report.bankrupt {
            println!("Bankrupt after Quarter {}!", report.quarter);
        }
        if let Some(path) = &args.save {
            hatchery.save_to(path)?;
        }
    }

    let snap = hatchery.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        println!(
            "Hatchery {} | quarter {} of {} | {} | cash: {:.2} | technicians: {}",
            snap.name,
            snap.quarter,
            snap.quarters_total,
            snap.phase,
            snap.cash,
            snap.technicians.len()
        );
    }
    println!("Simulation Ended");
    Ok(())
}
