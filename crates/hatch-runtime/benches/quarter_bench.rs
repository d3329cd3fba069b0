use criterion::{criterion_group, criterion_main, Criterion};
use hatch_core::Vendor;
use hatch_runtime::{Hatchery, NewHire, RosterChange};

fn staffed() -> Hatchery {
    let mut h = Hatchery::default();
    let hires = vec![
        NewHire::new("Ana", None),
        NewHire::new("Ben", Some("Modal Bass")),
        NewHire::new("Cy", None),
    ];
    h.apply_roster_change(&RosterChange::Hire(hires))
        .expect("hire bench roster");
    h
}

fn bench_quarter(c: &mut Criterion) {
    let species: Vec<String> = Hatchery::default()
        .catalog()
        .iter()
        .map(|s| s.name.clone())
        .collect();
    c.bench_function("full_quarter", |b| {
        b.iter(|| {
            let mut h = staffed();
            for name in &species {
                let n = h.max_sellable(name).unwrap_or(0);
                let _ = h.attempt_sale(name, n);
            }
            let _ = h.close_quarter(Vendor::SlipperyLakes);
        })
    });
    c.bench_function("max_sellable", |b| {
        let h = staffed();
        b.iter(|| h.max_sellable("Fugue Flounder"))
    });
}

criterion_group!(benches, bench_quarter);
criterion_main!(benches);
