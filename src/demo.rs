//! In-process demo session with a scripted client.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::client::generate_orders;
use crate::config::ShopConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::link::MemoryLink;
use crate::protocol;
use crate::report::SessionReport;

/// Demo timing knobs (small for quick CLI feedback).
pub fn demo_config() -> ShopConfig {
    ShopConfig {
        cooks: 3,
        couriers: 2,
        time_unit_ms: 10,
        preparation_min_units: 3,
        preparation_max_units: 5,
        travel_divisor: 2000,
        poll_timeout_ms: 10,
        ..ShopConfig::default()
    }
}

/// Run `orders` random orders through a full session and print a summary.
pub fn run_demo(orders: usize, seed: u64) -> Result<SessionReport> {
    let config = demo_config();
    let dispatcher = Dispatcher::new(config.clone())?;
    let mut rng = StdRng::seed_from_u64(seed);
    let batch = generate_orders(orders, 100, 100, &mut rng);
    log::info!("[DEMO] start orders={} seed={seed}", batch.len());

    let mut link = MemoryLink::new(protocol::encode_batch(&batch));
    let report = dispatcher.serve(&mut link)?;
    report.log_stats();

    let cooked: Vec<usize> = report.cooks.iter().map(|c| c.cooked).collect();
    let delivered: Vec<usize> = report.couriers.iter().map(|c| c.delivered).collect();
    println!("DEMO SUMMARY");
    println!(
        "cooks={} couriers={} orders_total={}",
        config.cooks, config.couriers, report.orders
    );
    println!("outcome={}", report.outcome);
    println!("orders_delivered={}", report.delivered());
    println!("cooked_per_cook={cooked:?}");
    println!("delivered_per_courier={delivered:?}");
    println!(
        "max_oven_occupancy_observed={} capacity={}",
        report.peak_oven_occupancy, report.oven_capacity
    );
    println!("oven_overflow={}", report.oven_overflow());
    println!("acknowledged={}", link.acknowledgments() == 1);
    println!("elapsed_ms={}", report.elapsed.as_millis());
    Ok(report)
}
