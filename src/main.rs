use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use oven_rush::client::{AckWait, OrderClient, generate_orders};
use oven_rush::config::ShopConfig;
use oven_rush::{Server, demo, logging};

#[derive(Parser)]
#[command(name = "oven_rush")]
#[command(about = "Simulated food shop: cooks, a shared oven, and couriers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept clients one at a time and fulfil their orders
    Serve {
        #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
        port: u16,

        /// Number of cook threads
        #[arg(value_parser = clap::value_parser!(u64).range(1..=1024))]
        cooks: u64,

        /// Number of courier threads
        #[arg(value_parser = clap::value_parser!(u64).range(1..=1024))]
        couriers: u64,

        /// Courier speed; travel time is divided by it
        #[arg(value_parser = clap::value_parser!(u64).range(1..=1024))]
        speed: u64,

        /// TOML file with the remaining shop settings
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Place a batch of random orders and wait for delivery
    Order {
        #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
        port: u16,

        /// Number of customers, one order each
        #[arg(value_parser = clap::value_parser!(u64).range(1..=1024))]
        customers: u64,

        /// Destinations are drawn from 0..max_x
        #[arg(value_parser = clap::value_parser!(i32).range(1..=1000))]
        max_x: i32,

        /// Destinations are drawn from 0..max_y
        #[arg(value_parser = clap::value_parser!(i32).range(1..=1000))]
        max_y: i32,

        /// Send a cancellation after this many milliseconds
        #[arg(long)]
        cancel_after_ms: Option<u64>,
    },

    /// Run one in-process session and print a summary
    Demo {
        #[arg(short, long, default_value = "12")]
        orders: usize,

        #[arg(short, long, default_value = "2432")]
        seed: u64,
    },
}

/// Raise the returned flag on Ctrl-C instead of killing the process.
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag)) {
        log::warn!("could not install Ctrl-C handler: {err}");
    }
    flag
}

fn serve(port: u16, cooks: u64, couriers: u64, speed: u64, config: Option<String>) -> ExitCode {
    let mut shop = match config {
        Some(path) => match ShopConfig::from_file(&path) {
            Ok(shop) => shop,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::from(2);
            }
        },
        None => ShopConfig::default(),
    };
    shop.cooks = cooks as usize;
    shop.couriers = couriers as usize;
    shop.courier_speed = speed;

    let server = match Server::bind(("0.0.0.0", port), shop) {
        Ok(server) => server.with_shutdown(interrupt_flag()),
        Err(err) => {
            eprintln!("could not start shop: {err}");
            return ExitCode::FAILURE;
        }
    };
    match server.run() {
        Ok(()) => {
            log::info!("shop closed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("shop stopped: {err}");
            ExitCode::FAILURE
        }
    }
}

fn order(port: u16, customers: u64, max_x: i32, max_y: i32, cancel_after_ms: Option<u64>) -> ExitCode {
    let mut rng = StdRng::from_entropy();
    let orders = generate_orders(customers as usize, max_x, max_y, &mut rng);
    for order in &orders {
        log::info!(
            "[CLIENT] order from customer {} at {}",
            order.customer_id,
            order.destination
        );
    }

    let mut client = match OrderClient::connect(("127.0.0.1", port)) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("connect failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = client.submit(&orders) {
        eprintln!("could not send orders: {err}");
        return ExitCode::FAILURE;
    }

    if let Some(delay) = cancel_after_ms {
        thread::sleep(Duration::from_millis(delay));
        return match client.cancel() {
            Ok(()) => {
                println!("Orders cancelled");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("could not cancel: {err}");
                ExitCode::FAILURE
            }
        };
    }

    let interrupted = interrupt_flag();
    match client.wait_for_ack_unless(&interrupted, Duration::from_millis(100)) {
        Ok(AckWait::Acknowledged) => {
            print!("{}", oven_rush::protocol::ACKNOWLEDGMENT);
            ExitCode::SUCCESS
        }
        Ok(AckWait::Interrupted) => {
            log::info!("[CLIENT] interrupted, cancelling orders");
            if let Err(err) = client.cancel() {
                eprintln!("could not cancel: {err}");
            }
            println!("Orders cancelled");
            ExitCode::from(130)
        }
        Ok(AckWait::Closed) | Err(_) => {
            println!("Shop closed without confirming delivery");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Serve {
            port,
            cooks,
            couriers,
            speed,
            config,
        }) => serve(port, cooks, couriers, speed, config),
        Some(Commands::Order {
            port,
            customers,
            max_x,
            max_y,
            cancel_after_ms,
        }) => order(port, customers, max_x, max_y, cancel_after_ms),
        Some(Commands::Demo { orders, seed }) => match demo::run_demo(orders, seed) {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("demo failed: {err}");
                ExitCode::FAILURE
            }
        },
        None => match demo::run_demo(12, 2432) {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("demo failed: {err}");
                ExitCode::FAILURE
            }
        },
    }
}
