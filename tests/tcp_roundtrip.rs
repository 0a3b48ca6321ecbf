//! Sessions served over a real loopback socket.

use std::thread;
use std::time::Duration;

use oven_rush::client::OrderClient;
use oven_rush::{AbortReason, Order, Server, SessionOutcome, ShopConfig};

fn fast_config() -> ShopConfig {
    ShopConfig {
        cooks: 2,
        couriers: 2,
        time_unit_ms: 1,
        preparation_min_units: 1,
        preparation_max_units: 3,
        travel_divisor: 1,
        poll_timeout_ms: 5,
        ..ShopConfig::default()
    }
}

#[test]
fn client_receives_acknowledgment_after_delivery() {
    let server = Server::bind("127.0.0.1:0", fast_config()).expect("bind");
    let addr = server.local_addr().expect("addr");
    let shop = thread::spawn(move || server.serve_one().expect("session"));

    let orders: Vec<Order> = (0..5).map(|id| Order::new(id, id + 1, 3)).collect();
    let mut client = OrderClient::connect(addr).expect("connect");
    client.submit(&orders).expect("submit");
    let acknowledged = client
        .wait_for_ack(Some(Duration::from_secs(10)))
        .expect("ack");

    let report = shop.join().expect("shop thread");
    assert!(acknowledged);
    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.delivered(), 5);
}

#[test]
fn cancelled_client_gets_no_acknowledgment() {
    let config = ShopConfig {
        cooks: 1,
        couriers: 1,
        time_unit_ms: 200,
        preparation_min_units: 3,
        preparation_max_units: 5,
        poll_timeout_ms: 5,
        ..ShopConfig::default()
    };
    let server = Server::bind("127.0.0.1:0", config).expect("bind");
    let addr = server.local_addr().expect("addr");
    let shop = thread::spawn(move || server.serve_one().expect("session"));

    let orders: Vec<Order> = (0..3).map(|id| Order::new(id, 8, 8)).collect();
    let mut client = OrderClient::connect(addr).expect("connect");
    client.submit(&orders).expect("submit");
    // Keep the cancel in a separate read from the batch.
    thread::sleep(Duration::from_millis(50));
    client.cancel().expect("cancel");
    let acknowledged = client
        .wait_for_ack(Some(Duration::from_secs(10)))
        .expect("shop closes connection");

    let report = shop.join().expect("shop thread");
    assert!(!acknowledged);
    assert_eq!(report.outcome, SessionOutcome::Aborted(AbortReason::Cancelled));
    assert_eq!(report.delivered(), 0);
}

#[test]
fn hang_up_mid_session_is_a_disconnect() {
    let config = ShopConfig {
        cooks: 1,
        couriers: 1,
        time_unit_ms: 200,
        preparation_min_units: 3,
        preparation_max_units: 5,
        poll_timeout_ms: 5,
        ..ShopConfig::default()
    };
    let server = Server::bind("127.0.0.1:0", config).expect("bind");
    let addr = server.local_addr().expect("addr");
    let shop = thread::spawn(move || server.serve_one().expect("session"));

    let mut client = OrderClient::connect(addr).expect("connect");
    client.submit(&[Order::new(1, 2, 2)]).expect("submit");
    thread::sleep(Duration::from_millis(50));
    drop(client);

    let report = shop.join().expect("shop thread");
    assert_eq!(
        report.outcome,
        SessionOutcome::Aborted(AbortReason::Disconnected)
    );
}
