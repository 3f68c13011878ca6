//! Seat Selection Demo
//!
//! Two users contend for the same showing through an in-memory lock server
//! that fans out every hold over the push channel:
//! - optimistic selection confirmed by the server
//! - a seat held by one user turning unclickable for the other
//! - a released seat coming back
//! - a hold lapsing while the countdown runs out
//!
//! # Usage
//!
//! ```bash
//! SEATING_MAX_SELECTION=3 cargo run --bin demo
//! ```

use futures::StreamExt;
use seatlock_core::environment::{Clock, SystemClock};
use seatlock_testing::InMemoryPushChannel;
use seating::mocks::InMemoryLockServer;
use seating::{
    Config, Money, Pricing, SeatId, SeatMapData, SeatSession, SelectionEnvironment, SessionError,
    ShowingId, TracingNotifier, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SETTLE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n=== Seat Selection: Live Demo ===\n");

    config.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let channel = InMemoryPushChannel::new(config.broadcast_capacity);
    // Short holds so the expiry is visible without waiting ten minutes
    let server = InMemoryLockServer::new(
        clock.clone(),
        channel.clone(),
        chrono::Duration::seconds(5),
    );

    let showing_id = ShowingId::new();
    let map = SeatMapData::builder(showing_id, 3, 6)
        .vip_rows([2])
        .disabled([SeatId::new(0, 6)])
        .booked([SeatId::new(1, 3), SeatId::new(1, 4)])
        .pricing(Pricing::new(Money::from_cents(1_250), Money::from_cents(2_400)))
        .build()?;

    let alice = mount(&config, &map, &server, &channel, clock.clone()).await?;
    let bob = mount(&config, &map, &server, &channel, clock.clone()).await?;
    println!("Mounted two sessions on showing {showing_id}");
    println!("Push subscribers: {}\n", channel.subscriber_count(&showing_id.topic()));

    // ========== Alice picks two seats ==========
    for label in ["A1", "A2"] {
        let outcome = alice.click(label.parse()?).await?;
        alice.settle(SETTLE).await?;
        println!(">>> Alice clicks {label}: {outcome:?}");
    }
    let summary = alice.summary().await;
    println!("Alice holds {} seats, total {}", summary.count, summary.total);

    // Bob's map learns about Alice's holds over the push channel
    bob.settle(SETTLE).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // ========== Bob tries a seat Alice holds ==========
    match bob.click("A1".parse()?).await {
        Ok(outcome) => println!(">>> Bob clicks A1: {outcome:?}"),
        Err(error) => println!(">>> Bob clicks A1: {error}"),
    }
    let outcome = bob.click("C2".parse()?).await?;
    bob.settle(SETTLE).await?;
    println!(">>> Bob clicks C2 (VIP): {outcome:?}, total {}", bob.summary().await.total);

    // ========== Alice lets one go ==========
    let outcome = alice.click("A2".parse()?).await?;
    alice.settle(SETTLE).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(">>> Alice clicks A2 again: {outcome:?}");
    if let Some(seat) = bob.seat("A2".parse()?).await {
        println!("Bob now sees A2 as {:?}", seat.status);
    }

    let stats = bob.stats().await;
    println!(
        "Bob's legend: {} available, {} selected, {} locked, {} booked, {} disabled\n",
        stats.available, stats.selected, stats.locked, stats.booked, stats.disabled
    );

    // ========== Alice's hold runs out ==========
    println!("Waiting for Alice's hold to lapse...");
    let mut countdown = Box::pin(alice.watch_countdown(alice.countdown_tick()));
    while let Some(remaining) = countdown.next().await {
        println!("  hold: {remaining}");
    }
    alice.settle(SETTLE).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    if let Some(notice) = alice.last_notice().await {
        println!("Alice was told: {notice}");
    }
    println!("Alice's selection: {:?}", alice.selection().await);

    // ========== Unmount ==========
    alice.unmount().await?;
    bob.unmount().await?;
    println!(
        "\nUnmounted. Push subscribers: {}",
        channel.subscriber_count(&showing_id.topic())
    );

    println!("\n=== Demo Complete ===");
    Ok(())
}

/// Mount a session for a fresh user sharing the demo's lock server
async fn mount(
    config: &Config,
    map: &SeatMapData,
    server: &InMemoryLockServer,
    channel: &InMemoryPushChannel,
    clock: Arc<dyn Clock>,
) -> Result<SeatSession, SessionError> {
    let user_id = UserId::new();
    let environment = SelectionEnvironment::new(
        clock,
        Arc::new(server.client(user_id)),
        Arc::new(TracingNotifier),
        user_id,
    );
    SeatSession::mount(config, map.clone(), environment, channel).await
}
