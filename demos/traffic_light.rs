//! Traffic light driven by delayed transitions.
//!
//! Run with: cargo run --example traffic_light
//! Set RUST_LOG=waypoint=debug to watch timers being armed and cancelled.

use std::time::Duration;
use waypoint::{
    create_machine, interpret, AfterTransition, MachineConfig, ServiceOptions, StateNode,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Traffic Light ===\n");

    let machine = create_machine(
        MachineConfig::<()>::new()
            .initial("green")
            .state(
                "green",
                StateNode::new()
                    .entry("announce")
                    .after(Duration::from_millis(300), "yellow")
                    .on("PEDESTRIAN", "yellow"),
            )
            .state(
                "yellow",
                StateNode::new()
                    .entry("announce")
                    .after(Duration::from_millis(100), "red"),
            )
            .state(
                "red",
                StateNode::new().entry("announce").after(
                    Duration::from_millis(200),
                    AfterTransition::to("green").actions("count_cycle"),
                ),
            ),
    );

    let options = ServiceOptions::<()>::new()
        .action("announce", |_, event| println!("  light changed ({event})"))
        .action("count_cycle", |_, _| println!("  cycle complete"));

    let mut service = interpret(machine, options);
    let subscription = service.subscribe(|state| println!("-> {}", state.value()));

    service.start();
    println!("Started on {}\n", service.state().value());

    service.run_for(Duration::from_millis(700)).await;

    println!("\nPedestrian button pressed");
    service.send("PEDESTRIAN");

    service.run_for(Duration::from_millis(300)).await;
    subscription.unsubscribe();
    service.stop();

    println!("\nPath taken:");
    for record in service.history().transitions() {
        println!("  {:>5?}  {} -> {} on {}", record.at, record.from, record.to, record.event);
    }
}
