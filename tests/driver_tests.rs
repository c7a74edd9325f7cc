//! Driving a service on the tokio clock.

use std::time::Duration;
use tokio::time::Instant;
use waypoint::{create_machine, interpret, MachineConfig, ServiceOptions, StateNode};

fn traffic_light() -> waypoint::Machine<()> {
    create_machine(
        MachineConfig::new()
            .initial("green")
            .state(
                "green",
                StateNode::new()
                    .after(Duration::from_secs(30), "yellow")
                    .on("EMERGENCY", "red"),
            )
            .state("yellow", StateNode::new().after(Duration::from_secs(5), "red"))
            .state("red", StateNode::new().after(Duration::from_secs(20), "green")),
    )
}

#[tokio::test(start_paused = true)]
async fn run_for_follows_the_tokio_clock() {
    let mut service = interpret(traffic_light(), ServiceOptions::new());
    service.start();
    let started = Instant::now();

    service.run_for(Duration::from_secs(34)).await;
    assert!(service.state().matches("yellow"));

    service.run_for(Duration::from_secs(1)).await;
    assert!(service.state().matches("red"));

    assert_eq!(started.elapsed(), Duration::from_secs(35));
    assert_eq!(service.now(), Duration::from_secs(35));
}

#[tokio::test(start_paused = true)]
async fn run_for_covers_whole_cycles() {
    let mut service = interpret(traffic_light(), ServiceOptions::new());
    service.start();

    service.run_for(Duration::from_secs(55 * 2)).await;
    assert!(service.state().matches("green"));
    assert_eq!(
        service.history().get_path(),
        vec!["green", "yellow", "red", "green", "yellow", "red", "green"]
    );
}

#[tokio::test(start_paused = true)]
async fn events_between_runs_reset_timers() {
    let mut service = interpret(traffic_light(), ServiceOptions::new());
    service.start();

    service.run_for(Duration::from_secs(10)).await;
    service.send("EMERGENCY");
    assert!(service.state().matches("red"));
    assert_eq!(service.next_deadline(), Some(Duration::from_secs(30)));

    service.run_for(Duration::from_secs(20)).await;
    assert!(service.state().matches("green"));
}

#[tokio::test(start_paused = true)]
async fn stopped_service_only_moves_its_clock() {
    let mut service = interpret(traffic_light(), ServiceOptions::new());
    service.start();
    service.stop();

    service.run_for(Duration::from_secs(60)).await;
    assert!(service.state().matches("green"));
    assert_eq!(service.now(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn run_for_returns_on_zero_delay_ping_pong() {
    let machine: waypoint::Machine<()> = create_machine(
        MachineConfig::new()
            .initial("a")
            .state("a", StateNode::new().after(Duration::ZERO, "b"))
            .state("b", StateNode::new().after(Duration::ZERO, "a")),
    );
    let mut service = interpret(machine, ServiceOptions::new());
    service.start();

    service.run_for(Duration::from_secs(1)).await;
    assert!(service.state().matches("a"));
    assert_eq!(service.now(), Duration::from_secs(1));
    assert_eq!(service.pending_timers(), 1);
}
