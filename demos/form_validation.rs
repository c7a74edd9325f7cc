//! Form validation with a JSON context, eventless transitions and a
//! deferred reset.
//!
//! Run with: cargo run --example form_validation

use serde_json::{json, Value};
use std::time::Duration;
use stillwater::validation::Validation;
use waypoint::{
    create_machine, interpret, merge, send, AlwaysTransition, Event, MachineConfig,
    ServiceOptions, State, StateNode, TransitionDescriptor,
};

fn email_looks_valid(state: &State<Value>) -> bool {
    state
        .context()
        .and_then(|ctx| ctx["email"].as_str())
        .is_some_and(|email| email.contains('@'))
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Form Validation ===\n");

    let config = MachineConfig::new()
        .initial("editing")
        .context(json!({ "email": "", "attempts": 0 }))
        .state(
            "editing",
            StateNode::new()
                .on("INPUT", TransitionDescriptor::new().actions("store_input"))
                .on("SUBMIT", TransitionDescriptor::to("checking").actions("count_attempt")),
        )
        .state(
            "checking",
            StateNode::new()
                .always(AlwaysTransition::to("accepted").when(email_looks_valid))
                .always(AlwaysTransition::to("rejected").actions("schedule_reset")),
        )
        .state("rejected", StateNode::new().on("RESET", "editing"))
        .state("accepted", StateNode::new().entry("thank_user"));

    let options = ServiceOptions::<Value>::new()
        .action("store_input", |_, event: &Event| {
            merge(json!({ "email": event.payload()["email"].clone() }))
        })
        .action("count_attempt", |ctx: Option<&Value>, _| {
            let attempts = ctx.and_then(|c| c["attempts"].as_u64()).unwrap_or_default();
            merge(json!({ "attempts": attempts + 1 }))
        })
        .action("schedule_reset", |_, _| send("RESET", Duration::from_millis(500)))
        .action("thank_user", |ctx, _| {
            let email = ctx.and_then(|c: &Value| c["email"].as_str()).unwrap_or_default();
            println!("  thanks, {email}");
        });

    match waypoint::validate_with(&config, &options) {
        Validation::Success(_) => println!("Configuration is clean\n"),
        Validation::Failure(issues) => {
            for issue in issues.iter() {
                println!("Configuration issue: {issue}");
            }
        }
    }

    let mut service = interpret(create_machine(config), options);
    service.subscribe(|state| {
        let context = state.context().map_or(Value::Null, Clone::clone);
        println!("-> {} {context}", state.value());
    });
    service.start();

    service.send(Event::new("INPUT").with_payload(json!({ "email": "nobody" })));
    service.send("SUBMIT");

    println!("\nWaiting for the reset...");
    service.advance(Duration::from_millis(500));

    service.send(Event::new("INPUT").with_payload(json!({ "email": "someone@example.com" })));
    service.send("SUBMIT");

    println!("\nFinal state: {}", service.state().value());
}
