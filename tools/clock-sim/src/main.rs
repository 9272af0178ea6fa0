//! Runs the clock orchestrator for a few seconds against in-memory
//! stand-ins for the persistence and notification collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use clock_orchestrator::{ClockCallback, ClockOrchestrator, OrchestratorConfig};
use matchclock::{
    ClockDirection, ClockId, ClockKind, ClockStateMachine, ClockStatus, RunningClock,
    SystemTimeSource, TimeSource,
};

/// What the persistence callbacks write, keyed by (kind, id).
#[derive(Debug, Clone)]
struct StoredClock {
    value: u32,
    status: ClockStatus,
}

type ClockStore = Arc<Mutex<HashMap<(ClockKind, ClockId), StoredClock>>>;

/// Change notification fanned out to subscribers on every update and stop.
#[derive(Debug, Clone)]
struct ClockEvent {
    kind: ClockKind,
    clock_id: ClockId,
    value: u32,
    stopped: bool,
}

fn persist_and_notify(
    kind: ClockKind,
    clocks: Arc<HashMap<ClockId, Arc<ClockStateMachine>>>,
    store: ClockStore,
    events: broadcast::Sender<ClockEvent>,
    stopped: bool,
) -> ClockCallback {
    Arc::new(move |clock_id: ClockId| {
        let clocks = Arc::clone(&clocks);
        let store = Arc::clone(&store);
        let events = events.clone();
        async move {
            let clock = clocks
                .get(&clock_id)
                .ok_or_else(|| anyhow::anyhow!("no {} with id {clock_id}", kind.as_str()))?;
            let (value, status) = if stopped {
                // The owning side freezes the machine when the orchestrator
                // reports zero.
                clock.stop();
                (clock.value(), clock.status())
            } else {
                (clock.current_value(), clock.status())
            };

            store.lock().insert((kind, clock_id), StoredClock { value, status });
            let _ = events.send(ClockEvent { kind, clock_id, value, stopped });
            Ok(())
        }
        .boxed()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = OrchestratorConfig { metrics_interval_ms: 1000, ..Default::default() };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.monitoring.log_level)),
        )
        .init();

    println!("🕒 Starting clock orchestrator simulation");

    let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource::new());
    let orchestrator = Arc::new(ClockOrchestrator::new(config, Arc::clone(&time))?);

    // A couple of matches: each gets a countdown play clock; match 1 has a
    // counting-down game clock, match 2 resumes an elapsed-time clock that
    // counts up to a cap.
    let mut playclocks: HashMap<ClockId, Arc<ClockStateMachine>> = HashMap::new();
    playclocks.insert(
        1,
        Arc::new(ClockStateMachine::new(1, 3, ClockDirection::Down, 40, Arc::clone(&time))),
    );
    playclocks.insert(
        2,
        Arc::new(ClockStateMachine::new(2, 25, ClockDirection::Down, 40, Arc::clone(&time))),
    );

    let mut gameclocks: HashMap<ClockId, Arc<ClockStateMachine>> = HashMap::new();
    gameclocks.insert(
        1,
        Arc::new(ClockStateMachine::new(1, 720, ClockDirection::Down, 720, Arc::clone(&time))),
    );
    gameclocks.insert(
        2,
        Arc::new(ClockStateMachine::new(2, 61, ClockDirection::Up, 2700, Arc::clone(&time))),
    );

    let playclocks = Arc::new(playclocks);
    let gameclocks = Arc::new(gameclocks);

    let store: ClockStore = Arc::new(Mutex::new(HashMap::new()));
    let (events, mut subscriber) = broadcast::channel::<ClockEvent>(64);

    // A connected client: prints every notification it receives.
    let listener = tokio::spawn(async move {
        while let Ok(event) = subscriber.recv().await {
            let label = if event.stopped { "stopped" } else { "update" };
            println!(
                "  📣 {} {} -> {}s ({label})",
                event.kind.as_str(),
                event.clock_id,
                event.value
            );
        }
    });

    orchestrator.set_playclock_update_callback(persist_and_notify(
        ClockKind::Play,
        Arc::clone(&playclocks),
        Arc::clone(&store),
        events.clone(),
        false,
    ));
    orchestrator.set_playclock_stop_callback(persist_and_notify(
        ClockKind::Play,
        Arc::clone(&playclocks),
        Arc::clone(&store),
        events.clone(),
        true,
    ));
    orchestrator.set_gameclock_update_callback(persist_and_notify(
        ClockKind::Game,
        Arc::clone(&gameclocks),
        Arc::clone(&store),
        events.clone(),
        false,
    ));
    orchestrator.set_gameclock_stop_callback(persist_and_notify(
        ClockKind::Game,
        Arc::clone(&gameclocks),
        Arc::clone(&store),
        events.clone(),
        true,
    ));

    for (&id, clock) in playclocks.iter() {
        clock.start();
        orchestrator.register_playclock(id, Arc::clone(clock) as Arc<dyn RunningClock>);
    }
    for (&id, clock) in gameclocks.iter() {
        clock.start();
        orchestrator.register_gameclock(id, Arc::clone(clock) as Arc<dyn RunningClock>);
    }

    orchestrator.start();
    println!("⏱️  Running for 5 seconds (playclock 1 hits zero on the way)...");
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Playclock 1 started at 3s; by now the orchestrator has retired it.
    println!(
        "  playclock 1 registered: {}",
        orchestrator.is_playclock_registered(1)
    );

    orchestrator.stop().await;
    drop(events);
    let _ = listener.await;

    println!("\n💾 Final stored clock rows:");
    let mut rows: Vec<_> = store
        .lock()
        .iter()
        .map(|(&(kind, id), stored)| (kind, id, stored.clone()))
        .collect();
    rows.sort_by_key(|(kind, id, _)| (kind.as_str(), *id));
    for (kind, id, stored) in rows {
        println!("  {} {id}: {}s {:?}", kind.as_str(), stored.value, stored.status);
    }

    let metrics = orchestrator.get_metrics();
    println!("\n📊 Orchestrator metrics:\n{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}
