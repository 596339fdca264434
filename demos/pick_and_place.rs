//! A pick-and-place cell driven by a simulated part sensor.
//!
//! Run with `cargo run --example pick_and_place [config.toml]` and watch the
//! status stream with any websocket client on the configured address.

use machineapp::builder::StateTable;
use machineapp::bus::{io_topic, BusMessage, LocalBus, LocalDevice};
use machineapp::config::RuntimeConfig;
use machineapp::core::{AppState, StateContext};
use machineapp::engine::{Engine, MachineApp};
use machineapp::io::{Direction, IoMonitor};
use machineapp::notifier::{NotificationLevel, Notifier};
use machineapp::observability::init_tracing;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PART_SENSOR_PIN: u32 = 0;
const GRIPPER_PIN: u32 = 1;

fn part_sensor_topic() -> String {
    io_topic("io-expander", 1, "digital-input", PART_SENSOR_PIN)
}

struct WaitForPart {
    device: LocalDevice,
    arrived: Arc<AtomicBool>,
}

impl AppState for WaitForPart {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        self.arrived.store(false, Ordering::SeqCst);
        let arrived = Arc::clone(&self.arrived);
        ctx.register_callback(&self.device, &part_sensor_topic(), move |message: &BusMessage| {
            if message.payload.trim() == "1" {
                arrived.store(true, Ordering::SeqCst);
            }
            Ok(())
        })?;
        ctx.notify(NotificationLevel::Info, "Waiting for a part");
        Ok(())
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        if self.arrived.load(Ordering::SeqCst) {
            ctx.goto_state("Pick");
        }
        Ok(())
    }
}

struct Pick {
    bus: LocalBus,
}

impl AppState for Pick {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        ctx.notify(NotificationLevel::Info, "Closing gripper");
        self.bus
            .publish(&io_topic("io-expander", 1, "digital-output", GRIPPER_PIN), "1");
        ctx.goto_state("Place");
        Ok(())
    }
}

struct Place {
    bus: LocalBus,
    cycles: u32,
}

impl AppState for Place {
    fn on_enter(&mut self, ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
        self.cycles += 1;
        let target = ctx.configuration()["cycles"].as_u64().unwrap_or(3);
        ctx.notifier().send_message(
            NotificationLevel::UiInfo,
            format!("Placed part {}", self.cycles),
            Some(json!({ "cycles": self.cycles })),
        );
        self.bus
            .publish(&io_topic("io-expander", 1, "digital-output", GRIPPER_PIN), "0");

        if u64::from(self.cycles) >= target {
            ctx.engine().stop();
        } else {
            ctx.goto_state("WaitForPart");
        }
        Ok(())
    }
}

struct PickAndPlace {
    bus: LocalBus,
}

impl MachineApp for PickAndPlace {
    fn initialize(&mut self, configuration: &Value) -> anyhow::Result<()> {
        tracing::info!(%configuration, "Initializing pick and place cell");
        Ok(())
    }

    fn build_state_table(&mut self) -> anyhow::Result<StateTable> {
        let table = StateTable::builder()
            .state(
                "WaitForPart",
                WaitForPart {
                    device: self.bus.device("mm-1"),
                    arrived: Arc::new(AtomicBool::new(false)),
                },
            )
            .state("Pick", Pick { bus: self.bus.clone() })
            .state(
                "Place",
                Place {
                    bus: self.bus.clone(),
                    cycles: 0,
                },
            )
            .build()?;
        Ok(table)
    }

    fn default_state_name(&self) -> &str {
        "WaitForPart"
    }

    fn on_estop(&mut self) -> anyhow::Result<()> {
        self.bus
            .publish(&io_topic("io-expander", 1, "digital-output", GRIPPER_PIN), "0");
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    init_tracing(&config.logging);

    let notifier = Notifier::start(config.notifier.clone())?;
    let bus = LocalBus::new();

    let monitor = Arc::new(IoMonitor::new(notifier.clone()));
    monitor.start_monitoring("part_present", Direction::Input, 1, PART_SENSOR_PIN);
    monitor.start_monitoring("gripper", Direction::Output, 1, GRIPPER_PIN);
    let _monitoring = monitor.attach(&bus.device("mm-1"))?;

    let engine = Engine::new(PickAndPlace { bus: bus.clone() }, notifier.clone())
        .with_config(config.engine.clone());
    let handle = engine.handle();

    let sensor = thread::spawn(move || {
        while !handle.is_running() {
            thread::sleep(Duration::from_millis(50));
        }
        while handle.is_running() {
            thread::sleep(Duration::from_millis(400));
            bus.publish(&part_sensor_topic(), "1");
            thread::sleep(Duration::from_millis(200));
            bus.publish(&part_sensor_topic(), "0");
        }
    });

    let report = engine.start(false, json!({ "cycles": 3 }))?;
    tracing::info!(path = ?report.history.get_path(), reason = ?report.reason, "Run finished");
    for point in monitor.points() {
        tracing::info!(name = %point.name, value = %point.value, "Final IO state");
    }

    if sensor.join().is_err() {
        tracing::error!("Sensor simulator panicked");
    }
    notifier.set_dead();
    Ok(())
}
