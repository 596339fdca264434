//! Websocket observers of the status broadcast service.

use async_tungstenite::tokio::{client_async, TokioAdapter};
use async_tungstenite::tungstenite::Message;
use async_tungstenite::WebSocketStream;
use futures::StreamExt;
use machineapp::config::{ConfigError, NotifierSettings};
use machineapp::notifier::{self, NotificationLevel, Notifier};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

type Observer = WebSocketStream<TokioAdapter<TcpStream>>;

fn local_settings() -> NotifierSettings {
    NotifierSettings {
        bind_addr: "127.0.0.1:0".to_string(),
        drain_interval_ms: 10,
        observer_capacity: 16,
    }
}

async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        sleep(Duration::from_millis(5)).await;
    }
}

async fn connect(notifier: &Notifier) -> Observer {
    let addr = notifier.local_addr().unwrap();
    let stream = TcpStream::connect(addr).await.unwrap();
    let (socket, _) = client_async(format!("ws://{addr}"), stream).await.unwrap();
    socket
}

async fn next_frame(observer: &mut Observer) -> Value {
    let message = timeout(Duration::from_secs(5), observer.next())
        .await
        .expect("no frame received")
        .unwrap()
        .unwrap();
    match message {
        Message::Text(_) => serde_json::from_str(message.to_text().unwrap()).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn late_observers_only_see_new_events() {
    let notifier = Notifier::start(local_settings()).unwrap();
    notifier.send_message(NotificationLevel::Info, "before anyone listened", None);
    wait_for("queue drain", || notifier.pending() == 0).await;

    let mut observer = connect(&notifier).await;
    wait_for("observer registration", || notifier.observer_count() == 1).await;

    notifier.send_message(
        NotificationLevel::UiInfo,
        "Cycle 4 complete",
        Some(json!({"parts": 4})),
    );
    let frame = next_frame(&mut observer).await;

    assert_eq!(frame["level"], "ui_info");
    assert_eq!(frame["message"], "Cycle 4 complete");
    assert_eq!(frame["customPayload"]["parts"], 4);
    assert!(frame["timeSeconds"].is_f64());

    notifier.set_dead();
}

#[tokio::test]
async fn every_observer_receives_every_event_in_order() {
    let notifier = Notifier::start(local_settings()).unwrap();
    let mut first = connect(&notifier).await;
    let mut second = connect(&notifier).await;
    wait_for("observer registration", || notifier.observer_count() == 2).await;

    notifier.send_message(NotificationLevel::AppStart, "MachineApp started", None);
    notifier.send_message(NotificationLevel::AppStateChange, "Entered MachineApp state: Home", None);

    for observer in [&mut first, &mut second] {
        let start = next_frame(observer).await;
        let change = next_frame(observer).await;
        assert_eq!(start["level"], "app_start");
        assert!(start["customPayload"].is_null());
        assert_eq!(change["message"], "Entered MachineApp state: Home");
    }

    notifier.set_dead();
}

#[tokio::test]
async fn disconnected_observers_are_forgotten() {
    let notifier = Notifier::start(local_settings()).unwrap();
    let mut observer = connect(&notifier).await;
    let mut other = connect(&notifier).await;
    wait_for("observer registration", || notifier.observer_count() == 2).await;

    observer.close(None).await.unwrap();
    wait_for("observer removal", || notifier.observer_count() == 1).await;

    notifier.send_message(NotificationLevel::Warning, "door open", None);
    assert_eq!(next_frame(&mut other).await["message"], "door open");

    notifier.set_dead();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let settings = NotifierSettings {
        bind_addr: taken.local_addr().unwrap().to_string(),
        ..local_settings()
    };

    let result = Notifier::start(settings);

    assert!(matches!(
        result,
        Err(machineapp::notifier::NotifierError::Bind { .. })
    ));
}

#[test]
fn zero_drain_interval_is_rejected_before_binding() {
    let settings = NotifierSettings {
        drain_interval_ms: 0,
        ..local_settings()
    };

    let result = Notifier::start(settings);

    assert!(matches!(
        result,
        Err(machineapp::notifier::NotifierError::Settings(
            ConfigError::Invalid { field: "notifier.drain_interval_ms", .. }
        ))
    ));
}

#[test]
fn process_wide_notifier_initializes_once() {
    assert!(notifier::initialize_notifier(local_settings()));
    assert!(!notifier::initialize_notifier(local_settings()));

    let global = notifier::notifier();
    assert!(global.is_alive());
    assert!(global.local_addr().is_some());

    notifier::send_notification(NotificationLevel::Info, "hello", None);
    assert!(std::ptr::eq(global, notifier::notifier()));
}
