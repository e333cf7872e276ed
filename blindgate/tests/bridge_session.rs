//! End-to-end session through the JSON-lines bridge and the controller.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use blindgate::bridge::Bridge;
use blindgate::config::CoverConfig;
use blindgate::cover::{CoverController, CoverEngine};

const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Channel depth used by `blindgated`.
const DAEMON_DEPTH: usize = 32;

struct Host {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
}

impl Host {
    async fn send(&mut self, line: Value) {
        self.send_raw(&line.to_string()).await;
    }

    async fn send_raw(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = timeout(READ_TIMEOUT, self.output.next_line())
            .await
            .expect("bridge output timed out")
            .unwrap()
            .expect("bridge output closed");
        serde_json::from_str(&line).unwrap()
    }
}

struct Session {
    host: Host,
    bridge: JoinHandle<blindgate::error::Result<()>>,
    controller: JoinHandle<()>,
    running: CancellationToken,
}

fn start(config: &str, depth: usize, pipe_size: usize) -> Session {
    let config = CoverConfig::from_json(config).unwrap();

    let (host_input, bridge_input) = tokio::io::duplex(pipe_size);
    let (bridge_output, host_output) = tokio::io::duplex(pipe_size);
    let (event_tx, event_rx) = mpsc::channel(depth);
    let (notify_tx, notify_rx) = mpsc::channel(depth);
    let (command_tx, command_rx) = mpsc::channel(depth);
    let running = CancellationToken::new();

    let controller =
        CoverController::new(CoverEngine::new(&config), event_rx, notify_tx, command_tx);
    let controller = tokio::spawn(controller.run(running.clone()));
    let bridge = Bridge::new(bridge_input, bridge_output, event_tx, notify_rx, command_rx);
    let bridge = tokio::spawn(bridge.run(running.clone()));

    Session {
        host: Host {
            input: host_input,
            output: BufReader::new(host_output).lines(),
        },
        bridge,
        controller,
        running,
    }
}

const TEST_BLIND: &str = r#"{"name":"Test Blind","topicBase":"zigbee2mqtt/test","targetConsolidate":50}"#;

fn notify(property: &str, value: u8) -> Value {
    json!({"kind": "notify", "property": property, "value": value})
}

fn publish(topic: &str, payload: &str) -> Value {
    json!({"kind": "publish", "topic": topic, "payload": payload})
}

#[tokio::test]
async fn session_filters_echoes_and_debounces_writes() {
    let Session {
        mut host,
        bridge,
        controller,
        running,
    } = start(TEST_BLIND, 16, 4096);

    // Startup: ask the device where it is.
    assert_eq!(host.recv().await, publish("zigbee2mqtt/test/get/position", "1"));

    // First state report is adopted and read back.
    host.send(json!({
        "kind": "message",
        "topic": "zigbee2mqtt/test",
        "payload": {"position": 50, "battery": 90, "linkquality": 80},
    }))
    .await;
    assert_eq!(host.recv().await, notify("currentPosition", 50));
    assert_eq!(host.recv().await, notify("targetPosition", 50));
    assert_eq!(host.recv().await, notify("batteryLevel", 90));

    // A slider drag collapses to its last value.
    for value in ["60", "70", "80"] {
        host.send(json!({"kind": "write", "property": "targetPosition", "value": value}))
            .await;
    }
    assert_eq!(host.recv().await, publish("zigbee2mqtt/test/set/position", "80"));

    // The immediate echo of 80 is dropped; only the read-back comes out.
    host.send(json!({
        "kind": "message",
        "topic": "zigbee2mqtt/test",
        "payload": "{\"position\":80,\"battery\":90}",
    }))
    .await;
    assert_eq!(host.recv().await, notify("targetPosition", 80));

    // Garbage doesn't stop the session.
    host.send_raw("this is not json").await;
    host.send(json!({
        "kind": "message",
        "topic": "zigbee2mqtt/test",
        "payload": {"battery": 85},
    }))
    .await;
    assert_eq!(host.recv().await, notify("batteryLevel", 85));

    // Host hangs up.
    drop(host.input);
    timeout(READ_TIMEOUT, bridge)
        .await
        .expect("bridge did not stop")
        .unwrap()
        .unwrap();

    running.cancel();
    timeout(READ_TIMEOUT, controller)
        .await
        .expect("controller did not stop")
        .unwrap();
}

#[tokio::test]
async fn output_queued_at_end_of_input_is_written() {
    let Session {
        mut host,
        bridge,
        controller,
        ..
    } = start(TEST_BLIND, DAEMON_DEPTH, 4096);

    host.send(json!({
        "kind": "message",
        "topic": "zigbee2mqtt/test",
        "payload": {"position": 30, "battery": 70},
    }))
    .await;
    drop(host.input);

    let mut lines = Vec::new();
    while let Some(line) = timeout(READ_TIMEOUT, host.output.next_line())
        .await
        .expect("bridge output timed out")
        .unwrap()
    {
        lines.push(serde_json::from_str::<Value>(&line).unwrap());
    }

    assert_eq!(
        lines,
        vec![
            publish("zigbee2mqtt/test/get/position", "1"),
            notify("currentPosition", 30),
            notify("targetPosition", 30),
            notify("batteryLevel", 70),
        ]
    );
    bridge.await.unwrap().unwrap();
    controller.await.unwrap();
}

#[tokio::test]
async fn input_flood_does_not_stall_output() {
    const MESSAGES: usize = 2000;

    let Session {
        host,
        bridge,
        controller,
        ..
    } = start(TEST_BLIND, DAEMON_DEPTH, 1 << 20);
    let Host {
        mut input,
        mut output,
    } = host;

    // Every message moves the cover externally and changes the battery, so
    // each yields current, target and battery notifications.
    let feeder = tokio::spawn(async move {
        for i in 0..MESSAGES {
            let (position, battery) = if i % 2 == 0 { (10, 90) } else { (20, 80) };
            let line = json!({
                "kind": "message",
                "topic": "zigbee2mqtt/test",
                "payload": {"position": position, "battery": battery},
            });
            input.write_all(format!("{line}\n").as_bytes()).await.unwrap();
        }
    });

    let received = timeout(Duration::from_secs(30), async {
        let mut count = 0;
        while output.next_line().await.unwrap().is_some() {
            count += 1;
        }
        count
    })
    .await
    .expect("bridge output stalled");

    assert_eq!(received, 1 + 3 * MESSAGES);
    feeder.await.unwrap();
    bridge.await.unwrap().unwrap();
    controller.await.unwrap();
}
