//! Inbound protocol handling: status probes, hostile frames, and frame
//! integrity under concurrent writers.

#![allow(clippy::panic)]

mod common;

use presence_gateway::ws::{Envelope, EventKind};
use serde_json::{Value, json};
use tokio_test::assert_ok;

#[tokio::test]
async fn status_query_reports_presence() {
    let gw = common::spawn_gateway().await;

    let _a = common::connect(gw.addr, "a").await;
    common::wait_for_len(&gw.registry, 1).await;
    let _c = common::connect(gw.addr, "c").await;
    common::wait_for_len(&gw.registry, 2).await;
    let mut q = common::connect(gw.addr, "q").await;
    common::wait_for_len(&gw.registry, 3).await;

    common::send_text(&mut q, r#"{"event":"status","data":["a","b","c"]}"#).await;
    let reply = common::recv_event(&mut q, EventKind::StatusResult).await;
    assert_eq!(reply.data, json!({"a": true, "b": false, "c": true}));
}

#[tokio::test]
async fn status_query_with_wrong_payload_shape() {
    let gw = common::spawn_gateway().await;

    let mut q = common::connect(gw.addr, "q").await;
    common::wait_for_len(&gw.registry, 1).await;

    common::send_text(&mut q, r#"{"event":"status","data":"not-a-list"}"#).await;
    let reply = common::recv_event(&mut q, EventKind::StatusFail).await;
    assert!(reply.data.as_str().is_some());

    // Neither the connection nor the coordinator died.
    common::send_text(&mut q, r#"{"event":"status","data":["q"]}"#).await;
    let reply = common::recv_event(&mut q, EventKind::StatusResult).await;
    assert_eq!(reply.data, json!({"q": true}));
    assert_eq!(gw.registry.len().await, 1);
}

#[tokio::test]
async fn non_string_probe_elements_are_coerced() {
    let gw = common::spawn_gateway().await;

    let mut q = common::connect(gw.addr, "q").await;
    common::wait_for_len(&gw.registry, 1).await;

    common::send_text(&mut q, r#"{"event":"status","data":["q",42]}"#).await;
    let reply = common::recv_event(&mut q, EventKind::StatusResult).await;
    assert_eq!(reply.data, json!({"q": true, "42": false}));
}

#[tokio::test]
async fn hostile_frames_are_dropped() {
    let gw = common::spawn_gateway().await;

    let mut q = common::connect(gw.addr, "q").await;
    common::wait_for_len(&gw.registry, 1).await;

    // None of these may kill the read pump: not JSON, an empty frame, an
    // unknown event name, and a spoofed server-side event.
    common::send_text(&mut q, "this is not json").await;
    common::send_text(&mut q, "").await;
    common::send_text(&mut q, r#"{"event":"bogus","data":1}"#).await;
    common::send_text(&mut q, r#"{"event":"online","data":"spoof"}"#).await;

    common::send_text(&mut q, r#"{"event":"status","data":["q"]}"#).await;
    let reply = common::recv_event(&mut q, EventKind::StatusResult).await;
    assert_eq!(reply.data, json!({"q": true}));

    // The spoofed online event was not re-broadcast or registered.
    assert_eq!(gw.registry.len().await, 1);
    assert!(!gw.registry.contains("spoof").await);
}

#[tokio::test]
async fn concurrent_writes_never_interleave() {
    let gw = common::spawn_gateway().await;

    let mut sink = common::connect(gw.addr, "sink").await;
    common::wait_for_len(&gw.registry, 1).await;

    let fill = "x".repeat(4096);
    let mut writers = Vec::new();
    for task in 0..8u32 {
        let registry = gw.registry.clone();
        let fill = fill.clone();
        writers.push(tokio::spawn(async move {
            for seq in 0..50u32 {
                let envelope = Envelope {
                    event: EventKind::StatusResult,
                    data: json!({"task": task, "seq": seq, "fill": fill}),
                };
                registry.send_to(&envelope, "sink").await;
            }
        }));
    }

    // Read while the writers run; every frame must decode cleanly.
    for _ in 0..400 {
        let envelope = common::recv_envelope(&mut sink).await;
        assert_eq!(envelope.event, EventKind::StatusResult);
        assert_eq!(
            envelope.data.pointer("/fill").and_then(Value::as_str),
            Some(fill.as_str())
        );
    }

    for writer in writers {
        assert_ok!(writer.await);
    }
}
