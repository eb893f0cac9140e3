mod common;

use ar_measure_engine::prelude::*;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use common::*;
use serde_json::{Value, json};
use std::time::Duration;

fn rpc(app: &mut App, message: Value) {
    app.world_mut().send_event(IncomingRpcMessage {
        content: message.to_string(),
    });
    app.update();
}

fn drain(app: &mut App) -> Vec<Value> {
    app.world_mut()
        .resource_mut::<WebRpcInterface>()
        .take_outbox()
        .iter()
        .map(|message| serde_json::from_str(message).expect("outbox holds valid JSON"))
        .collect()
}

fn response(messages: &[Value], id: i64) -> &Value {
    messages
        .iter()
        .find(|m| m["id"] == json!(id))
        .expect("response with matching id")
}

fn notifications<'a>(messages: &'a [Value], method: &str) -> Vec<&'a Value> {
    messages
        .iter()
        .filter(|m| m["method"] == json!(method))
        .collect()
}

#[test]
fn capture_requests_measure_and_session_reports_it() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "capture_point", "params": {"position": [0.0, 0.0, 0.0]}, "id": 1}),
    );
    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "capture_point", "params": {"position": [1.0, 0.0, 0.0]}, "id": 2}),
    );
    let messages = drain(&mut app);

    assert_eq!(response(&messages, 1)["result"]["queued"], json!(true));
    assert_eq!(response(&messages, 2)["result"]["queued"], json!(true));
    assert_eq!(notifications(&messages, "measure_started").len(), 1);
    let completed = notifications(&messages, "measure_completed");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["params"]["label"], json!("1.00 m"));

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "get_session", "id": 3}),
    );
    let messages = drain(&mut app);
    let summary = &response(&messages, 3)["result"];
    assert_eq!(summary["count"], json!(1));
    assert_eq!(summary["units"], json!("metric"));
    assert_eq!(summary["lines"][0]["label"], json!("1.00 m"));
    assert_eq!(summary["total_label"], json!("1.00 m"));
}

#[test]
fn capture_without_position_uses_crosshair() {
    let (mut app, scene) = test_app(exact_settings());

    scene.set_hit(None);
    settle(&mut app);
    drain(&mut app);

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "capture_point", "id": 7}),
    );
    let messages = drain(&mut app);

    assert_eq!(response(&messages, 7)["result"]["queued"], json!(true));
    assert_eq!(notifications(&messages, "measure_failed").len(), 1);
}

#[test]
fn unknown_method_returns_method_not_found() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "teleport", "id": 4}),
    );
    let messages = drain(&mut app);

    assert_eq!(response(&messages, 4)["error"]["code"], json!(-32601));
}

#[test]
fn bad_params_return_invalid_params() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "set_unit_system", "params": {"units": "cubits"}, "id": 5}),
    );
    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "remove_measurement", "params": {"index": -1}, "id": 6}),
    );
    let messages = drain(&mut app);

    assert_eq!(response(&messages, 5)["error"]["code"], json!(-32602));
    assert_eq!(response(&messages, 6)["error"]["code"], json!(-32602));
    assert!(notifications(&messages, "units_changed").is_empty());
    assert_eq!(
        app.world().resource::<MeasureSettings>().unit_system,
        UnitSystem::Metric
    );
}

#[test]
fn unit_system_change_is_notified() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "set_unit_system", "params": {"units": "Imperial"}, "id": 8}),
    );
    let messages = drain(&mut app);

    let changed = notifications(&messages, "units_changed");
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0]["params"]["units"], json!("imperial"));
}

#[test]
fn out_of_range_removal_is_notified() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "remove_measurement", "params": {"index": 3}, "id": 9}),
    );
    let messages = drain(&mut app);

    let invalid = notifications(&messages, "invalid_index");
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0]["params"], json!({"index": 3, "len": 0}));
}

#[test]
fn requests_without_id_run_but_get_no_response() {
    let (mut app, _scene) = test_app(exact_settings());

    measure(&mut app, Vec3::ZERO, Vec3::X);
    drain(&mut app);

    rpc(&mut app, json!({"jsonrpc": "2.0", "method": "clear_all"}));
    let messages = drain(&mut app);

    assert!(messages.iter().all(|m| m.get("id").is_none()));
    let cleared = notifications(&messages, "measure_cleared");
    assert_eq!(cleared.len(), 1);
    assert_eq!(cleared[0]["params"]["removed"], json!(1));
    assert!(session(&app).is_empty());
}

#[test]
fn malformed_message_returns_parse_error() {
    let (mut app, _scene) = test_app(exact_settings());

    app.world_mut().send_event(IncomingRpcMessage {
        content: "{not json".to_string(),
    });
    app.update();
    let messages = drain(&mut app);

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["error"]["code"], json!(-32700));
}

#[test]
fn overlay_frames_are_only_sent_when_they_change() {
    let (mut app, scene) = test_app(exact_settings());

    scene.set_hit(Some(Vec3::X));
    settle(&mut app);
    let messages = drain(&mut app);
    assert_eq!(notifications(&messages, "overlay_frame").len(), 1);

    settle(&mut app);
    let messages = drain(&mut app);
    assert!(notifications(&messages, "overlay_frame").is_empty());

    scene.set_hit(None);
    settle(&mut app);
    let messages = drain(&mut app);
    let overlays = notifications(&messages, "overlay_frame");
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0]["params"]["surface_detected"], json!(false));
}

#[test]
fn pipeline_stats_are_reported_on_request() {
    let (mut app, _scene) = test_app(exact_settings());

    settle(&mut app);
    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "get_pipeline_stats", "id": 10}),
    );
    let messages = drain(&mut app);

    let stats = &response(&messages, 10)["result"];
    assert_eq!(stats["ticks"], json!(2));
    assert_eq!(stats["frames_published"], json!(1));
}

#[test]
fn smoothing_can_be_changed_over_rpc() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "set_smoothing", "params": {"strategy": "rolling_average", "window": 4}, "id": 11}),
    );
    let messages = drain(&mut app);

    assert_eq!(response(&messages, 11)["result"]["queued"], json!(true));
    let changed = notifications(&messages, "smoothing_changed");
    assert_eq!(changed.len(), 1);
    assert_eq!(
        changed[0]["params"],
        json!({"strategy": "rolling_average", "window": 4})
    );
    assert_eq!(
        app.world().resource::<MeasureSettings>().smoothing,
        SmoothingStrategy::RollingAverage { window: 4 }
    );
}

#[test]
fn invalid_smoothing_is_rejected() {
    let (mut app, _scene) = test_app(exact_settings());

    rpc(
        &mut app,
        json!({"jsonrpc": "2.0", "method": "set_smoothing", "params": {"strategy": "exponential", "factor": 1.5}, "id": 12}),
    );
    let messages = drain(&mut app);

    assert_eq!(response(&messages, 12)["error"]["code"], json!(-32602));
    assert!(notifications(&messages, "smoothing_changed").is_empty());
}

#[test]
fn pipeline_stats_are_pushed_periodically() {
    let (mut app, _scene) = test_app(exact_settings());
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(200)));

    for _ in 0..6 {
        app.update();
    }
    let messages = drain(&mut app);

    let pushed = notifications(&messages, "pipeline_stats");
    assert!(!pushed.is_empty());
    assert!(pushed[0]["params"]["ticks"].is_u64());
    assert!(pushed[0]["params"]["frames_published"].is_u64());
}
