use crate::engine::format::UnitSystem;
use crate::engine::model::{Line, Point3};
use crate::engine::pipeline::OverlayFrame;
use crate::engine::session::MeasureSession;
use crate::engine::settings::MeasureSettings;
use crate::engine::smoothing::SmoothingStrategy;
use crate::engine::stats::PipelineStats;
use crate::tools::measure::{MeasureCommand, MeasureNotification};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Resource managing bidirectional RPC communication between the host UI and the engine.
/// Handles both request-response patterns and notification broadcasting.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
    /// Serialised messages delivered on targets without a parent window.
    outbox: Vec<String>,
}

impl WebRpcInterface {
    /// Send notification to the host without expecting response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Queue response for transmission to the host.
    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    /// Take every message delivered so far (native hosts and tests).
    pub fn take_outbox(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }
}

/// Plugin establishing the JSON-RPC bridge to the host UI shell.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .in_set(crate::MeasureSet::Input),
            )
            .add_systems(
                PostUpdate,
                (
                    forward_measure_notifications,
                    forward_overlay_frames,
                    crate::engine::stats::pipeline_stats_notification_system,
                    send_outgoing_messages,
                )
                    .chain(),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    // Thread-safe message queue for cross-thread communication.
    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    match window() {
        Some(window) => {
            if let Err(e) =
                window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            {
                error!("Failed to register message listener: {:?}", e);
            }
        }
        None => error!("Window object not available"),
    }

    // Prevent closure from being dropped by transferring ownership to JS.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Resource wrapping thread-safe message queue for WASM event handling.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Raw JSON-RPC text received from the host. Native hosts write these directly.
#[derive(Event, Debug, Clone)]
pub struct IncomingRpcMessage {
    pub content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    session: Res<MeasureSession>,
    settings: Res<MeasureSettings>,
    stats: Res<PipelineStats>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut measure_commands: EventWriter<MeasureCommand>,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("Processing RPC method: {}", request.method);
                if let Some(response) = handle_rpc_request(
                    &request,
                    &session,
                    &settings,
                    &stats,
                    &mut measure_commands,
                ) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Dropping malformed RPC message: {}", parse_error);
                rpc_interface.queue_response(create_error_response(
                    serde_json::Value::Null,
                    -32700,
                    "Parse error",
                    Some(serde_json::json!({ "detail": parse_error.to_string() })),
                ));
            }
        }
    }
}

/// Handle individual RPC request. Requests without an ID are notifications:
/// they are still executed but produce no response.
fn handle_rpc_request(
    request: &RpcRequest,
    session: &MeasureSession,
    settings: &MeasureSettings,
    stats: &PipelineStats,
    measure_commands: &mut EventWriter<MeasureCommand>,
) -> Option<RpcResponse> {
    let result = match request.method.as_str() {
        "capture_point" => handle_capture_point(&request.params, measure_commands),
        "undo" => queue_command(MeasureCommand::Undo, measure_commands),
        "clear_all" => queue_command(MeasureCommand::ClearAll, measure_commands),
        "remove_measurement" => handle_remove_measurement(&request.params, measure_commands),
        "set_unit_system" => handle_set_unit_system(&request.params, measure_commands),
        "set_smoothing" => handle_set_smoothing(&request.params, settings, measure_commands),
        "get_session" => serde_json::to_value(session.summary(settings.unit_system))
            .map_err(|e| RpcError::internal_error(&e.to_string())),
        "get_pipeline_stats" => {
            serde_json::to_value(stats).map_err(|e| RpcError::internal_error(&e.to_string()))
        }
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            return request.id.clone().map(|id| {
                create_error_response(
                    id,
                    -32601,
                    "Method not found",
                    Some(serde_json::json!({"method": request.method})),
                )
            });
        }
    };

    let id = request.id.clone()?;
    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

fn queue_command(
    command: MeasureCommand,
    measure_commands: &mut EventWriter<MeasureCommand>,
) -> Result<serde_json::Value, RpcError> {
    info!("Measure command queued: {:?}", command);
    measure_commands.write(command);
    Ok(serde_json::json!({ "queued": true }))
}

/// Capture at an explicit position when given, otherwise at the crosshair.
fn handle_capture_point(
    params: &serde_json::Value,
    measure_commands: &mut EventWriter<MeasureCommand>,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize, Default)]
    struct CaptureParams {
        position: Option<[f32; 3]>,
    }

    let capture_params = if params.is_null() {
        CaptureParams::default()
    } else {
        serde_json::from_value::<CaptureParams>(params.clone())
            .map_err(|_| RpcError::invalid_params("Expected optional 'position' as [x, y, z]"))?
    };

    let command = match capture_params.position {
        Some(position) => MeasureCommand::CaptureAt(Vec3::from_array(position)),
        None => MeasureCommand::CaptureCrosshair,
    };
    queue_command(command, measure_commands)
}

fn handle_remove_measurement(
    params: &serde_json::Value,
    measure_commands: &mut EventWriter<MeasureCommand>,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct RemoveParams {
        index: usize,
    }

    let remove_params = serde_json::from_value::<RemoveParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected non-negative 'index' parameter"))?;

    queue_command(MeasureCommand::RemoveAt(remove_params.index), measure_commands)
}

fn handle_set_unit_system(
    params: &serde_json::Value,
    measure_commands: &mut EventWriter<MeasureCommand>,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct UnitParams {
        units: String,
    }

    let unit_params = serde_json::from_value::<UnitParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'units' parameter"))?;

    let units = UnitSystem::from_string(&unit_params.units).ok_or_else(|| {
        RpcError::invalid_params(&format!("Unknown unit system: {}", unit_params.units))
    })?;

    queue_command(MeasureCommand::SetUnits(units), measure_commands)
}

/// Params use the settings form, e.g. `{"strategy": "rolling_average", "window": 4}`.
fn handle_set_smoothing(
    params: &serde_json::Value,
    settings: &MeasureSettings,
    measure_commands: &mut EventWriter<MeasureCommand>,
) -> Result<serde_json::Value, RpcError> {
    let strategy = serde_json::from_value::<SmoothingStrategy>(params.clone()).map_err(|_| {
        RpcError::invalid_params("Expected 'strategy' of 'exponential' or 'rolling_average'")
    })?;

    let candidate = MeasureSettings {
        smoothing: strategy,
        ..settings.clone()
    };
    candidate
        .validate()
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;

    queue_command(MeasureCommand::SetSmoothing(strategy), measure_commands)
}

fn point_json(point: &Point3) -> serde_json::Value {
    let p = point.position();
    serde_json::json!({ "id": point.id(), "position": [p.x, p.y, p.z] })
}

fn line_json(line: &Line) -> serde_json::Value {
    serde_json::json!({
        "id": line.id(),
        "start": point_json(line.start()),
        "end": point_json(line.end()),
        "distance": line.distance(),
        "degenerate": line.is_degenerate(),
    })
}

/// Translate engine notifications into host notifications.
fn forward_measure_notifications(
    mut notifications: EventReader<MeasureNotification>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for notification in notifications.read() {
        let (method, params) = match notification {
            MeasureNotification::CaptureStarted { point } => (
                "measure_started",
                serde_json::json!({
                    "point": point_json(point),
                    "prompt": crate::engine::capture::CaptureState::AwaitingSecond.prompt(),
                }),
            ),
            MeasureNotification::MeasurementCompleted { line, label } => {
                let mut params = line_json(line);
                params["label"] = serde_json::json!(label);
                ("measure_completed", params)
            }
            MeasureNotification::CaptureFailed { message } => {
                ("measure_failed", serde_json::json!({ "message": message }))
            }
            MeasureNotification::PendingDiscarded { point } => (
                "measure_pending_discarded",
                serde_json::json!({ "point": point_json(point) }),
            ),
            MeasureNotification::MeasurementRemoved { index, line } => (
                "measure_removed",
                serde_json::json!({ "index": index, "line": line_json(line) }),
            ),
            MeasureNotification::SessionCleared { removed } => {
                ("measure_cleared", serde_json::json!({ "removed": removed }))
            }
            MeasureNotification::InvalidIndex { index, len } => (
                "invalid_index",
                serde_json::json!({ "index": index, "len": len }),
            ),
            MeasureNotification::UnitsChanged { units } => {
                ("units_changed", serde_json::json!({ "units": units }))
            }
            MeasureNotification::SmoothingChanged { strategy } => {
                match serde_json::to_value(strategy) {
                    Ok(params) => ("smoothing_changed", params),
                    Err(e) => {
                        error!("Failed to serialize smoothing strategy: {}", e);
                        continue;
                    }
                }
            }
        };
        rpc_interface.send_notification(method, params);
    }
}

/// Forward overlay frames, skipping ones identical to the last sent.
fn forward_overlay_frames(
    mut overlays: EventReader<OverlayFrame>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut last_sent: Local<Option<OverlayFrame>>,
) {
    let Some(latest) = overlays.read().last() else {
        return;
    };

    let unchanged = last_sent.as_ref().is_some_and(|previous| {
        previous.screen_lines == latest.screen_lines
            && previous.live_distance_text == latest.live_distance_text
            && previous.surface_detected == latest.surface_detected
    });
    if unchanged {
        return;
    }

    match serde_json::to_value(latest) {
        Ok(params) => rpc_interface.send_notification("overlay_frame", params),
        Err(e) => error!("Failed to serialize overlay frame: {}", e),
    }
    *last_sent = Some(latest.clone());
}

/// Create standardized error response with optional data payload.
fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

/// Send queued notifications and responses to the host.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    let notifications: Vec<_> = rpc_interface.outgoing_notifications.drain(..).collect();
    let responses: Vec<_> = rpc_interface.outgoing_responses.drain(..).collect();

    // Notifications first, responses second to maintain order.
    for notification in &notifications {
        send_message_to_parent(&mut rpc_interface, notification);
    }
    for response in &responses {
        send_message_to_parent(&mut rpc_interface, response);
    }
}

/// Serialise a message and hand it to the parent window, or to the outbox natively.
fn send_message_to_parent<T: Serialize>(rpc_interface: &mut WebRpcInterface, message: &T) {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message: {}", e);
            return;
        }
    };

    #[cfg(target_arch = "wasm32")]
    {
        let _ = rpc_interface;
        if let Some(window) = window() {
            if let Some(parent) = window.parent().ok().flatten() {
                if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                    error!("Failed to send message to parent: {:?}", e);
                }
            } else {
                warn!("No parent window available for message transmission");
            }
        } else {
            error!("Window object not available");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        rpc_interface.outbox.push(json);
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }
}
