//! JSON-RPC 2.0 bridge between the host UI shell and the measuring engine.
//!
//! On the web the engine runs inside an iframe and talks to its parent via
//! `postMessage`. Native hosts write `IncomingRpcMessage` events directly and
//! drain replies with `WebRpcInterface::take_outbox()`.
//!
//! ## Message Flow
//!
//! ```text
//! Host UI                                   Engine
//!    │                                        │
//!    ├─ Request (with ID) ──────────────────> ├─ MeasureCommand queued
//!    │ <───────────────── Response (with ID) ─┤
//!    │                                        │
//!    │ <────────── Notification (no ID) ──────┤  measure_*, overlay_frame,
//!    │                                        │  pipeline_stats
//! ```
//!
//! Commands are applied later in the same frame, so a response only
//! acknowledges that a command was queued. The outcome arrives as a
//! notification.
//!
//! ## Methods
//!
//! - `capture_point`: optional `position: [x, y, z]`, otherwise the crosshair
//! - `undo`, `clear_all`
//! - `remove_measurement`: `index`
//! - `set_unit_system`: `units` (`"metric"` or `"imperial"`)
//! - `set_smoothing`: `{"strategy": "exponential", "factor": f}` or
//!   `{"strategy": "rolling_average", "window": n}`
//! - `get_session`: ordered measurements with labels and total distance
//! - `get_pipeline_stats`: frame pipeline counters
//!
//! ## Error Handling
//!
//! - `-32700`: Parse error
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error

pub mod web_rpc;
