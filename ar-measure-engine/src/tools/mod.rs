//! User-facing measuring tool.
//!
//! The host UI shell never touches engine state directly. It sends
//! `MeasureCommand` events (tap to capture, undo, remove, clear, unit toggle)
//! and receives `MeasureNotification` events back:
//!
//! ```text
//! Tap / RPC
//!   └─> MeasureCommand::CaptureCrosshair
//!       └─> handle_measure_commands()
//!           ├─> no estimate      ─> CaptureFailed (session untouched)
//!           ├─> Idle             ─> CaptureStarted ("Move to the end point")
//!           └─> AwaitingSecond   ─> Line appended ─> MeasurementCompleted
//! ```

/// Command handling for the two-point tape measure.
pub mod measure;
