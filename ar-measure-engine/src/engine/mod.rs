//! Measurement geometry and temporal smoothing.
//!
//! ## Data Flow
//!
//! ```text
//! HitTestService ──> CrosshairTracker (Smoother) ──┬─> MeasurementEngine (on capture)
//!                                                   └─> frame pipeline (every tick)
//!                                                         └─> OverlayFrame event
//! ```
//!
//! ## Tick Model
//!
//! Each tick harvests the collaborator queries issued on the previous tick,
//! polling every future exactly once. Unresolved futures are dropped at the
//! tick boundary, and a batch whose `FrameGeneration` no longer matches is
//! discarded whole, so a query started before a clear or undo can never be
//! applied after it. The tick then dispatches the next batch.

/// Two-point capture state machine.
pub mod capture;

/// Metric and imperial distance labels.
pub mod format;

/// Immutable point and line value types.
pub mod model;

/// Per-tick scatter/gather of hit-test and projection queries.
pub mod pipeline;

/// Collaborator traits for the host AR session.
pub mod services;

/// Ordered collection of completed measurements.
pub mod session;

/// Engine configuration loaded from JSON.
pub mod settings;

/// Pinhole-camera stand-in for a real AR session.
pub mod simulated;

/// Exponential and rolling-average sample filters.
pub mod smoothing;

/// Pipeline counters reported to the host.
pub mod stats;
