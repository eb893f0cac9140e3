use bevy::math::Vec2;

/// Normalised viewport coordinate of the crosshair used for hit-testing and capture.
pub const CROSSHAIR: Vec2 = Vec2::new(0.5, 0.5);

/// Default rate of the frame projection tick.
pub const DEFAULT_TICK_HZ: f64 = 30.0;

/// Default exponential smoothing factor for the crosshair surface estimate.
/// Lower is steadier, higher is more responsive.
pub const DEFAULT_SMOOTH_FACTOR: f32 = 0.15;

/// Default number of samples held by the rolling-average smoother.
pub const DEFAULT_ROLLING_WINDOW: usize = 3;

/// Lines shorter than this (meters) are reported as degenerate.
pub const DEGENERATE_LINE_LENGTH: f32 = 0.001;

/// How often pipeline statistics are pushed to the host (seconds).
pub const STATS_REPORT_INTERVAL_SECS: f32 = 0.5;
