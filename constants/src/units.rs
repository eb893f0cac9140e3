/// Centimeters in one meter.
pub const CENTIMETERS_PER_METER: f64 = 100.0;

/// Inches in one meter.
pub const INCHES_PER_METER: f64 = 39.3701;

/// Inches in one foot.
pub const INCHES_PER_FOOT: f64 = 12.0;

/// Metric readouts below this many meters are shown in centimeters.
pub const METRIC_CENTIMETER_THRESHOLD: f64 = 1.0;

/// Imperial readouts below this many inches are shown in inches.
pub const IMPERIAL_INCH_THRESHOLD: f64 = 12.0;
