//! Fixed literals and tuning defaults shared by the measurement engine.

pub mod tracking;
pub mod units;
