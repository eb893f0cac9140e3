use std::fmt;
use std::time::Duration;

use bevy::math::Vec3;
use constants::tracking::DEGENERATE_LINE_LENGTH;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a captured point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub u64);

/// Opaque identifier of a completed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u64);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// A captured world position (meters, tracking frame). Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    id: PointId,
    position: Vec3,
    /// Time since app start at which the point was captured.
    captured_at: Duration,
}

impl Point3 {
    pub fn new(id: PointId, position: Vec3, captured_at: Duration) -> Self {
        Self {
            id,
            position,
            captured_at,
        }
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn captured_at(&self) -> Duration {
        self.captured_at
    }
}

/// A completed two-point measurement. Distance is always derived from the endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    id: LineId,
    start: Point3,
    end: Point3,
}

impl Line {
    pub fn new(id: LineId, start: Point3, end: Point3) -> Self {
        debug_assert_ne!(start.id, end.id, "line endpoints must be distinct points");
        Self { id, start, end }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn start(&self) -> &Point3 {
        &self.start
    }

    pub fn end(&self) -> &Point3 {
        &self.end
    }

    /// Euclidean length in meters.
    pub fn distance(&self) -> f32 {
        self.start.position.distance(self.end.position)
    }

    /// Zero-length (or nearly so) lines are kept but flagged.
    pub fn is_degenerate(&self) -> bool {
        self.distance() < DEGENERATE_LINE_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, position: Vec3) -> Point3 {
        Point3::new(PointId(id), position, Duration::from_millis(id * 16))
    }

    #[test]
    fn distance_is_symmetric() {
        let a = point(1, Vec3::new(0.0, 0.0, 0.0));
        let b = point(2, Vec3::new(3.0, 4.0, 0.0));
        let forward = Line::new(LineId(1), a, b);
        let backward = Line::new(LineId(2), b, a);
        assert!((forward.distance() - 5.0).abs() < 1e-6);
        assert_eq!(forward.distance(), backward.distance());
    }

    #[test]
    fn zero_length_line_is_flagged_not_rejected() {
        let a = point(1, Vec3::ONE);
        let b = point(2, Vec3::ONE);
        let line = Line::new(LineId(7), a, b);
        assert!(line.is_degenerate());
        assert_eq!(line.distance(), 0.0);
        assert_eq!(line.start().id(), PointId(1));
        assert_eq!(line.end().id(), PointId(2));
    }

    #[test]
    fn ids_display_compactly() {
        assert_eq!(PointId(4).to_string(), "p4");
        assert_eq!(LineId(12).to_string(), "l12");
    }
}
