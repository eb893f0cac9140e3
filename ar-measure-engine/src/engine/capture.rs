use std::time::Duration;

use bevy::prelude::*;
use serde::Serialize;

use super::model::{Line, LineId, Point3, PointId};

/// Where the two-point capture cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    AwaitingSecond,
}

impl CaptureState {
    /// Status line the host shows next to the crosshair.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Idle => "Tap to place the start point",
            Self::AwaitingSecond => "Move to the end point",
        }
    }
}

/// Result of feeding one confirmed world position to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureOutcome {
    /// First point buffered; engine is now awaiting the second.
    Started(Point3),
    /// Second point paired with the buffered one; engine is idle again.
    Completed(Line),
}

/// Capture state machine. Holds at most one pending point and mints ids for
/// every point and line it produces.
#[derive(Resource, Debug, Default)]
pub struct MeasurementEngine {
    pending: Option<Point3>,
    next_point_id: u64,
    next_line_id: u64,
}

impl MeasurementEngine {
    pub fn state(&self) -> CaptureState {
        if self.pending.is_some() {
            CaptureState::AwaitingSecond
        } else {
            CaptureState::Idle
        }
    }

    pub fn pending(&self) -> Option<&Point3> {
        self.pending.as_ref()
    }

    /// Feed a resolved world position. Callers with no surface under the
    /// crosshair must not call this.
    pub fn capture_point(&mut self, position: Vec3, captured_at: Duration) -> CaptureOutcome {
        let point = Point3::new(self.mint_point_id(), position, captured_at);
        match self.pending.take() {
            None => {
                self.pending = Some(point);
                CaptureOutcome::Started(point)
            }
            Some(start) => {
                let line = Line::new(self.mint_line_id(), start, point);
                CaptureOutcome::Completed(line)
            }
        }
    }

    /// Drop any pending point and return to `Idle`.
    pub fn reset(&mut self) -> Option<Point3> {
        self.pending.take()
    }

    /// Distance from the pending start to `current`, if a start is buffered.
    pub fn live_distance(&self, current: Vec3) -> Option<f32> {
        self.pending
            .as_ref()
            .map(|start| start.position().distance(current))
    }

    fn mint_point_id(&mut self) -> PointId {
        let id = PointId(self.next_point_id);
        self.next_point_id += 1;
        id
    }

    fn mint_line_id(&mut self) -> LineId {
        let id = LineId(self.next_line_id);
        self.next_line_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: Duration = Duration::from_millis(100);
    const T1: Duration = Duration::from_millis(900);

    #[test]
    fn single_capture_awaits_second() {
        let mut engine = MeasurementEngine::default();
        let a = Vec3::new(0.1, 0.0, -0.4);

        let outcome = engine.capture_point(a, T0);

        let CaptureOutcome::Started(point) = outcome else {
            panic!("expected Started, got {outcome:?}");
        };
        assert_eq!(engine.state(), CaptureState::AwaitingSecond);
        assert_eq!(engine.pending(), Some(&point));
        assert_eq!(point.position(), a);
        assert_eq!(point.captured_at(), T0);
    }

    #[test]
    fn two_captures_emit_ordered_line_and_return_to_idle() {
        let mut engine = MeasurementEngine::default();
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);

        engine.capture_point(a, T0);
        let outcome = engine.capture_point(b, T1);

        let CaptureOutcome::Completed(line) = outcome else {
            panic!("expected Completed, got {outcome:?}");
        };
        assert_eq!(line.start().position(), a);
        assert_eq!(line.end().position(), b);
        assert_ne!(line.start().id(), line.end().id());
        assert!((line.distance() - 1.0).abs() < 1e-6);
        assert_eq!(engine.state(), CaptureState::Idle);
        assert!(engine.pending().is_none());
    }

    #[test]
    fn reset_from_any_state_returns_to_idle() {
        let mut engine = MeasurementEngine::default();
        assert!(engine.reset().is_none());
        assert_eq!(engine.state(), CaptureState::Idle);

        engine.capture_point(Vec3::ONE, T0);
        let dropped = engine.reset();
        assert_eq!(dropped.map(|p| p.position()), Some(Vec3::ONE));
        assert_eq!(engine.state(), CaptureState::Idle);
        assert!(engine.pending().is_none());
    }

    #[test]
    fn ids_stay_unique_across_cycles() {
        let mut engine = MeasurementEngine::default();
        let mut lines = Vec::new();
        for i in 0..3 {
            engine.capture_point(Vec3::splat(i as f32), T0);
            if let CaptureOutcome::Completed(line) = engine.capture_point(Vec3::ZERO, T1) {
                lines.push(line);
            }
        }
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].id(), LineId(0));
        assert_eq!(lines[2].id(), LineId(2));
        assert_eq!(lines[2].end().id(), PointId(5));
    }

    #[test]
    fn live_distance_needs_pending_point() {
        let mut engine = MeasurementEngine::default();
        assert_eq!(engine.live_distance(Vec3::X), None);
        engine.capture_point(Vec3::ZERO, T0);
        assert_eq!(engine.live_distance(Vec3::new(0.0, 2.0, 0.0)), Some(2.0));
    }
}
