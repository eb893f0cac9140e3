use bevy::prelude::*;

use crate::engine::capture::{CaptureOutcome, CaptureState, MeasurementEngine};
use crate::engine::format::{UnitSystem, format_distance};
use crate::engine::model::{Line, Point3};
use crate::engine::pipeline::{CrosshairTracker, FrameGeneration};
use crate::engine::session::{MeasureSession, SessionError};
use crate::engine::settings::MeasureSettings;
use crate::engine::smoothing::SmoothingStrategy;

/// Shown when a capture is requested with no surface under the crosshair.
pub const NO_SURFACE_MESSAGE: &str =
    "No surface detected. Aim the crosshair at a flat, textured surface and try again.";

/// User actions sent by the host UI.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum MeasureCommand {
    /// Capture at the current smoothed crosshair estimate.
    CaptureCrosshair,
    /// Capture a position the caller already resolved.
    CaptureAt(Vec3),
    /// Drop the pending point, or the last line when nothing is pending.
    Undo,
    /// Remove the line at an index.
    RemoveAt(usize),
    ClearAll,
    SetUnits(UnitSystem),
    SetSmoothing(SmoothingStrategy),
}

/// Outcomes reported back to the host UI.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum MeasureNotification {
    CaptureStarted {
        point: Point3,
    },
    MeasurementCompleted {
        line: Line,
        label: String,
    },
    /// One per failed capture attempt; never retried automatically.
    CaptureFailed {
        message: String,
    },
    PendingDiscarded {
        point: Point3,
    },
    MeasurementRemoved {
        index: usize,
        line: Line,
    },
    SessionCleared {
        removed: usize,
    },
    /// A remove request named an index outside the session.
    InvalidIndex {
        index: usize,
        len: usize,
    },
    UnitsChanged {
        units: UnitSystem,
    },
    /// The crosshair tracker was rebuilt; the surface estimate starts over.
    SmoothingChanged {
        strategy: SmoothingStrategy,
    },
}

/// Apply queued user actions to the session, engine and tracker, in order.
pub fn handle_measure_commands(
    mut commands: EventReader<MeasureCommand>,
    mut engine: ResMut<MeasurementEngine>,
    mut session: ResMut<MeasureSession>,
    mut tracker: ResMut<CrosshairTracker>,
    mut generation: ResMut<FrameGeneration>,
    mut settings: ResMut<MeasureSettings>,
    time: Res<Time>,
    mut notifications: EventWriter<MeasureNotification>,
) {
    for command in commands.read() {
        let estimate = tracker.estimate();
        match command {
            MeasureCommand::CaptureCrosshair => match estimate {
                Some(position) => capture(
                    position,
                    &time,
                    &mut engine,
                    &mut session,
                    &mut tracker,
                    &mut generation,
                    settings.unit_system,
                    &mut notifications,
                ),
                None => {
                    warn!("Capture failed: no surface under crosshair");
                    notifications.write(MeasureNotification::CaptureFailed {
                        message: NO_SURFACE_MESSAGE.to_string(),
                    });
                }
            },
            MeasureCommand::CaptureAt(position) => capture(
                *position,
                &time,
                &mut engine,
                &mut session,
                &mut tracker,
                &mut generation,
                settings.unit_system,
                &mut notifications,
            ),
            MeasureCommand::Undo => {
                if let Some(point) = engine.reset() {
                    generation.bump();
                    info!("Pending point {} discarded", point.id());
                    notifications.write(MeasureNotification::PendingDiscarded { point });
                } else if let Some(line) = session.remove_last() {
                    generation.bump();
                    info!("Measurement {} undone", line.id());
                    notifications.write(MeasureNotification::MeasurementRemoved {
                        index: session.len(),
                        line,
                    });
                }
            }
            MeasureCommand::RemoveAt(index) => match session.remove_at(*index) {
                Ok(line) => {
                    generation.bump();
                    info!("Measurement {} removed at index {}", line.id(), index);
                    notifications.write(MeasureNotification::MeasurementRemoved {
                        index: *index,
                        line,
                    });
                }
                Err(SessionError::IndexOutOfRange { index, len }) => {
                    error!("Rejected removal: index {index} out of range for {len} measurements");
                    notifications.write(MeasureNotification::InvalidIndex { index, len });
                }
            },
            MeasureCommand::ClearAll => {
                let removed = session.clear();
                engine.reset();
                tracker.reset();
                generation.bump();
                info!("Session cleared ({removed} measurements)");
                notifications.write(MeasureNotification::SessionCleared { removed });
            }
            MeasureCommand::SetUnits(units) => {
                settings.unit_system = *units;
                info!("Unit system set to {}", units.as_str());
                notifications.write(MeasureNotification::UnitsChanged { units: *units });
            }
            MeasureCommand::SetSmoothing(strategy) => {
                settings.smoothing = *strategy;
                *tracker = CrosshairTracker::new(*strategy);
                generation.bump();
                info!("Smoothing strategy set to {:?}", strategy);
                notifications.write(MeasureNotification::SmoothingChanged {
                    strategy: *strategy,
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn capture(
    position: Vec3,
    time: &Time,
    engine: &mut MeasurementEngine,
    session: &mut MeasureSession,
    tracker: &mut CrosshairTracker,
    generation: &mut FrameGeneration,
    units: UnitSystem,
    notifications: &mut EventWriter<MeasureNotification>,
) {
    let outcome = engine.capture_point(position, time.elapsed());
    generation.bump();

    match outcome {
        CaptureOutcome::Started(point) => {
            info!(
                "Measurement started at {}; {}",
                point.position(),
                CaptureState::AwaitingSecond.prompt()
            );
            notifications.write(MeasureNotification::CaptureStarted { point });
        }
        CaptureOutcome::Completed(line) => {
            let label = format_distance(line.distance(), units);
            if line.is_degenerate() {
                warn!("Measurement {} has near-zero length", line.id());
            }
            info!("Measurement {} completed: {}", line.id(), label);
            session.append(line);
            tracker.reset();
            notifications.write(MeasureNotification::MeasurementCompleted { line, label });
        }
    }
}
