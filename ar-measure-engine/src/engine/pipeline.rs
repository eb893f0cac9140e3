use std::sync::{Mutex, PoisonError};

use bevy::prelude::*;
use bevy::tasks::futures_lite::future::{block_on, poll_once};
use serde::Serialize;

use super::capture::MeasurementEngine;
use super::format::format_distance;
use super::model::LineId;
use super::services::{ArServices, QueryFuture};
use super::session::MeasureSession;
use super::settings::{MeasureSettings, PendingAnchor};
use super::smoothing::{Smoother, SmoothingStrategy};
use super::stats::PipelineStats;

/// Epoch of the shared measurement state. Bumped on every session or engine
/// mutation; query batches issued under an older epoch are discarded.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeneration(u64);

impl FrameGeneration {
    pub fn current(&self) -> u64 {
        self.0
    }

    pub fn bump(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Smoothed estimate of the surface under the crosshair.
#[derive(Resource, Debug)]
pub struct CrosshairTracker {
    smoother: Smoother<Vec3>,
    estimate: Option<Vec3>,
}

impl CrosshairTracker {
    pub fn new(strategy: SmoothingStrategy) -> Self {
        Self {
            smoother: Smoother::from_strategy(strategy),
            estimate: None,
        }
    }

    /// Feed the latest hit-test answer.
    pub fn observe(&mut self, raw: Option<Vec3>) -> Option<Vec3> {
        self.estimate = self.smoother.observe(raw);
        self.estimate
    }

    /// The frame got no answer in time; report nothing without touching history.
    pub fn mark_unresolved(&mut self) {
        self.estimate = None;
    }

    pub fn estimate(&self) -> Option<Vec3> {
        self.estimate
    }

    /// Start a new tracking episode.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.estimate = None;
    }
}

impl Default for CrosshairTracker {
    fn default() -> Self {
        Self::new(SmoothingStrategy::default())
    }
}

/// A 2D segment for the overlay renderer, in normalised viewport coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenLine {
    /// `None` for the in-progress line.
    pub line: Option<LineId>,
    pub start: Vec2,
    pub end: Vec2,
    pub label: Option<String>,
}

/// Everything the overlay needs for one tick.
#[derive(Event, Debug, Clone, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub generation: u64,
    pub screen_lines: Vec<ScreenLine>,
    pub live_distance: Option<f32>,
    pub live_distance_text: Option<String>,
    pub surface_detected: bool,
}

struct LineQuery {
    id: LineId,
    distance: f32,
    start: QueryFuture<Option<Vec2>>,
    end: QueryFuture<Option<Vec2>>,
}

/// Queries issued on one tick, gathered on the next.
struct QueryBatch {
    generation: u64,
    surface: QueryFuture<Option<Vec3>>,
    lines: Vec<LineQuery>,
    pending_start: Option<QueryFuture<Option<Vec2>>>,
    /// Smoothed surface point at dispatch and its projection.
    surface_anchor: Option<(Vec3, QueryFuture<Option<Vec2>>)>,
}

/// In-flight collaborator queries.
#[derive(Resource, Default)]
pub struct FrameQueries {
    // Boxed futures are Send but not Sync.
    in_flight: Mutex<Option<QueryBatch>>,
}

impl FrameQueries {
    fn take(&mut self) -> Option<QueryBatch> {
        self.in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn replace(&mut self, batch: QueryBatch) -> Option<QueryBatch> {
        self.in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(batch)
    }

    pub fn is_in_flight(&mut self) -> bool {
        self.in_flight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Poll a query exactly once. Outer `None` means it has not resolved and is
/// abandoned at this tick boundary.
fn gather<T>(query: &mut QueryFuture<Option<T>>) -> Option<Option<T>> {
    block_on(poll_once(query))
}

/// Gather last tick's queries, apply them if still current, and publish the overlay.
pub fn harvest_frame_queries(
    mut queries: ResMut<FrameQueries>,
    mut tracker: ResMut<CrosshairTracker>,
    mut stats: ResMut<PipelineStats>,
    engine: Res<MeasurementEngine>,
    settings: Res<MeasureSettings>,
    generation: Res<FrameGeneration>,
    mut overlays: EventWriter<OverlayFrame>,
) {
    stats.ticks += 1;

    let Some(mut batch) = queries.take() else {
        return;
    };

    if batch.generation != generation.current() {
        debug!(
            "Discarding query batch from generation {} (now {})",
            batch.generation,
            generation.current()
        );
        stats.batches_discarded += 1;
        return;
    }

    // Surface under the crosshair feeds the smoother.
    match gather(&mut batch.surface) {
        Some(raw) => {
            tracker.observe(raw);
        }
        None => {
            stats.queries_abandoned += 1;
            tracker.mark_unresolved();
        }
    }
    let surface = tracker.estimate();

    let units = settings.unit_system;
    let mut screen_lines = Vec::with_capacity(batch.lines.len() + 1);

    for query in batch.lines.iter_mut() {
        let start = gather(&mut query.start);
        let end = gather(&mut query.end);
        match (start, end) {
            (Some(Some(start)), Some(Some(end))) => screen_lines.push(ScreenLine {
                line: Some(query.id),
                start,
                end,
                label: Some(format_distance(query.distance, units)),
            }),
            (start, end) => {
                // Off-screen endpoints are a visibility condition, not a failure.
                let unresolved = usize::from(start.is_none()) + usize::from(end.is_none());
                stats.queries_abandoned += unresolved as u64;
                stats.lines_culled += 1;
            }
        }
    }

    // The line end and the live readout describe the same world point.
    let mut live_point = surface;
    if let Some(mut pending_query) = batch.pending_start.take() {
        let start = gather(&mut pending_query);
        // A lost surface hides a surface-anchored line.
        let anchor = match (settings.pending_anchor, batch.surface_anchor.as_mut()) {
            (PendingAnchor::ScreenCenter, _) => Some(Some(settings.crosshair)),
            (PendingAnchor::Surface, _) if surface.is_none() => Some(None),
            (PendingAnchor::Surface, Some((anchor_point, query))) => {
                live_point = Some(*anchor_point);
                gather(query)
            }
            (PendingAnchor::Surface, None) => Some(None),
        };
        match (start, anchor) {
            (Some(Some(start)), Some(Some(end))) => {
                screen_lines.push(ScreenLine {
                    line: None,
                    start,
                    end,
                    label: None,
                });
            }
            (start, anchor) => {
                let unresolved = usize::from(start.is_none()) + usize::from(anchor.is_none());
                stats.queries_abandoned += unresolved as u64;
            }
        }
    }

    let live_distance = live_point.and_then(|position| engine.live_distance(position));

    overlays.write(OverlayFrame {
        generation: batch.generation,
        screen_lines,
        live_distance,
        live_distance_text: live_distance.map(|d| format_distance(d, units)),
        surface_detected: surface.is_some(),
    });
    stats.frames_published += 1;
}

/// Issue this tick's queries: crosshair hit-test, both endpoints of every
/// session line, and the pending start point (plus its anchor) when aiming.
pub fn dispatch_frame_queries(
    mut queries: ResMut<FrameQueries>,
    services: Option<Res<ArServices>>,
    tracker: Res<CrosshairTracker>,
    engine: Res<MeasurementEngine>,
    session: Res<MeasureSession>,
    settings: Res<MeasureSettings>,
    generation: Res<FrameGeneration>,
    mut warned: Local<bool>,
) {
    let Some(services) = services else {
        if !*warned {
            warn!("No AR services registered; frame projection is idle");
            *warned = true;
        }
        return;
    };

    let lines = session
        .iter()
        .map(|line| LineQuery {
            id: line.id(),
            distance: line.distance(),
            start: services.project(line.start().position()),
            end: services.project(line.end().position()),
        })
        .collect();

    let pending_start = engine
        .pending()
        .map(|point| services.project(point.position()));

    let surface_anchor = match (pending_start.is_some(), settings.pending_anchor) {
        (true, PendingAnchor::Surface) => tracker
            .estimate()
            .map(|position| (position, services.project(position))),
        _ => None,
    };

    let batch = QueryBatch {
        generation: generation.current(),
        surface: services.resolve_world_position(settings.crosshair),
        lines,
        pending_start,
        surface_anchor,
    };

    if queries.replace(batch).is_some() {
        // A batch nobody harvested; only happens if dispatch runs without harvest.
        warn!("Replacing unharvested query batch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_bumps_monotonically() {
        let mut generation = FrameGeneration::default();
        assert_eq!(generation.current(), 0);
        assert_eq!(generation.bump(), 1);
        assert_eq!(generation.bump(), 2);
        assert_eq!(generation.current(), 2);
    }

    #[test]
    fn tracker_unresolved_frame_keeps_history() {
        let mut tracker = CrosshairTracker::new(SmoothingStrategy::Exponential { factor: 0.5 });
        tracker.observe(Some(Vec3::ZERO));
        tracker.mark_unresolved();
        assert_eq!(tracker.estimate(), None);

        // History survived the unresolved frame, so the next sample is blended.
        let blended = tracker.observe(Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(blended, Some(Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn tracker_reset_starts_new_episode() {
        let mut tracker = CrosshairTracker::new(SmoothingStrategy::Exponential { factor: 0.5 });
        tracker.observe(Some(Vec3::ZERO));
        tracker.reset();
        assert_eq!(tracker.estimate(), None);
        assert_eq!(tracker.observe(Some(Vec3::ONE)), Some(Vec3::ONE));
    }

    #[test]
    fn gather_abandons_unresolved_queries() {
        let mut never: QueryFuture<Option<Vec3>> = Box::pin(std::future::pending());
        assert_eq!(gather(&mut never), None);

        let mut done: QueryFuture<Option<Vec3>> = Box::pin(std::future::ready(Some(Vec3::X)));
        assert_eq!(gather(&mut done), Some(Some(Vec3::X)));
    }
}
