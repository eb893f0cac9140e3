#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ar_measure_engine::prelude::*;
use bevy::prelude::*;

/// Hand-driven AR collaborator.
///
/// Projection maps the ground plane onto the viewport with
/// `(0.5 + x / 4, 0.5 + z / 4)`, so anything further than 2 m from the
/// origin along X or Z is off-screen.
#[derive(Default)]
pub struct ScriptedAr {
    hit: Mutex<Option<Vec3>>,
    stall_hit_test: AtomicBool,
}

impl ScriptedAr {
    pub fn set_hit(&self, hit: Option<Vec3>) {
        *self.hit.lock().unwrap() = hit;
    }

    /// Make hit-test queries never resolve.
    pub fn stall_hit_test(&self, stall: bool) {
        self.stall_hit_test.store(stall, Ordering::SeqCst);
    }
}

impl HitTestService for ScriptedAr {
    fn resolve_world_position(&self, _screen: Vec2) -> QueryFuture<Option<Vec3>> {
        if self.stall_hit_test.load(Ordering::SeqCst) {
            return Box::pin(std::future::pending());
        }
        ready(*self.hit.lock().unwrap())
    }
}

impl ProjectionService for ScriptedAr {
    fn project(&self, point: Vec3) -> QueryFuture<Option<Vec2>> {
        let screen = Vec2::new(0.5 + point.x * 0.25, 0.5 + point.z * 0.25);
        let visible = (0.0..=1.0).contains(&screen.x) && (0.0..=1.0).contains(&screen.y);
        ready(visible.then_some(screen))
    }
}

/// Everything the engine published, in order.
#[derive(Resource, Default)]
pub struct Collected {
    pub notifications: Vec<MeasureNotification>,
    pub overlays: Vec<OverlayFrame>,
}

impl Collected {
    pub fn last_overlay(&self) -> &OverlayFrame {
        self.overlays.last().expect("an overlay was published")
    }
}

fn collect(
    mut notifications: EventReader<MeasureNotification>,
    mut overlays: EventReader<OverlayFrame>,
    mut collected: ResMut<Collected>,
) {
    collected.notifications.extend(notifications.read().cloned());
    collected.overlays.extend(overlays.read().cloned());
}

/// Unsmoothed settings so estimates equal the last raw hit.
pub fn exact_settings() -> MeasureSettings {
    MeasureSettings {
        smoothing: SmoothingStrategy::Exponential { factor: 1.0 },
        ..default()
    }
}

pub fn test_app(settings: MeasureSettings) -> (App, Arc<ScriptedAr>) {
    let scene = Arc::new(ScriptedAr::default());
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(MeasurePlugin::every_frame().with_settings(settings))
        .insert_resource(ArServices::from_scene(scene.clone()))
        .init_resource::<Collected>()
        .add_systems(PostUpdate, collect);
    (app, scene)
}

/// Dispatch then harvest, so the tracker holds the current hit.
pub fn settle(app: &mut App) {
    app.update();
    app.update();
}

pub fn send(app: &mut App, command: MeasureCommand) {
    app.world_mut().send_event(command);
    app.update();
}

pub fn collected(app: &App) -> &Collected {
    app.world().resource::<Collected>()
}

pub fn take_notifications(app: &mut App) -> Vec<MeasureNotification> {
    std::mem::take(&mut app.world_mut().resource_mut::<Collected>().notifications)
}

pub fn session(app: &App) -> &MeasureSession {
    app.world().resource::<MeasureSession>()
}

pub fn stats(app: &App) -> PipelineStats {
    *app.world().resource::<PipelineStats>()
}

pub fn measure(app: &mut App, start: Vec3, end: Vec3) {
    send(app, MeasureCommand::CaptureAt(start));
    send(app, MeasureCommand::CaptureAt(end));
}
