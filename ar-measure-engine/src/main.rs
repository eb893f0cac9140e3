use std::sync::Arc;
use std::time::Duration;

use ar_measure_engine::prelude::*;
use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

/// Camera sweep speed along +X, in meters per second.
const SWEEP_SPEED: f32 = 0.25;
const CAMERA_HEIGHT: f32 = 1.5;
/// Seconds between scripted taps.
const TAP_INTERVAL: f32 = 1.5;
const DEMO_MEASUREMENTS: usize = 3;

/// Scripted user driving the simulated AR session.
#[derive(Resource)]
struct DemoScript {
    scene: Arc<SimulatedArScene>,
    last_tap: f32,
    completed: usize,
}

fn main() {
    create_app().run();
}

fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
    )
    .add_plugins(LogPlugin::default());

    let settings = load_settings();
    let scene = Arc::new(SimulatedArScene::new(camera_pose(0.0), 0.0));

    app.add_plugins(MeasurePlugin::new().with_settings(settings))
        .insert_resource(ArServices::from_scene(scene.clone()))
        .insert_resource(DemoScript {
            scene,
            last_tap: 0.0,
            completed: 0,
        })
        .add_systems(
            Update,
            (sweep_camera, scripted_taps)
                .chain()
                .before(MeasureSet::Input),
        )
        .add_systems(PostUpdate, (log_notifications, drain_outbox));

    app
}

/// Settings from the JSON file named on the command line, or defaults.
fn load_settings() -> MeasureSettings {
    let Some(path) = std::env::args().nth(1) else {
        return MeasureSettings::default();
    };

    match std::fs::read_to_string(&path) {
        Ok(json) => match MeasureSettings::from_json(&json) {
            Ok(settings) => {
                info!("Loaded settings from {}", path);
                settings
            }
            Err(e) => {
                error!("{} ({}); using defaults", e, path);
                MeasureSettings::default()
            }
        },
        Err(e) => {
            error!("Failed to read {}: {}; using defaults", path, e);
            MeasureSettings::default()
        }
    }
}

fn camera_pose(x: f32) -> CameraPose {
    CameraPose::looking_at(
        Vec3::new(x, CAMERA_HEIGHT, 0.0),
        Vec3::new(x, 0.0, -2.0),
    )
}

fn sweep_camera(script: Res<DemoScript>, time: Res<Time>) {
    script
        .scene
        .set_pose(camera_pose(time.elapsed_secs() * SWEEP_SPEED));
}

fn scripted_taps(
    mut script: ResMut<DemoScript>,
    time: Res<Time>,
    mut commands: EventWriter<MeasureCommand>,
) {
    let now = time.elapsed_secs();
    if now - script.last_tap >= TAP_INTERVAL {
        script.last_tap = now;
        commands.write(MeasureCommand::CaptureCrosshair);
    }
}

fn log_notifications(
    mut notifications: EventReader<MeasureNotification>,
    mut script: ResMut<DemoScript>,
    session: Res<MeasureSession>,
    settings: Res<MeasureSettings>,
    mut exit: EventWriter<AppExit>,
) {
    for notification in notifications.read() {
        match notification {
            MeasureNotification::MeasurementCompleted { label, .. } => {
                script.completed += 1;
                let summary = session.summary(settings.unit_system);
                info!(
                    "Measured {} ({} lines, total {})",
                    label, summary.count, summary.total_label
                );
            }
            MeasureNotification::CaptureFailed { message } => warn!("{}", message),
            other => debug!("{:?}", other),
        }
    }

    if script.completed >= DEMO_MEASUREMENTS {
        info!("Demo finished");
        exit.write(AppExit::Success);
    }
}

fn drain_outbox(rpc: Option<ResMut<WebRpcInterface>>) {
    let Some(mut rpc) = rpc else {
        return;
    };
    for message in rpc.take_outbox() {
        debug!("-> host: {}", message);
    }
}
