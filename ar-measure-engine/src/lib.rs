//! Two-point AR tape measure.
//!
//! The engine keeps a session of measured lines, a two-state capture machine
//! and a smoothed estimate of the surface under the crosshair. Every tick it
//! projects the session into viewport coordinates and publishes an
//! `OverlayFrame` for the host UI to draw. Hit-testing and projection are
//! delegated to an `ArServices` resource supplied by the host.

use bevy::prelude::*;

pub mod engine;
pub mod rpc;
pub mod tools;

use engine::capture::MeasurementEngine;
use engine::pipeline::{
    CrosshairTracker, FrameGeneration, FrameQueries, OverlayFrame, dispatch_frame_queries,
    harvest_frame_queries,
};
use engine::session::MeasureSession;
use engine::settings::MeasureSettings;
use engine::stats::PipelineStats;
use rpc::web_rpc::WebRpcPlugin;
use tools::measure::{MeasureCommand, MeasureNotification, handle_measure_commands};

pub mod prelude {
    pub use crate::engine::capture::{CaptureState, MeasurementEngine};
    pub use crate::engine::format::{UnitSystem, format_distance};
    pub use crate::engine::model::{Line, LineId, Point3, PointId};
    pub use crate::engine::pipeline::{CrosshairTracker, FrameGeneration, OverlayFrame, ScreenLine};
    pub use crate::engine::services::{
        ArServices, HitTestService, ProjectionService, QueryFuture, ready,
    };
    pub use crate::engine::session::{MeasureSession, SessionError, SessionSummary};
    pub use crate::engine::settings::{MeasureSettings, PendingAnchor, SettingsError};
    pub use crate::engine::simulated::{CameraPose, SimulatedArScene};
    pub use crate::engine::smoothing::SmoothingStrategy;
    pub use crate::engine::stats::PipelineStats;
    pub use crate::rpc::web_rpc::{IncomingRpcMessage, WebRpcInterface};
    pub use crate::tools::measure::{MeasureCommand, MeasureNotification};
    pub use crate::{MeasurePlugin, MeasureSet, TickMode};
}

/// When the frame projection pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickMode {
    /// On the fixed timestep at `MeasureSettings::tick_hz`.
    #[default]
    Fixed,
    /// Once per app update, after commands. Deterministic for tests.
    EveryFrame,
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MeasureSet {
    /// Host messages turned into commands.
    Input,
    Commands,
    /// Gather last tick's queries and publish the overlay.
    Harvest,
    /// Issue this tick's queries.
    Dispatch,
}

pub struct MeasurePlugin {
    pub settings: MeasureSettings,
    pub tick_mode: TickMode,
    pub enable_rpc: bool,
}

impl Default for MeasurePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurePlugin {
    pub fn new() -> Self {
        Self {
            settings: MeasureSettings::default(),
            tick_mode: TickMode::Fixed,
            enable_rpc: true,
        }
    }

    pub fn every_frame() -> Self {
        Self {
            tick_mode: TickMode::EveryFrame,
            ..Self::new()
        }
    }

    pub fn with_settings(mut self, settings: MeasureSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn without_rpc(mut self) -> Self {
        self.enable_rpc = false;
        self
    }
}

impl Plugin for MeasurePlugin {
    fn build(&self, app: &mut App) {
        let settings = match self.settings.validate() {
            Ok(()) => self.settings.clone(),
            Err(e) => {
                error!("{}; falling back to default settings", e);
                MeasureSettings::default()
            }
        };

        app.insert_resource(CrosshairTracker::new(settings.smoothing))
            .init_resource::<MeasurementEngine>()
            .init_resource::<MeasureSession>()
            .init_resource::<FrameGeneration>()
            .init_resource::<FrameQueries>()
            .init_resource::<PipelineStats>()
            .add_event::<MeasureCommand>()
            .add_event::<MeasureNotification>()
            .add_event::<OverlayFrame>()
            .configure_sets(Update, (MeasureSet::Input, MeasureSet::Commands).chain())
            .add_systems(Update, handle_measure_commands.in_set(MeasureSet::Commands));

        let pipeline = (
            harvest_frame_queries.in_set(MeasureSet::Harvest),
            dispatch_frame_queries.in_set(MeasureSet::Dispatch),
        )
            .chain();

        match self.tick_mode {
            TickMode::Fixed => {
                info!("Frame pipeline ticking at {} Hz", settings.tick_hz);
                app.insert_resource(Time::<Fixed>::from_hz(settings.tick_hz))
                    .add_systems(FixedUpdate, pipeline);
            }
            TickMode::EveryFrame => {
                app.configure_sets(
                    Update,
                    (MeasureSet::Harvest, MeasureSet::Dispatch).after(MeasureSet::Commands),
                )
                .add_systems(Update, pipeline);
            }
        }

        app.insert_resource(settings);

        if self.enable_rpc {
            app.add_plugins(WebRpcPlugin);
        }
    }
}
