use bevy::prelude::*;
use constants::tracking::STATS_REPORT_INTERVAL_SECS;
use serde::Serialize;

use crate::rpc::web_rpc::WebRpcInterface;

/// Running counters for the frame projection pipeline.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub ticks: u64,
    pub frames_published: u64,
    /// Queries that had not resolved by the next tick boundary.
    pub queries_abandoned: u64,
    /// Whole batches dropped because state changed while they were in flight.
    pub batches_discarded: u64,
    /// Session lines left out of a frame because an endpoint was not visible.
    pub lines_culled: u64,
}

pub fn pipeline_stats_notification_system(
    mut rpc_interface: ResMut<WebRpcInterface>,
    stats: Res<PipelineStats>,
    mut last_send_time: Local<f32>,
    time: Res<Time>,
) {
    let current_time = time.elapsed_secs();

    if current_time - *last_send_time >= STATS_REPORT_INTERVAL_SECS {
        match serde_json::to_value(*stats) {
            Ok(params) => rpc_interface.send_notification("pipeline_stats", params),
            Err(e) => error!("Failed to serialize pipeline stats: {}", e),
        }
        *last_send_time = current_time;
    }
}
