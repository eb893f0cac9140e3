use std::sync::RwLock;

use bevy::prelude::*;

use super::services::{HitTestService, ProjectionService, QueryFuture, ready};

/// Pinhole camera pose and intrinsics. Looks down local -Z like a Bevy camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
}

impl CameraPose {
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let rotation = Transform::from_translation(position)
            .looking_at(target, Vec3::Y)
            .rotation;
        Self {
            position,
            rotation,
            fov_y: 60f32.to_radians(),
            aspect: 9.0 / 16.0,
        }
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (
            self.rotation * Vec3::X,
            self.rotation * Vec3::Y,
            self.rotation * Vec3::NEG_Z,
        )
    }

    /// World-space ray through a normalised viewport coordinate (origin top-left).
    pub fn viewport_ray(&self, screen: Vec2) -> Ray3d {
        let (right, up, forward) = self.basis();
        let tan_half = (self.fov_y * 0.5).tan();
        let ndc_x = screen.x * 2.0 - 1.0;
        let ndc_y = 1.0 - screen.y * 2.0;
        let direction = forward
            + right * (ndc_x * tan_half * self.aspect)
            + up * (ndc_y * tan_half);
        Ray3d::new(self.position, Dir3::new(direction).unwrap_or(Dir3::NEG_Z))
    }

    /// Normalised viewport coordinate of `point`, or `None` when behind the
    /// camera or outside the frame.
    pub fn world_to_viewport(&self, point: Vec3) -> Option<Vec2> {
        let (right, up, forward) = self.basis();
        let relative = point - self.position;
        let depth = relative.dot(forward);
        if depth <= NEAR_CLIP {
            return None;
        }
        let tan_half = (self.fov_y * 0.5).tan();
        let ndc_x = relative.dot(right) / (depth * tan_half * self.aspect);
        let ndc_y = relative.dot(up) / (depth * tan_half);
        if ndc_x.abs() > 1.0 || ndc_y.abs() > 1.0 {
            return None;
        }
        Some(Vec2::new((ndc_x + 1.0) * 0.5, (1.0 - ndc_y) * 0.5))
    }
}

const NEAR_CLIP: f32 = 1e-3;

/// Stand-in AR session: a camera over a horizontal ground plane, optionally
/// bounded to a square detected region around the origin.
#[derive(Debug)]
pub struct SimulatedArScene {
    pose: RwLock<CameraPose>,
    ground_height: f32,
    surface_half_extent: Option<f32>,
}

impl SimulatedArScene {
    pub fn new(pose: CameraPose, ground_height: f32) -> Self {
        Self {
            pose: RwLock::new(pose),
            ground_height,
            surface_half_extent: None,
        }
    }

    /// Limit hits to `|x|, |z| <= half_extent`, as if only that plane were detected.
    pub fn with_surface_extent(mut self, half_extent: f32) -> Self {
        self.surface_half_extent = Some(half_extent);
        self
    }

    pub fn pose(&self) -> Option<CameraPose> {
        self.pose.read().ok().map(|pose| *pose)
    }

    pub fn set_pose(&self, pose: CameraPose) {
        if let Ok(mut current) = self.pose.write() {
            *current = pose;
        } else {
            warn!("Simulated camera pose lock poisoned; pose not updated");
        }
    }

    /// Ray/plane intersection against the ground, clipped to the detected extent.
    pub fn hit_test(&self, screen: Vec2) -> Option<Vec3> {
        let ray = self.pose()?.viewport_ray(screen);
        if ray.direction.y.abs() < 0.001 {
            return None;
        }
        let t = (self.ground_height - ray.origin.y) / ray.direction.y;
        if t <= 0.0 {
            return None;
        }
        let hit = ray.origin + ray.direction * t;
        match self.surface_half_extent {
            Some(extent) if hit.x.abs() > extent || hit.z.abs() > extent => None,
            _ => Some(hit),
        }
    }
}

impl HitTestService for SimulatedArScene {
    fn resolve_world_position(&self, screen: Vec2) -> QueryFuture<Option<Vec3>> {
        ready(self.hit_test(screen))
    }
}

impl ProjectionService for SimulatedArScene {
    fn project(&self, point: Vec3) -> QueryFuture<Option<Vec2>> {
        ready(self.pose().and_then(|pose| pose.world_to_viewport(point)))
    }
}
