use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bevy::prelude::*;

/// Boxed future returned by AR collaborator queries.
pub type QueryFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Wrap an already-known answer as a query future.
pub fn ready<T: Send + 'static>(value: T) -> QueryFuture<T> {
    Box::pin(std::future::ready(value))
}

/// Casts a ray from a normalised viewport coordinate into the sensed scene.
///
/// Returns `None` when no surface or feature is detected there. Choosing among
/// plane, feature-point and estimated-plane hits is the implementor's job; the
/// engine uses whatever single position comes back.
pub trait HitTestService: Send + Sync + 'static {
    fn resolve_world_position(&self, screen: Vec2) -> QueryFuture<Option<Vec3>>;
}

/// Maps a world position onto the current camera frame.
///
/// Returns a normalised viewport coordinate, or `None` when the point is
/// behind the camera or outside the visible frame.
pub trait ProjectionService: Send + Sync + 'static {
    fn project(&self, point: Vec3) -> QueryFuture<Option<Vec2>>;
}

/// Collaborators supplied by the host AR session.
#[derive(Resource, Clone)]
pub struct ArServices {
    hit_test: Arc<dyn HitTestService>,
    projection: Arc<dyn ProjectionService>,
}

impl ArServices {
    pub fn new(hit_test: Arc<dyn HitTestService>, projection: Arc<dyn ProjectionService>) -> Self {
        Self {
            hit_test,
            projection,
        }
    }

    /// Use one object for both queries.
    pub fn from_scene<T>(scene: Arc<T>) -> Self
    where
        T: HitTestService + ProjectionService,
    {
        Self {
            hit_test: scene.clone(),
            projection: scene,
        }
    }

    pub fn resolve_world_position(&self, screen: Vec2) -> QueryFuture<Option<Vec3>> {
        self.hit_test.resolve_world_position(screen)
    }

    pub fn project(&self, point: Vec3) -> QueryFuture<Option<Vec2>> {
        self.projection.project(point)
    }
}
