//! # Tinsel
//!
//! **A particle Christmas tree that bursts apart and reassembles on click.**
//!
//! Thousands of instanced leaves, ornaments and ribbon pieces sit in a cone.
//! Click anywhere and every particle flies off to a point in a spherical
//! shell; click again and they ease back home. Snow falls throughout, a
//! spinning star with sparkles crowns the tree and bloom makes the emissive
//! parts glow.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tinsel::*;
//!
//! fn main() -> Result<(), AppError> {
//!     run(AppConfig::new().title("Merry Christmas"), SceneConfig::default())
//! }
//! ```
//!
//! ## Layout
//!
//! - [`animation`]: GPU-free animators driven by `(dt, time, state)`
//! - [`Scene`]: the assembled tree, snow and star in a `hecs` world
//! - [`render_graph`]: scene, bloom and tone-mapping passes
//! - [`config`]: every tunable constant, with the reference defaults

pub mod animation;
mod app;
mod assets;
mod camera;
mod color;
pub mod config;
mod draw2d;
mod ecs;
mod geometry;
mod gpu;
mod input;
mod lighting;
mod material;
mod mesh;
mod mesh_pass;
mod orbit_camera;
pub mod overlay;
mod post_process;
pub mod render_graph;
mod scene;

pub use animation::{AnimationState, InstanceGroup, SnowField, TopMarker, TransformBuffer};
pub use app::{AppConfig, AppError, run};
pub use assets::{Assets, FontAtlas, FontError, FontId};
pub use camera::Camera;
pub use color::Color;
pub use config::SceneConfig;
pub use draw2d::Draw2d;
pub use ecs::{Appearance, BatchId, MarkerAppearance, MarkerSlots, MeshId, MeshKind, RenderSlot};
pub use geometry::{RawGeometry, StarOutline};
pub use gpu::{GpuContext, GpuError};
pub use input::Input;
pub use lighting::{Lighting, SceneUniforms};
pub use material::{BlendMode, Material, palette};
pub use mesh::{InstanceRaw, Mesh, Transform, Vertex3d};
pub use mesh_pass::{InstanceBatch, MeshPass};
pub use orbit_camera::OrbitCamera;
pub use post_process::{BloomPass, FinishPass};
pub use scene::{Name, Scene};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;

pub use hecs::{Entity, World};
