//! ECS components for the scene's particle groups.
//!
//! The [`Scene`](crate::Scene) keeps one `hecs` entity per animated group.
//! Alongside its animator component each entity carries how it looks
//! ([`Appearance`], or [`MarkerAppearance`] for the star) and, once the GPU
//! side exists, where its instances go ([`RenderSlot`] or [`MarkerSlots`]).
//!
//! # Example
//!
//! ```ignore
//! use tinsel::*;
//!
//! let mut scene = Scene::new(&SceneConfig::default());
//! scene.bind_slots(|mesh, material, capacity| {
//!     mesh_node.add_batch(&gpu, mesh_ids[&mesh], material, capacity as u32)
//! });
//! scene.update(dt, time);
//! scene.drain_uploads(|batch, instances| queue.upload(&gpu, batch, instances));
//! ```

use crate::config::SceneConfig;
use crate::geometry::{RawGeometry, StarOutline};
use crate::material::Material;

use glam::Vec3;

/// Type-safe handle to a mesh stored in the MeshQueue.
///
/// This newtype wrapper prevents accidentally passing batch indices where mesh indices are expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Type-safe handle to an instance batch stored in the MeshQueue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BatchId(pub(crate) usize);

/// The shapes the scene is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Leaves.
    Octahedron,
    /// Boxy ornaments.
    Cube,
    /// Glass ornaments.
    Icosahedron,
    /// Ribbon pieces.
    Tetrahedron,
    Snowflake,
    Star,
    /// The glowing ball inside the star.
    Core,
    Sparkle,
}

impl MeshKind {
    pub const ALL: [MeshKind; 8] = [
        MeshKind::Octahedron,
        MeshKind::Cube,
        MeshKind::Icosahedron,
        MeshKind::Tetrahedron,
        MeshKind::Snowflake,
        MeshKind::Star,
        MeshKind::Core,
        MeshKind::Sparkle,
    ];

    /// Builds the unit-sized geometry for this shape.
    ///
    /// Particle scale is applied per instance, so only the snowflake and the
    /// star take their size from `config`.
    pub fn geometry(self, config: &SceneConfig) -> RawGeometry {
        match self {
            MeshKind::Octahedron => RawGeometry::octahedron(1.0),
            MeshKind::Cube => RawGeometry::cuboid(Vec3::ONE),
            MeshKind::Icosahedron => RawGeometry::icosahedron(1.0),
            MeshKind::Tetrahedron => RawGeometry::tetrahedron(1.0),
            MeshKind::Snowflake => RawGeometry::octahedron(config.snow.flake_radius),
            MeshKind::Star => {
                let star = &config.star;
                RawGeometry::extruded_star(&StarOutline {
                    points: star.points,
                    outer_radius: star.outer_radius,
                    inner_radius: star.inner_radius,
                    depth: star.depth,
                    bevel: star.bevel,
                })
            }
            MeshKind::Core => RawGeometry::uv_sphere(1.0, 16, 16),
            MeshKind::Sparkle => RawGeometry::uv_sphere(1.0, 6, 4),
        }
    }
}

/// How every instance of a group looks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Appearance {
    pub mesh: MeshKind,
    pub material: Material,
}

impl Appearance {
    pub fn new(mesh: MeshKind, material: Material) -> Self {
        Self { mesh, material }
    }
}

/// Batch a group's transforms are uploaded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSlot(pub BatchId);

/// Looks of the star's parts. Sparkle appearances follow the order of the
/// star's sparkle emitters.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerAppearance {
    pub star: Appearance,
    pub core: Appearance,
    pub sparkles: Vec<Appearance>,
}

/// Batches for each part of the star, in [`MarkerAppearance`] order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerSlots {
    pub star: BatchId,
    pub core: BatchId,
    pub sparkles: Vec<BatchId>,
}
