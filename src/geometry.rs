//! Procedural geometry built on the CPU.
//!
//! Every shape in the scene is generated here as [`RawGeometry`] and uploaded
//! once with [`Mesh::from_geometry`](crate::mesh::Mesh::from_geometry).
//!
//! # Shapes
//!
//! | Builder                          | Used for                        | Shading |
//! |----------------------------------|---------------------------------|---------|
//! | [`RawGeometry::octahedron`]      | leaves, snowflakes              | flat    |
//! | [`RawGeometry::cuboid`]          | box ornaments                   | flat    |
//! | [`RawGeometry::icosahedron`]     | round ornaments                 | flat    |
//! | [`RawGeometry::tetrahedron`]     | ribbon                          | flat    |
//! | [`RawGeometry::uv_sphere`]       | star core, sparkles             | smooth  |
//! | [`RawGeometry::extruded_star`]   | the star                        | flat    |
//!
//! The polyhedra are centered on the origin and wound counter-clockwise when
//! seen from outside.

use crate::mesh::Vertex3d;
use glam::{Vec2, Vec3};

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

/// Outline and extrusion parameters for [`RawGeometry::extruded_star`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarOutline {
    pub points: u32,
    pub outer_radius: f32,
    pub inner_radius: f32,
    /// Thickness of the straight side wall.
    pub depth: f32,
    /// Width and height of the chamfer on both faces.
    pub bevel: f32,
}

impl StarOutline {
    /// The closed outline in the XY plane, tips and valleys alternating,
    /// starting with a tip on +X.
    pub fn outline(&self) -> Vec<Vec2> {
        let corners = self.points.max(2) * 2;
        (0..corners)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::PI / (corners / 2) as f32;
                let radius = if i % 2 == 0 {
                    self.outer_radius
                } else {
                    self.inner_radius
                };
                Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect()
    }
}

impl RawGeometry {
    /// Creates raw geometry from vertices and indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Appends one flat-shaded triangle.
    ///
    /// The winding is flipped if needed so the face normal points away from the
    /// origin. That is correct for every shape here, since each one is
    /// star-shaped around its center.
    fn push_facet(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        let (b, c) = if normal.dot(a + b + c) < 0.0 {
            normal = -normal;
            (c, b)
        } else {
            (b, c)
        };

        let base = self.vertices.len() as u32;
        let n = normal.into();
        self.vertices.push(Vertex3d::new(a.into(), n, [0.0, 0.0]));
        self.vertices.push(Vertex3d::new(b.into(), n, [1.0, 0.0]));
        self.vertices.push(Vertex3d::new(c.into(), n, [0.5, 1.0]));
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Appends a flat quad split into two triangles.
    fn push_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        self.push_facet(a, b, c);
        self.push_facet(a, c, d);
    }

    fn polyhedron(corners: &[Vec3], faces: &[[usize; 3]], radius: f32) -> Self {
        let mut geometry = Self::default();
        for face in faces {
            geometry.push_facet(
                corners[face[0]].normalize() * radius,
                corners[face[1]].normalize() * radius,
                corners[face[2]].normalize() * radius,
            );
        }
        geometry
    }

    /// Regular octahedron with its corners on the axes.
    pub fn octahedron(radius: f32) -> Self {
        let corners = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        let faces = [
            [0, 2, 4],
            [0, 4, 3],
            [0, 3, 5],
            [0, 5, 2],
            [1, 2, 5],
            [1, 5, 3],
            [1, 3, 4],
            [1, 4, 2],
        ];
        Self::polyhedron(&corners, &faces, radius)
    }

    /// Regular tetrahedron inscribed in a sphere of `radius`.
    pub fn tetrahedron(radius: f32) -> Self {
        let corners = [
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ];
        let faces = [[2, 1, 0], [0, 3, 2], [1, 3, 0], [2, 3, 1]];
        Self::polyhedron(&corners, &faces, radius)
    }

    /// Regular icosahedron inscribed in a sphere of `radius`.
    pub fn icosahedron(radius: f32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let corners = [
            Vec3::new(-1.0, t, 0.0),
            Vec3::new(1.0, t, 0.0),
            Vec3::new(-1.0, -t, 0.0),
            Vec3::new(1.0, -t, 0.0),
            Vec3::new(0.0, -1.0, t),
            Vec3::new(0.0, 1.0, t),
            Vec3::new(0.0, -1.0, -t),
            Vec3::new(0.0, 1.0, -t),
            Vec3::new(t, 0.0, -1.0),
            Vec3::new(t, 0.0, 1.0),
            Vec3::new(-t, 0.0, -1.0),
            Vec3::new(-t, 0.0, 1.0),
        ];
        let faces = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];
        Self::polyhedron(&corners, &faces, radius)
    }

    /// Axis-aligned box with the given edge lengths.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let p = |x: f32, y: f32, z: f32| Vec3::new(x * h.x, y * h.y, z * h.z);
        let mut geometry = Self::default();
        // +X, -X, +Y, -Y, +Z, -Z
        geometry.push_quad(p(1., -1., -1.), p(1., 1., -1.), p(1., 1., 1.), p(1., -1., 1.));
        geometry.push_quad(p(-1., -1., 1.), p(-1., 1., 1.), p(-1., 1., -1.), p(-1., -1., -1.));
        geometry.push_quad(p(-1., 1., -1.), p(-1., 1., 1.), p(1., 1., 1.), p(1., 1., -1.));
        geometry.push_quad(p(-1., -1., 1.), p(-1., -1., -1.), p(1., -1., -1.), p(1., -1., 1.));
        geometry.push_quad(p(-1., -1., 1.), p(1., -1., 1.), p(1., 1., 1.), p(-1., 1., 1.));
        geometry.push_quad(p(1., -1., -1.), p(-1., -1., -1.), p(-1., 1., -1.), p(1., 1., -1.));
        geometry
    }

    /// Smooth latitude/longitude sphere.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
                let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];
                vertices.push(Vertex3d::new((normal * radius).into(), normal.into(), uv));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        Self::new(vertices, indices)
    }

    /// A star outline pushed out along Z, with a chamfer on both faces.
    ///
    /// The result is centered on the origin: the side wall spans
    /// `-depth / 2..depth / 2` and each chamfer adds `bevel` beyond that,
    /// narrowing the face back to the plain outline.
    pub fn extruded_star(star: &StarOutline) -> Self {
        let outline = star.outline();
        let wall = star.depth * 0.5;
        let cap = wall + star.bevel;

        // The chamfer widens the outline by `bevel` along each corner's radius
        let widened: Vec<Vec2> = outline
            .iter()
            .map(|p| *p + p.normalize_or_zero() * star.bevel)
            .collect();

        let at = |p: Vec2, z: f32| Vec3::new(p.x, p.y, z);
        let mut geometry = Self::default();
        let n = outline.len();

        for i in 0..n {
            let j = (i + 1) % n;

            // Both faces, fanned from the center
            geometry.push_facet(Vec3::new(0.0, 0.0, cap), at(outline[i], cap), at(outline[j], cap));
            geometry.push_facet(Vec3::new(0.0, 0.0, -cap), at(outline[j], -cap), at(outline[i], -cap));

            // Chamfers
            geometry.push_quad(
                at(outline[i], cap),
                at(widened[i], wall),
                at(widened[j], wall),
                at(outline[j], cap),
            );
            geometry.push_quad(
                at(widened[i], -wall),
                at(outline[i], -cap),
                at(outline[j], -cap),
                at(widened[j], -wall),
            );

            // Side wall
            geometry.push_quad(
                at(widened[i], wall),
                at(widened[i], -wall),
                at(widened[j], -wall),
                at(widened[j], wall),
            );
        }

        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward_unit_normals(geometry: &RawGeometry) {
        for tri in geometry.indices.chunks(3) {
            let v: Vec<&Vertex3d> = tri.iter().map(|&i| &geometry.vertices[i as usize]).collect();
            let n = Vec3::from(v[0].normal);
            assert!((n.length() - 1.0).abs() < 1e-4, "normal {n:?} is not unit");

            let a = Vec3::from(v[0].position);
            let b = Vec3::from(v[1].position);
            let c = Vec3::from(v[2].position);
            // Counter-clockwise seen from outside means the winding agrees with the normal
            assert!((b - a).cross(c - a).dot(n) > 0.0);
            assert!(n.dot(a + b + c) >= 0.0);
        }
    }

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn polyhedra_have_expected_faces() {
        assert_eq!(RawGeometry::tetrahedron(1.0).triangle_count(), 4);
        assert_eq!(RawGeometry::octahedron(1.0).triangle_count(), 8);
        assert_eq!(RawGeometry::cuboid(Vec3::ONE).triangle_count(), 12);
        assert_eq!(RawGeometry::icosahedron(1.0).triangle_count(), 20);
    }

    #[test]
    fn polyhedra_face_outward() {
        assert_outward_unit_normals(&RawGeometry::tetrahedron(1.0));
        assert_outward_unit_normals(&RawGeometry::octahedron(0.08));
        assert_outward_unit_normals(&RawGeometry::cuboid(Vec3::ONE));
        assert_outward_unit_normals(&RawGeometry::icosahedron(1.0));
    }

    #[test]
    fn polyhedra_sit_on_their_sphere() {
        for geom in [RawGeometry::octahedron(2.0), RawGeometry::icosahedron(2.0)] {
            for v in &geom.vertices {
                assert!((Vec3::from(v.position).length() - 2.0).abs() < 1e-4);
            }
        }
        let cube = RawGeometry::cuboid(Vec3::ONE);
        let (min, max) = cube.bounds();
        assert!((max - min).abs_diff_eq(Vec3::ONE, 1e-6));
        assert!((min + max).abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn sphere_has_unit_normals_and_radius() {
        let sphere = RawGeometry::uv_sphere(1.0, 16, 16);
        assert_eq!(sphere.vertices.len(), 17 * 17);
        assert_eq!(sphere.indices.len(), 16 * 16 * 6);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.normal).length() - 1.0).abs() < 1e-4);
            assert!((Vec3::from(v.position).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn star_outline_alternates_radii() {
        let star = StarOutline {
            points: 5,
            outer_radius: 1.2,
            inner_radius: 0.5,
            depth: 0.2,
            bevel: 0.1,
        };
        let outline = star.outline();
        assert_eq!(outline.len(), 10);
        for (i, p) in outline.iter().enumerate() {
            let expected = if i % 2 == 0 { 1.2 } else { 0.5 };
            assert!((p.length() - expected).abs() < 1e-5);
        }
        assert!(outline[0].abs_diff_eq(Vec2::new(1.2, 0.0), 1e-6));
    }

    #[test]
    fn extruded_star_is_closed_and_centered() {
        let star = StarOutline {
            points: 5,
            outer_radius: 1.2,
            inner_radius: 0.5,
            depth: 0.2,
            bevel: 0.1,
        };
        let geom = RawGeometry::extruded_star(&star);
        // Per corner: two cap triangles and three quads
        assert_eq!(geom.triangle_count(), 10 * (2 + 3 * 2));
        assert_outward_unit_normals(&geom);

        let (min, max) = geom.bounds();
        assert!((max.z - 0.2).abs() < 1e-6);
        assert!((min.z + 0.2).abs() < 1e-6);
        assert!((max.x - 1.3).abs() < 1e-5);
    }
}
