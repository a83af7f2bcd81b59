//! GPU mesh data and spatial transforms.
//!
//! - [`Vertex3d`]: per-vertex position, normal and UV
//! - [`InstanceRaw`]: per-instance model matrix, streamed every frame
//! - [`Mesh`]: vertex and index buffers living on the GPU
//! - [`Transform`]: position, rotation and scale, folded into a matrix
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location | Step     |
//! |-----------|-----------|--------|-----------------|----------|
//! | position  | Float32x3 | 0      | 0               | vertex   |
//! | normal    | Float32x3 | 12     | 1               | vertex   |
//! | uv        | Float32x2 | 24     | 2               | vertex   |
//! | model.x   | Float32x4 | 0      | 3               | instance |
//! | model.y   | Float32x4 | 16     | 4               | instance |
//! | model.z   | Float32x4 | 32     | 5               | instance |
//! | model.w   | Float32x4 | 48     | 6               | instance |

use crate::geometry::RawGeometry;
use crate::gpu::GpuContext;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// A vertex with position, normal and texture coordinates.
///
/// `#[repr(C)]` with [`bytemuck::Pod`] so vertex slices can be cast straight
/// to bytes for upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Model-space position.
    pub position: [f32; 3],
    /// Surface normal; unit length for correct lighting.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// Vertex buffer layout for slot 0 of the mesh pipeline.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Per-instance data: a column-major model matrix.
///
/// All transforms in the scene use uniform scale, so the shader rotates
/// normals with the model matrix directly instead of needing a separate
/// normal matrix.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    /// Vertex buffer layout for slot 1 of the mesh pipeline.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    #[inline]
    pub fn from_matrix(matrix: &Mat4) -> Self {
        Self {
            model: matrix.to_cols_array_2d(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }
}

/// GPU-resident geometry with vertex and index buffers.
///
/// Immutable after creation. All built-in shapes use counter-clockwise
/// winding for front faces.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Uploads raw vertex and index data.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex3d], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Uploads geometry built on the CPU.
    pub fn from_geometry(gpu: &GpuContext, geometry: &RawGeometry) -> Self {
        Self::new(gpu, &geometry.vertices, &geometry.indices)
    }
}

/// Position, rotation and scale.
///
/// [`Transform::matrix()`] applies them in scale, rotate, translate order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Quaternion for intrinsic X-Y-Z Euler angles.
#[inline]
pub fn euler_xyz(angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_applies_scale_before_translation() {
        let t = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            scale: Vec3::splat(2.0),
            ..Transform::new()
        };
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn euler_xyz_matches_single_axis_rotations() {
        let q = euler_xyz(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        assert!(q.abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), 1e-6));
    }

    #[test]
    fn instance_raw_is_a_plain_matrix() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
        let m = Mat4::from_rotation_z(0.3);
        assert_eq!(InstanceRaw::from_matrix(&m).matrix(), m);
    }
}
