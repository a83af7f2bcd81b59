use glam::Mat4;

use crate::mesh::InstanceRaw;

/// One model matrix per instance, laid out exactly as the GPU reads it.
///
/// Animators overwrite every slot once per step and mark the buffer dirty;
/// the renderer takes the dirty flag before uploading. The length is fixed at
/// construction.
#[derive(Clone, Debug)]
pub struct TransformBuffer {
    instances: Vec<InstanceRaw>,
    dirty: bool,
}

impl TransformBuffer {
    /// A buffer of `count` identity transforms, dirty so the first frame uploads it.
    pub fn new(count: usize) -> Self {
        Self {
            instances: vec![InstanceRaw::from_matrix(&Mat4::IDENTITY); count],
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Overwrite slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`; slots are allocated once and never grow.
    #[inline]
    pub fn set(&mut self, index: usize, matrix: &Mat4) {
        self.instances[index] = InstanceRaw::from_matrix(matrix);
    }

    pub fn matrix(&self, index: usize) -> Option<Mat4> {
        self.instances.get(index).map(InstanceRaw::matrix)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the buffer changed since the last call, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn as_slice(&self) -> &[InstanceRaw] {
        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn starts_dirty_with_identity() {
        let mut buffer = TransformBuffer::new(3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.matrix(2), Some(Mat4::IDENTITY));
        assert!(buffer.take_dirty());
        assert!(!buffer.take_dirty());
    }

    #[test]
    fn set_round_trips_through_raw_layout() {
        let mut buffer = TransformBuffer::new(1);
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        buffer.set(0, &m);
        assert_eq!(buffer.matrix(0), Some(m));
        assert_eq!(buffer.matrix(1), None);
    }

    #[test]
    fn empty_buffer_is_allowed() {
        let buffer = TransformBuffer::new(0);
        assert!(buffer.is_empty());
        assert!(buffer.as_slice().is_empty());
    }
}
