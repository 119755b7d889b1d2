use log::warn;
use nalgebra_glm as glm;

/// Model matrix stack for nested local to world transforms. The bottom
/// entry is the frame's root and can not be popped.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    current: glm::Mat4,
    saved: Vec<glm::Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self {
            current: glm::Mat4::identity(),
            saved: Vec::with_capacity(8),
        }
    }
}

impl MatrixStack {
    /// Back to a single identity root
    pub fn reset(&mut self) {
        self.current = glm::Mat4::identity();
        self.saved.clear();
    }

    #[must_use]
    pub const fn top(&self) -> &glm::Mat4 {
        &self.current
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restores the matrix saved by the matching `push`. Returns false,
    /// leaving the root in place, if there is nothing to pop.
    pub fn pop(&mut self) -> bool {
        if let Some(m) = self.saved.pop() {
            self.current = m;
            true
        } else {
            warn!("Matrix stack pop past the frame root ignored");
            false
        }
    }

    pub fn translate(&mut self, v: &glm::Vec3) {
        self.current = glm::translate(&self.current, v);
    }

    /// Angle in radians about `axis`
    pub fn rotate(&mut self, angle: f32, axis: &glm::Vec3) {
        self.current = glm::rotate(&self.current, angle, axis);
    }

    pub fn rotate_quat(&mut self, q: &glm::Quat) {
        self.current *= glm::quat_to_mat4(q);
    }

    pub fn scale(&mut self, v: &glm::Vec3) {
        self.current = glm::scale(&self.current, v);
    }

    pub fn multiply(&mut self, m: &glm::Mat4) {
        self.current *= m;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    #[test]
    fn push_pop_restores() {
        let mut stack = MatrixStack::default();
        stack.translate(&glm::vec3(1.0, 0.0, 0.0));
        stack.push();
        stack.scale(&glm::vec3(2.0, 2.0, 2.0));
        stack.translate(&glm::vec3(1.0, 0.0, 0.0));
        // Child transforms compose in the parent's space
        assert!((stack.top()[(0, 3)] - 3.0).abs() < EPSILON);
        assert!(stack.pop());
        assert!((stack.top()[(0, 3)] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn root_can_not_be_popped() {
        let mut stack = MatrixStack::default();
        stack.translate(&glm::vec3(0.0, 5.0, 0.0));
        assert!(!stack.pop());
        assert!((stack.top()[(1, 3)] - 5.0).abs() < EPSILON);
        stack.push();
        stack.reset();
        assert_eq!(stack.depth(), 0);
        assert_eq!(*stack.top(), glm::Mat4::identity());
    }
}
