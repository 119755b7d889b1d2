use crate::types::{CameraTrait, Z_FAR, Z_NEAR};
use nalgebra_glm as glm;

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 1.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.06;
pub const DEFAULT_ZOOM: f32 = 45.0;

/// Eye height that keyboard movement keeps the camera at
pub const EYE_HEIGHT: f32 = 1.5;

const MAX_PITCH: f32 = 89.0;
const MIN_ZOOM: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

/// Right handed Y up perspective projection for Vulkan
///
/// Vulkan clip space has Y pointing down and depth in 0..1, so this is the
/// zero-to-one depth projection with the Y axis flipped. Every projection
/// used by the renderer goes through here so that all passes agree.
#[must_use]
pub fn perspective(
    aspect_ratio: f32,
    fovy: f32,
    near: f32,
    far: f32,
) -> glm::Mat4 {
    let mut proj = glm::perspective_rh_zo(aspect_ratio, fovy, near, far);
    proj[(1, 1)] *= -1.0;
    proj
}

/// What the renderer is given each frame. It never sees the camera itself.
#[derive(Clone, Copy, Debug)]
pub struct CameraSnapshot {
    pub view: glm::Mat4,
    pub projection: glm::Mat4,
    pub position: glm::Vec3,
}

impl Default for CameraSnapshot {
    fn default() -> Self {
        Self {
            view: glm::Mat4::identity(),
            projection: perspective(
                1.0,
                DEFAULT_ZOOM.to_radians(),
                Z_NEAR,
                Z_FAR,
            ),
            position: glm::Vec3::zeros(),
        }
    }
}

/// First person yaw/pitch camera. Angles are stored in degrees.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    position: glm::Vec3,
    front: glm::Vec3,
    world_up: glm::Vec3,
    right: glm::Vec3,
    up: glm::Vec3,
    yaw: f32,
    pitch: f32,
    zoom: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            glm::vec3(0.0, EYE_HEIGHT, 0.0),
            glm::vec3(0.0, 1.0, 0.0),
            DEFAULT_PITCH,
            DEFAULT_YAW,
        )
    }
}

impl CameraTrait for Camera {
    fn view_matrix(&self) -> glm::Mat4 {
        let target = self.position + self.front;
        glm::look_at_rh(&self.position, &target, &self.up)
    }

    fn proj_matrix(&self, aspect_ratio: f32) -> glm::Mat4 {
        perspective(aspect_ratio, self.zoom.to_radians(), Z_NEAR, Z_FAR)
    }

    fn position(&self) -> glm::Vec3 {
        self.position
    }
}

impl Camera {
    #[must_use]
    pub fn new(
        position: glm::Vec3,
        world_up: glm::Vec3,
        pitch: f32,
        yaw: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            front: glm::vec3(0.0, 0.0, -1.0),
            world_up,
            right: glm::Vec3::zeros(),
            up: glm::Vec3::zeros(),
            yaw,
            pitch,
            zoom: DEFAULT_ZOOM,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
        };
        camera.update_vectors();
        camera
    }

    #[must_use]
    pub const fn front(&self) -> glm::Vec3 {
        self.front
    }

    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    #[must_use]
    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
        self.update_vectors();
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
        self.update_vectors();
    }

    pub fn set_position(&mut self, position: glm::Vec3) {
        self.position = position;
        self.update_vectors();
    }

    /// Moves the camera. Height is pinned to eye level.
    pub fn process_keyboard(&mut self, direction: Direction, delta_time: f32) {
        self.position += self.offset(direction, delta_time);
        self.position.y = EYE_HEIGHT;
        self.update_vectors();
    }

    /// Velocity for a physics body moving the way the camera would, with
    /// the vertical component removed
    #[must_use]
    pub fn linear_velocity(
        &self,
        direction: Direction,
        delta_time: f32,
    ) -> glm::Vec3 {
        let mut v = self.offset(direction, delta_time);
        v.y = 0.0;
        v
    }

    pub fn process_mouse(
        &mut self,
        x_offset: f32,
        y_offset: f32,
        constrain_pitch: bool,
    ) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        }
        self.update_vectors();
    }

    pub fn process_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, DEFAULT_ZOOM);
    }

    /// Captures the matrices the renderer needs for this frame
    #[must_use]
    pub fn snapshot(&self, aspect_ratio: f32) -> CameraSnapshot {
        CameraSnapshot {
            view: self.view_matrix(),
            projection: self.proj_matrix(aspect_ratio),
            position: self.position,
        }
    }

    // `right` actually points to the camera's left, so strafing right
    // subtracts it
    fn offset(&self, direction: Direction, delta_time: f32) -> glm::Vec3 {
        let velocity = delta_time * self.movement_speed;
        match direction {
            Direction::Forward => self.front * velocity,
            Direction::Back => -self.front * velocity,
            Direction::Right => -self.right * velocity,
            Direction::Left => self.right * velocity,
        }
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = glm::vec3(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        );
        self.front = glm::normalize(&front);
        self.right = -glm::normalize(&glm::cross(&self.front, &self.world_up));
        self.up = glm::normalize(&glm::cross(&self.front, &self.right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    #[test]
    fn default_looks_down_negative_z() {
        let camera = Camera::default();
        let expected = glm::vec3(0.0, 0.0, -1.0);
        assert!(glm::all(&glm::equal_eps(&camera.front(), &expected, EPSILON)));
        assert!(camera.up.y > 0.99);
    }

    #[test]
    fn keyboard_pins_height() {
        let mut camera = Camera::default();
        camera.set_pitch(45.0);
        camera.process_keyboard(Direction::Forward, 1.0);
        assert!((camera.position().y - EYE_HEIGHT).abs() < EPSILON);
        assert!(camera.position().z < 0.0);
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse(0.0, 10_000.0, true);
        assert!((camera.pitch() - MAX_PITCH).abs() < EPSILON);
        camera.process_scroll(100.0);
        assert!((camera.zoom() - MIN_ZOOM).abs() < EPSILON);
        camera.process_scroll(-100.0);
        assert!((camera.zoom() - DEFAULT_ZOOM).abs() < EPSILON);
    }

    #[test]
    fn velocity_is_horizontal() {
        let mut camera = Camera::default();
        camera.set_pitch(60.0);
        let v = camera.linear_velocity(Direction::Forward, 1.0);
        assert!(v.y.abs() < EPSILON);
        assert!(v.z < 0.0);
    }

    #[test]
    fn projection_flips_y_for_vulkan() {
        let p = perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 10.0);
        let clip = p * glm::vec4(0.0, 1.0, -1.0, 1.0);
        assert!(clip.y < 0.0);
        let near = p * glm::vec4(0.0, 0.0, -0.1, 1.0);
        assert!((near.z / near.w).abs() < EPSILON);
    }
}
