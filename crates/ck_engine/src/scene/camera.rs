//! Fly camera
//!
//! Yaw/pitch camera driven by keyboard, mouse and scroll input. Angles are
//! kept in degrees; the basis vectors are recomputed whenever they change.

use crate::core::config::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Pitch limit in degrees when pitch is constrained
pub const PITCH_LIMIT: f32 = 89.9;

/// Narrowest field of view reachable by zooming, in degrees
pub const MIN_ZOOM: f32 = 1.0;

/// Widest field of view reachable by zooming, in degrees
pub const MAX_ZOOM: f32 = 45.0;

/// Speed multiplier while [`Camera::speed_up`] is active
pub const SPEED_UP_FACTOR: f32 = 3.0;

/// Direction of a keyboard camera move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    /// Along the view direction
    Forward,
    /// Against the view direction
    Backward,
    /// Against the right vector
    Left,
    /// Along the right vector
    Right,
    /// Along world up
    Up,
    /// Against world up
    Down,
}

/// Perspective fly camera
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    base_speed: f32,
    move_speed: f32,
    mouse_sensitivity: f32,
    zoom: f32,
    near: f32,
    far: f32,
    first_mouse: bool,
}

impl Camera {
    /// Create a camera at `position` looking down -Z
    pub fn new(position: Vec3, world_up: Vec3) -> Self {
        Self::from_config(&CameraConfig {
            position: [position.x, position.y, position.z],
            world_up: [world_up.x, world_up.y, world_up.z],
            ..CameraConfig::default()
        })
    }

    /// Create a camera from configuration
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: Vec3::from(config.position),
            front: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::y(),
            right: Vec3::x(),
            world_up: Vec3::from(config.world_up),
            yaw: -90.0,
            pitch: 0.0,
            base_speed: config.move_speed,
            move_speed: config.move_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            zoom: config.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            near: config.near,
            far: config.far,
            first_mouse: true,
        };
        camera.update_vectors();
        camera
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the camera
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Unit view direction
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit camera up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit camera right vector
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Yaw in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Current movement speed in units per second
    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(utils::deg_to_rad(self.zoom), aspect, self.near, self.far)
    }

    /// Move along `direction` for `delta_time` seconds
    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.move_speed * delta_time;
        let offset = match direction {
            CameraMovement::Forward => self.front,
            CameraMovement::Backward => -self.front,
            CameraMovement::Left => -self.right,
            CameraMovement::Right => self.right,
            CameraMovement::Up => self.world_up,
            CameraMovement::Down => -self.world_up,
        };
        self.position += offset * velocity;
    }

    /// Turn by a mouse delta in pixels
    ///
    /// The first call after construction or [`Self::reset_mouse`] only
    /// primes the cursor and does not turn the camera. Screen y grows
    /// downwards, so a positive `y_offset` looks down.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        if self.first_mouse {
            self.first_mouse = false;
            return;
        }

        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch -= y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    /// Ignore the next mouse movement (cursor re-entered or was recaptured)
    pub fn reset_mouse(&mut self) {
        self.first_mouse = true;
    }

    /// Zoom by a scroll delta
    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Toggle fast movement
    pub fn speed_up(&mut self, enabled: bool) {
        self.move_speed = if enabled {
            self.base_speed * SPEED_UP_FACTOR
        } else {
            self.base_speed
        };
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (utils::deg_to_rad(self.yaw), utils::deg_to_rad(self.pitch));
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(&self.world_up).normalize();
        self.up = self.right.cross(&self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}
