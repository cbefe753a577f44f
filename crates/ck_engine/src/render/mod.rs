//! # Rendering seam
//!
//! The scene never talks to a graphics API directly. Everything it needs
//! from the outside world goes through the traits in [`backend`]:
//!
//! - [`GraphicsDevice`]: the handful of global state changes and buffer
//!   operations the scene performs itself (clear, winding, cube texture
//!   binding, uniform buffer lifecycle)
//! - [`Model`] / [`Shader`]: loaded resources, drawn and configured through
//!   their own methods
//! - [`AssetLoader`]: creates models, shaders and cube maps from paths
//! - [`FramebufferSize`]: the window, queried once per frame
//!
//! [`headless`] provides an in-memory implementation of all of them that
//! records every call, for tests and tools that run without a GPU.

pub mod backend;
pub mod headless;

pub use backend::{
    AssetLoader, FramebufferSize, GraphicsDevice, Model, Shader, ShaderPaths,
};

use thiserror::Error;

use crate::foundation::math::{Mat4, Vec2, Vec3};

/// Result type for backend operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Handle to a GPU buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Handle to a GPU texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Which triangle winding counts as front-facing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    /// Clockwise triangles are front faces
    Clockwise,
    /// Counter-clockwise triangles are front faces (the default)
    CounterClockwise,
}

/// A value uploaded to a named shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `bool` uniform
    Bool(bool),
    /// `int` / sampler uniform
    Int(i32),
    /// `float` uniform
    Float(f32),
    /// `vec2` uniform
    Vec2(Vec2),
    /// `vec3` uniform
    Vec3(Vec3),
    /// `mat4` uniform
    Mat4(Mat4),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

/// Errors reported by rendering backends and asset loaders
#[derive(Debug, Error)]
pub enum RenderError {
    /// The buffer handle does not name a live buffer
    #[error("Unknown buffer {0:?}")]
    UnknownBuffer(BufferHandle),

    /// The buffer is already mapped for writing
    #[error("Buffer {0:?} is already mapped")]
    BufferAlreadyMapped(BufferHandle),

    /// Unmap was requested for a buffer that is not mapped
    #[error("Buffer {0:?} is not mapped")]
    BufferNotMapped(BufferHandle),

    /// A bound range falls outside the buffer
    #[error("Range of {size} bytes at offset {offset} is outside buffer {buffer:?} of {len} bytes")]
    RangeOutOfBounds {
        /// Buffer the range was requested on
        buffer: BufferHandle,
        /// Start of the range
        offset: usize,
        /// Length of the range
        size: usize,
        /// Size of the buffer
        len: usize,
    },

    /// An asset could not be loaded
    #[error("Failed to load '{path}': {reason}")]
    AssetLoad {
        /// Path that was requested
        path: String,
        /// Loader-specific explanation
        reason: String,
    },
}
