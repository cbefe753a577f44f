//! Backend abstraction traits for the scene renderer
//!
//! These traits are the only way the scene reaches the graphics API, the
//! asset importers and the window. An OpenGL application implements them
//! over its own mesh/shader wrappers; [`super::headless`] implements them
//! in memory.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{BufferHandle, FrontFace, RenderResult, TextureHandle, UniformValue};
use crate::foundation::math::Vec3;

/// File names of the six cube map faces inside a cube texture folder, in
/// `+X, -X, +Y, -Y, +Z, -Z` order
pub const CUBE_FACE_NAMES: [&str; 6] = [
    "right.jpg",
    "left.jpg",
    "top.jpg",
    "bottom.jpg",
    "front.jpg",
    "back.jpg",
];

/// Source files of a shader program
///
/// Doubles as the deduplication key of the shader pool, so two programs
/// built from the same three files are the same prototype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderPaths {
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
    /// Geometry stage source, empty when the program has none
    pub geometry: String,
}

impl ShaderPaths {
    /// Vertex + fragment program
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: String::new(),
        }
    }

    /// Add a geometry stage
    pub fn with_geometry(mut self, geometry: impl Into<String>) -> Self {
        self.geometry = geometry.into();
        self
    }

    /// Whether the program has a geometry stage
    pub fn has_geometry(&self) -> bool {
        !self.geometry.is_empty()
    }

    /// Apply `f` to every non-empty path
    pub fn map(&self, mut f: impl FnMut(&str) -> String) -> Self {
        let mut apply = |path: &str| if path.is_empty() { String::new() } else { f(path) };
        Self {
            vertex: apply(&self.vertex),
            fragment: apply(&self.fragment),
            geometry: apply(&self.geometry),
        }
    }
}

impl From<[&str; 3]> for ShaderPaths {
    fn from([vertex, fragment, geometry]: [&str; 3]) -> Self {
        Self::new(vertex, fragment).with_geometry(geometry)
    }
}

impl fmt::Display for ShaderPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.vertex, self.fragment)?;
        if self.has_geometry() {
            write!(f, " + {}", self.geometry)?;
        }
        Ok(())
    }
}

/// A loaded, drawable mesh resource
pub trait Model: fmt::Debug {
    /// Path the model was loaded from
    fn load_path(&self) -> &str;

    /// Issue the draw calls for every mesh of the model with `shader` bound
    fn draw(&self, shader: &dyn Shader);

    /// First texture unit not used by the model's own material textures
    fn available_texture_slot(&self) -> u32;
}

/// A linked shader program
pub trait Shader: fmt::Debug {
    /// Source files the program was built from
    fn load_paths(&self) -> &ShaderPaths;

    /// Make this program current
    fn activate(&self);

    /// Upload a uniform value; the program must be current
    fn set_parameter(&self, name: &str, value: UniformValue);
}

/// Creates models, shaders and cube maps from files
///
/// Loading is synchronous and happens during scene setup, never inside the
/// frame loop.
pub trait AssetLoader {
    /// Import a model file
    fn load_model(&mut self, path: &str) -> RenderResult<Arc<dyn Model>>;

    /// Compile and link a shader program
    fn load_shader(&mut self, paths: &ShaderPaths) -> RenderResult<Arc<dyn Shader>>;

    /// Build a cube map from the six [`CUBE_FACE_NAMES`] images in `folder`
    fn load_cube_texture(&mut self, folder: &str) -> RenderResult<TextureHandle>;
}

/// Global GPU state and buffer operations the scene performs itself
pub trait GraphicsDevice {
    /// Clear color, depth and stencil, filling color with `color`
    fn clear(&mut self, color: Vec3);

    /// Choose the front-facing triangle winding
    fn set_front_face(&mut self, front_face: FrontFace);

    /// Bind a cube map texture to texture unit `slot`
    fn bind_cube_texture(&mut self, slot: u32, texture: TextureHandle);

    /// Delete a texture object
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Allocate a zero-filled uniform buffer of `size` bytes
    fn create_uniform_buffer(&mut self, size: usize) -> RenderResult<BufferHandle>;

    /// Delete a buffer object; unknown handles are ignored
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Map a buffer for writing
    ///
    /// The returned slice borrows the device, so nothing else can be issued
    /// on it until the mapping goes out of scope. [`Self::unmap_buffer`] must
    /// follow before the buffer is read by a draw.
    fn map_buffer(&mut self, buffer: BufferHandle) -> RenderResult<&mut [u8]>;

    /// Finish a mapping started with [`Self::map_buffer`]
    fn unmap_buffer(&mut self, buffer: BufferHandle) -> RenderResult<()>;

    /// Copy the current contents of a buffer back to the CPU
    fn read_buffer(&self, buffer: BufferHandle) -> RenderResult<Vec<u8>>;

    /// Bind a whole buffer to a uniform block binding point
    fn bind_uniform_buffer(&mut self, binding_point: u32, buffer: BufferHandle) -> RenderResult<()>;

    /// Bind `size` bytes starting at `offset` to a uniform block binding point
    fn bind_uniform_buffer_range(
        &mut self,
        binding_point: u32,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
    ) -> RenderResult<()>;
}

/// Anything that can report its framebuffer size in pixels
pub trait FramebufferSize {
    /// Current framebuffer `(width, height)`
    fn framebuffer_size(&self) -> (i32, i32);
}

impl FramebufferSize for (i32, i32) {
    fn framebuffer_size(&self) -> (i32, i32) {
        *self
    }
}

#[cfg(feature = "glfw")]
impl FramebufferSize for glfw::Window {
    fn framebuffer_size(&self) -> (i32, i32) {
        self.get_framebuffer_size()
    }
}
