//! Headless backend
//!
//! In-memory implementation of every backend trait. Buffers are plain byte
//! vectors, textures are counters, and every call is appended to a shared
//! [`CommandLog`] so callers can inspect exactly what a frame would have
//! sent to the GPU.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use super::backend::{AssetLoader, GraphicsDevice, Model, Shader, ShaderPaths};
use super::{BufferHandle, FrontFace, RenderError, RenderResult, TextureHandle, UniformValue};
use crate::foundation::math::Vec3;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `GraphicsDevice::clear`
    Clear(Vec3),
    /// `GraphicsDevice::set_front_face`
    SetFrontFace(FrontFace),
    /// `GraphicsDevice::bind_cube_texture`
    BindCubeTexture {
        /// Texture unit
        slot: u32,
        /// Bound texture
        texture: TextureHandle,
    },
    /// `GraphicsDevice::delete_texture`
    DeleteTexture(TextureHandle),
    /// `GraphicsDevice::create_uniform_buffer`
    CreateBuffer {
        /// New buffer
        buffer: BufferHandle,
        /// Size in bytes
        size: usize,
    },
    /// `GraphicsDevice::delete_buffer`
    DeleteBuffer(BufferHandle),
    /// `GraphicsDevice::map_buffer`
    MapBuffer(BufferHandle),
    /// `GraphicsDevice::unmap_buffer`
    UnmapBuffer(BufferHandle),
    /// `GraphicsDevice::bind_uniform_buffer{,_range}`
    BindUniformBuffer {
        /// Uniform block binding point
        binding_point: u32,
        /// Bound buffer
        buffer: BufferHandle,
        /// `(offset, size)` for ranged binds
        range: Option<(usize, usize)>,
    },
    /// `Shader::activate`
    ActivateShader(ShaderPaths),
    /// `Shader::set_parameter`
    SetParameter {
        /// Uniform name
        name: String,
        /// Uploaded value
        value: UniformValue,
    },
    /// `Model::draw`
    DrawModel {
        /// Model load path
        model: String,
        /// Program the model was drawn with
        shader: ShaderPaths,
    },
}

/// Shared, append-only list of recorded calls
pub type CommandLog = Rc<RefCell<Vec<Command>>>;

/// Create an empty command log
pub fn new_command_log() -> CommandLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// In-memory [`GraphicsDevice`]
#[derive(Debug)]
pub struct HeadlessDevice {
    log: CommandLog,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    mapped: Option<BufferHandle>,
    next_buffer: u32,
}

impl HeadlessDevice {
    /// Create a device with its own command log
    pub fn new() -> Self {
        Self::with_log(new_command_log())
    }

    /// Create a device appending to an existing log
    pub fn with_log(log: CommandLog) -> Self {
        Self {
            log,
            buffers: HashMap::new(),
            mapped: None,
            next_buffer: 1,
        }
    }

    /// The command log this device appends to
    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Snapshot of every recorded call
    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    /// Forget recorded calls (buffers are kept)
    pub fn clear_commands(&self) {
        self.log.borrow_mut().clear();
    }

    /// Number of live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Whether `buffer` is currently mapped
    pub fn is_mapped(&self, buffer: BufferHandle) -> bool {
        self.mapped == Some(buffer)
    }

    fn record(&self, command: Command) {
        self.log.borrow_mut().push(command);
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn clear(&mut self, color: Vec3) {
        self.record(Command::Clear(color));
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        self.record(Command::SetFrontFace(front_face));
    }

    fn bind_cube_texture(&mut self, slot: u32, texture: TextureHandle) {
        self.record(Command::BindCubeTexture { slot, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.record(Command::DeleteTexture(texture));
    }

    fn create_uniform_buffer(&mut self, size: usize) -> RenderResult<BufferHandle> {
        let buffer = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(buffer, vec![0; size]);
        self.record(Command::CreateBuffer { buffer, size });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            if self.mapped == Some(buffer) {
                self.mapped = None;
            }
            self.record(Command::DeleteBuffer(buffer));
        }
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> RenderResult<&mut [u8]> {
        if let Some(mapped) = self.mapped {
            return Err(RenderError::BufferAlreadyMapped(mapped));
        }
        let data = self
            .buffers
            .get_mut(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        self.mapped = Some(buffer);
        self.log.borrow_mut().push(Command::MapBuffer(buffer));
        Ok(data.as_mut_slice())
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) -> RenderResult<()> {
        if self.mapped != Some(buffer) {
            return Err(RenderError::BufferNotMapped(buffer));
        }
        self.mapped = None;
        self.record(Command::UnmapBuffer(buffer));
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferHandle) -> RenderResult<Vec<u8>> {
        self.buffers
            .get(&buffer)
            .cloned()
            .ok_or(RenderError::UnknownBuffer(buffer))
    }

    fn bind_uniform_buffer(&mut self, binding_point: u32, buffer: BufferHandle) -> RenderResult<()> {
        if !self.buffers.contains_key(&buffer) {
            return Err(RenderError::UnknownBuffer(buffer));
        }
        self.record(Command::BindUniformBuffer { binding_point, buffer, range: None });
        Ok(())
    }

    fn bind_uniform_buffer_range(
        &mut self,
        binding_point: u32,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
    ) -> RenderResult<()> {
        let len = self
            .buffers
            .get(&buffer)
            .map(Vec::len)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        if offset.checked_add(size).map_or(true, |end| end > len) {
            return Err(RenderError::RangeOutOfBounds { buffer, offset, size, len });
        }
        self.record(Command::BindUniformBuffer {
            binding_point,
            buffer,
            range: Some((offset, size)),
        });
        Ok(())
    }
}

/// In-memory [`Model`]
#[derive(Debug)]
pub struct HeadlessModel {
    path: String,
    texture_slot: u32,
    log: CommandLog,
}

impl HeadlessModel {
    /// Create a model whose material uses `texture_slot` units
    pub fn new(path: impl Into<String>, texture_slot: u32, log: CommandLog) -> Self {
        Self { path: path.into(), texture_slot, log }
    }
}

impl Model for HeadlessModel {
    fn load_path(&self) -> &str {
        &self.path
    }

    fn draw(&self, shader: &dyn Shader) {
        self.log.borrow_mut().push(Command::DrawModel {
            model: self.path.clone(),
            shader: shader.load_paths().clone(),
        });
    }

    fn available_texture_slot(&self) -> u32 {
        self.texture_slot
    }
}

/// In-memory [`Shader`]
#[derive(Debug)]
pub struct HeadlessShader {
    paths: ShaderPaths,
    log: CommandLog,
}

impl HeadlessShader {
    /// Create a shader program record
    pub fn new(paths: ShaderPaths, log: CommandLog) -> Self {
        Self { paths, log }
    }
}

impl Shader for HeadlessShader {
    fn load_paths(&self) -> &ShaderPaths {
        &self.paths
    }

    fn activate(&self) {
        self.log.borrow_mut().push(Command::ActivateShader(self.paths.clone()));
    }

    fn set_parameter(&self, name: &str, value: UniformValue) {
        self.log.borrow_mut().push(Command::SetParameter {
            name: name.to_string(),
            value,
        });
    }
}

/// In-memory [`AssetLoader`] that counts loads and can simulate failures
#[derive(Debug)]
pub struct HeadlessLoader {
    log: CommandLog,
    texture_slot: u32,
    next_texture: u32,
    failing: HashSet<String>,
    model_loads: usize,
    shader_loads: usize,
    texture_loads: usize,
}

impl HeadlessLoader {
    /// Create a loader whose models and shaders record into `log`
    pub fn new(log: CommandLog) -> Self {
        Self {
            log,
            texture_slot: 1,
            next_texture: 1,
            failing: HashSet::new(),
            model_loads: 0,
            shader_loads: 0,
            texture_loads: 0,
        }
    }

    /// Make every load of `path` fail (matches model paths, any shader stage
    /// and cube texture folders)
    pub fn fail_on(mut self, path: impl Into<String>) -> Self {
        self.failing.insert(path.into());
        self
    }

    /// Number of models imported so far
    pub fn model_loads(&self) -> usize {
        self.model_loads
    }

    /// Number of shader programs built so far
    pub fn shader_loads(&self) -> usize {
        self.shader_loads
    }

    /// Number of cube textures created so far
    pub fn texture_loads(&self) -> usize {
        self.texture_loads
    }

    fn check(&self, path: &str) -> RenderResult<()> {
        if self.failing.contains(path) {
            return Err(RenderError::AssetLoad {
                path: path.to_string(),
                reason: "file not found".to_string(),
            });
        }
        Ok(())
    }
}

// The command log is shared through `Rc`; headless resources never leave the
// thread that created them.
#[allow(clippy::arc_with_non_send_sync)]
impl AssetLoader for HeadlessLoader {
    fn load_model(&mut self, path: &str) -> RenderResult<Arc<dyn Model>> {
        self.check(path)?;
        self.model_loads += 1;
        Ok(Arc::new(HeadlessModel::new(path, self.texture_slot, Rc::clone(&self.log))))
    }

    fn load_shader(&mut self, paths: &ShaderPaths) -> RenderResult<Arc<dyn Shader>> {
        self.check(&paths.vertex)?;
        self.check(&paths.fragment)?;
        if paths.has_geometry() {
            self.check(&paths.geometry)?;
        }
        self.shader_loads += 1;
        Ok(Arc::new(HeadlessShader::new(paths.clone(), Rc::clone(&self.log))))
    }

    fn load_cube_texture(&mut self, folder: &str) -> RenderResult<TextureHandle> {
        self.check(folder)?;
        self.texture_loads += 1;
        let texture = TextureHandle(self.next_texture);
        self.next_texture += 1;
        Ok(texture)
    }
}
