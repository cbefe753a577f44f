//! Light uniform buffer packing
//!
//! The light shaders read a std140 block of the form
//!
//! ```glsl
//! layout(std140) uniform Lights {
//!     int   lightCount;       // offset 0, bytes 4..16 reserved
//!     Light lights[MAX_LIGHTS]; // offset 16, stride 80
//! };
//! ```
//!
//! [`LightBufferLayout`] knows that shape and packs `(light, position,
//! rotation)` triples into it. [`SceneLightUboManager`] keeps one GPU buffer
//! in sync with the light objects of a [`Scene`]; [`LightGroup`] does the
//! same for a free-standing list of lights.

use super::error::{SceneError, SceneResult};
use super::light::{self, Light, LightRecord};
use super::scene::Scene;
use crate::core::config::{SceneConfig, DEFAULT_MAX_LIGHTS, MAX_LIGHTS_LIMIT};
use crate::foundation::math::Vec3;
use crate::render::{BufferHandle, GraphicsDevice};

/// Shape of the light uniform block for a fixed number of slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightBufferLayout {
    max_lights: usize,
}

impl LightBufferLayout {
    /// Bytes before the first light record
    pub const HEADER_SIZE: usize = 16;
    /// Offset of the `int` light count inside the header
    pub const COUNT_OFFSET: usize = 0;
    /// Distance between consecutive light records
    pub const STRIDE: usize = Light::ENCODED_SIZE;

    /// Layout with `max_lights` slots, clamped to [`MAX_LIGHTS_LIMIT`]
    pub fn new(max_lights: usize) -> Self {
        if max_lights > MAX_LIGHTS_LIMIT {
            log::warn!(
                "{} light slots requested, clamping to {}",
                max_lights,
                MAX_LIGHTS_LIMIT
            );
        }
        Self {
            max_lights: max_lights.min(MAX_LIGHTS_LIMIT),
        }
    }

    /// Number of light slots
    pub const fn max_lights(&self) -> usize {
        self.max_lights
    }

    /// Total buffer size in bytes
    pub const fn size(&self) -> usize {
        Self::HEADER_SIZE + Self::STRIDE * self.max_lights
    }

    /// Byte offset of slot `index`
    pub const fn slot_offset(index: usize) -> usize {
        Self::HEADER_SIZE + index * Self::STRIDE
    }

    /// Pack lights into `bytes` in iteration order
    ///
    /// Sentinel lights are skipped. At most [`Self::max_lights`] lights are
    /// written; the rest are dropped with a warning. Unused slots get sentinel records and the header
    /// holds the number written, which is also returned. `bytes` must be at
    /// least [`Self::size`] long and is left untouched otherwise.
    pub fn pack<I>(&self, bytes: &mut [u8], lights: I) -> SceneResult<usize>
    where
        I: IntoIterator<Item = (Light, Vec3, Vec3)>,
    {
        let required = self.size();
        let actual = bytes.len();
        let bytes = bytes
            .get_mut(..required)
            .ok_or(SceneError::BufferTooSmall { required, actual })?;

        let mut written = 0;
        let mut offered = 0;
        for (light, position, rotation) in lights {
            if light.is_sentinel() {
                continue;
            }
            offered += 1;
            if written < self.max_lights {
                light.encode_into(&mut bytes[Self::slot_offset(written)..], &position, &rotation)?;
                written += 1;
            }
        }
        if offered > written {
            log::warn!(
                "{} lights exceed the {} light slots; dropping the last {}",
                offered,
                self.max_lights,
                offered - written
            );
        }

        for slot in written..self.max_lights {
            Light::encode_sentinel(&mut bytes[Self::slot_offset(slot)..])?;
        }

        bytes[..Self::HEADER_SIZE].fill(0);
        // max_lights is bounded by the configuration limit
        let count = i32::try_from(written).unwrap_or(i32::MAX);
        light::write_i32(bytes, Self::COUNT_OFFSET, count);
        Ok(written)
    }

    /// Light count stored in a packed buffer
    pub fn read_count(&self, bytes: &[u8]) -> SceneResult<i32> {
        if bytes.len() < Self::HEADER_SIZE {
            return Err(SceneError::BufferTooSmall {
                required: Self::HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(light::read_i32(bytes, Self::COUNT_OFFSET))
    }

    /// Decode slot `index` of a packed buffer
    pub fn read_slot(&self, bytes: &[u8], index: usize) -> SceneResult<LightRecord> {
        if index >= self.max_lights {
            return Err(SceneError::LightIndexOutOfRange {
                index,
                len: self.max_lights,
            });
        }
        let start = Self::slot_offset(index);
        LightRecord::read(bytes.get(start..).unwrap_or_default())
    }
}

impl Default for LightBufferLayout {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIGHTS)
    }
}

/// Log every slot of a packed buffer at debug level
fn log_packed(layout: &LightBufferLayout, bytes: &[u8]) -> SceneResult<()> {
    log::debug!("Light buffer: {} lights", layout.read_count(bytes)?);
    for index in 0..layout.max_lights() {
        let record = layout.read_slot(bytes, index)?;
        if record.is_sentinel() {
            continue;
        }
        log::debug!(
            "  [{}] type {} color {:?} intensity {} position {:?} rotation {:?} cutoff {}/{}",
            index,
            record.light_type,
            record.color.as_slice(),
            record.intensity,
            record.position.as_slice(),
            record.rotation.as_slice(),
            record.inner_cutoff,
            record.outer_cutoff
        );
    }
    Ok(())
}

/// Map `buffer`, pack `lights` into it and unmap it again
///
/// The buffer is unmapped before any packing error is reported.
fn upload<I>(
    device: &mut dyn GraphicsDevice,
    buffer: BufferHandle,
    layout: &LightBufferLayout,
    lights: I,
) -> SceneResult<usize>
where
    I: IntoIterator<Item = (Light, Vec3, Vec3)>,
{
    let packed = {
        let bytes = device.map_buffer(buffer)?;
        layout.pack(bytes, lights)
    };
    device.unmap_buffer(buffer)?;
    packed
}

/// Keeps a uniform buffer in sync with the light objects of a scene
///
/// Lights are packed in the scene's insertion order, each with the position
/// and rotation of the object that carries it.
#[derive(Debug, Clone)]
pub struct SceneLightUboManager {
    layout: LightBufferLayout,
    buffer: Option<BufferHandle>,
}

impl SceneLightUboManager {
    /// Manager for a buffer with `max_lights` slots
    pub fn new(max_lights: usize) -> Self {
        Self {
            layout: LightBufferLayout::new(max_lights),
            buffer: None,
        }
    }

    /// Manager sized from scene configuration
    pub fn from_config(config: &SceneConfig) -> Self {
        Self::new(config.max_lights)
    }

    /// Buffer layout
    pub fn layout(&self) -> &LightBufferLayout {
        &self.layout
    }

    /// GPU buffer, once created
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// (Re)allocate the buffer and fill it from `scene`
    ///
    /// Any previous buffer is deleted first, so calling this again simply
    /// starts over. Returns the number of lights written.
    pub fn create_light_buffer(&mut self, device: &mut dyn GraphicsDevice, scene: &Scene) -> SceneResult<usize> {
        self.release(device);
        let buffer = device.create_uniform_buffer(self.layout.size())?;
        self.buffer = Some(buffer);
        log::info!(
            "Created light buffer {:?} ({} bytes, {} slots)",
            buffer,
            self.layout.size(),
            self.layout.max_lights()
        );
        self.update_light_buffer(device, scene)
    }

    /// Repack the buffer from the current light objects of `scene`
    ///
    /// Returns the number of lights written.
    pub fn update_light_buffer(&self, device: &mut dyn GraphicsDevice, scene: &Scene) -> SceneResult<usize> {
        let buffer = self.require_buffer()?;
        let lights = scene
            .light_objects()
            .map(|(_, object)| (object.light_value(), object.position(), object.rotation()));
        let written = upload(device, buffer, &self.layout, lights)?;
        log::trace!("Packed {} scene lights", written);
        Ok(written)
    }

    /// Bind the whole buffer to a uniform block binding point
    pub fn bind(&self, device: &mut dyn GraphicsDevice, binding_point: u32) -> SceneResult<()> {
        let buffer = self.require_buffer()?;
        device.bind_uniform_buffer(binding_point, buffer)?;
        Ok(())
    }

    /// Delete the buffer
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            device.delete_buffer(buffer);
        }
    }

    /// Decode the buffer contents back from the device
    pub fn read_back(&self, device: &dyn GraphicsDevice) -> SceneResult<(i32, Vec<LightRecord>)> {
        let bytes = device.read_buffer(self.require_buffer()?)?;
        let count = self.layout.read_count(&bytes)?;
        let records = (0..self.layout.max_lights())
            .map(|index| self.layout.read_slot(&bytes, index))
            .collect::<SceneResult<Vec<_>>>()?;
        Ok((count, records))
    }

    /// Dump the decoded buffer contents at debug level
    pub fn log_buffer_contents(&self, device: &dyn GraphicsDevice) -> SceneResult<()> {
        let bytes = device.read_buffer(self.require_buffer()?)?;
        log_packed(&self.layout, &bytes)
    }

    fn require_buffer(&self) -> SceneResult<BufferHandle> {
        self.buffer.ok_or_else(|| {
            log::error!("Light buffer used before create_light_buffer");
            SceneError::LightBufferNotCreated
        })
    }
}

impl Default for SceneLightUboManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIGHTS)
    }
}

/// A light with its own placement, for use outside a scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedLight {
    /// Emitted light
    pub light: Light,
    /// World position
    pub position: Vec3,
    /// Euler rotation in radians
    pub rotation: Vec3,
}

impl PlacedLight {
    /// Place `light`
    pub fn new(light: Light, position: Vec3, rotation: Vec3) -> Self {
        Self { light, position, rotation }
    }
}

/// Free-standing list of lights with its own uniform buffer
///
/// Usage: add lights, `create_light_buffer`, `bind`; after changing the
/// list call `update_light_buffer` again.
#[derive(Debug, Clone)]
pub struct LightGroup {
    lights: Vec<PlacedLight>,
    layout: LightBufferLayout,
    buffer: Option<BufferHandle>,
}

impl LightGroup {
    /// Empty group with `max_lights` buffer slots
    pub fn new(max_lights: usize) -> Self {
        Self {
            lights: Vec::new(),
            layout: LightBufferLayout::new(max_lights),
            buffer: None,
        }
    }

    /// Light at `index`
    pub fn light(&self, index: usize) -> Option<&PlacedLight> {
        self.lights.get(index)
    }

    /// All lights in insertion order
    pub fn lights(&self) -> &[PlacedLight] {
        &self.lights
    }

    /// Number of lights
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Append a light, returning its index
    pub fn add_light(&mut self, light: PlacedLight) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Append several lights
    pub fn add_lights(&mut self, lights: impl IntoIterator<Item = PlacedLight>) {
        self.lights.extend(lights);
    }

    /// Remove the light at `index`, shifting later lights down
    pub fn remove_light(&mut self, index: usize) -> SceneResult<PlacedLight> {
        if index >= self.lights.len() {
            return Err(SceneError::LightIndexOutOfRange {
                index,
                len: self.lights.len(),
            });
        }
        Ok(self.lights.remove(index))
    }

    /// Buffer bytes the group occupies (header plus every slot)
    pub fn memory_occupation(&self) -> usize {
        self.layout.size()
    }

    /// Buffer layout
    pub fn layout(&self) -> &LightBufferLayout {
        &self.layout
    }

    /// GPU buffer, once created
    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// (Re)allocate the buffer and fill it
    pub fn create_light_buffer(&mut self, device: &mut dyn GraphicsDevice) -> SceneResult<usize> {
        self.release(device);
        self.buffer = Some(device.create_uniform_buffer(self.layout.size())?);
        self.update_light_buffer(device)
    }

    /// Repack the buffer from the current list
    pub fn update_light_buffer(&self, device: &mut dyn GraphicsDevice) -> SceneResult<usize> {
        let buffer = self.buffer.ok_or(SceneError::LightBufferNotCreated)?;
        let lights = self.lights.iter().map(|p| (p.light, p.position, p.rotation));
        upload(device, buffer, &self.layout, lights)
    }

    /// Bind the whole buffer
    pub fn bind(&self, device: &mut dyn GraphicsDevice, binding_point: u32) -> SceneResult<()> {
        let buffer = self.buffer.ok_or(SceneError::LightBufferNotCreated)?;
        device.bind_uniform_buffer(binding_point, buffer)?;
        Ok(())
    }

    /// Bind `size` bytes starting at `offset`
    pub fn bind_range(
        &self,
        device: &mut dyn GraphicsDevice,
        binding_point: u32,
        offset: usize,
        size: usize,
    ) -> SceneResult<()> {
        let buffer = self.buffer.ok_or(SceneError::LightBufferNotCreated)?;
        device.bind_uniform_buffer_range(binding_point, buffer, offset, size)?;
        Ok(())
    }

    /// Dump the decoded buffer contents at debug level
    pub fn log_buffer_contents(&self, device: &dyn GraphicsDevice) -> SceneResult<()> {
        let buffer = self.buffer.ok_or(SceneError::LightBufferNotCreated)?;
        log_packed(&self.layout, &device.read_buffer(buffer)?)
    }

    /// Delete the buffer
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            device.delete_buffer(buffer);
        }
    }
}

impl Default for LightGroup {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIGHTS)
    }
}
