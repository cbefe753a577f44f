//! Skybox
//!
//! The skybox lives outside the object graph: it is drawn after everything
//! else and its cube texture doubles as the environment map for meshes.

use super::error::SceneResult;
use super::render_object::{ObjectType, RenderObject};
use crate::foundation::math::Vec3;
use crate::render::{AssetLoader, GraphicsDevice, TextureHandle};

/// Environment cube with a fallback texture and a tint color
#[derive(Debug, Clone)]
pub struct Skybox {
    object: RenderObject,
    fallback_texture: TextureHandle,
    user_texture: Option<TextureHandle>,
    color: Vec3,
}

impl Skybox {
    /// Wrap a skybox node
    ///
    /// `fallback_texture` is used until [`Self::load_texture`] succeeds.
    pub fn new(object: RenderObject, fallback_texture: TextureHandle, color: Vec3) -> Self {
        debug_assert_eq!(object.object_type(), ObjectType::Skybox);
        Self {
            object,
            fallback_texture,
            user_texture: None,
            color,
        }
    }

    /// The cube node
    pub fn object(&self) -> &RenderObject {
        &self.object
    }

    /// The cube node, for transform or resource edits
    pub fn object_mut(&mut self) -> &mut RenderObject {
        &mut self.object
    }

    /// Texture to sample: the user texture if one is loaded, else the fallback
    pub fn texture(&self) -> TextureHandle {
        self.user_texture.unwrap_or(self.fallback_texture)
    }

    /// The fallback (pure white) cube map
    pub fn fallback_texture(&self) -> TextureHandle {
        self.fallback_texture
    }

    /// The user cube map, if loaded
    pub fn user_texture(&self) -> Option<TextureHandle> {
        self.user_texture
    }

    /// Tint and clear color
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Change the tint and clear color
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Load a cube map from `folder` and make it the active texture
    ///
    /// The previous user texture is deleted once the new one has loaded; on
    /// failure the current texture stays active.
    pub fn load_texture(
        &mut self,
        loader: &mut dyn AssetLoader,
        device: &mut dyn GraphicsDevice,
        folder: &str,
    ) -> SceneResult<TextureHandle> {
        let texture = loader.load_cube_texture(folder)?;
        if let Some(old) = self.user_texture.replace(texture) {
            device.delete_texture(old);
        }
        log::info!("Loaded skybox texture from '{}'", folder);
        Ok(texture)
    }

    /// Delete both cube maps
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(texture) = self.user_texture.take() {
            device.delete_texture(texture);
        }
        device.delete_texture(self.fallback_texture);
    }
}
