//! # Unified Configuration System
//!
//! All configuration structures for the scene subsystem live here. Every
//! struct uses `#[serde(default)]` so a config file only has to list the
//! values it wants to change.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging and debug behaviour
//! - **Scene Config**: asset locations, light buffer capacity, default
//!   light and skybox resources, camera defaults

use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::render::ShaderPaths;

// Re-export the loading trait next to the structs implementing it
pub use crate::config::{Config, ConfigError};

/// Number of light slots the stock light shaders declare
pub const DEFAULT_MAX_LIGHTS: usize = 16;

/// Hard upper bound for `max_lights`
///
/// The light buffer must fit in the 16 KiB minimum uniform block size
/// OpenGL guarantees.
pub const MAX_LIGHTS_LIMIT: usize = 128;

/// # Camera Configuration
///
/// Initial placement and feel of the scene's fly camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial camera position
    pub position: [f32; 3],
    /// World up direction
    pub world_up: [f32; 3],
    /// Movement speed in units per second
    pub move_speed: f32,
    /// Degrees of rotation per pixel of mouse movement
    pub mouse_sensitivity: f32,
    /// Initial vertical field of view in degrees
    pub zoom: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.5, -5.0],
            world_up: [0.0, 1.0, 0.0],
            move_speed: 5.0,
            mouse_sensitivity: 0.1,
            zoom: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// # Skybox Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyboxConfig {
    /// Cube mesh used for the skybox (relative to the asset root)
    pub model: String,
    /// Skybox shader (relative to the asset root)
    pub shader: ShaderPaths,
    /// Folder holding the six faces of the fallback (pure white) cube map
    pub fallback_texture_folder: String,
    /// Tint color, also used as the clear color
    pub color: [f32; 3],
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        Self {
            model: "stdModel/box.obj".to_string(),
            shader: ShaderPaths::new(
                "stdShader/stdSkyboxShader.vs.glsl",
                "stdShader/stdSkyboxShader.fs.glsl",
            ),
            fallback_texture_folder: "stdTexture/skybox/".to_string(),
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// # Scene Configuration
///
/// Everything a `Scene` and its light buffer need at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory prepended to every built-in asset path
    pub asset_root: String,
    /// Number of light slots in the light uniform buffer
    ///
    /// Must match the array size declared by the light shaders.
    pub max_lights: usize,
    /// Uniform block binding point of the light buffer
    pub light_binding_point: u32,
    /// Placeholder mesh drawn for light objects (relative to the asset root)
    pub light_model: String,
    /// Shader used to draw light objects (relative to the asset root)
    pub light_shader: ShaderPaths,
    /// Camera defaults
    pub camera: CameraConfig,
    /// Skybox resources
    pub skybox: SkyboxConfig,
}

impl SceneConfig {
    /// Create a scene configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the asset root directory
    pub fn with_asset_root(mut self, root: impl Into<String>) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Set the number of light slots
    pub fn with_max_lights(mut self, max_lights: usize) -> Self {
        self.max_lights = max_lights;
        self
    }

    /// Resolve an asset path against the asset root
    pub fn resolve(&self, relative: &str) -> String {
        if self.asset_root.is_empty() || relative.is_empty() {
            return relative.to_string();
        }
        Path::new(&self.asset_root).join(relative).to_string_lossy().into_owned()
    }

    /// Light mesh path with the asset root applied
    pub fn light_model_path(&self) -> String {
        self.resolve(&self.light_model)
    }

    /// Light shader paths with the asset root applied
    pub fn light_shader_paths(&self) -> ShaderPaths {
        self.light_shader.map(|p| self.resolve(p))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lights == 0 {
            return Err(ConfigError::Invalid("max_lights must be at least 1".to_string()));
        }
        if self.max_lights > MAX_LIGHTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_lights {} exceeds the limit of {}",
                self.max_lights, MAX_LIGHTS_LIMIT
            )));
        }
        if self.light_model.is_empty() {
            return Err(ConfigError::Invalid("light_model cannot be empty".to_string()));
        }
        if self.light_shader.vertex.is_empty() || self.light_shader.fragment.is_empty() {
            return Err(ConfigError::Invalid(
                "light_shader needs a vertex and a fragment stage".to_string(),
            ));
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (near = {}, far = {})",
                self.camera.near, self.camera.far
            )));
        }
        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            max_lights: DEFAULT_MAX_LIGHTS,
            light_binding_point: 0,
            light_model: "stdModel/sphere.obj".to_string(),
            light_shader: ShaderPaths::new(
                "stdShader/stdLightShader.vs.glsl",
                "stdShader/stdLightShader.fs.glsl",
            ),
            camera: CameraConfig::default(),
            skybox: SkyboxConfig::default(),
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration loaded by applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Whether to enable debug features (light buffer dumps)
    pub debug_mode: bool,
    /// Scene configuration
    pub scene: SceneConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            scene: SceneConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Set the scene configuration
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }
        self.scene.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scene.max_lights, DEFAULT_MAX_LIGHTS);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_lights = SceneConfig::default().with_max_lights(0);
        assert!(matches!(zero_lights.validate(), Err(ConfigError::Invalid(_))));

        let too_many = SceneConfig::default().with_max_lights(MAX_LIGHTS_LIMIT + 1);
        assert!(too_many.validate().is_err());

        let mut bad_planes = SceneConfig::default();
        bad_planes.camera.far = bad_planes.camera.near;
        assert!(bad_planes.validate().is_err());

        let bad_level = EngineConfig::default().with_log_level("loud");
        assert!(bad_level.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
            log_level = "debug"

            [scene]
            max_lights = 8
            asset_root = "resources"
        "#;
        let config = EngineConfig::from_str_with_format(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scene.max_lights, 8);
        assert_eq!(config.scene.light_model, "stdModel/sphere.obj");
        assert_eq!(config.scene.camera, CameraConfig::default());
    }

    #[test]
    fn test_ron_roundtrip() {
        let config = EngineConfig::default().with_log_level("warn");
        let text = config.to_string_with_format(ConfigFormat::Ron).unwrap();
        let parsed = EngineConfig::from_str_with_format(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_resolve_against_asset_root() {
        let config = SceneConfig::default().with_asset_root("res");
        assert_eq!(
            Path::new(&config.light_model_path()),
            Path::new("res").join("stdModel/sphere.obj")
        );

        let bare = SceneConfig::default().with_asset_root("");
        assert_eq!(bare.light_model_path(), "stdModel/sphere.obj");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EngineConfig::load_from_file("settings.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
