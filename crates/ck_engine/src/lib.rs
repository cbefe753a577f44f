//! # CK Engine
//!
//! Scene graph and multi-light uniform buffer management for a small
//! real-time renderer.
//!
//! ## Features
//!
//! - **Scene graph**: parent/child hierarchy of meshes, lights and a skybox
//!   behind stable, generation-checked handles
//! - **Prototype pooling**: every model and shader is loaded once and shared
//! - **Light uniform buffer**: std140 packing of up to `max_lights` lights
//!   straight from the scene's light objects
//! - **Backend agnostic**: the graphics API, asset importers and window are
//!   reached only through traits; a headless backend records every call
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use ck_engine::prelude::*;
//! use ck_engine::render::headless::{new_command_log, HeadlessDevice, HeadlessLoader};
//!
//! let log = new_command_log();
//! let mut loader = HeadlessLoader::new(Rc::clone(&log));
//! let mut device = HeadlessDevice::with_log(log);
//!
//! let mut scene = Scene::new(SceneConfig::default());
//! let lamp = scene.add_light(&mut loader, "lamp", Light::point(Vec3::new(1.0, 1.0, 1.0), 2.0))?;
//! scene.modify_object(lamp, &EditContext::new(ObjectType::Light).with_position(Vec3::new(1.0, 1.5, 1.0)))?;
//!
//! let mut lights = SceneLightUboManager::from_config(scene.config());
//! assert_eq!(lights.create_light_buffer(&mut device, &scene)?, 1);
//! lights.bind(&mut device, scene.config().light_binding_point)?;
//!
//! scene.draw(&mut device, &(1280, 720));
//! # Ok::<(), ck_engine::scene::SceneError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{CameraConfig, Config, EngineConfig, SceneConfig, SkyboxConfig},
        foundation::math::{Mat4, Mat4Ext, Vec3},
        render::{AssetLoader, FramebufferSize, GraphicsDevice, Model, Shader, ShaderPaths},
        scene::{
            Camera, CameraMovement, DrawType, EditContext, Light, LightGroup, LightType, ObjectHandle,
            ObjectType, PlacedLight, RenderObject, Scene, SceneError, SceneLightUboManager,
        },
    };
}
