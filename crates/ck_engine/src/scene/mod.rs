//! Scene graph and light buffer management
//!
//! ## Architecture
//!
//! ```text
//! Scene ──owns──► ObjectGraph (arena of RenderObjects, root first)
//!   │                 │
//!   │                 └─ RenderObject ──Arc──► Model / Shader prototypes
//!   ├──owns──► PrototypeCache (models, shaders; keyed by canonical path)
//!   ├──owns──► Camera
//!   └──owns──► Skybox (drawn last)
//!
//! SceneLightUboManager ──reads──► Scene light objects ──packs──► GPU buffer
//! ```
//!
//! - Objects are addressed by [`ObjectHandle`]s that survive arena growth
//!   and go stale when their object is removed.
//! - Models and shaders are loaded once per scene and shared.
//! - Lights are plain values; their placement comes from the carrying
//!   object when the light buffer is packed.

mod camera;
mod error;
mod graph;
mod light;
mod light_buffer;
mod prototypes;
mod render_object;
#[allow(clippy::module_inception)]
mod scene;
mod skybox;

#[cfg(test)]
mod tests;

pub use camera::{Camera, CameraMovement, MAX_ZOOM, MIN_ZOOM, PITCH_LIMIT};
pub use error::{SceneError, SceneResult};
pub use graph::{Ancestors, ObjectGraph, ObjectHandle};
pub use light::{layout, Light, LightRecord, LightType};
pub use light_buffer::{LightBufferLayout, LightGroup, PlacedLight, SceneLightUboManager};
pub use prototypes::{canonicalize_path, canonicalize_shader, PrototypeCache};
pub use render_object::{DrawType, EditContext, ObjectKind, ObjectType, RenderContext, RenderObject};
pub use scene::{Scene, DEFAULT_CLEAR_COLOR, ROOT_NAME};
pub use skybox::Skybox;
