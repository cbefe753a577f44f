//! The scene: object tree, prototype pools, camera and skybox
//!
//! A [`Scene`] is created once at startup and handed by reference to
//! whatever needs it. Objects are added through the pooled loaders, edited
//! through [`EditContext`]s and drawn in insertion order with the skybox
//! last.

use std::sync::Arc;

use super::camera::Camera;
use super::error::{SceneError, SceneResult};
use super::graph::{Ancestors, ObjectGraph, ObjectHandle};
use super::light::Light;
use super::prototypes::{canonicalize_path, canonicalize_shader, PrototypeCache};
use super::render_object::{EditContext, ObjectType, RenderContext, RenderObject};
use super::skybox::Skybox;
use crate::core::config::SceneConfig;
use crate::foundation::math::Vec3;
use crate::render::{AssetLoader, FramebufferSize, GraphicsDevice, Model, Shader, ShaderPaths};

/// Name of the root node
pub const ROOT_NAME: &str = "root";

/// Clear color used when the scene has no skybox
pub const DEFAULT_CLEAR_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);

/// Scene graph with shared model and shader prototypes
#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    graph: ObjectGraph,
    models: PrototypeCache<String, dyn Model>,
    shaders: PrototypeCache<ShaderPaths, dyn Shader>,
    camera: Camera,
    skybox: Option<Skybox>,
}

impl Scene {
    /// Create an empty scene holding only the root node
    pub fn new(config: SceneConfig) -> Self {
        let camera = Camera::from_config(&config.camera);
        log::info!(
            "Created scene (asset root '{}', {} light slots)",
            config.asset_root,
            config.max_lights
        );
        Self {
            config,
            graph: ObjectGraph::new(RenderObject::null(ROOT_NAME)),
            models: PrototypeCache::new(),
            shaders: PrototypeCache::new(),
            camera,
            skybox: None,
        }
    }

    /// Configuration the scene was created with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The object arena
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    // ------------------------------------------------------------------
    // Prototypes
    // ------------------------------------------------------------------

    /// Pooled model for `path`, loading it on first use
    pub fn load_model(&mut self, loader: &mut dyn AssetLoader, path: &str) -> SceneResult<Arc<dyn Model>> {
        let model = self.models.get_or_load(canonicalize_path(path), |key| {
            log::debug!("Loading model '{}'", key);
            loader.load_model(path)
        })?;
        Ok(model)
    }

    /// Pooled shader program for `paths`, building it on first use
    pub fn load_shader(&mut self, loader: &mut dyn AssetLoader, paths: &ShaderPaths) -> SceneResult<Arc<dyn Shader>> {
        let shader = self.shaders.get_or_load(canonicalize_shader(paths), |key| {
            log::debug!("Loading shader '{}'", key);
            loader.load_shader(paths)
        })?;
        Ok(shader)
    }

    /// Look up or load a model and a shader, caching both only if both load
    fn load_pair(
        &mut self,
        loader: &mut dyn AssetLoader,
        model_path: &str,
        shader_paths: &ShaderPaths,
    ) -> SceneResult<(Arc<dyn Model>, Arc<dyn Shader>)> {
        let model_key = canonicalize_path(model_path);
        let shader_key = canonicalize_shader(shader_paths);

        let model = match self.models.get(&model_key) {
            Some(model) => Arc::clone(model),
            None => {
                log::debug!("Loading model '{}'", model_key);
                loader.load_model(model_path)?
            }
        };
        let shader = match self.shaders.get(&shader_key) {
            Some(shader) => Arc::clone(shader),
            None => {
                log::debug!("Loading shader '{}'", shader_key);
                loader.load_shader(shader_paths)?
            }
        };

        Ok((
            self.models.insert(model_key, model),
            self.shaders.insert(shader_key, shader),
        ))
    }

    /// Number of pooled models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of pooled shader programs
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Drop pooled prototypes no object uses anymore
    ///
    /// Returns the number of prototypes dropped.
    pub fn prune_prototypes(&mut self) -> usize {
        let pruned = self.models.prune_unused() + self.shaders.prune_unused();
        if pruned > 0 {
            log::debug!("Pruned {} unused prototypes", pruned);
        }
        pruned
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Add a polygon mesh under the root
    ///
    /// The model and shader are shared with every other object loaded from
    /// the same files. On a load failure nothing is pooled and no object is
    /// created.
    pub fn add_model_from_file(
        &mut self,
        loader: &mut dyn AssetLoader,
        model_path: &str,
        shader_paths: &ShaderPaths,
        name: &str,
    ) -> SceneResult<ObjectHandle> {
        let (model, shader) = self.load_pair(loader, model_path, shader_paths).map_err(|e| {
            log::error!("Failed to add model '{}' from '{}': {}", name, model_path, e);
            e
        })?;
        let handle = self
            .graph
            .insert(self.graph.root(), RenderObject::polygon_mesh(name, model, shader))?;
        log::info!("Added model '{}' from '{}'", name, model_path);
        Ok(handle)
    }

    /// Add a light under the root, drawn with the configured light mesh
    ///
    /// Place it with [`Self::modify_object`]; a new light sits at the origin.
    pub fn add_light(&mut self, loader: &mut dyn AssetLoader, name: &str, light: Light) -> SceneResult<ObjectHandle> {
        let model_path = self.config.light_model_path();
        let shader_paths = self.config.light_shader_paths();
        let (model, shader) = self.load_pair(loader, &model_path, &shader_paths).map_err(|e| {
            log::error!("Failed to add light '{}': {}", name, e);
            e
        })?;
        let handle = self
            .graph
            .insert(self.graph.root(), RenderObject::light(name, light, model, shader))?;
        log::info!("Added {} light '{}'", light.light_type(), name);
        Ok(handle)
    }

    /// Apply an edit to an object
    ///
    /// The edit is checked as a whole first: a stale handle, a missing or
    /// cyclic parent, a type mismatch or a null target rejects it and
    /// leaves the scene untouched.
    pub fn modify_object(&mut self, handle: ObjectHandle, edit: &EditContext) -> SceneResult<()> {
        if let Err(e) = self.check_edit(handle, edit) {
            log::error!("Discarded edit of {:?}: {}", handle, e);
            return Err(e);
        }

        if let Some(object) = self.graph.get_mut(handle) {
            object.modify(edit)?;
        }
        if let Some(parent) = edit.parent {
            self.graph.reparent(handle, parent)?;
        }
        Ok(())
    }

    fn check_edit(&self, handle: ObjectHandle, edit: &EditContext) -> SceneResult<()> {
        let object = self.graph.get(handle).ok_or(SceneError::InvalidHandle(handle))?;
        object.check_edit(edit)?;
        if let Some(parent) = edit.parent {
            self.graph.check_reparent(handle, parent)?;
        }
        Ok(())
    }

    /// Remove an object and everything below it
    ///
    /// Returns the number of objects removed. Handles of removed objects go
    /// stale; their prototypes stay pooled until [`Self::prune_prototypes`].
    pub fn remove_object(&mut self, handle: ObjectHandle) -> SceneResult<usize> {
        match self.graph.remove_subtree(handle) {
            Ok(removed) => {
                log::info!("Removed {} object(s) starting at {:?}", removed.len(), handle);
                Ok(removed.len())
            }
            Err(e) => {
                log::error!("Cannot remove {:?}: {}", handle, e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The root node
    pub fn root(&self) -> ObjectHandle {
        self.graph.root()
    }

    /// Look up an object
    pub fn object(&self, handle: ObjectHandle) -> Option<&RenderObject> {
        self.graph.get(handle)
    }

    /// Every object in insertion order, root first
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &RenderObject)> + '_ {
        self.graph.iter()
    }

    /// Number of objects, root included
    pub fn object_count(&self) -> usize {
        self.graph.len()
    }

    /// Children of an object
    pub fn children(&self, handle: ObjectHandle) -> &[ObjectHandle] {
        self.graph.children(handle)
    }

    /// Parent of an object
    pub fn parent(&self, handle: ObjectHandle) -> Option<ObjectHandle> {
        self.graph.parent(handle)
    }

    /// Distance from an object to the root
    pub fn depth(&self, handle: ObjectHandle) -> Option<usize> {
        self.graph.depth(handle)
    }

    /// Ancestors of an object, nearest first, ending at the root
    pub fn ancestors(&self, handle: ObjectHandle) -> Ancestors<'_> {
        self.graph.ancestors(handle)
    }

    /// Light objects in insertion order
    pub fn light_objects(&self) -> impl Iterator<Item = (ObjectHandle, &RenderObject)> + '_ {
        self.graph
            .iter()
            .filter(|(_, object)| object.object_type() == ObjectType::Light)
    }

    /// First object with this name, in insertion order
    pub fn find_by_name(&self, name: &str) -> Option<ObjectHandle> {
        self.graph
            .iter()
            .find(|(_, object)| object.name() == name)
            .map(|(handle, _)| handle)
    }

    /// The camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The camera, for input handling
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    // ------------------------------------------------------------------
    // Skybox
    // ------------------------------------------------------------------

    /// The skybox, if any
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    /// The skybox, for texture or color changes
    pub fn skybox_mut(&mut self) -> Option<&mut Skybox> {
        self.skybox.as_mut()
    }

    /// Install or remove the skybox, returning the previous one
    ///
    /// The caller owns the returned skybox and releases its textures.
    pub fn set_skybox(&mut self, skybox: Option<Skybox>) -> Option<Skybox> {
        std::mem::replace(&mut self.skybox, skybox)
    }

    /// Build the skybox from the configured cube mesh, shader and fallback
    /// texture, replacing (and releasing) any existing one
    pub fn load_skybox(&mut self, loader: &mut dyn AssetLoader, device: &mut dyn GraphicsDevice) -> SceneResult<()> {
        let sky = self.config.skybox.clone();
        let model_path = self.config.resolve(&sky.model);
        let shader_paths = sky.shader.map(|p| self.config.resolve(p));
        let fallback_folder = self.config.resolve(&sky.fallback_texture_folder);

        let (model, shader) = self.load_pair(loader, &model_path, &shader_paths)?;
        let fallback = loader.load_cube_texture(&fallback_folder)?;
        let skybox = Skybox::new(
            RenderObject::skybox("skybox", model, shader),
            fallback,
            Vec3::from(sky.color),
        );

        if let Some(mut old) = self.set_skybox(Some(skybox)) {
            old.release(device);
        }
        log::info!("Loaded skybox from '{}'", model_path);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Per-frame values for a framebuffer with this aspect ratio
    pub fn render_context(&self, aspect: f32) -> RenderContext {
        RenderContext {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(aspect),
            camera_position: self.camera.position(),
            skybox_texture: self.skybox.as_ref().map(Skybox::texture),
            skybox_color: self.skybox.as_ref().map_or(DEFAULT_CLEAR_COLOR, Skybox::color),
        }
    }

    /// Draw one frame
    ///
    /// Clears to the skybox color, draws every non-null object in insertion
    /// order and the skybox last. An object that fails to draw is logged
    /// and skipped. A framebuffer with zero height (minimised window)
    /// skips the frame. Returns the number of objects drawn.
    #[allow(clippy::cast_precision_loss)]
    pub fn draw(&self, device: &mut dyn GraphicsDevice, window: &dyn FramebufferSize) -> usize {
        let (width, height) = window.framebuffer_size();
        if height <= 0 {
            log::trace!("Skipping frame for {}x{} framebuffer", width, height);
            return 0;
        }
        let ctx = self.render_context(width as f32 / height as f32);

        device.clear(ctx.skybox_color);

        let mut drawn = 0;
        for (handle, object) in self.graph.iter() {
            if object.object_type() == ObjectType::NullObject {
                continue;
            }
            match object.draw(&ctx, device) {
                Ok(()) => drawn += 1,
                Err(e) => log::error!("Failed to draw {:?} ('{}'): {}", handle, object.name(), e),
            }
        }

        if let Some(skybox) = &self.skybox {
            match skybox.object().draw(&ctx, device) {
                Ok(()) => drawn += 1,
                Err(e) => log::error!("Failed to draw skybox: {}", e),
            }
        }
        drawn
    }

    /// Tear the scene down to its root
    ///
    /// Every object and prototype is dropped and the skybox textures are
    /// deleted. Light buffers are owned by their managers and released
    /// separately.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(mut skybox) = self.skybox.take() {
            skybox.release(device);
        }
        self.graph.clear();
        self.models.clear();
        self.shaders.clear();
        log::info!("Released scene");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{new_command_log, Command, HeadlessDevice, HeadlessLoader};
    use crate::render::FrontFace;
    use crate::scene::render_object::DrawType;
    use std::rc::Rc;

    const CUBE: &str = "assets/model/cube.obj";

    fn shader() -> ShaderPaths {
        ShaderPaths::new("shader/basic.vs", "shader/basic.fs")
    }

    fn setup() -> (Scene, HeadlessLoader, HeadlessDevice) {
        let log = new_command_log();
        let loader = HeadlessLoader::new(Rc::clone(&log));
        let device = HeadlessDevice::with_log(log);
        (Scene::new(SceneConfig::default()), loader, device)
    }

    #[test]
    fn test_new_scene_has_null_root() {
        let (scene, _, _) = setup();
        let root = scene.object(scene.root()).unwrap();
        assert_eq!(root.object_type(), ObjectType::NullObject);
        assert_eq!(root.name(), ROOT_NAME);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.parent(scene.root()), None);
    }

    #[test]
    fn test_models_are_pooled() {
        let (mut scene, mut loader, _) = setup();
        let a = scene.add_model_from_file(&mut loader, CUBE, &shader(), "a").unwrap();
        let b = scene
            .add_model_from_file(&mut loader, "./assets/model/../model/cube.obj", &shader(), "b")
            .unwrap();

        assert_eq!(scene.model_count(), 1);
        assert_eq!(scene.shader_count(), 1);
        assert_eq!(loader.model_loads(), 1);
        assert_eq!(loader.shader_loads(), 1);

        let model_a = scene.object(a).and_then(RenderObject::model).unwrap();
        let model_b = scene.object(b).and_then(RenderObject::model).unwrap();
        assert!(Arc::ptr_eq(model_a, model_b));
        assert_eq!(scene.children(scene.root()), &[a, b]);
        assert_eq!(scene.object(a).unwrap().draw_type(), DrawType::NORMAL);
    }

    #[test]
    fn test_failed_load_creates_nothing() {
        let log = new_command_log();
        let mut loader = HeadlessLoader::new(log).fail_on("shader/broken.fs");
        let mut scene = Scene::new(SceneConfig::default());

        let result = scene.add_model_from_file(
            &mut loader,
            CUBE,
            &ShaderPaths::new("shader/basic.vs", "shader/broken.fs"),
            "cube",
        );
        assert!(matches!(result, Err(SceneError::Render(_))));
        assert_eq!(scene.model_count(), 0);
        assert_eq!(scene.shader_count(), 0);
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_add_light_uses_configured_assets() {
        let (mut scene, mut loader, _) = setup();
        let lamp = scene
            .add_light(&mut loader, "lamp", Light::point(Vec3::new(1.0, 1.0, 1.0), 2.0))
            .unwrap();
        scene.add_light(&mut loader, "lamp2", Light::default()).unwrap();

        let object = scene.object(lamp).unwrap();
        assert_eq!(object.object_type(), ObjectType::Light);
        assert_eq!(
            object.model().map(|m| m.load_path().to_string()),
            Some(scene.config().light_model_path())
        );
        assert_eq!(loader.model_loads(), 1);
        assert_eq!(scene.light_objects().count(), 2);
    }

    #[test]
    fn test_modify_rejections_leave_scene_unchanged() {
        let (mut scene, mut loader, _) = setup();
        let cube = scene.add_model_from_file(&mut loader, CUBE, &shader(), "cube").unwrap();
        let root = scene.root();

        let mismatch = EditContext::new(ObjectType::Light).with_position(Vec3::new(5.0, 5.0, 5.0));
        assert!(matches!(scene.modify_object(cube, &mismatch), Err(SceneError::TypeMismatch { .. })));
        assert_eq!(scene.object(cube).unwrap().position(), Vec3::zeros());

        let rename_root = EditContext::new(ObjectType::NullObject).with_name("x");
        assert!(matches!(scene.modify_object(root, &rename_root), Err(SceneError::NullObjectEdit)));

        scene.remove_object(cube).unwrap();
        let stale = EditContext::new(ObjectType::PolygonMesh).with_name("x");
        assert!(matches!(scene.modify_object(cube, &stale), Err(SceneError::InvalidHandle(_))));
    }

    #[test]
    fn test_bad_parent_rejects_whole_edit() {
        let (mut scene, mut loader, _) = setup();
        let a = scene.add_model_from_file(&mut loader, CUBE, &shader(), "a").unwrap();
        let b = scene.add_model_from_file(&mut loader, CUBE, &shader(), "b").unwrap();
        scene
            .modify_object(b, &EditContext::new(ObjectType::PolygonMesh).with_parent(a))
            .unwrap();

        let cyclic = EditContext::new(ObjectType::PolygonMesh)
            .with_name("renamed")
            .with_parent(b);
        assert!(matches!(scene.modify_object(a, &cyclic), Err(SceneError::CyclicParent { .. })));
        assert_eq!(scene.object(a).unwrap().name(), "a");
        assert_eq!(scene.parent(a), Some(scene.root()));
    }

    #[test]
    fn test_remove_object_and_prune() {
        let (mut scene, mut loader, _) = setup();
        let cube = scene.add_model_from_file(&mut loader, CUBE, &shader(), "cube").unwrap();
        assert!(matches!(scene.remove_object(scene.root()), Err(SceneError::RootRemoval)));

        assert_eq!(scene.remove_object(cube).unwrap(), 1);
        assert_eq!(scene.model_count(), 1);
        assert_eq!(scene.prune_prototypes(), 2);
        assert_eq!(scene.model_count(), 0);
        assert!(scene.find_by_name("cube").is_none());
    }

    #[test]
    fn test_draw_order_and_skybox_last() {
        let (mut scene, mut loader, mut device) = setup();
        scene.add_model_from_file(&mut loader, CUBE, &shader(), "first").unwrap();
        scene.add_model_from_file(&mut loader, "assets/model/sphere.obj", &shader(), "second").unwrap();
        scene.load_skybox(&mut loader, &mut device).unwrap();
        device.clear_commands();

        assert_eq!(scene.draw(&mut device, &(800, 600)), 3);

        let commands = device.commands();
        assert_eq!(commands.first(), Some(&Command::Clear(Vec3::new(1.0, 1.0, 1.0))));
        let draws: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawModel { model, .. } => Some(model.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0], CUBE);
        assert_eq!(draws[1], "assets/model/sphere.obj");
        assert_eq!(draws[2], scene.config().resolve(&scene.config().skybox.model));
        assert_eq!(commands.last(), Some(&Command::SetFrontFace(FrontFace::CounterClockwise)));
    }

    #[test]
    fn test_zero_height_skips_frame() {
        let (mut scene, mut loader, mut device) = setup();
        scene.add_model_from_file(&mut loader, CUBE, &shader(), "cube").unwrap();
        device.clear_commands();

        assert_eq!(scene.draw(&mut device, &(800, 0)), 0);
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_release_clears_everything() {
        let (mut scene, mut loader, mut device) = setup();
        scene.add_model_from_file(&mut loader, CUBE, &shader(), "cube").unwrap();
        scene.load_skybox(&mut loader, &mut device).unwrap();

        scene.release(&mut device);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.model_count(), 0);
        assert!(scene.skybox().is_none());
        assert!(device
            .commands()
            .iter()
            .any(|c| matches!(c, Command::DeleteTexture(_))));
    }
}
