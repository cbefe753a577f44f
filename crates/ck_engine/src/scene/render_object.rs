//! Scene nodes
//!
//! A [`RenderObject`] is one node of the scene tree. What it is (and what it
//! carries) is decided once at construction by its [`ObjectKind`]; the
//! transform, name and links can be edited afterwards through an
//! [`EditContext`].

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use super::error::{SceneError, SceneResult};
use super::graph::ObjectHandle;
use super::light::Light;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::{FrontFace, GraphicsDevice, Model, Shader, TextureHandle, UniformValue};

/// Uniform names shared with the demo shaders
mod uniforms {
    pub const MODEL: &str = "model";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const CAMERA_POS: &str = "cameraPos";
    pub const LIGHT_COLOR: &str = "lightColor";
    pub const SKYBOX: &str = "skybox";
}

bitflags! {
    /// How a polygon mesh is drawn
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DrawType: u32 {
        /// Regular shaded draw
        const NORMAL = 1 << 0;
        /// Skipped by the draw traversal
        const INVISIBLE = 1 << 1;
        /// Outline pass
        const OUTLINE = 1 << 2;
        /// Casts shadows
        const SHADOW = 1 << 3;
        /// Flashing highlight
        const FLASHING = 1 << 4;
        /// Blurred
        const BLUR = 1 << 5;
    }
}

impl Default for DrawType {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Type tag of a scene node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Structural node without resources (the scene root)
    NullObject,
    /// Mesh drawn with a model and a shader
    PolygonMesh,
    /// Light source, drawn as a placeholder mesh
    Light,
    /// Environment cube
    Skybox,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NullObject => "null",
            Self::PolygonMesh => "polygon mesh",
            Self::Light => "light",
            Self::Skybox => "skybox",
        };
        f.write_str(name)
    }
}

/// Per-variant data of a scene node
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Structural node
    Null,
    /// Mesh
    PolygonMesh {
        /// Shared mesh prototype
        model: Option<Arc<dyn Model>>,
        /// Shared program prototype
        shader: Option<Arc<dyn Shader>>,
        /// Draw flags
        draw_type: DrawType,
    },
    /// Light source
    Light {
        /// Placeholder mesh
        model: Option<Arc<dyn Model>>,
        /// Placeholder program
        shader: Option<Arc<dyn Shader>>,
        /// Emitted light
        light: Light,
    },
    /// Environment cube
    Skybox {
        /// Cube mesh
        model: Option<Arc<dyn Model>>,
        /// Skybox program
        shader: Option<Arc<dyn Shader>>,
    },
}

impl ObjectKind {
    /// Type tag of this variant
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Null => ObjectType::NullObject,
            Self::PolygonMesh { .. } => ObjectType::PolygonMesh,
            Self::Light { .. } => ObjectType::Light,
            Self::Skybox { .. } => ObjectType::Skybox,
        }
    }
}

/// Per-frame values every draw needs
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Camera view matrix
    pub view: Mat4,
    /// Camera projection matrix
    pub projection: Mat4,
    /// Camera position in world space
    pub camera_position: Vec3,
    /// Cube texture used for environment lookups and the skybox itself
    pub skybox_texture: Option<TextureHandle>,
    /// Clear / tint color of the skybox
    pub skybox_color: Vec3,
}

/// Sparse patch applied to a scene node
///
/// Only the fields that are `Some` are written. `object_type` must match the
/// target, so an edit prepared for a light can never land on a mesh.
#[derive(Debug, Clone)]
pub struct EditContext {
    /// Type the edit was prepared for
    pub object_type: ObjectType,
    /// New name
    pub name: Option<String>,
    /// New parent (applied by the scene graph)
    pub parent: Option<ObjectHandle>,
    /// New position
    pub position: Option<Vec3>,
    /// New Euler rotation in radians
    pub rotation: Option<Vec3>,
    /// New scale
    pub scale: Option<Vec3>,
    /// New model prototype
    pub model: Option<Arc<dyn Model>>,
    /// New shader prototype
    pub shader: Option<Arc<dyn Shader>>,
    /// New light value (light nodes only)
    pub light: Option<Light>,
    /// New draw flags (polygon meshes only)
    pub draw_type: Option<DrawType>,
}

impl EditContext {
    /// Empty edit for an object of `object_type`
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            name: None,
            parent: None,
            position: None,
            rotation: None,
            scale: None,
            model: None,
            shader: None,
            light: None,
            draw_type: None,
        }
    }

    /// Rename
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Move under another parent
    pub fn with_parent(mut self, parent: ObjectHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Set rotation
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Set scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Swap the model
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Swap the shader
    pub fn with_shader(mut self, shader: Arc<dyn Shader>) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Replace the light value
    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    /// Replace the draw flags
    pub fn with_draw_type(mut self, draw_type: DrawType) -> Self {
        self.draw_type = Some(draw_type);
        self
    }
}

/// A node of the scene tree
#[derive(Debug, Clone)]
pub struct RenderObject {
    kind: ObjectKind,
    name: String,
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    parent: Option<ObjectHandle>,
    children: Vec<ObjectHandle>,
}

impl RenderObject {
    fn with_kind(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Structural node
    pub fn null(name: impl Into<String>) -> Self {
        Self::with_kind(ObjectKind::Null, name)
    }

    /// Mesh drawn with `model` and `shader`
    pub fn polygon_mesh(name: impl Into<String>, model: Arc<dyn Model>, shader: Arc<dyn Shader>) -> Self {
        Self::with_kind(
            ObjectKind::PolygonMesh {
                model: Some(model),
                shader: Some(shader),
                draw_type: DrawType::NORMAL,
            },
            name,
        )
    }

    /// Light source drawn as `model` with `shader`
    pub fn light(name: impl Into<String>, light: Light, model: Arc<dyn Model>, shader: Arc<dyn Shader>) -> Self {
        Self::with_kind(
            ObjectKind::Light {
                model: Some(model),
                shader: Some(shader),
                light,
            },
            name,
        )
    }

    /// Environment cube
    pub fn skybox(name: impl Into<String>, model: Arc<dyn Model>, shader: Arc<dyn Shader>) -> Self {
        Self::with_kind(
            ObjectKind::Skybox {
                model: Some(model),
                shader: Some(shader),
            },
            name,
        )
    }

    /// Node built from raw parts, resources may be absent
    pub fn from_kind(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::with_kind(kind, name)
    }

    /// Set the initial transform
    #[must_use]
    pub fn with_transform(mut self, position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        self.position = position;
        self.rotation = rotation;
        self.scale = scale;
        self
    }

    /// Type tag
    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    /// Variant data
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Name, possibly empty
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler rotation in radians
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Parent handle, `None` for the root and detached nodes
    pub fn parent(&self) -> Option<ObjectHandle> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[ObjectHandle] {
        &self.children
    }

    /// Model prototype, if any
    pub fn model(&self) -> Option<&Arc<dyn Model>> {
        match &self.kind {
            ObjectKind::Null => None,
            ObjectKind::PolygonMesh { model, .. }
            | ObjectKind::Light { model, .. }
            | ObjectKind::Skybox { model, .. } => model.as_ref(),
        }
    }

    /// Shader prototype, if any
    pub fn shader(&self) -> Option<&Arc<dyn Shader>> {
        match &self.kind {
            ObjectKind::Null => None,
            ObjectKind::PolygonMesh { shader, .. }
            | ObjectKind::Light { shader, .. }
            | ObjectKind::Skybox { shader, .. } => shader.as_ref(),
        }
    }

    /// Embedded light; every other kind reports [`Light::SENTINEL`]
    pub fn light_value(&self) -> Light {
        match &self.kind {
            ObjectKind::Light { light, .. } => *light,
            _ => Light::SENTINEL,
        }
    }

    /// Draw flags; only meshes carry any
    pub fn draw_type(&self) -> DrawType {
        match &self.kind {
            ObjectKind::PolygonMesh { draw_type, .. } => *draw_type,
            _ => DrawType::empty(),
        }
    }

    /// Object-to-world matrix, `T * Rx * Ry * Rz * S`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_euler_transform(&self.position, &self.rotation, &self.scale)
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ObjectHandle>) {
        self.parent = parent;
    }

    pub(crate) fn add_child(&mut self, child: ObjectHandle) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: ObjectHandle) {
        self.children.retain(|c| *c != child);
    }

    pub(crate) fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Check that `edit` may be applied to this node
    pub fn check_edit(&self, edit: &EditContext) -> SceneResult<()> {
        let actual = self.object_type();
        if actual == ObjectType::NullObject {
            return Err(SceneError::NullObjectEdit);
        }
        if edit.object_type != actual {
            return Err(SceneError::TypeMismatch {
                expected: edit.object_type,
                actual,
            });
        }
        Ok(())
    }

    /// Apply every present field of `edit` except `parent`
    ///
    /// Links are owned by the scene graph, which moves the node after this
    /// returns. Nothing is written when the edit is rejected.
    pub fn modify(&mut self, edit: &EditContext) -> SceneResult<()> {
        if let Err(e) = self.check_edit(edit) {
            log::error!("Rejected edit of '{}': {}", self.name, e);
            return Err(e);
        }

        if let Some(name) = &edit.name {
            self.name.clone_from(name);
        }
        if let Some(position) = edit.position {
            self.position = position;
        }
        if let Some(rotation) = edit.rotation {
            self.rotation = rotation;
        }
        if let Some(scale) = edit.scale {
            self.scale = scale;
        }

        match &mut self.kind {
            ObjectKind::Null => {}
            ObjectKind::PolygonMesh { model, shader, draw_type } => {
                patch_resources(model, shader, edit);
                if let Some(new_draw_type) = edit.draw_type {
                    *draw_type = new_draw_type;
                }
            }
            ObjectKind::Light { model, shader, light } => {
                patch_resources(model, shader, edit);
                if let Some(new_light) = edit.light {
                    *light = new_light;
                }
            }
            ObjectKind::Skybox { model, shader } => patch_resources(model, shader, edit),
        }
        Ok(())
    }

    /// Issue this node's draw calls
    ///
    /// GPU state (bound program, textures, winding) is left as the draw
    /// leaves it. A node missing its model or shader draws nothing and
    /// reports [`SceneError::MissingResource`].
    pub fn draw(&self, ctx: &RenderContext, device: &mut dyn GraphicsDevice) -> SceneResult<()> {
        match &self.kind {
            ObjectKind::Null => Ok(()),
            ObjectKind::PolygonMesh { model, shader, draw_type } => {
                if draw_type.contains(DrawType::INVISIBLE) {
                    log::trace!("Skipping invisible mesh '{}'", self.name);
                    return Ok(());
                }
                let (model, shader) = self.resources(model, shader)?;
                shader.activate();
                shader.set_parameter(uniforms::MODEL, self.model_matrix().into());
                shader.set_parameter(uniforms::VIEW, ctx.view.into());
                shader.set_parameter(uniforms::PROJECTION, ctx.projection.into());
                shader.set_parameter(uniforms::CAMERA_POS, ctx.camera_position.into());
                bind_environment(ctx, model, shader, device);
                model.draw(shader);
                Ok(())
            }
            ObjectKind::Light { model, shader, light } => {
                let (model, shader) = self.resources(model, shader)?;
                shader.activate();
                shader.set_parameter(uniforms::MODEL, self.model_matrix().into());
                shader.set_parameter(uniforms::VIEW, ctx.view.into());
                shader.set_parameter(uniforms::PROJECTION, ctx.projection.into());
                shader.set_parameter(uniforms::LIGHT_COLOR, light.color().into());
                model.draw(shader);
                Ok(())
            }
            ObjectKind::Skybox { model, shader } => {
                let (model, shader) = self.resources(model, shader)?;
                // The camera sits inside the cube
                device.set_front_face(FrontFace::Clockwise);
                shader.activate();
                shader.set_parameter(uniforms::VIEW, ctx.view.without_translation().into());
                shader.set_parameter(uniforms::PROJECTION, ctx.projection.into());
                bind_environment(ctx, model, shader, device);
                model.draw(shader);
                device.set_front_face(FrontFace::CounterClockwise);
                Ok(())
            }
        }
    }

    fn resources<'a>(
        &self,
        model: &'a Option<Arc<dyn Model>>,
        shader: &'a Option<Arc<dyn Shader>>,
    ) -> SceneResult<(&'a dyn Model, &'a dyn Shader)> {
        let missing = |resource| SceneError::MissingResource {
            name: self.name.clone(),
            resource,
        };
        let model = model.as_deref().ok_or_else(|| missing("model"))?;
        let shader = shader.as_deref().ok_or_else(|| missing("shader"))?;
        Ok((model, shader))
    }
}

fn patch_resources(model: &mut Option<Arc<dyn Model>>, shader: &mut Option<Arc<dyn Shader>>, edit: &EditContext) {
    if let Some(new_model) = &edit.model {
        *model = Some(Arc::clone(new_model));
    }
    if let Some(new_shader) = &edit.shader {
        *shader = Some(Arc::clone(new_shader));
    }
}

fn bind_environment(ctx: &RenderContext, model: &dyn Model, shader: &dyn Shader, device: &mut dyn GraphicsDevice) {
    let Some(texture) = ctx.skybox_texture else {
        return;
    };
    let slot = model.available_texture_slot();
    device.bind_cube_texture(slot, texture);
    shader.set_parameter(uniforms::SKYBOX, UniformValue::Int(i32::try_from(slot).unwrap_or(i32::MAX)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{new_command_log, Command, CommandLog, HeadlessDevice, HeadlessModel, HeadlessShader};
    use crate::render::ShaderPaths;
    use crate::scene::light::LightType;
    use std::rc::Rc;

    fn resources(log: &CommandLog, path: &str) -> (Arc<dyn Model>, Arc<dyn Shader>) {
        let model: Arc<dyn Model> = Arc::new(HeadlessModel::new(path, 3, Rc::clone(log)));
        let shader: Arc<dyn Shader> = Arc::new(HeadlessShader::new(ShaderPaths::new("s.vs", "s.fs"), Rc::clone(log)));
        (model, shader)
    }

    fn context(texture: Option<TextureHandle>) -> RenderContext {
        RenderContext {
            view: Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0)),
            projection: Mat4::identity(),
            camera_position: Vec3::new(0.0, 0.0, 5.0),
            skybox_texture: texture,
            skybox_color: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    fn has_parameter(commands: &[Command], name: &str) -> bool {
        commands
            .iter()
            .any(|c| matches!(c, Command::SetParameter { name: n, .. } if n == name))
    }

    #[test]
    fn test_light_value_sentinel_for_non_lights() {
        let log = new_command_log();
        let (model, shader) = resources(&log, "cube.obj");
        let mesh = RenderObject::polygon_mesh("cube", model, shader);
        assert_eq!(mesh.light_value().light_type(), LightType::Invalid);
        assert_eq!(RenderObject::null("root").light_value().light_type(), LightType::Invalid);
        assert_eq!(mesh.draw_type(), DrawType::NORMAL);
    }

    #[test]
    fn test_modify_applies_only_present_fields() {
        let log = new_command_log();
        let (model, shader) = resources(&log, "cube.obj");
        let mut mesh = RenderObject::polygon_mesh("cube", model, shader)
            .with_transform(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0));

        let edit = EditContext::new(ObjectType::PolygonMesh)
            .with_rotation(Vec3::new(0.0, 1.0, 0.0))
            .with_draw_type(DrawType::NORMAL | DrawType::OUTLINE);
        mesh.modify(&edit).unwrap();

        assert_eq!(mesh.name(), "cube");
        assert_eq!(mesh.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.rotation(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(mesh.scale(), Vec3::new(2.0, 2.0, 2.0));
        assert!(mesh.draw_type().contains(DrawType::OUTLINE));
    }

    #[test]
    fn test_modify_rejects_null_and_mismatch() {
        let mut root = RenderObject::null("root");
        let edit = EditContext::new(ObjectType::NullObject).with_name("renamed");
        assert!(matches!(root.modify(&edit), Err(SceneError::NullObjectEdit)));
        assert_eq!(root.name(), "root");

        let log = new_command_log();
        let (model, shader) = resources(&log, "sphere.obj");
        let mut light = RenderObject::light("lamp", Light::point(Vec3::new(1.0, 0.0, 0.0), 1.0), model, shader);
        let edit = EditContext::new(ObjectType::PolygonMesh).with_position(Vec3::new(9.0, 9.0, 9.0));
        assert!(matches!(
            light.modify(&edit),
            Err(SceneError::TypeMismatch { expected: ObjectType::PolygonMesh, actual: ObjectType::Light })
        ));
        assert_eq!(light.position(), Vec3::zeros());
    }

    #[test]
    fn test_modify_replaces_light() {
        let log = new_command_log();
        let (model, shader) = resources(&log, "sphere.obj");
        let mut lamp = RenderObject::light("lamp", Light::point(Vec3::new(1.0, 0.0, 0.0), 1.0), model, shader);
        let spot = Light::spot(Vec3::new(0.0, 0.0, 1.0), 3.0, 10.0, 15.0);
        lamp.modify(&EditContext::new(ObjectType::Light).with_light(spot)).unwrap();
        assert_eq!(lamp.light_value(), spot);
    }

    #[test]
    fn test_mesh_draw_sequence() {
        let log = new_command_log();
        let mut device = HeadlessDevice::with_log(Rc::clone(&log));
        let (model, shader) = resources(&log, "cube.obj");
        let mesh = RenderObject::polygon_mesh("cube", model, shader);

        mesh.draw(&context(Some(TextureHandle(7))), &mut device).unwrap();

        let commands = device.commands();
        assert!(matches!(commands.first(), Some(Command::ActivateShader(_))));
        for name in ["model", "view", "projection", "cameraPos"] {
            assert!(has_parameter(&commands, name), "missing uniform {name}");
        }
        assert!(commands.contains(&Command::BindCubeTexture { slot: 3, texture: TextureHandle(7) }));
        assert!(commands.contains(&Command::SetParameter {
            name: "skybox".to_string(),
            value: UniformValue::Int(3),
        }));
        assert!(matches!(commands.last(), Some(Command::DrawModel { model, .. }) if model == "cube.obj"));
    }

    #[test]
    fn test_invisible_mesh_not_drawn() {
        let log = new_command_log();
        let mut device = HeadlessDevice::with_log(Rc::clone(&log));
        let (model, shader) = resources(&log, "cube.obj");
        let mut mesh = RenderObject::polygon_mesh("cube", model, shader);
        mesh.modify(&EditContext::new(ObjectType::PolygonMesh).with_draw_type(DrawType::INVISIBLE))
            .unwrap();

        mesh.draw(&context(None), &mut device).unwrap();
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_light_draw_uploads_color() {
        let log = new_command_log();
        let mut device = HeadlessDevice::with_log(Rc::clone(&log));
        let (model, shader) = resources(&log, "sphere.obj");
        let color = Vec3::new(0.2, 0.4, 0.6);
        let lamp = RenderObject::light("lamp", Light::point(color, 1.0), model, shader);

        lamp.draw(&context(Some(TextureHandle(1))), &mut device).unwrap();

        let commands = device.commands();
        assert!(commands.contains(&Command::SetParameter {
            name: "lightColor".to_string(),
            value: UniformValue::Vec3(color),
        }));
        assert!(!has_parameter(&commands, "cameraPos"));
        assert!(!commands.iter().any(|c| matches!(c, Command::BindCubeTexture { .. })));
    }

    #[test]
    fn test_skybox_draw_flips_winding_and_strips_translation() {
        let log = new_command_log();
        let mut device = HeadlessDevice::with_log(Rc::clone(&log));
        let (model, shader) = resources(&log, "box.obj");
        let skybox = RenderObject::skybox("skybox", model, shader);
        let ctx = context(Some(TextureHandle(2)));

        skybox.draw(&ctx, &mut device).unwrap();

        let commands = device.commands();
        assert_eq!(commands.first(), Some(&Command::SetFrontFace(FrontFace::Clockwise)));
        assert_eq!(commands.last(), Some(&Command::SetFrontFace(FrontFace::CounterClockwise)));
        let view = commands.iter().find_map(|c| match c {
            Command::SetParameter { name, value: UniformValue::Mat4(m) } if name == "view" => Some(*m),
            _ => None,
        });
        let view = view.unwrap();
        assert_eq!(view[(0, 3)], 0.0);
        assert_eq!(view[(1, 3)], 0.0);
        assert_eq!(view[(2, 3)], 0.0);
        assert!(!has_parameter(&commands, "model"));
    }

    #[test]
    fn test_missing_resource_draws_nothing() {
        let mut device = HeadlessDevice::new();
        let orphan = RenderObject::from_kind(
            ObjectKind::PolygonMesh { model: None, shader: None, draw_type: DrawType::NORMAL },
            "orphan",
        );
        let result = orphan.draw(&context(None), &mut device);
        assert!(matches!(result, Err(SceneError::MissingResource { resource: "model", .. })));
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_null_draw_is_noop() {
        let mut device = HeadlessDevice::new();
        RenderObject::null("root").draw(&context(None), &mut device).unwrap();
        assert!(device.commands().is_empty());
    }
}
