//! Headless multi-light scene demo
//!
//! Builds the shadowed multi-light demo scene on the recording backend,
//! packs the light uniform buffer, draws one frame and reports what would
//! have been sent to the GPU.
//!
//! Usage: `scene_demo [config.toml | config.ron]`

use std::rc::Rc;

use ck_engine::config::ConfigError;
use ck_engine::foundation::logging;
use ck_engine::prelude::*;
use ck_engine::render::headless::{new_command_log, Command, HeadlessDevice, HeadlessLoader};
use thiserror::Error;

const WINDOW_SIZE: (i32, i32) = (1280, 720);
const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(Debug, Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

fn load_config() -> Result<EngineConfig, ConfigError> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Place a freshly added light
fn place_light(scene: &mut Scene, handle: ObjectHandle, position: Vec3, rotation: Vec3) -> Result<(), SceneError> {
    let edit = EditContext::new(ObjectType::Light)
        .with_position(position)
        .with_rotation(rotation)
        .with_scale(Vec3::new(0.1, 0.1, 0.1));
    scene.modify_object(handle, &edit)
}

fn build_scene(scene: &mut Scene, loader: &mut HeadlessLoader, device: &mut HeadlessDevice) -> Result<(), SceneError> {
    scene.load_skybox(loader, device)?;

    let phong = ShaderPaths::new(
        scene.config().resolve("stdShader/stdVerShader.vs.glsl"),
        scene.config().resolve("stdShader/stdShadowedPhongLighting.fs.glsl"),
    );
    let box_model = scene.config().resolve("stdModel/box/box.obj");

    let floor = scene.add_model_from_file(loader, &box_model, &phong, "floor")?;
    scene.modify_object(
        floor,
        &EditContext::new(ObjectType::PolygonMesh)
            .with_position(Vec3::new(0.0, -0.5, 0.0))
            .with_scale(Vec3::new(10.0, 0.1, 10.0)),
    )?;

    let crate_box = scene.add_model_from_file(loader, &box_model, &phong, "container")?;
    scene.modify_object(
        crate_box,
        &EditContext::new(ObjectType::PolygonMesh)
            .with_parent(floor)
            .with_rotation(Vec3::new(0.0, 0.6, 0.0)),
    )?;

    let white = Vec3::new(1.0, 1.0, 1.0);
    let point = scene.add_light(loader, "point", Light::point(white, 2.0))?;
    place_light(scene, point, Vec3::new(1.0, 1.5, 1.0), Vec3::zeros())?;

    let sun = scene.add_light(loader, "sun", Light::directional(white, 1.2))?;
    place_light(scene, sun, Vec3::zeros(), Vec3::new(1.0, -1.0, 1.0))?;

    let spot = scene.add_light(loader, "spot", Light::spot(white, 1.0, 12.5, 17.5))?;
    place_light(scene, spot, Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, -1.0, 0.0))?;

    log::info!(
        "Scene ready: {} objects, {} models, {} shaders",
        scene.object_count(),
        scene.model_count(),
        scene.shader_count()
    );
    Ok(())
}

fn report_frame(device: &HeadlessDevice) {
    let commands = device.commands();
    let draws = commands
        .iter()
        .filter(|c| matches!(c, Command::DrawModel { .. }))
        .count();
    let uniforms = commands
        .iter()
        .filter(|c| matches!(c, Command::SetParameter { .. }))
        .count();
    log::info!(
        "Frame recorded {} commands: {} draws, {} uniform uploads",
        commands.len(),
        draws,
        uniforms
    );
    for command in &commands {
        log::trace!("{:?}", command);
    }
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting scene demo (debug mode: {})", config.debug_mode);

    let log = new_command_log();
    let mut loader = HeadlessLoader::new(Rc::clone(&log));
    let mut device = HeadlessDevice::with_log(log);

    let mut scene = Scene::new(config.scene.clone());
    build_scene(&mut scene, &mut loader, &mut device)?;

    let mut lights = SceneLightUboManager::from_config(scene.config());
    let written = lights.create_light_buffer(&mut device, &scene)?;
    lights.bind(&mut device, scene.config().light_binding_point)?;
    log::info!("Packed {} lights into the light buffer", written);
    if config.debug_mode {
        lights.log_buffer_contents(&device)?;
    }

    // Free-standing group for an overlay pass, bound on the next binding point
    let mut overlay = LightGroup::new(scene.config().max_lights);
    overlay.add_lights([
        PlacedLight::new(Light::point(Vec3::new(1.0, 0.2, 0.2), 0.8), Vec3::new(-2.0, 1.0, 0.0), Vec3::zeros()),
        PlacedLight::new(Light::point(Vec3::new(0.2, 0.2, 1.0), 0.8), Vec3::new(2.0, 1.0, 0.0), Vec3::zeros()),
    ]);
    overlay.create_light_buffer(&mut device)?;
    overlay.bind_range(
        &mut device,
        scene.config().light_binding_point + 1,
        0,
        overlay.memory_occupation(),
    )?;
    log::info!(
        "Overlay group: {} lights, {} bytes",
        overlay.len(),
        overlay.memory_occupation()
    );

    // Nudge the camera the way one frame of input would
    let camera = scene.camera_mut();
    camera.process_keyboard(CameraMovement::Forward, FRAME_TIME);
    camera.process_mouse_movement(0.0, 0.0, true);
    camera.process_mouse_movement(12.0, -4.0, true);

    device.clear_commands();
    let drawn = scene.draw(&mut device, &WINDOW_SIZE);
    log::info!("Drew {} objects", drawn);
    report_frame(&device);

    overlay.release(&mut device);
    lights.release(&mut device);
    scene.release(&mut device);
    log::info!("Scene demo finished");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("scene_demo: {e}");
        std::process::exit(1);
    }
}
