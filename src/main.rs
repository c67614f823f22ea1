///
/// Enable debug logging: RUST_LOG=debug
/// Shaders are loaded from `shaders/*.spv` relative to the working directory.
/// Scroll to zoom.
///

mod app;

use anyhow::Result;
use lazy_static::lazy_static;
use log::*;
use nalgebra_glm as glm;
use std::time::Instant;
use winit::dpi::LogicalSize;
use winit::event::{Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use app::{App, Camera, DrawableObject, EngineConfig, FrameStatus, SceneGraph, Shape, Version, CIRCLE_DEFAULT_SEGMENTS};

lazy_static! {
    static ref TRIANGLE: [glm::Vec2; 3] = [
        glm::vec2(0.0, -0.25),
        glm::vec2(0.25, 0.25),
        glm::vec2(-0.25, 0.25),
    ];
    static ref HEXAGON: Vec<glm::Vec2> = (0..6)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::FRAC_PI_3;
            glm::vec2(0.7 + 0.12 * angle.cos(), -0.6 + 0.12 * angle.sin())
        })
        .collect();
    static ref DIAMOND: [glm::Vec2; 4] = [
        glm::vec2(-0.7, -0.75),
        glm::vec2(-0.6, -0.6),
        glm::vec2(-0.7, -0.45),
        glm::vec2(-0.8, -0.6),
    ];
}

const DIAMOND_INDICES: &[u16] = &[0, 1, 2, 2, 3, 0];

/// Radians per second.
const TRIANGLE_SPEED: f32 = std::f32::consts::FRAC_PI_2;
const ORBIT_SPEED: f32 = -std::f32::consts::FRAC_PI_4;

/// Camera distance per scroll line, and its limits.
const ZOOM_STEP: f32 = 0.1;
const ZOOM_RANGE: (f32, f32) = (0.5, 10.0);

fn main() -> Result<()> {
    pretty_env_logger::init();
    info!("Creating app...");

    let config = EngineConfig::default()
        .with_app_name("vk2d demo")
        .with_app_version(Version::new(0, 1, 0))
        .with_window_size(1024, 768)
        .with_max_draws(16);

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(config.app_name.as_str())
        .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
        .build(&event_loop)?;

    let mut app = unsafe { App::create(&window, &config)? };
    let mut scene = SceneGraph::new();
    if let Err(e) = unsafe { create_scene(&app, &mut scene) } {
        unsafe { shutdown(&mut app, &mut scene) };
        return Err(e);
    }
    log_scene(&scene);

    let clock = Instant::now();
    let mut last_frame = clock.elapsed().as_secs_f32();
    let mut destroying = false;
    let mut minimized = false;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::MainEventsCleared if !destroying && !minimized => {
                let now = clock.elapsed().as_secs_f32();
                animate(&mut scene, now, now - last_frame);
                last_frame = now;

                for root in scene.roots() {
                    if !scene.enqueue_all(root, |object| app.draw(object)) {
                        warn!("Scene did not fit in one frame.");
                        break;
                    }
                }

                match unsafe { app.render(&window) } {
                    Ok(FrameStatus::Presented) => {}
                    Ok(FrameStatus::Skipped) => debug!("Frame skipped, swapchain rebuilt."),
                    Err(e) => {
                        error!("Rendering failed: {:?}", e);
                        destroying = true;
                        *control_flow = ControlFlow::Exit;
                        unsafe { shutdown(&mut app, &mut scene) };
                    }
                }
            }

            Event::WindowEvent { event: WindowEvent::Resized(size), .. } => {
                if size.width == 0 || size.height == 0 {
                    minimized = true;
                } else {
                    minimized = false;
                    app.resized = true;
                }
            }

            Event::WindowEvent { event: WindowEvent::MouseWheel { delta, .. }, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                };

                app.update_camera(zoom(*app.camera(), lines));
            }

            Event::WindowEvent { event: WindowEvent::CloseRequested, .. } if !destroying => {
                destroying = true;
                *control_flow = ControlFlow::Exit;
                unsafe { shutdown(&mut app, &mut scene) };
            }

            _ => {}
        }
    });
}

/// A rectangle with a spinning triangle drawn on top of it, plus a second
/// tree: a circle orbiting the origin with a hexagon and a diamond under it.
unsafe fn create_scene(app: &App, scene: &mut SceneGraph<DrawableObject>) -> Result<()> {
    // Children draw first, so each parent ends up on top of its children.
    let triangle = scene.add_root(app.create_triangle(*TRIANGLE, glm::vec3(1.0, 0.6, 0.1))?);
    let rectangle = app.create_rectangle(glm::vec2(-0.5, -0.5), glm::vec2(1.0, 1.0), glm::vec3(0.2, 0.4, 0.8))?;
    scene.add_child(triangle, rectangle)?;

    let circle = app.create_circle(glm::vec2(0.6, 0.6), 0.15, glm::vec3(0.9, 0.2, 0.3), CIRCLE_DEFAULT_SEGMENTS)?;
    let circle = scene.add_root(circle);

    let hexagon = app.upload_shape(&Shape::convex_polygon(&HEXAGON, glm::vec3(0.3, 0.8, 0.4))?)?;
    scene.add_child(circle, hexagon)?;

    let diamond = app.upload_object(&*DIAMOND, glm::vec3(0.9, 0.9, 0.9), DIAMOND_INDICES)?;
    scene.add_child(circle, diamond)?;

    Ok(())
}

fn log_scene(scene: &SceneGraph<DrawableObject>) {
    for root in scene.roots() {
        scene.traverse_post_order(root, |id, object| {
            debug!("Node {:?} (parent {:?}): {} indices.", id, scene.parent(id), object.index_count());
        });
    }
    info!("Scene has {} objects.", scene.len());
}

/// Spins the first root in place and turns every other root a little further
/// around the origin.
fn animate(scene: &mut SceneGraph<DrawableObject>, now: f32, delta: f32) {
    for (i, root) in scene.roots().into_iter().enumerate() {
        if let Some(object) = scene.get_mut(root) {
            let transform = if i == 0 {
                glm::rotate_z(&glm::identity(), now * TRIANGLE_SPEED)
            } else {
                glm::rotate_z(object.transform(), delta * ORBIT_SPEED)
            };
            object.set_transform(transform);
        }
    }
}

/// Moves the camera towards the scene for positive `lines`.
fn zoom(mut camera: Camera, lines: f32) -> Camera {
    camera.position.z = (camera.position.z - lines * ZOOM_STEP).clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
    camera
}

unsafe fn shutdown(app: &mut App, scene: &mut SceneGraph<DrawableObject>) {
    if let Err(e) = app.wait_idle() {
        warn!("Failed to wait for device idle: {}", e);
    }

    for root in scene.roots() {
        scene.remove(root, true).into_iter().for_each(|o| app.destroy_object(o));
    }
    debug_assert!(scene.is_empty());

    app.destroy();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_stays_within_range() {
        let camera = Camera::default();

        assert!(zoom(camera, 1.0).position.z < camera.position.z);
        assert_eq!(zoom(camera, 1000.0).position.z, ZOOM_RANGE.0);
        assert_eq!(zoom(camera, -1000.0).position.z, ZOOM_RANGE.1);
        assert_eq!(zoom(camera, 1.0).target, camera.target);
    }
}
