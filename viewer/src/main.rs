use cgmath::{Point3, Vector3};
use log::{error, info, trace};
use std::env;
use std::fs;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ControlFlow;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::Window;
use winit::window::WindowId;

use tracer::settings::RenderSettings;
use tracer::{Camera, Engine, Geom, GeomKind, Material, SceneBundle};

const WINDOW_TITLE: &str = "Wavefront Tracer Viewer";
const SETTINGS_FILE: &str = "settings.json";

const WHEEL_ZOOM_STEP: f32 = 0.25;
const TRACE_DEPTH: u32 = 8;

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(Engine::get_reasonable_log_filter()),
    )
    .init();

    match env::current_dir() {
        Ok(path) => info!("current directory: {}", path.display()),
        Err(e) => error!("error getting current directory: {}", e),
    }

    let event_loop = EventLoop::new()
        .map_err(|e| format!("event loop creation failed: {}", e))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut application = Application::default();

    event_loop.run_app(&mut application)
        .map_err(|e| format!("event loop has failed: {}", e))?;

    Ok(())
}

#[derive(Default)]
struct Application {
    window: Option<Arc<Window>>,
    engine: Option<Engine>,

    left_mouse_down: bool,
    last_cursor_position: Option<(f64, f64)>,
}

#[must_use]
fn load_settings() -> RenderSettings {
    let Ok(text) = fs::read_to_string(SETTINGS_FILE) else {
        return RenderSettings::default();
    };
    match RenderSettings::from_json(&text) {
        Ok(settings) => settings,
        Err(e) => {
            error!("failed to parse {}: {} — using defaults", SETTINGS_FILE, e);
            RenderSettings::default()
        }
    }
}

#[must_use]
fn make_default_camera() -> Camera {
    Camera::new(
        Point3::new(0.0, 1.0, 6.5),
        Point3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        45.0,
    )
}

/// Conservative world bounds per primitive, flattened as the spatial payload
/// the intersection stage consumes (low corner, high corner per record).
#[must_use]
fn bounding_slabs(geoms: &[Geom]) -> Vec<f32> {
    let mut slabs = Vec::with_capacity(geoms.len() * 6);
    for geom in geoms {
        // axes may be rotated; the diagonal covers every orientation
        let radius = 0.5
            * (geom.scale[0] * geom.scale[0]
                + geom.scale[1] * geom.scale[1]
                + geom.scale[2] * geom.scale[2])
                .sqrt();
        for axis in 0..3 {
            slabs.push(geom.translation[axis] - radius);
        }
        for axis in 0..3 {
            slabs.push(geom.translation[axis] + radius);
        }
    }
    slabs
}

#[must_use]
fn make_demo_scene() -> SceneBundle {
    let materials = vec![
        Material::diffuse(0.85, 0.85, 0.85),
        Material::diffuse(0.75, 0.15, 0.15),
        Material::diffuse(0.15, 0.55, 0.15),
        Material::diffuse(0.9, 0.65, 0.3).with_specular(1.0, 1.0, 1.0, 32.0),
        Material::diffuse(0.3, 0.5, 0.9),
        Material::diffuse(1.0, 1.0, 1.0).with_emittance(6.0, 6.0, 5.0),
    ];

    let unit = Vector3::new(1.0, 1.0, 1.0);
    let zero = Vector3::new(0.0, 0.0, 0.0);
    let room = 5.0;
    let geoms = vec![
        // floor, ceiling, back wall, side walls
        Geom::new(GeomKind::Plane, 0, Vector3::new(0.0, 0.0, 0.0), Vector3::new(-90.0, 0.0, 0.0), Vector3::new(room, room, 1.0)),
        Geom::new(GeomKind::Plane, 0, Vector3::new(0.0, room * 0.5, 0.0), Vector3::new(90.0, 0.0, 0.0), Vector3::new(room, room, 1.0)),
        Geom::new(GeomKind::Plane, 0, Vector3::new(0.0, 1.0, -2.5), zero, Vector3::new(room, room, 1.0)),
        Geom::new(GeomKind::Plane, 1, Vector3::new(-2.5, 1.0, 0.0), Vector3::new(0.0, 90.0, 0.0), Vector3::new(room, room, 1.0)),
        Geom::new(GeomKind::Plane, 2, Vector3::new(2.5, 1.0, 0.0), Vector3::new(0.0, -90.0, 0.0), Vector3::new(room, room, 1.0)),
        // subjects
        Geom::new(GeomKind::Sphere, 3, Vector3::new(-0.8, 0.5, -0.5), zero, unit),
        Geom::new(GeomKind::Cube, 4, Vector3::new(0.9, 0.4, 0.3), Vector3::new(0.0, 25.0, 0.0), Vector3::new(0.8, 0.8, 0.8)),
        Geom::new(GeomKind::Triangle, 2, Vector3::new(0.0, 1.2, -1.5), zero, Vector3::new(1.5, 1.5, 1.0)),
        // ceiling light
        Geom::new(GeomKind::Plane, 5, Vector3::new(0.0, room * 0.5 - 0.01, 0.0), Vector3::new(90.0, 0.0, 0.0), Vector3::new(1.5, 1.5, 1.0)),
    ];

    let light_count = SceneBundle::count_lights(&geoms, &materials);
    let accel = bounding_slabs(&geoms);

    SceneBundle {
        camera: make_default_camera(),
        geoms,
        light_count,
        materials,
        accel,
        environment: None,
        max_depth: TRACE_DEPTH,
    }
}

impl ApplicationHandler for Application {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_creation
            = event_loop.create_window(Window::default_attributes()
                .with_title(WINDOW_TITLE));

        match window_creation {
            Ok(ware) => {
                let window = Arc::new(ware);
                self.window = Some(window.clone());

                let scene = make_demo_scene();
                let settings = load_settings();

                match pollster::block_on(Engine::new(window.clone(), scene, settings)) {
                    Ok(e) => {
                        self.engine = Some(e);
                    },
                    Err(error) => {
                        error!("failed to create an engine: {}", error);
                        event_loop.exit();
                    }
                }
            }
            Err(error) => {
                error!("could not create the window: {}", error);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                trace!("exiting the loop via close request");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                info!("window resized to {:?}", new_size);
                self.engine.as_mut().map(|engine| {
                    engine.handle_window_resize(new_size);
                });
            }
            WindowEvent::RedrawRequested => {
                self.window.as_ref().map(|window| {
                    self.engine.as_mut().map(|engine| {
                        engine.render(|| {
                            window.pre_present_notify();
                        });
                    });
                    window.request_redraw();
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.left_mouse_down = state == ElementState::Pressed;
                    if !self.left_mouse_down {
                        self.last_cursor_position = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (current_x, current_y) = (position.x, position.y);
                if self.left_mouse_down {
                    if let Some((last_x, last_y)) = self.last_cursor_position {
                        let delta_x = (current_x - last_x) as f32;
                        let delta_y = (current_y - last_y) as f32;
                        self.engine.as_mut().map(|engine| {
                            engine.pan(delta_x, delta_y);
                        });
                    }
                    self.last_cursor_position = Some((current_x, current_y));
                }
            }
            WindowEvent::MouseWheel { delta: MouseScrollDelta::LineDelta(_, y), .. } => {
                self.engine.as_mut().map(|engine| engine.zoom(y * WHEEL_ZOOM_STEP));
            }
            _ => (),
        }
    }
}
