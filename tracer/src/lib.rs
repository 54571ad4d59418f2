#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::bool_comparison)]

mod gpu;
pub mod scene;
pub mod settings;

use crate::gpu::context::Context;
use crate::gpu::frame_pacer::FramePacer;
use crate::gpu::render::Renderer;
use crate::gpu::viewport::Viewport;
use log::{info, trace, warn};
use std::cmp::max;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use wgpu::wgt::PollType;
use wgpu::{Adapter, Trace};
use winit::window::Window;

pub use crate::scene::bundle::{EnvironmentDescriptor, SceneBundle};
pub use crate::scene::camera::Camera;
pub use crate::scene::types::{Geom, GeomKind, Material};
pub use crate::settings::{RenderSettings, ShadingMode};

const DEVICE_LABEL: &str = "Wavefront Tracer Library";

/// Host-facing boundary: owns the window surface and the frame pacing; the
/// renderer behind it owns everything else. One `render` call per display
/// refresh drives one progressive-refinement iteration.
pub struct Engine {
    window_pixels_size: winit::dpi::PhysicalSize<u32>,
    ignore_render_requests: bool,

    context: Rc<Context>,

    window_output_surface: wgpu::Surface<'static>,
    window_surface_format: wgpu::TextureFormat,

    renderer: Renderer,
    pacer: FramePacer,
}

#[derive(Error, Debug)]
pub enum EngineInstantiationError {
    #[error("failed to create window surface: {what:?}")]
    SurfaceCreationError { what: String },
    #[error("failed to request adapter: {what:?}")]
    AdapterRequisitionError { what: String },
    #[error("failed to select device: {what:?}")]
    DeviceSelectionError { what: String },
    #[error("surface is incompatible with the device")]
    SurfaceCompatibilityError,
    #[error("internal error: {what:?}")]
    InternalError { what: String },
}

impl Engine {
    #[must_use]
    pub fn get_reasonable_log_filter() -> &'static str {
        "wgpu=warn,naga=warn"
    }

    pub async fn new(
        window: Arc<Window>,
        scene: SceneBundle,
        settings: RenderSettings,
    ) -> Result<Engine, EngineInstantiationError> {
        let wgpu_instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            ..Default::default()
        });

        let window_pixels_size = window.inner_size();
        let window_surface = wgpu_instance
            .create_surface(window.clone())
            .map_err(|e| EngineInstantiationError::SurfaceCreationError { what: e.to_string() })?;

        let graphics_adapter = wgpu_instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&window_surface),
                ..Default::default()
            })
            .await
            .map_err(|error| EngineInstantiationError::AdapterRequisitionError { what: error.to_string() })?;

        log_adapter_info(&graphics_adapter);

        let (graphics_device, commands_queue) = graphics_adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(DEVICE_LABEL),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Trace::Off,
            })
            .await
            .map_err(|e| EngineInstantiationError::DeviceSelectionError { what: e.to_string() })?;

        let surface_capabilities = window_surface.get_capabilities(&graphics_adapter);
        if surface_capabilities.formats.is_empty() {
            return Err(EngineInstantiationError::SurfaceCompatibilityError);
        }
        let output_surface_format = select_presentation_format(&surface_capabilities);

        let context = Rc::new(Context::new(graphics_device, commands_queue));

        let viewport = Viewport::new(max(1, window_pixels_size.width), max(1, window_pixels_size.height));
        let renderer = Renderer::new(context.clone(), scene, &settings, viewport)
            .map_err(|e| EngineInstantiationError::InternalError { what: e.to_string() })?;

        let ware = Engine {
            context: context.clone(),
            window_pixels_size,
            ignore_render_requests: false,
            window_output_surface: window_surface,
            window_surface_format: output_surface_format,
            renderer,
            pacer: FramePacer::new(FramePacer::FRAMES_IN_FLIGHT),
        };

        ware.configure_surface();

        Ok(ware)
    }

    fn configure_surface(&self) {
        let surface_config = wgpu::SurfaceConfiguration {
            // the gather stage writes the surface from compute and the shade
            // stage may sample it as the environment fallback
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING,
            format: self.window_surface_format,
            view_formats: vec![self.window_surface_format],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            width: self.window_pixels_size.width,
            height: self.window_pixels_size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 1,
        };

        self.window_output_surface.configure(self.context.device(), &surface_config);
    }

    pub fn handle_window_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            info!("window resized to zero, render requests will be ignored");
            self.ignore_render_requests = true;
            return;
        }

        if self.ignore_render_requests {
            info!("window resized, render requests resume");
            self.ignore_render_requests = false;
        }

        if new_size == self.window_pixels_size {
            return;
        }
        self.window_pixels_size = new_size;
        self.configure_surface();
        self.renderer.set_viewport(new_size.width, new_size.height);
    }

    pub fn render<Code: Fn()>(&mut self, pre_present_notify: Code) {
        if self.ignore_render_requests {
            return;
        }

        // the permit comes back through the submitted-work-done callback,
        // which only fires while the device is being polled
        while !self.pacer.try_acquire() {
            self.context.device().poll(PollType::Wait).expect("failed to poll the device");
        }

        let surface_texture = match self.window_output_surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Timeout) => {
                trace!("no drawable this refresh, frame skipped");
                self.pacer.release();
                return;
            }
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                warn!("presentation surface lost, reconfiguring");
                self.configure_surface();
                self.pacer.release();
                return;
            }
            Err(error) => panic!("presentation surface is unusable: {error}"),
        };

        let surface_view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let submitted = self.renderer.on_frame(Some(&surface_view));

        if submitted {
            let pacer = self.pacer.clone();
            self.context.queue().on_submitted_work_done(move || pacer.release());
        } else {
            self.pacer.release();
        }

        pre_present_notify();
        surface_texture.present();

        self.context.device().poll(PollType::Poll).expect("failed to poll the device");
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.renderer.pan(dx, dy);
    }

    pub fn zoom(&mut self, dz: f32) {
        self.renderer.zoom(dz);
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        self.renderer.camera()
    }

    #[must_use]
    pub fn iteration(&self) -> u32 {
        self.renderer.iteration()
    }
}

#[must_use]
fn select_presentation_format(capabilities: &wgpu::SurfaceCapabilities) -> wgpu::TextureFormat {
    // the gather kernel declares its storage target as rgba8unorm; fall back
    // to whatever the surface offers and let device validation speak
    capabilities
        .formats
        .iter()
        .copied()
        .find(|format| *format == wgpu::TextureFormat::Rgba8Unorm)
        .unwrap_or_else(|| {
            warn!("surface does not offer rgba8unorm, using {:?}", capabilities.formats[0]);
            capabilities.formats[0]
        })
}

fn log_adapter_info(adapter: &Adapter) {
    let adapter_info = adapter.get_info();
    info!(
        "Adapter Info:\n\
         Name: {}\n\
         Backend: {:?}\n\
         Device Type: {:?}\n\
         Driver: {:?}",
        adapter_info.name,
        adapter_info.backend,
        adapter_info.device_type,
        adapter_info.driver,
    );
}
