use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use sierpinski_geometry::{Depth, FractalMesh, MeshStats, generate_fractal_mesh};
use sierpinski_input::{Action, InputState};
use sierpinski_render_wgpu::{FlyCamera, PyramidRenderer};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Pixels of trackpad scroll treated as one wheel line.
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

#[derive(Parser)]
#[command(name = "sierpinski-desktop", about = "Sierpinski pyramid viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Fractal recursion depth (5^depth pyramids)
    #[arg(short, long, default_value_t = Depth::DEFAULT.get())]
    depth: u32,

    /// Initial window width in pixels
    #[arg(long, default_value = "1920")]
    width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value = "1080")]
    height: u32,
}

/// Window settings fixed at startup.
#[derive(Debug, Clone)]
struct ViewerConfig {
    title: &'static str,
    width: u32,
    height: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Sierpinski pyramid",
            width: 1920,
            height: 1080,
        }
    }
}

fn bind_key(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::KeyW => Some(Action::MoveForward),
        KeyCode::KeyS => Some(Action::MoveBackward),
        KeyCode::KeyA => Some(Action::StrafeLeft),
        KeyCode::KeyD => Some(Action::StrafeRight),
        KeyCode::Space => Some(Action::Ascend),
        KeyCode::KeyC => Some(Action::Descend),
        KeyCode::ShiftLeft => Some(Action::Sprint),
        _ => None,
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_LINE,
    }
}

/// Cursor grab modes to try in order. Not every platform supports `Locked`.
fn grab_modes(captured: bool) -> &'static [CursorGrabMode] {
    if captured {
        &[CursorGrabMode::Locked, CursorGrabMode::Confined]
    } else {
        &[CursorGrabMode::None]
    }
}

/// Application state.
struct AppState {
    camera: FlyCamera,
    input: InputState,
    stats: MeshStats,
    show_overlay: bool,
    mouse_captured: bool,
    last_frame: Instant,
    // Smoothed frame time in seconds
    frame_time: f32,
}

impl AppState {
    fn new(stats: MeshStats) -> Self {
        Self {
            camera: FlyCamera::default(),
            input: InputState::new(),
            stats,
            show_overlay: true,
            mouse_captured: false,
            last_frame: Instant::now(),
            frame_time: 0.0,
        }
    }

    fn update(&mut self, dt: f32) {
        let frame = self.input.take_frame();
        self.camera.apply_input(&frame, dt);
        self.frame_time = self.frame_time * 0.9 + dt * 0.1;
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if let Some(action) = bind_key(key) {
            self.input.set_action(action, pressed);
            return;
        }

        if pressed && key == KeyCode::F1 {
            self.show_overlay = !self.show_overlay;
        }
    }

    fn draw_ui(&self, ctx: &EguiContext) {
        if !self.show_overlay {
            return;
        }

        egui::Window::new("Sierpinski pyramid")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                let fps = if self.frame_time > 0.0 {
                    1.0 / self.frame_time
                } else {
                    0.0
                };
                ui.label(format!(
                    "Frame: {:.2} ms ({fps:.0} fps)",
                    self.frame_time * 1000.0
                ));
                ui.label(format!(
                    "Camera: ({:.1}, {:.1}, {:.1})",
                    self.camera.position.x, self.camera.position.y, self.camera.position.z
                ));
                ui.label(format!("FOV: {:.1} deg (horizontal)", self.camera.zoom));
                ui.separator();
                ui.label(format!("Pyramids: {}", self.stats.leaf_count));
                ui.label(format!("Vertices: {}", self.stats.vertex_count));
                ui.label(format!("Indices: {}", self.stats.index_count));
                ui.separator();
                ui.small("WASD: Move | Space/C: Up/Down | Shift: Fast | Scroll: Zoom");
                ui.small("F1: Toggle Overlay | Esc: Quit");
            });
    }
}

struct GpuApp {
    state: AppState,
    config: ViewerConfig,
    // Host copy of the mesh, released once uploaded
    mesh: Option<FractalMesh>,
    startup_error: Option<anyhow::Error>,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<PyramidRenderer>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
}

impl GpuApp {
    fn new(config: ViewerConfig, mesh: FractalMesh) -> Self {
        Self {
            state: AppState::new(mesh.stats()),
            config,
            mesh: Some(mesh),
            startup_error: None,
            window: None,
            surface: None,
            device: None,
            queue: None,
            surface_config: None,
            renderer: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter found")?;

        // The default depth needs ~150 MiB vertex buffers; ask for what the
        // adapter can actually do.
        let required_limits = wgpu::Limits {
            max_buffer_size: adapter.limits().max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sierpinski_device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("failed to create GPU device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        self.state
            .camera
            .set_viewport(surface_config.width, surface_config.height);

        let mesh = self.mesh.take().context("fractal mesh already uploaded")?;
        let renderer = PyramidRenderer::new(
            &device,
            surface_format,
            surface_config.width,
            surface_config.height,
            &mesh,
        )
        .context("failed to upload fractal mesh")?;
        drop(mesh);
        tracing::debug!("host-side mesh released");

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        self.window = Some(window);
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.surface_config = Some(surface_config);
        self.renderer = Some(renderer);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        self.set_mouse_captured(true);
        Ok(())
    }

    fn set_mouse_captured(&mut self, captured: bool) {
        let Some(window) = &self.window else {
            return;
        };

        let mut last_err = None;
        for &mode in grab_modes(captured) {
            match window.set_cursor_grab(mode) {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        if let Some(e) = last_err {
            if captured {
                tracing::warn!("cursor grab unavailable: {e}");
            } else {
                tracing::warn!("cursor release failed: {e}");
            }
        }
        window.set_cursor_visible(!captured);
        self.state.mouse_captured = captured;
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
        self.state.last_frame = now;
        self.state.update(dt);

        let (Some(window), Some(surface), Some(device), Some(queue), Some(surface_config), Some(renderer)) = (
            &self.window,
            &self.surface,
            &self.device,
            &self.queue,
            &self.surface_config,
            &self.renderer,
        ) else {
            return;
        };

        let output = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(device, surface_config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(e) = renderer.render(device, queue, &view, &self.state.camera) {
            tracing::error!("frame skipped: {e}");
        }

        if let (Some(egui_winit), Some(egui_renderer)) =
            (&mut self.egui_winit, &mut self.egui_renderer)
        {
            let raw_input = egui_winit.take_egui_input(window);
            let full_output = self.egui_ctx.run(raw_input, |ctx| {
                self.state.draw_ui(ctx);
            });

            egui_winit.handle_platform_output(window, full_output.platform_output);

            let paint_jobs = self
                .egui_ctx
                .tessellate(full_output.shapes, full_output.pixels_per_point);

            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [surface_config.width, surface_config.height],
                pixels_per_point: full_output.pixels_per_point,
            };

            for (id, image_delta) in &full_output.textures_delta.set {
                egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
            egui_renderer.update_buffers(
                device,
                queue,
                &mut encoder,
                &paint_jobs,
                &screen_descriptor,
            );
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
            }
            queue.submit(std::iter::once(encoder.finish()));
            for id in &full_output.textures_delta.free {
                egui_renderer.free_texture(id);
            }
        }

        output.present();
        window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.startup_error.is_some() {
            return;
        }

        if let Err(e) = self.init_gpu(event_loop) {
            tracing::error!("startup failed: {e:#}");
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(surface), Some(device), Some(config)) =
                    (&self.surface, &self.device, &mut self.surface_config)
                {
                    config.width = new_size.width.max(1);
                    config.height = new_size.height.max(1);
                    surface.configure(device, config);
                    self.state.camera.set_viewport(config.width, config.height);
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(device, config.width, config.height);
                    }
                }
            }
            WindowEvent::Focused(false) => {
                self.state.input.release_all();
                self.set_mouse_captured(false);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                let pressed = key_state == ElementState::Pressed;
                if pressed && key == KeyCode::Escape {
                    tracing::info!("escape pressed, exiting");
                    event_loop.exit();
                    return;
                }
                self.state.handle_key(key, pressed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } if !self.state.mouse_captured => {
                self.set_mouse_captured(true);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.state.input.add_scroll(scroll_lines(delta));
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.state.mouse_captured {
                self.state
                    .input
                    .add_mouse_motion(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("sierpinski-desktop starting");

    let mesh = generate_fractal_mesh(cli.depth).context("fractal mesh generation failed")?;

    let config = ViewerConfig {
        width: cli.width,
        height: cli.height,
        ..ViewerConfig::default()
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config, mesh);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.startup_error.take() {
        return Err(e.context("GPU initialisation failed"));
    }

    Ok(())
}
