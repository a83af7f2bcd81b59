//! Window, event loop and the per-frame driver.
//!
//! [`run`] opens a window, brings up the GPU, uploads one mesh per
//! [`MeshKind`], asks the [`Scene`] for its batches and then renders until the
//! window closes. Each frame it reads input, toggles the animation state on a
//! click, advances the scene, streams dirty transforms and runs the render
//! graph with the overlay on top.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::SceneConfig;
use crate::ecs::MeshKind;
use crate::gpu::{GpuContext, GpuError};
use crate::input::Input;
use crate::lighting::Lighting;
use crate::mesh::Mesh;
use crate::orbit_camera::OrbitCamera;
use crate::overlay::Overlay;
use crate::render_graph::{BloomNode, FinishNode, MeshNode, MeshQueue, RenderGraph};
use crate::scene::Scene;

/// Errors that end the application before or while it runs.
#[derive(Debug)]
pub enum AppError {
    /// The event loop could not be created or failed while running.
    EventLoop(winit::error::EventLoopError),
    /// The OS refused to open the window.
    Window(winit::error::OsError),
    /// The GPU could not be brought up.
    Gpu(GpuError),
    /// The GPU ran out of memory mid-frame.
    OutOfMemory,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "event loop error: {}", e),
            AppError::Window(e) => write!(f, "could not open window: {}", e),
            AppError::Gpu(e) => write!(f, "GPU initialization failed: {}", e),
            AppError::OutOfMemory => write!(f, "GPU out of memory"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
            AppError::Window(e) => Some(e),
            AppError::Gpu(e) => Some(e),
            AppError::OutOfMemory => None,
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e)
    }
}

impl From<GpuError> for AppError {
    fn from(e: GpuError) -> Self {
        AppError::Gpu(e)
    }
}

/// Configuration for the app window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Merry Christmas".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Open a window and run the scene until it is closed.
///
/// # Example
/// ```no_run
/// use tinsel::{AppConfig, SceneConfig};
///
/// tinsel::run(AppConfig::new().size(1600, 900), SceneConfig::new().seed(2024))?;
/// # Ok::<(), tinsel::AppError>(())
/// ```
///
/// # Errors
///
/// Returns an error if the event loop, the window or the GPU cannot be set
/// up, or if the GPU runs out of memory while rendering.
pub fn run(config: AppConfig, scene_config: SceneConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let scene = Scene::new(&scene_config);
    let mut app = TinselApp::Pending {
        config,
        scene_config,
        scene: Some(scene),
    };

    event_loop.run_app(&mut app)?;

    match app {
        TinselApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

enum TinselApp {
    Pending {
        config: AppConfig,
        scene_config: SceneConfig,
        scene: Option<Scene>,
    },
    Running(Box<Running>),
    Failed(AppError),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    scene: Scene,
    orbit: OrbitCamera,
    input: Input,
    graph: RenderGraph,
    queue: Rc<RefCell<MeshQueue>>,
    overlay: Option<Overlay>,
    start_time: Instant,
    last_frame: Instant,
}

impl Running {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        scene_config: &SceneConfig,
        mut scene: Scene,
    ) -> Result<Self, AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;

        let queue = Rc::new(RefCell::new(MeshQueue::new()));
        let meshes: HashMap<MeshKind, _> = MeshKind::ALL
            .into_iter()
            .map(|kind| {
                let mesh = Mesh::from_geometry(&gpu, &kind.geometry(scene_config));
                (kind, queue.borrow_mut().add_mesh(mesh))
            })
            .collect();

        let lighting = Lighting::default().with_fog(scene_config.fog);
        let mesh_node = MeshNode::new(&gpu, Rc::clone(&queue), lighting);
        scene.bind_slots(|kind, material, capacity| {
            mesh_node.add_batch(&gpu, meshes[&kind], material, capacity)
        });
        log::info!(
            "{} batches, {} instances",
            queue.borrow().batches.len(),
            scene.instance_count()
        );

        let graph = RenderGraph::builder()
            .node(mesh_node)
            .node(BloomNode::new(&gpu, &scene_config.bloom))
            .node(FinishNode::new(&gpu, &scene_config.vignette))
            .build(&gpu);

        let overlay = match Overlay::new(&gpu) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                log::warn!("overlay disabled: {e}");
                None
            }
        };

        let now = Instant::now();
        Ok(Self {
            window,
            gpu,
            scene,
            orbit: OrbitCamera::from_config(&scene_config.camera),
            input: Input::new(),
            graph,
            queue,
            overlay,
            start_time: now,
            last_frame: now,
        })
    }

    /// Runs one frame. Returns an error only when rendering cannot go on.
    fn frame(&mut self) -> Result<(), AppError> {
        let now = Instant::now();
        let time = self.start_time.elapsed().as_secs_f32();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.input.clicked(MouseButton::Left) {
            self.scene.toggle();
        }
        self.orbit.update(&self.input, dt);

        self.scene.update(dt, time);
        {
            let mut queue = self.queue.borrow_mut();
            let gpu = &self.gpu;
            self.scene
                .drain_uploads(|batch, instances| queue.upload(gpu, batch, instances));
        }

        let state = self.scene.state();
        if let Some(overlay) = &mut self.overlay {
            overlay.prepare(&self.gpu, state, time);
        }

        let camera = self.orbit.camera();
        let overlay = self.overlay.as_ref();
        let result = self
            .graph
            .render(&self.gpu, time, &camera, |gpu, pass| {
                if let Some(overlay) = overlay {
                    overlay.render(gpu, pass);
                }
            });

        match result {
            Ok(()) => Ok(()),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(AppError::OutOfMemory),
            Err(e) => {
                log::debug!("skipping frame: {e}");
                Ok(())
            }
        }
    }
}

impl ApplicationHandler for TinselApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let TinselApp::Pending {
            config,
            scene_config,
            scene,
        } = self
        else {
            return;
        };
        let Some(scene) = scene.take() else {
            return;
        };

        *self = match Running::start(event_loop, config, scene_config, scene) {
            Ok(running) => TinselApp::Running(Box::new(running)),
            Err(e) => {
                event_loop.exit();
                TinselApp::Failed(e)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let TinselApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = app.frame() {
                    event_loop.exit();
                    *self = TinselApp::Failed(e);
                    return;
                }
                app.input.begin_frame();
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_overrides_window() {
        let config = AppConfig::new().title("Tree").size(640, 480);
        assert_eq!(config.title, "Tree");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(AppConfig::default().width, 1280);
    }

    #[test]
    fn errors_describe_their_cause() {
        let err = AppError::Gpu(GpuError::NoSurfaceFormat);
        assert_eq!(
            err.to_string(),
            "GPU initialization failed: surface supports no texture formats"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&AppError::OutOfMemory).is_none());
    }
}
