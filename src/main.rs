use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{Window, WindowBuilder};

use glint::{
    FrameDriver, GpuContext, InputPublisher, NavKey, Renderer, SceneConfig, UniformSync, World,
    MAX_SPHERES,
};

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let scene = match &options.scene_path {
        Some(path) => SceneConfig::from_file(Path::new(path))?,
        None => SceneConfig::demo(),
    };

    println!("Loaded scene with {} spheres", scene.spheres.len());
    for (index, sphere) in scene.spheres.iter().enumerate() {
        println!(
            " - sphere {index}: center=({:.2}, {:.2}, {:.2}) radius={:.2}",
            sphere.center.x, sphere.center.y, sphere.center.z, sphere.radius
        );
    }

    if options.summary_only {
        run_headless(&scene)
    } else {
        match run_interactive(&scene) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&scene)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn run_headless(scene: &SceneConfig) -> Result<()> {
    let world = World::from_config(scene, WINDOW_WIDTH, WINDOW_HEIGHT)?;
    print_final_state(&world);
    Ok(())
}

fn run_interactive(scene: &SceneConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Glint")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH as f64, WINDOW_HEIGHT as f64))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let context = Arc::new(block_on(GpuContext::new(Arc::clone(&window)))?);
    let size = window.inner_size();
    let world = World::from_config(scene, size.width, size.height)?;
    let uniforms = UniformSync::new(Arc::clone(&context));
    let renderer = Renderer::new(Arc::clone(&context), &uniforms);
    let input = Arc::new(InputPublisher::new());

    let mut driver = FrameDriver::new(world, uniforms, renderer, Arc::clone(&input));
    driver.start()?;

    let mut app = AppState {
        driver,
        input,
        window,
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    app.shutdown();

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

struct AppState {
    driver: FrameDriver,
    input: Arc<InputPublisher>,
    window: Arc<Window>,
    last_error: Option<anyhow::Error>,
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.driver.notify_resize(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.driver
                            .notify_resize(new_inner_size.width, new_inner_size.height);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if *button == MouseButton::Right {
                            self.input.set_look_active(*state == ElementState::Pressed);
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let pos = Vec2::new(position.x as f32, position.y as f32);
                        self.input.set_mouse_position(pos);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.window.id() => {
                self.driver.run_frame()?;
            }
            Event::MainEventsCleared => {
                self.window.request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&self, input: &KeyboardInput) {
        let Some(key) = input.virtual_keycode.and_then(map_keycode) else {
            return;
        };
        self.input.set_key(key, input.state == ElementState::Pressed);
    }

    fn shutdown(&mut self) {
        self.driver.stop();
        print_final_state(self.driver.world());
    }
}

fn print_final_state(world: &World) {
    let camera = world.camera();
    let position = camera.position();
    let forward = camera.forward();
    println!("Final camera state:");
    println!(
        " - position=({:.2}, {:.2}, {:.2}) forward=({:.2}, {:.2}, {:.2})",
        position.x, position.y, position.z, forward.x, forward.y, forward.z
    );
    println!(
        "Live spheres: {}/{}",
        world.spheres().len_existing(),
        MAX_SPHERES
    );
}

fn map_keycode(code: VirtualKeyCode) -> Option<NavKey> {
    Some(match code {
        VirtualKeyCode::W => NavKey::Forward,
        VirtualKeyCode::S => NavKey::Backward,
        VirtualKeyCode::A => NavKey::StrafeLeft,
        VirtualKeyCode::D => NavKey::StrafeRight,
        VirtualKeyCode::Q => NavKey::Down,
        VirtualKeyCode::E => NavKey::Up,
        _ => return None,
    })
}

struct CliOptions {
    scene_path: Option<String>,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut scene_path = None;
        let mut summary_only = false;
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                other if other.starts_with('-') => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: glint [scene.json] [--summary-only]"
                    ));
                }
                path => {
                    if scene_path.replace(path.to_string()).is_some() {
                        return Err(anyhow!("Usage: glint [scene.json] [--summary-only]"));
                    }
                }
            }
        }
        Ok(Self {
            scene_path,
            summary_only,
        })
    }
}
