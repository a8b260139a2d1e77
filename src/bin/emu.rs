use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, NamedKey, PhysicalKey},
    window::{Window, WindowId},
};

use chip8_vm::{
    config::VmArgs,
    emu::{DISPLAY_X, DISPLAY_Y, Display, Runner, read_program},
    u4,
};

/// Brightness lost per second by a pixel that has been switched off.
const PHOSPHOR_DECAY_PER_SEC: f32 = 10.0;
const WINDOW_SCALE: u32 = 10;
const WINDOW_TITLE: &str = "chip8-vm";

/// Physical keys for CHIP-8 keys 0x0-0xF.
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x0
    KeyCode::Digit1, // 0x1
    KeyCode::Digit2, // 0x2
    KeyCode::Digit3, // 0x3
    KeyCode::KeyQ,   // 0x4
    KeyCode::KeyW,   // 0x5
    KeyCode::KeyE,   // 0x6
    KeyCode::KeyA,   // 0x7
    KeyCode::KeyS,   // 0x8
    KeyCode::KeyD,   // 0x9
    KeyCode::KeyZ,   // 0xA
    KeyCode::KeyC,   // 0xB
    KeyCode::Digit4, // 0xC
    KeyCode::KeyR,   // 0xD
    KeyCode::KeyF,   // 0xE
    KeyCode::KeyV,   // 0xF
];

struct App {
    pixels: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    /// Per-pixel brightness in 0.0..=1.0, lets switched-off pixels fade.
    brightness: Display<f32>,
    /// Whether the title currently shows the sound indicator.
    sound_shown: bool,

    runner: Runner,
    last_frame_instant: Instant,

    /// Result handed back to main once the event loop exits.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(runner: Runner) -> Self {
        Self {
            pixels: None,
            window: None,
            brightness: [[0.0; DISPLAY_X]; DISPLAY_Y],
            sound_shown: false,
            runner,
            last_frame_instant: Instant::now(),
            exit_result: Ok(()),
        }
    }

    fn pixels_mut(&mut self) -> anyhow::Result<&mut Pixels<'static>> {
        self.pixels.as_mut().context("Pixels surface not created")
    }

    /// Copies the framebuffer into the surface, fading pixels that turned off.
    fn draw_frame(&mut self, dt: f32) -> anyhow::Result<()> {
        let decay = PHOSPHOR_DECAY_PER_SEC * dt;
        let machine = self.runner.machine();

        for (y, row) in self.brightness.iter_mut().enumerate() {
            for (x, level) in row.iter_mut().enumerate() {
                *level = if machine.pixel(y, x) {
                    1.0
                } else {
                    (*level - decay).max(0.0)
                };
            }
        }

        let brightness = self.brightness;
        let frame = self.pixels_mut()?.frame_mut();
        for (i, rgba) in frame.chunks_exact_mut(4).enumerate() {
            let level = brightness[i / DISPLAY_X][i % DISPLAY_X];
            rgba.copy_from_slice(&[0, 0xff, 0, (level * 255.0) as u8]);
        }

        self.pixels_mut()?.render().context("Pixels render error")
    }

    fn show_sound(&mut self) {
        let active = self.runner.machine().sound_active();
        if active == self.sound_shown {
            return;
        }

        self.sound_shown = active;
        if let Some(window) = &self.window {
            let title = if active {
                format!("{WINDOW_TITLE} \u{266A}")
            } else {
                WINDOW_TITLE.to_string()
            };
            window.set_title(&title);
        }
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let size = LogicalSize::new(
            DISPLAY_X as u32 * WINDOW_SCALE,
            DISPLAY_Y as u32 * WINDOW_SCALE,
        );
        let min_size = LogicalSize::new(DISPLAY_X as u32, DISPLAY_Y as u32);

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(WINDOW_TITLE)
                        .with_inner_size(size)
                        .with_min_inner_size(min_size),
                )
                .context("Failed to create window")?,
        );

        let window_size = window.inner_size();
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());
        let pixels = Pixels::new(DISPLAY_X as u32, DISPLAY_Y as u32, surface_texture)
            .context("Failed to create pixels surface")?;

        window.request_redraw();
        self.window = Some(window);
        self.pixels = Some(pixels);

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        Ok(())
    }

    fn set_key(&mut self, code: KeyCode, pressed: bool) {
        if let Some(key) = KEY_MAP.iter().position(|&k| k == code) {
            self.runner
                .machine_mut()
                .set_key(u4::new(key as u8), pressed);
        }
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.pixels_mut()?
                    .resize_surface(size.width, size.height)
                    .context("Failed to resize pixels surface")?;
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame_instant).as_secs_f32();
                self.last_frame_instant = now;

                // Whole frames: cycles, then one timer tick each
                self.runner.update(dt).context("CHIP-8 execution error")?;
                self.show_sound();
                self.draw_frame(dt)?;

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.set_key(code, event.state == ElementState::Pressed);
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

/// CHIP-8 virtual machine.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape is used to exit.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 program image
    rom_path: PathBuf,

    #[command(flatten)]
    vm: VmArgs,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = read_program(&args.rom_path).context("Failed to read ROM file")?;
    let runner = args
        .vm
        .build_runner(&rom)
        .context("Failed to load ROM into CHIP-8 memory")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(runner);
    event_loop
        .run_app(&mut app)
        .context("Error occurred during event loop execution")?;

    app.exit_result
}
