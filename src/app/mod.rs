//! Demo driver: one window, a presentation thread running the engine, and a
//! ticker thread updating the status line.

mod screen;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::RenderConfig;
use crate::engine::{ApiHandle, AtlasEngine};
use crate::font::{FaceIdx, FontCollection, FontMetrics, SwashRasterizer, find_monospace_font};
use crate::geometry::{CellCount, CellRect, PixelSize};
use crate::gpu::{FrameSignal, WgpuBackend};
use crate::logging;

use screen::{Screen, layout_row, row_color};

/// Presentation thread sleep when nothing is invalidated.
const IDLE_WAIT: Duration = Duration::from_millis(250);
const STATUS_INTERVAL: Duration = Duration::from_millis(500);
/// Pause before retrying backend creation after device loss.
const RECREATE_BACKOFF: Duration = Duration::from_millis(200);

const INITIAL_COLS: u16 = 100;
const INITIAL_ROWS: u16 = 30;

type Engine = AtlasEngine<WgpuBackend, SwashRasterizer>;

/// State shared between the event loop and the worker threads.
struct Shared {
    screen: Mutex<Screen>,
    wake: FrameSignal,
    shutdown: AtomicBool,
    frames: AtomicU64,
}

struct Session {
    api: ApiHandle,
    font: FontMetrics,
    threads: Vec<JoinHandle<()>>,
}

pub struct App {
    config: RenderConfig,
    shared: Arc<Shared>,
    session: Option<Session>,
}

impl App {
    /// Load config, install the logger and run the event loop until the
    /// window closes.
    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        std::panic::set_hook(Box::new(|info| {
            log::error!("panic: {info}");
            let _ = std::fs::write("oriterm_atlas_panic.log", format!("{info}"));
        }));

        let _ = std::fs::remove_file(logging::log_path());
        // Installed first so config read and parse warnings are kept.
        logging::init(log::LevelFilter::Info);
        let config = RenderConfig::load();
        logging::set_level(config.debug.log_level_filter());
        log::info!(
            "config: atlas={} packer={:?} vsync={} continuous_redraw={}",
            config.atlas.effective_size(),
            config.atlas.packer,
            config.present.vsync,
            config.debug.continuous_redraw,
        );

        let event_loop = EventLoop::new()?;
        let mut app = Self {
            config,
            shared: Arc::new(Shared {
                screen: Mutex::new(Screen::sample()),
                wake: FrameSignal::new(true),
                shutdown: AtomicBool::new(false),
                frames: AtomicU64::new(0),
            }),
            session: None,
        };
        event_loop.run_app(&mut app)?;
        app.stop();
        Ok(())
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Option<Session> {
        let (fonts, face) = load_font(&self.config)?;
        let font = fonts.metrics(face, self.config.font.size)?;

        let attrs = Window::default_attributes()
            .with_title("oriterm_atlas")
            .with_inner_size(PhysicalSize::new(
                u32::from(font.cell.width) * u32::from(INITIAL_COLS),
                u32::from(font.cell.height) * u32::from(INITIAL_ROWS),
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("app: failed to create window: {e}");
                return None;
            }
        };

        let backend = match WgpuBackend::new(&window, &self.config) {
            Ok(b) => b,
            Err(e) => {
                log::error!("app: GPU init failed: {e}");
                return None;
            }
        };
        log::info!("app: adapter {}", backend.adapter_name());

        let engine = AtlasEngine::new(backend, SwashRasterizer::new(fonts), &self.config);
        let api = engine.api();
        api.set_font_metrics(font);

        let mut session = Session {
            api: api.clone(),
            font,
            threads: Vec::new(),
        };
        self.resize(&session, window.inner_size());

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let thread_window = Arc::clone(&window);
        match std::thread::Builder::new()
            .name("present".into())
            .spawn(move || present_loop(engine, face, &thread_window, &config, &shared))
        {
            Ok(h) => session.threads.push(h),
            Err(e) => {
                log::error!("app: failed to spawn presentation thread: {e}");
                return None;
            }
        }

        let shared = Arc::clone(&self.shared);
        match std::thread::Builder::new()
            .name("status".into())
            .spawn(move || status_loop(&api, &shared))
        {
            Ok(h) => session.threads.push(h),
            Err(e) => log::warn!("app: status line disabled: {e}"),
        }

        Some(session)
    }

    fn resize(&self, session: &Session, size: PhysicalSize<u32>) {
        let cell = session.font.cell;
        let cells = CellCount::new(
            clamp_u16(size.width / u32::from(cell.width).max(1)),
            clamp_u16(size.height / u32::from(cell.height).max(1)),
        );
        self.shared.screen.lock().set_cells(cells);
        session
            .api
            .set_viewport(PixelSize::new(size.width, size.height), cells);
        self.shared.wake.signal();
    }

    fn scroll(&self, session: &Session, lines: i32) {
        let (moved, cells) = {
            let mut screen = self.shared.screen.lock();
            (screen.scroll(lines), screen.cells())
        };
        if moved == 0 {
            return;
        }
        session.api.invalidate_scroll(moved);
        // The status line does not scroll with the content.
        if cells.rows > 0 {
            session
                .api
                .invalidate(CellRect::rows(cells, cells.rows - 1, cells.rows));
        }
        self.shared.wake.signal();
    }

    /// Stop and join the worker threads.
    fn stop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.wake.signal();
        if let Some(session) = self.session.take() {
            for handle in session.threads {
                if handle.join().is_err() {
                    log::error!("app: worker thread panicked");
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        match self.start(event_loop) {
            Some(session) => self.session = Some(session),
            None => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(session) = &self.session {
                    self.resize(session, size);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => (y * 3.0).round() as i32,
                    MouseScrollDelta::PixelDelta(p) => self.session.as_ref().map_or(0, |s| {
                        (p.y / f64::from(s.font.cell.height)).round() as i32
                    }),
                };
                if let Some(session) = &self.session {
                    self.scroll(session, lines);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(session) = &self.session {
                    session.api.invalidate_all();
                    self.shared.wake.signal();
                }
            }
            _ => {}
        }
    }
}

/// Configured font, else the first installed monospace candidate.
fn load_font(config: &RenderConfig) -> Option<(FontCollection, FaceIdx)> {
    let Some(path) = config.font.path.clone().or_else(find_monospace_font) else {
        log::error!("app: no font configured and no monospace font found");
        return None;
    };
    let mut fonts = FontCollection::new();
    let face = fonts.load_file(&path)?;
    log::info!("app: font {}", path.display());
    Some((fonts, face))
}

/// Owns the engine. Renders whenever woken or, with continuous redraw,
/// every frame.
fn present_loop(
    mut engine: Engine,
    face: FaceIdx,
    window: &Arc<Window>,
    config: &RenderConfig,
    shared: &Shared,
) {
    let api = engine.api();
    while !shared.shutdown.load(Ordering::Acquire) {
        if !engine.requires_continuous_redraw() {
            shared.wake.wait(IDLE_WAIT);
        }
        engine.wait_until_can_render();

        let mut code = engine.start_paint();
        if code.is_ok() {
            let font = engine.font_metrics();
            let cells = engine.cell_count();
            {
                let screen = shared.screen.lock();
                let fonts = engine.rasterizer().fonts();
                let rows: Vec<_> = (0..cells.rows)
                    .map(|r| {
                        layout_row(
                            screen.line(r),
                            r,
                            cells.cols,
                            face,
                            &font,
                            row_color(&screen, r),
                            |ch| fonts.glyph_id(face, ch),
                        )
                    })
                    .collect();
                drop(screen);
                for row in rows {
                    engine.paint_row(row);
                }
            }
            code = engine.present();
        }
        if code.is_ok() {
            shared.frames.fetch_add(1, Ordering::Relaxed);
        } else {
            log::debug!("app: frame result {code:?}");
        }

        if api.take_device_lost() {
            match WgpuBackend::new(window, config) {
                Ok(backend) => {
                    log::info!("app: recreated GPU backend on {}", backend.adapter_name());
                    drop(engine.replace_backend(backend));
                    shared.wake.signal();
                }
                Err(e) => {
                    log::error!("app: GPU backend recreation failed: {e}");
                    api.invalidate_device();
                    std::thread::sleep(RECREATE_BACKOFF);
                }
            }
        }
    }
    log::debug!("app: presentation thread exiting");
}

/// Refresh the status line twice a second.
fn status_loop(api: &ApiHandle, shared: &Shared) {
    let started = Instant::now();
    while !shared.shutdown.load(Ordering::Acquire) {
        let secs = started.elapsed().as_secs();
        let status = format!(
            " up {:02}:{:02}:{:02}  frames {}  (scroll with the mouse wheel)",
            secs / 3600,
            secs / 60 % 60,
            secs % 60,
            shared.frames.load(Ordering::Relaxed),
        );
        let cells = {
            let mut screen = shared.screen.lock();
            screen.set_status(status);
            screen.cells()
        };
        if cells.rows > 0 {
            api.invalidate(CellRect::rows(cells, cells.rows - 1, cells.rows));
            shared.wake.signal();
        }
        std::thread::sleep(STATUS_INTERVAL);
    }
}

fn clamp_u16(v: u32) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}
