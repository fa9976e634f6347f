/// Terminal viewer for parametric meshes
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use log::{info, warn};
use paramesh_core::parametric;
use paramesh_core::scene::{demo_scene, single_shape_scene};
use paramesh_core::{Camera, FrameDriver, FrameStats, Scene, Shading};
use std::io::{stdout, Write};
use std::time::{Duration, Instant};

pub mod config;
pub mod inspect;
pub mod logging;
pub mod renderer;

pub use config::{AppConfig, SceneKind};
pub use renderer::AsciiRenderer;

const ROTATE_STEP: f32 = 0.1;
const MIN_TIME_STEP: f32 = 0.001;
const MAX_TIME_STEP: f32 = 0.5;

/// Build the scene selected by `config`, uploading its meshes to `renderer`
pub fn build_scene(config: &AppConfig, renderer: &mut AsciiRenderer) -> Result<Scene> {
    let scene_config = &config.scene_config;
    let scene = match config.scene {
        SceneKind::Demo => demo_scene(renderer, scene_config),
        SceneKind::Plane => single_shape_scene(
            renderer,
            &parametric::plane(),
            scene_config.resolution,
            scene_config.shading,
        ),
        SceneKind::Sphere => single_shape_scene(
            renderer,
            &parametric::sphere(),
            scene_config.resolution,
            scene_config.shading,
        ),
        SceneKind::Torus => single_shape_scene(
            renderer,
            &parametric::torus(1.0, 0.35),
            scene_config.resolution,
            scene_config.shading,
        ),
    };
    scene.with_context(|| format!("failed to build {:?} scene", config.scene))
}

/// Main application struct for terminal rendering
pub struct TerminalApp {
    config: AppConfig,
    scene: Scene,
    driver: FrameDriver,
    renderer: AsciiRenderer,
    running: bool,
    last_fps_sample: Instant,
    frame_count: u32,
    fps: f32,
    last_stats: Option<FrameStats>,
}

impl TerminalApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let (width, height) = terminal::size().context("failed to query terminal size")?;
        Self::with_size(config, width as usize, height as usize)
    }

    /// Build the app for a fixed character grid without touching the terminal
    pub fn with_size(config: AppConfig, width: usize, height: usize) -> Result<Self> {
        let mut renderer = AsciiRenderer::new(width, height);
        let scene = build_scene(&config, &mut renderer)?;

        let aspect = if width > 0 && height > 0 { renderer.aspect() } else { 1.0 };
        let mut camera = Camera::new(aspect);
        camera.near = config.near;
        let driver = FrameDriver::new(camera).with_time_step(config.time_step);

        info!(
            "viewer ready: {:?} scene, {} instances, {width}x{height} cells",
            config.scene,
            scene.instances().len()
        );
        Ok(Self {
            config,
            scene,
            driver,
            renderer,
            running: true,
            last_fps_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
            last_stats: None,
        })
    }

    pub fn driver(&self) -> &FrameDriver {
        &self.driver
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        let target_frame_time = self.config.frame_time;

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            // Render
            self.render_frame()?;
            self.present()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_fps_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_fps_sample = now;
            }
        }

        info!("viewer stopped after {} frames", self.driver.frame());
        Ok(())
    }

    /// Apply one terminal event to the viewer state
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                self.handle_key(code)
            }
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                // A collapsed window keeps the last usable aspect
                if width > 0 && height > 0 {
                    self.driver.camera_mut().aspect = self.renderer.aspect();
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char(' ') => {
                self.driver.toggle_pause();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let step = (self.driver.time_step() * 2.0).min(MAX_TIME_STEP);
                self.driver.set_time_step(step);
            }
            KeyCode::Char('-') => {
                let step = (self.driver.time_step() * 0.5).max(MIN_TIME_STEP);
                self.driver.set_time_step(step);
            }
            KeyCode::Char('n') => {
                let shading = match self.renderer.shading_override() {
                    Some(Shading::Normals) => None,
                    _ => Some(Shading::Normals),
                };
                self.renderer.set_shading_override(shading);
            }
            KeyCode::Char('w') | KeyCode::Up => {
                self.driver.rotation_mut().rotate(ROTATE_STEP, 0.0, 0.0);
            }
            KeyCode::Char('s') | KeyCode::Down => {
                self.driver.rotation_mut().rotate(-ROTATE_STEP, 0.0, 0.0);
            }
            KeyCode::Char('a') | KeyCode::Left => {
                self.driver.rotation_mut().rotate(0.0, -ROTATE_STEP, 0.0);
            }
            KeyCode::Char('d') | KeyCode::Right => {
                self.driver.rotation_mut().rotate(0.0, ROTATE_STEP, 0.0);
            }
            KeyCode::Char('e') => {
                self.driver.rotation_mut().rotate(0.0, 0.0, ROTATE_STEP);
            }
            KeyCode::Char('r') => {
                self.driver.rotation_mut().rotate(0.0, 0.0, -ROTATE_STEP);
            }
            _ => {}
        }
    }

    /// Rasterize one frame into the character grid and advance scene time
    pub fn render_frame(&mut self) -> Result<FrameStats> {
        self.renderer.clear();
        let stats = self
            .driver
            .render_frame(&self.scene, &mut self.renderer)
            .with_context(|| format!("frame {} failed", self.driver.frame()))?;
        if stats.draw_calls == 0 {
            warn!("frame {} drew nothing", stats.frame);
        }
        self.last_stats = Some(stats);
        Ok(stats)
    }

    fn present(&mut self) -> Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(self.status_line()),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }

    fn status_line(&self) -> String {
        let draws = self.last_stats.map_or(0, |s| s.draw_calls);
        format!(
            "Paramesh | FPS: {:.1} | t: {:.2} | draws: {draws}{} | WASD/Arrows=Rotate E/R=Roll Space=Pause +/-=Speed N=Normals Q=Quit",
            self.fps,
            self.driver.time(),
            if self.driver.is_paused() { " | PAUSED" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use paramesh_core::SceneConfig;

    fn press(app: &mut TerminalApp, code: KeyCode) {
        app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn small_config(scene: SceneKind) -> AppConfig {
        AppConfig {
            scene,
            scene_config: SceneConfig {
                resolution: 6,
                grid: 2,
                shading: Shading::Lit,
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_every_scene_kind_renders() {
        for kind in [SceneKind::Demo, SceneKind::Plane, SceneKind::Sphere, SceneKind::Torus] {
            let mut app = TerminalApp::with_size(small_config(kind), 60, 30).unwrap();
            let stats = app.render_frame().unwrap();
            assert_eq!(stats.draw_calls, app.scene.instances().len());
            assert_eq!(app.driver().frame(), 1);
        }
    }

    #[test]
    fn test_keys_control_the_driver() {
        let mut app = TerminalApp::with_size(small_config(SceneKind::Sphere), 40, 20).unwrap();
        let step = app.driver().time_step();

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.driver().time_step(), step * 2.0);
        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.driver().time_step(), step * 0.5);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.driver().is_paused());
        app.render_frame().unwrap();
        assert_eq!(app.driver().time(), 0.0);

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.renderer().shading_override(), Some(Shading::Normals));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.renderer().shading_override(), None);

        press(&mut app, KeyCode::Char('q'));
        assert!(!app.is_running());
    }

    #[test]
    fn test_time_step_is_clamped() {
        let mut app = TerminalApp::with_size(small_config(SceneKind::Plane), 20, 10).unwrap();
        for _ in 0..20 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.driver().time_step(), MAX_TIME_STEP);
        for _ in 0..20 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.driver().time_step(), MIN_TIME_STEP);
    }

    #[test]
    fn test_resize_updates_camera_aspect() {
        let mut app = TerminalApp::with_size(small_config(SceneKind::Plane), 40, 20).unwrap();
        app.handle_event(Event::Resize(100, 25));
        assert_eq!(app.renderer().width(), 100);
        assert_eq!(app.driver().camera().aspect, 2.0);
    }

    #[test]
    fn test_zero_sized_terminal_keeps_rendering() {
        let mut app = TerminalApp::with_size(small_config(SceneKind::Sphere), 40, 20).unwrap();
        let aspect = app.driver().camera().aspect;

        app.handle_event(Event::Resize(0, 20));
        assert_eq!(app.driver().camera().aspect, aspect);
        assert!(app.render_frame().is_ok());
        assert_eq!(app.renderer().covered_cells(), 0);

        app.handle_event(Event::Resize(30, 0));
        assert!(app.render_frame().is_ok());

        app.handle_event(Event::Resize(40, 10));
        assert_eq!(app.driver().camera().aspect, 2.0);
        assert!(app.render_frame().is_ok());
    }

    #[test]
    fn test_starts_in_zero_sized_terminal() {
        let mut app = TerminalApp::with_size(small_config(SceneKind::Plane), 0, 0).unwrap();
        assert_eq!(app.driver().camera().aspect, 1.0);
        assert!(app.render_frame().is_ok());
    }

    #[test]
    fn test_status_line_shows_pause() {
        let mut app = TerminalApp::with_size(small_config(SceneKind::Torus), 40, 20).unwrap();
        assert!(!app.status_line().contains("PAUSED"));
        press(&mut app, KeyCode::Char(' '));
        assert!(app.status_line().contains("PAUSED"));
    }
}
