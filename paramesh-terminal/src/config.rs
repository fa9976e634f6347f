/// Command-line configuration for the terminal viewer
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use paramesh_core::parametric::{self, Shape};
use paramesh_core::render::DEFAULT_TIME_STEP;
use paramesh_core::scene::MAX_GRID;
use paramesh_core::{SceneConfig, Shading};

/// Paramesh - parametric surfaces rendered in the terminal
#[derive(Parser, Debug)]
#[command(name = "paramesh")]
#[command(about = "Parametric surface meshing with a terminal renderer")]
#[command(version)]
pub struct Cli {
    /// Log filter in env_logger syntax (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an orbiting scene in the terminal
    View(ViewArgs),

    /// Build one mesh and print its statistics
    Inspect(InspectArgs),
}

/// Which surface the viewer shows
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    /// Floor, a grid of spheres, a big sphere and a torus
    Demo,
    Plane,
    Sphere,
    Torus,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Plane,
    Sphere,
    Torus,
}

impl ShapeKind {
    pub fn shape(self, major: f32, minor: f32) -> Shape {
        match self {
            Self::Plane => parametric::plane(),
            Self::Sphere => parametric::sphere(),
            Self::Torus => parametric::torus(major, minor),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ViewArgs {
    #[arg(long, value_enum, default_value_t = SceneKind::Demo)]
    pub scene: SceneKind,

    /// Grid cells per side of every mesh
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..=255))]
    pub resolution: u32,

    /// Spheres per axis in the demo scene
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=MAX_GRID as i64))]
    pub grid: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Scene time advanced per frame
    #[arg(long, default_value_t = DEFAULT_TIME_STEP)]
    pub time_step: f32,

    /// Near clipping plane distance
    #[arg(long, default_value_t = 0.001)]
    pub near: f32,

    /// Colour surfaces by their normals instead of lighting them
    #[arg(long)]
    pub normals: bool,
}

impl ViewArgs {
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            scene: self.scene,
            scene_config: SceneConfig {
                resolution: self.resolution,
                grid: self.grid,
                shading: if self.normals {
                    Shading::Normals
                } else {
                    Shading::Lit
                },
            },
            frame_time: Duration::from_secs_f64(1.0 / f64::from(self.fps)),
            time_step: self.time_step,
            near: self.near,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct InspectArgs {
    #[arg(long, value_enum, default_value_t = ShapeKind::Sphere)]
    pub shape: ShapeKind,

    /// Grid cells along u
    #[arg(short, long, default_value_t = 16)]
    pub u: u32,

    /// Grid cells along v
    #[arg(short, long, default_value_t = 16)]
    pub v: u32,

    /// Torus ring radius
    #[arg(long, default_value_t = 10.0)]
    pub major: f32,

    /// Torus tube radius
    #[arg(long, default_value_t = 1.0)]
    pub minor: f32,
}

/// Resolved settings for [`TerminalApp`](crate::TerminalApp)
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub scene: SceneKind,
    pub scene_config: SceneConfig,
    pub frame_time: Duration,
    pub time_step: f32,
    pub near: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scene: SceneKind::Demo,
            scene_config: SceneConfig::default(),
            frame_time: Duration::from_millis(1000 / 30),
            time_step: DEFAULT_TIME_STEP,
            near: 0.001,
        }
    }
}
