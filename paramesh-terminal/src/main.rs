/// Paramesh terminal viewer
///
/// # Commands
///
/// - `paramesh view` - Render an orbiting scene of parametric surfaces
/// - `paramesh inspect` - Build one mesh and print its statistics
///
/// # Controls (view)
///
/// - WASD / Arrow Keys: Rotate the scene
/// - E/R: Roll rotation
/// - Space: Pause the clock
/// - +/-: Speed the clock up or down
/// - N: Toggle normal-colour shading
/// - Q/ESC: Quit
use anyhow::{Context, Result};
use clap::Parser;
use paramesh_terminal::config::{Cli, Command};
use paramesh_terminal::inspect::inspect;
use paramesh_terminal::logging::{init_logging, LoggingConfig};
use paramesh_terminal::TerminalApp;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log,
        log_file: cli.log_file.clone(),
        ..LoggingConfig::default()
    })
    .with_context(|| format!("failed to open log file {:?}", cli.log_file))?;

    match cli.command {
        Command::View(args) => {
            let mut app = TerminalApp::new(args.app_config())?;
            app.run()
        }
        Command::Inspect(args) => inspect(&args, &mut std::io::stdout().lock()),
    }
}
