mod daemon;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use mate_panel_core::{ConfigPaths, MonitorRegistry, PanelsConfig};

#[derive(Parser)]
#[command(name = "mate-panel")]
#[command(about = "MATE desktop panel shell")]
#[command(version)]
struct Cli {
    /// Panel layout file (defaults to ~/.config/mate-panel/panels.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the panels (default)
    Daemon,
    /// Print the monitors panels can be placed on
    Monitors,
    /// Parse and validate the panel layout file
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mate_panel=info".parse()?)
                .add_directive("mate_panel_core=info".parse()?)
                .add_directive("mate_panel_components=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let paths = match cli.config {
        Some(path) => ConfigPaths::with_panels_config(path),
        None => ConfigPaths::new(),
    };

    match cli.command {
        Some(Command::Daemon) | None => {
            info!("Starting MATE panel");
            daemon::run(paths)
        }
        Some(Command::Monitors) => show_monitors(),
        Some(Command::CheckConfig) => check_config(&paths),
    }
}

fn show_monitors() -> anyhow::Result<()> {
    gtk4::init()?;

    let mut monitors = MonitorRegistry::new(daemon::monitor_sources(false));
    monitors.init();

    for (index, monitor) in monitors.monitors().iter().enumerate() {
        let g = monitor.geometry;
        let extremes = monitors.is_at_visible_extreme(index);
        println!(
            "{}: {}x{}+{}+{} scale {} {} [left={} right={} top={} bottom={}]",
            index,
            g.width,
            g.height,
            g.x,
            g.y,
            monitor.scale,
            monitor.connector.as_deref().unwrap_or("-"),
            extremes.leftmost,
            extremes.rightmost,
            extremes.topmost,
            extremes.bottommost,
        );
    }
    Ok(())
}

fn check_config(paths: &ConfigPaths) -> anyhow::Result<()> {
    let config = PanelsConfig::load_checked(&paths.panels_config)?;
    let problems = config.validate();

    println!(
        "{:?}: {} toplevel(s)",
        paths.panels_config,
        config.toplevels.len()
    );
    for problem in &problems {
        println!("  {}", problem);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} problem(s) in panel layout", problems.len()))
    }
}
