//! Heatgrid - a terminal heatmap browser for large telemetry arrays.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use heatgrid::app::App;
use heatgrid::color::{ColorMap, IntervalType, ScaleType};
use heatgrid::config::{ColorConfig, EngineConfig};
use heatgrid::surface::{export_png, FrameSurface, TimelineSurface};
use heatgrid::tiles::SyntheticSource;
use heatgrid::ui;
use heatgrid::viewport::Nudge;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "heatgrid")]
#[command(about = "A terminal heatmap browser for large time-indexed telemetry arrays", long_about = None)]
struct Args {
    /// Number of frames in the synthetic dataset
    #[arg(long, default_value_t = 100_000)]
    frames: usize,

    /// Number of indices per frame
    #[arg(long, default_value_t = 1_024)]
    indices: usize,

    /// Number of value dimensions
    #[arg(long, default_value_t = 3)]
    dims: usize,

    /// Simulated latency of each tile fetch, in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Fail every n-th tile fetch
    #[arg(long, value_name = "N")]
    fail_every: Option<u64>,

    /// Colormap (viridis, inferno, greys, blues, reds, greens, rainbow)
    #[arg(long, default_value = "viridis")]
    colormap: ColorMap,

    /// Scale transform (linear, log, sqrt, squared, asinh, sinh, logexp)
    #[arg(long, default_value = "linear")]
    scale: ScaleType,

    /// Color interval (minmax, zscale, percentile-<n>)
    #[arg(long, default_value = "minmax")]
    interval: IntervalType,

    /// Surface pixels per data cell at zoom 1
    #[arg(long, default_value_t = 6.0)]
    cell_size: f64,

    /// Enable logging to specified file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Render headless and write PNG files to this directory
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Surface width in pixels for --export
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Surface height in pixels for --export
    #[arg(long, default_value_t = 400)]
    height: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging if --log option is provided
    if let Some(log_path) = &args.log {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        tracing::info!("Starting heatgrid");
    }

    let config = EngineConfig {
        cell_size: args.cell_size,
        ..EngineConfig::default()
    };
    config.validate()?;
    let color = ColorConfig {
        colormap: args.colormap,
        scale: args.scale,
        interval: args.interval,
    };

    let mut source = SyntheticSource::new(args.frames, args.indices, args.dims)
        .with_latency(Duration::from_millis(args.latency_ms));
    if let Some(n) = args.fail_every {
        source = source.with_fail_every(n);
    }
    let source = Arc::new(source);

    if let Some(dir) = &args.export {
        return export_headless(source, &config, color, dir, args.width, args.height);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let app = App::new(source, &config, color);
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {}", err);
    }

    tracing::info!("heatgrid exited");

    Ok(())
}

/// Render both views without a terminal and write them as PNG files.
fn export_headless(
    source: Arc<SyntheticSource>,
    config: &EngineConfig,
    color: ColorConfig,
    dir: &Path,
    width: u32,
    height: u32,
) -> Result<()> {
    let mut timeline = TimelineSurface::new(Arc::clone(&source), config, color);
    if !timeline.render_blocking(width, height, Duration::from_secs(30)) {
        eprintln!("Warning: some tiles did not load in time; exporting what is cached");
    }
    let mut paths = export_png(timeline.surfaces(), dir, "timeline")?;

    let mut frame_view = FrameSurface::new(source, config, color);
    if !frame_view.render_blocking(width, height, Duration::from_secs(30)) {
        eprintln!("Warning: the frame did not load in time; exporting a blank frame");
    }
    paths.extend(export_png(frame_view.surfaces(), dir, "frame")?);

    for path in &paths {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App<SyntheticSource>,
) -> Result<()> {
    loop {
        app.update(Instant::now());
        terminal.draw(|f| ui::draw(f, &mut app))?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match (key.modifiers, key.code) {
                    // Quit
                    (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(()),

                    (KeyModifiers::NONE, KeyCode::Tab) => app.switch_view(),
                    (KeyModifiers::NONE, KeyCode::Char('m')) => app.toggle_mode(),

                    // Zoom around the surface center
                    (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char('+'))
                    | (KeyModifiers::NONE, KeyCode::Char('=')) => app.zoom_in(),
                    (KeyModifiers::NONE, KeyCode::Char('-')) => app.zoom_out(),
                    (KeyModifiers::NONE, KeyCode::Char('0')) => app.reset_zoom(),

                    // Color
                    (KeyModifiers::NONE, KeyCode::Char('c')) => app.cycle_colormap(),
                    (KeyModifiers::NONE, KeyCode::Char('v')) => app.cycle_scale(),
                    (KeyModifiers::NONE, KeyCode::Char('i')) => app.cycle_interval(),

                    // Overlays
                    (KeyModifiers::NONE, KeyCode::Char('t')) => app.toggle_tooltips(),
                    (KeyModifiers::SHIFT, KeyCode::Char('L')) => app.toggle_legend(),
                    (KeyModifiers::SHIFT, KeyCode::Char('T')) => app.cycle_theme(),

                    (KeyModifiers::NONE, KeyCode::Char('e')) => app.export(),

                    // Frame view playback
                    (KeyModifiers::NONE, KeyCode::Char('[')) => app.step_frame(-1),
                    (KeyModifiers::NONE, KeyCode::Char(']')) => app.step_frame(1),
                    (KeyModifiers::NONE, KeyCode::Char('p')) => app.toggle_playback(),

                    // Nudge
                    (KeyModifiers::NONE, KeyCode::Up) | (KeyModifiers::NONE, KeyCode::Char('w')) => {
                        app.nudge(Nudge::Up)
                    },
                    (KeyModifiers::NONE, KeyCode::Down) | (KeyModifiers::NONE, KeyCode::Char('s')) => {
                        app.nudge(Nudge::Down)
                    },
                    (KeyModifiers::NONE, KeyCode::Left) | (KeyModifiers::NONE, KeyCode::Char('a')) => {
                        app.nudge(Nudge::Left)
                    },
                    (KeyModifiers::NONE, KeyCode::Right) | (KeyModifiers::NONE, KeyCode::Char('d')) => {
                        app.nudge(Nudge::Right)
                    },

                    _ => {},
                }
            },
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => {},
        }
    }
}
