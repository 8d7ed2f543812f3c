use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use greyline::refresh::{RefreshEvent, RefreshWorker};
use greyline::settings::{self, GreylineSettings};
use greyline::wallpaper::{self, PostRenderHook, StyleMode};
use greyline::{GreylineCompositor, RenderJob, SystemClock, logging};

#[derive(Parser, Debug)]
#[command(name = "greyline", version, about = "Render a day/night greyline world map")]
struct Cli {
    /// UTC hour of the day (e.g. 13.5); defaults to the current time
    #[arg(long)]
    hour: Option<f64>,

    /// Set the render as the desktop background
    #[arg(long)]
    set_wallpaper: bool,

    /// How the desktop fits the render
    #[arg(long, value_enum)]
    style: Option<StyleMode>,

    /// Settings file to use instead of the per-user one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,

    /// Keep running and re-render every SECS seconds
    #[arg(long, value_name = "SECS")]
    every: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_to_settings(&self, settings: &mut GreylineSettings) {
        if self.set_wallpaper {
            settings.set_wallpaper = true;
        }
        if let Some(style) = self.style {
            settings.wallpaper_style = style;
        }
        if let Some(secs) = self.every {
            settings.refresh_interval_secs = Some(secs);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_subscriber(cli.verbose)?;

    let mut settings = match &cli.config {
        Some(path) => settings::load_from(path),
        None => settings::load(),
    };
    cli.apply_to_settings(&mut settings);

    if cli.save_config {
        let path = match &cli.config {
            Some(path) => {
                settings::save_to(&settings, path)?;
                path.clone()
            }
            None => settings::save(&settings)?,
        };
        info!(path = %path.display(), "saved settings");
    }

    let base = settings.base_dir()?;
    let job = RenderJob::from_settings(&settings, &base).with_hour(cli.hour);
    let hook = wallpaper::desktop_hook(&settings);
    let compositor = GreylineCompositor::new(SystemClock);

    match settings.refresh_interval_secs.filter(|secs| *secs > 0) {
        Some(secs) => run_refresh(job, compositor, hook, Duration::from_secs(secs)),
        None => {
            job.run(&compositor, hook.as_deref())
                .context("greyline render failed")?;
            Ok(())
        }
    }
}

fn run_refresh(
    job: RenderJob,
    compositor: GreylineCompositor<SystemClock>,
    hook: Option<Box<dyn PostRenderHook>>,
    interval: Duration,
) -> Result<()> {
    if let Some(hour) = job.hour {
        warn!(hour, "refreshing with a fixed hour renders the same map every time");
    }
    info!(interval_secs = interval.as_secs(), "refreshing greyline map");
    let worker = RefreshWorker::start(job, compositor, hook, interval);
    while let Some(event) = worker.next_event() {
        match event {
            RefreshEvent::Rendered(path) => debug!(path = %path.display(), "refresh complete"),
            RefreshEvent::Error(message) => debug!(%message, "refresh failed, retrying next interval"),
        }
    }
    worker.stop();
    Ok(())
}
