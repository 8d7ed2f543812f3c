//! One render invocation: load inputs, composite, persist, run the hook.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::compositor::GreylineCompositor;
use crate::error::GreylineError;
use crate::image_ops::{is_lossy, load_image, load_watermark, resolve_path, save_image};
use crate::settings::GreylineSettings;
use crate::wallpaper::{PostRenderHook, run_hook};
use crate::watermark::WatermarkPlacement;

/// Watermark file and where to put it.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSource {
    pub path: PathBuf,
    pub placement: WatermarkPlacement,
}

/// Fully resolved inputs of a single render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub day: PathBuf,
    pub night: PathBuf,
    pub mask: PathBuf,
    pub output: PathBuf,
    pub watermark: Option<WatermarkSource>,
    /// Explicit hour; the compositor's clock is used when absent.
    pub hour: Option<f64>,
}

impl RenderJob {
    /// Build a job from settings, resolving relative names against `base`.
    pub fn from_settings(settings: &GreylineSettings, base: &Path) -> Self {
        let watermark = settings.watermark.as_ref().map(|setting| WatermarkSource {
            path: resolve_path(base, &setting.path),
            placement: setting.placement(),
        });
        Self {
            day: resolve_path(base, &settings.day),
            night: resolve_path(base, &settings.night),
            mask: resolve_path(base, &settings.mask),
            output: resolve_path(base, &settings.output),
            watermark,
            hour: None,
        }
    }

    pub fn with_hour(mut self, hour: Option<f64>) -> Self {
        self.hour = hour;
        self
    }

    /// Render and write the composite, then hand the output to `hook`.
    ///
    /// Every input is decoded before anything is written; a hook failure is
    /// logged and does not fail the render.
    pub fn run<C: Clock>(
        &self,
        compositor: &GreylineCompositor<C>,
        hook: Option<&dyn PostRenderHook>,
    ) -> Result<PathBuf, GreylineError> {
        let day = load_image(&self.day)?;
        let night = load_image(&self.night)?;
        if is_lossy(&self.mask) {
            warn!(mask = %self.mask.display(), "lossy mask format, terminator edges may band");
        }
        let mask = load_image(&self.mask)?;
        let watermark = self
            .watermark
            .as_ref()
            .map(|source| load_watermark(&source.path, source.placement))
            .transpose()?;

        let hour = compositor.resolve_hour(self.hour);
        let image = compositor.render(&day, &night, &mask, Some(hour), watermark.as_ref())?;
        save_image(&image, &self.output)?;
        info!(output = %self.output.display(), hour, "rendered greyline composite");

        if let Some(hook) = hook {
            run_hook(hook, &self.output);
        }
        Ok(self.output.clone())
    }
}
