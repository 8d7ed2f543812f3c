//! Greyline map renderer.
//!
//! Blends a daytime and a nighttime world map along a terminator mask that is
//! rotated according to the UTC hour, optionally pastes a callsign overlay,
//! and can hand the result to the desktop background.

pub mod clock;
pub mod compositor;
pub mod error;
pub mod image_ops;
pub mod job;
pub mod logging;
pub mod refresh;
pub mod settings;
pub mod wallpaper;
pub mod watermark;

pub use clock::{Clock, FixedClock, SystemClock, hour_of_day};
pub use compositor::{GreylineCompositor, mask_shift, offset_mask, render_composite};
pub use error::GreylineError;
pub use job::{RenderJob, WatermarkSource};
pub use wallpaper::{PostRenderHook, StyleMode};
pub use watermark::{Watermark, WatermarkPlacement};
