//! Desktop background hooks run after a successful render.

use std::io;
use std::path::{self, Component, Path};
use std::process::{Child, Command};
use std::thread;

use tracing::{info, warn};

use crate::error::GreylineError;
use crate::settings::GreylineSettings;

/// How the desktop should fit the rendered map.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
pub enum StyleMode {
    Fill,
    Fit,
    Stretch,
    Tile,
    Center,
    Span,
}

impl Default for StyleMode {
    fn default() -> Self {
        // A world map should never be cropped.
        StyleMode::Fit
    }
}

impl StyleMode {
    /// Value for `org.gnome.desktop.background picture-options`.
    pub fn gnome_option(&self) -> &'static str {
        match self {
            StyleMode::Fill => "zoom",
            StyleMode::Fit => "scaled",
            StyleMode::Stretch => "stretched",
            StyleMode::Tile => "wallpaper",
            StyleMode::Center => "centered",
            StyleMode::Span => "spanned",
        }
    }

    /// `(WallpaperStyle, TileWallpaper)` registry values used by Windows.
    pub fn windows_values(&self) -> (&'static str, &'static str) {
        match self {
            StyleMode::Fill => ("10", "0"),
            StyleMode::Fit => ("6", "0"),
            StyleMode::Stretch => ("2", "0"),
            StyleMode::Tile => ("0", "1"),
            StyleMode::Center => ("0", "0"),
            StyleMode::Span => ("22", "0"),
        }
    }
}

/// Callback invoked with the written composite.
pub trait PostRenderHook: Send {
    fn name(&self) -> &'static str;

    fn apply(&self, image_path: &Path) -> Result<(), GreylineError>;
}

/// Run `hook`, logging failures instead of returning them.
///
/// The render has already succeeded by the time a hook runs.
pub fn run_hook(hook: &dyn PostRenderHook, image_path: &Path) {
    match hook.apply(image_path) {
        Ok(()) => info!(hook = hook.name(), path = %image_path.display(), "desktop background updated"),
        Err(err) => warn!(hook = hook.name(), error = %err, "desktop background hook failed"),
    }
}

const GSETTINGS: &str = "gsettings";
const GNOME_BACKGROUND_SCHEMA: &str = "org.gnome.desktop.background";

/// GNOME background setter backed by `gsettings`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GnomeBackground {
    pub style: StyleMode,
}

impl GnomeBackground {
    pub fn new(style: StyleMode) -> Self {
        Self { style }
    }

    /// `gsettings` argument lists issued for `image_path`.
    pub fn commands(&self, image_path: &Path) -> Vec<[String; 4]> {
        let uri = file_uri(image_path);
        [
            ("picture-uri", uri.as_str()),
            ("picture-uri-dark", uri.as_str()),
            ("picture-options", self.style.gnome_option()),
        ]
        .into_iter()
        .map(|(key, value)| {
            [
                "set".to_string(),
                GNOME_BACKGROUND_SCHEMA.to_string(),
                key.to_string(),
                value.to_string(),
            ]
        })
        .collect()
    }
}

impl PostRenderHook for GnomeBackground {
    fn name(&self) -> &'static str {
        GSETTINGS
    }

    fn apply(&self, image_path: &Path) -> Result<(), GreylineError> {
        let commands = self.commands(image_path).into_iter().map(|args| {
            let mut command = Command::new(GSETTINGS);
            command.args(args);
            command
        });
        let (children, failure) = spawn_each(commands);
        reap_detached(children);
        match failure {
            Some(source) => Err(GreylineError::ExternalHook {
                tool: GSETTINGS,
                source,
            }),
            None => Ok(()),
        }
    }
}

/// Spawn `commands` in order, stopping at the first that fails to start.
///
/// Children started before the failure are returned alongside the error.
fn spawn_each(commands: impl IntoIterator<Item = Command>) -> (Vec<Child>, Option<io::Error>) {
    let mut children = Vec::new();
    for mut command in commands {
        match command.spawn() {
            Ok(child) => children.push(child),
            Err(err) => return (children, Some(err)),
        }
    }
    (children, None)
}

/// Wait for spawned tools off-thread so they do not linger as zombies.
fn reap_detached(children: Vec<Child>) {
    if children.is_empty() {
        return;
    }
    thread::spawn(move || {
        for mut child in children {
            let _ = child.wait();
        }
    });
}

/// `file://` URI for `image_path` with every segment percent-encoded.
fn file_uri(image_path: &Path) -> String {
    let absolute = path::absolute(image_path).unwrap_or_else(|_| image_path.to_path_buf());
    let mut uri = String::from("file://");
    for component in absolute.components() {
        match component {
            Component::Normal(segment) => {
                uri.push('/');
                uri.push_str(&urlencoding::encode_binary(segment.as_encoded_bytes()));
            }
            Component::Prefix(prefix) => {
                uri.push('/');
                uri.push_str(&prefix.as_os_str().to_string_lossy());
            }
            Component::ParentDir => uri.push_str("/.."),
            Component::RootDir | Component::CurDir => {}
        }
    }
    uri
}

#[cfg(windows)]
pub use windows_background::WindowsBackground;

#[cfg(windows)]
mod windows_background {
    use std::ffi::OsStr;
    use std::io;
    use std::os::windows::ffi::OsStrExt;
    use std::path::{self, Path};

    use windows::Win32::UI::WindowsAndMessaging::{
        SPI_SETDESKWALLPAPER, SPIF_SENDCHANGE, SPIF_UPDATEINIFILE, SystemParametersInfoW,
    };
    use winreg::RegKey;
    use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};

    use super::{PostRenderHook, StyleMode};
    use crate::error::GreylineError;

    const TOOL: &str = "SystemParametersInfoW";

    /// Windows background setter using the user registry and `SystemParametersInfoW`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WindowsBackground {
        pub style: StyleMode,
    }

    impl WindowsBackground {
        pub fn new(style: StyleMode) -> Self {
            Self { style }
        }
    }

    impl PostRenderHook for WindowsBackground {
        fn name(&self) -> &'static str {
            TOOL
        }

        fn apply(&self, image_path: &Path) -> Result<(), GreylineError> {
            let hook_error = |source: io::Error| GreylineError::ExternalHook { tool: TOOL, source };
            set_wallpaper_style(self.style).map_err(hook_error)?;
            let absolute = path::absolute(image_path).map_err(hook_error)?;
            let wide_path = to_wide_null(&absolute);
            unsafe {
                SystemParametersInfoW(
                    SPI_SETDESKWALLPAPER,
                    0,
                    Some(wide_path.as_ptr() as *mut _),
                    SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
                )
            }
            .map_err(|err| hook_error(io::Error::other(err.to_string())))
        }
    }

    fn set_wallpaper_style(mode: StyleMode) -> io::Result<()> {
        let (style, tile) = mode.windows_values();
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let desktop = hkcu.open_subkey_with_flags("Control Panel\\Desktop", KEY_SET_VALUE)?;
        desktop.set_value("WallpaperStyle", &style)?;
        desktop.set_value("TileWallpaper", &tile)?;
        Ok(())
    }

    fn to_wide_null(path: &Path) -> Vec<u16> {
        OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }
}

/// The background setter for the current platform.
pub fn platform_hook(style: StyleMode) -> Box<dyn PostRenderHook> {
    #[cfg(windows)]
    {
        Box::new(WindowsBackground::new(style))
    }
    #[cfg(not(windows))]
    {
        Box::new(GnomeBackground::new(style))
    }
}

/// The desktop hook requested by `settings`, if any.
pub fn desktop_hook(settings: &GreylineSettings) -> Option<Box<dyn PostRenderHook>> {
    settings
        .set_wallpaper
        .then(|| platform_hook(settings.wallpaper_style))
}
