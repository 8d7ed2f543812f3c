//! Loading render inputs and persisting the composite.

use std::ffi::OsStr;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::GreylineError;
use crate::watermark::{Watermark, WatermarkPlacement};

/// Resolve `name` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, name: impl AsRef<Path>) -> PathBuf {
    let name = name.as_ref();
    if name.is_absolute() {
        name.to_path_buf()
    } else {
        base.join(name)
    }
}

/// Return true when the file extension is a supported image type.
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) => matches!(
            ext.to_ascii_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "tif" | "tiff" | "webp"
        ),
        None => false,
    }
}

/// Return true for formats that cannot preserve exact mask values.
pub fn is_lossy(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("jpg" | "jpeg")
    )
}

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, GreylineError> {
    let image = image::open(path).map_err(|source| GreylineError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded image");
    Ok(image)
}

/// Decode a watermark and attach its placement.
pub fn load_watermark(
    path: &Path,
    placement: WatermarkPlacement,
) -> Result<Watermark, GreylineError> {
    let image = load_image(path)?;
    Ok(Watermark::new(image.to_rgba8(), placement))
}

/// Encode `image` in the format implied by `path` and write it atomically.
///
/// The encoded bytes land in a uniquely named hidden sibling file first and
/// are renamed over `path`, so a failed or concurrent write never leaves a
/// truncated output behind.
pub fn save_image(image: &DynamicImage, path: &Path) -> Result<(), GreylineError> {
    let encode_error = |reason: String| GreylineError::Encode {
        path: path.to_path_buf(),
        reason,
    };

    if !is_supported_image(path) {
        return Err(encode_error("unsupported output format".to_string()));
    }
    let format = ImageFormat::from_path(path).map_err(|err| encode_error(err.to_string()))?;
    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, format)
        .map_err(|err| encode_error(err.to_string()))?;

    let mut staging = staging_file(path).map_err(|err| encode_error(err.to_string()))?;
    staging
        .write_all(encoded.get_ref())
        .map_err(|err| encode_error(err.to_string()))?;
    staging
        .persist(path)
        .map_err(|err| encode_error(err.error.to_string()))?;
    debug!(path = %path.display(), bytes = encoded.get_ref().len(), "wrote composite");
    Ok(())
}

/// Temporary file next to `path`; removed on drop unless persisted.
fn staging_file(path: &Path) -> std::io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "render".to_string());
    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
}
