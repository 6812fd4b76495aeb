use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use rayon::prelude::*;

use crate::error::IoError;

/// Image extensions accepted from an image folder, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// JPEG quality used when images are re-encoded.
pub const JPEG_QUALITY: u8 = 95;

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(true, |name| name.starts_with('.'))
}

fn read_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !dir.is_dir() {
        return Err(IoError::FileDoesNotExist(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// List the images of a folder, sorted by file name.
///
/// Hidden files and files without an image extension are skipped.
///
/// # Arguments
///
/// * `dir` - The folder to list.
///
/// # Returns
///
/// The image paths.
pub fn list_images(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, IoError> {
    let mut images = read_files(dir.as_ref())?
        .into_iter()
        .filter(|p| has_image_extension(p))
        .collect::<Vec<_>>();
    images.sort();
    Ok(images)
}

/// List the images of a folder whose stem is a frame number, sorted numerically.
///
/// Capture apps name frames `0.jpg`, `1.jpg`, ...; copies such as `12(1).jpg`
/// are skipped.
pub fn list_numbered_images(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, IoError> {
    let mut numbered = read_files(dir.as_ref())?
        .into_iter()
        .filter(|p| has_image_extension(p))
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?;
            if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let number = stem.parse::<u64>().ok()?;
            Some((number, p))
        })
        .collect::<Vec<_>>();
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

/// The dataset file name of the `number`-th frame, 1-indexed.
///
/// Example:
///
/// ```
/// use nerfprep_io::images::frame_file_name;
///
/// assert_eq!(frame_file_name(1, Some("jpg")), "frame_00001.jpg");
/// assert_eq!(frame_file_name(123, None), "frame_00123");
/// ```
pub fn frame_file_name(number: usize, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("frame_{number:05}.{ext}"),
        None => format!("frame_{number:05}"),
    }
}

/// Copy images into `image_dir` as `frame_00001.<ext>`, `frame_00002.<ext>`, ...
///
/// The destination folder is cleared first when there is something to copy.
///
/// # Arguments
///
/// * `image_paths` - The images to copy, in dataset order.
/// * `image_dir` - The destination folder.
///
/// # Returns
///
/// The paths of the copies.
pub fn copy_images(
    image_paths: &[PathBuf],
    image_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, IoError> {
    let image_dir = image_dir.as_ref();

    if !image_paths.is_empty() && image_dir.is_dir() {
        std::fs::remove_dir_all(image_dir)?;
    }
    std::fs::create_dir_all(image_dir)?;

    let mut copied = Vec::with_capacity(image_paths.len());
    for (idx, image_path) in image_paths.iter().enumerate() {
        log::debug!("Copying image {} of {}...", idx + 1, image_paths.len());
        let extension = image_path.extension().and_then(|ext| ext.to_str());
        let copied_path = image_dir.join(frame_file_name(idx + 1, extension));
        std::fs::copy(image_path, &copied_path)?;
        copied.push(copied_path);
    }

    if copied.is_empty() {
        log::warn!("No usable images in the data folder.");
    } else {
        log::info!("Done copying images.");
    }

    Ok(copied)
}

/// Decode an image from disk.
pub fn read_image(path: impl AsRef<Path>) -> Result<DynamicImage, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }
    Ok(image::open(path)?)
}

/// Encode an image to disk, the format follows the file extension.
///
/// JPEG files are written with [`JPEG_QUALITY`].
pub fn write_image(path: impl AsRef<Path>, image: &DynamicImage) -> Result<(), IoError> {
    let path = path.as_ref();
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    if is_jpeg {
        let mut writer = BufWriter::new(File::create(path)?);
        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        // jpeg has no alpha channel
        if image.color().has_alpha() {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        } else {
            image.write_with_encoder(encoder)?;
        }
    } else {
        image.save(path)?;
    }

    Ok(())
}

/// Crop `margin` pixels from every border of the images, in place.
///
/// Images are processed in parallel.
pub fn crop_images(image_paths: &[PathBuf], margin: u32) -> Result<(), IoError> {
    if margin == 0 {
        return Ok(());
    }

    image_paths.par_iter().try_for_each(|path| {
        let image = read_image(path)?;
        let (width, height) = (image.width(), image.height());
        let crop = 2 * u64::from(margin);
        if crop >= u64::from(width) || crop >= u64::from(height) {
            return Err(IoError::CropTooLarge {
                path: path.clone(),
                margin,
                width,
                height,
            });
        }
        let cropped = image.crop_imm(margin, margin, width - 2 * margin, height - 2 * margin);
        write_image(path, &cropped)
    })
}
