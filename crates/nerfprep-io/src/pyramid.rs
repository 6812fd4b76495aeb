use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use rayon::prelude::*;

use crate::{
    error::IoError,
    images::{list_images, read_image, write_image},
};

/// The downscale factors `2, 4, ..., 2^num_downscales`.
pub fn downscale_factors(num_downscales: u32) -> Vec<u32> {
    (1..=num_downscales).map(|i| 1u32 << i).collect()
}

/// Name of the folder holding the images downscaled by `factor`.
pub fn downscale_dir_name(factor: u32) -> String {
    format!("images_{factor}")
}

/// Size of a tier image, integer division keeping at least one pixel.
pub fn downscaled_size(width: u32, height: u32, factor: u32) -> (u32, u32) {
    ((width / factor).max(1), (height / factor).max(1))
}

/// Build the downscaled tiers of the images in `image_dir`.
///
/// For every factor `2^i`, `i in 1..=num_downscales`, a sibling folder
/// `images_{2^i}` receives every image of `image_dir` under the same name.
/// Each base image is decoded once and every tier is resized from it.
///
/// # Arguments
///
/// * `image_dir` - The folder with the base images.
/// * `num_downscales` - Number of tiers, zero builds nothing.
///
/// # Returns
///
/// The tier folders, smallest factor first.
pub fn build_pyramid(
    image_dir: impl AsRef<Path>,
    num_downscales: u32,
) -> Result<Vec<PathBuf>, IoError> {
    let image_dir = image_dir.as_ref();
    if num_downscales == 0 {
        return Ok(Vec::new());
    }

    let root = image_dir.parent().unwrap_or_else(|| Path::new(""));
    let factors = downscale_factors(num_downscales);
    let tier_dirs = factors
        .iter()
        .map(|factor| root.join(downscale_dir_name(*factor)))
        .collect::<Vec<_>>();
    for dir in tier_dirs.iter() {
        std::fs::create_dir_all(dir)?;
    }

    let images = list_images(image_dir)?;
    images.par_iter().try_for_each(|path| -> Result<(), IoError> {
        let base = read_image(path)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| IoError::FileDoesNotExist(path.clone()))?;
        for (factor, dir) in factors.iter().zip(tier_dirs.iter()) {
            let (width, height) = downscaled_size(base.width(), base.height(), *factor);
            let resized = base.resize_exact(width, height, FilterType::CatmullRom);
            write_image(dir.join(file_name), &resized)?;
        }
        Ok(())
    })?;

    log::info!("Done downscaling images.");

    Ok(tier_dirs)
}

/// Human readable description of the pyramid, e.g.
/// `We downsampled the images by 2x, 4x and 8x`.
pub fn downscale_summary(num_downscales: u32) -> String {
    let factors = downscale_factors(num_downscales)
        .iter()
        .map(|f| format!("{f}x"))
        .collect::<Vec<_>>();

    match factors.split_last() {
        None => "No downscaling performed.".to_string(),
        Some((last, [])) => format!("We downsampled the images by {last}"),
        Some((last, rest)) => {
            format!("We downsampled the images by {} and {last}", rest.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    #[test]
    fn test_downscale_summary() {
        assert_eq!(downscale_summary(0), "No downscaling performed.");
        assert_eq!(downscale_summary(1), "We downsampled the images by 2x");
        assert_eq!(
            downscale_summary(3),
            "We downsampled the images by 2x, 4x and 8x"
        );
    }

    #[test]
    fn test_downscaled_size() {
        assert_eq!(downscaled_size(1890, 1050, 2), (945, 525));
        assert_eq!(downscaled_size(1890, 1050, 8), (236, 131));
        assert_eq!(downscaled_size(5, 3, 8), (1, 1));
    }

    #[test]
    fn test_build_pyramid_naming() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let image_dir = tmp_dir.path().join("images");
        std::fs::create_dir_all(&image_dir)?;
        for i in 1..=10 {
            RgbImage::new(17, 9).save(image_dir.join(format!("frame_{i:05}.png")))?;
        }

        let tiers = build_pyramid(&image_dir, 2)?;
        assert_eq!(
            tiers,
            vec![tmp_dir.path().join("images_2"), tmp_dir.path().join("images_4")]
        );

        let base_names = list_images(&image_dir)?
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect::<Vec<_>>();
        assert_eq!(base_names.len(), 10);
        for (tier, expected_size) in tiers.iter().zip([(8, 4), (4, 2)]) {
            let tier_images = list_images(tier)?;
            let names = tier_images
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
                .collect::<Vec<_>>();
            assert_eq!(names, base_names);
            assert_eq!(read_image(&tier_images[0])?.dimensions(), expected_size);
        }
        assert!(!tmp_dir.path().join("images_8").exists());
        Ok(())
    }

    #[test]
    fn test_build_pyramid_noop() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let image_dir = tmp_dir.path().join("images");
        std::fs::create_dir_all(&image_dir)?;
        assert!(build_pyramid(&image_dir, 0)?.is_empty());
        assert!(!tmp_dir.path().join("images_2").exists());
        Ok(())
    }
}
