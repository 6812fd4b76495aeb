use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use super::{CameraModelId, ColmapCamera, ColmapImage, ColmapModel};

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),
}

/// Read the cameras.txt file and return a vector of ColmapCamera structs.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
///
/// # Returns
///
/// A vector of ColmapCamera structs.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let reader = BufReader::new(File::open(path)?);

    // skip the comment header and blank lines, parse the rest
    let cameras = reader
        .lines()
        .filter(|line| {
            line.as_ref()
                .map_or(true, |l| !l.starts_with('#') && !l.trim().is_empty())
        })
        .map(|line| -> Result<ColmapCamera, ColmapError> {
            let line = line.map_err(ColmapError::from)?;
            parse_camera_line(&line)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cameras)
}

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// Every image takes two lines: the pose line and the 2D points line, which
/// is empty for images without observations.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
///
/// # Returns
///
/// A vector of ColmapImage structs.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let reader = BufReader::new(File::open(path)?);

    let images = reader
        .lines()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|chunk| match chunk {
            [pose_line, _points_line] => parse_image_line(pose_line),
            _ => Err(ColmapError::ParseError(
                "Invalid number of lines".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(images)
}

/// Read the `cameras.txt` and `images.txt` files of a sparse model directory.
///
/// # Arguments
///
/// * `model_dir` - Directory holding the text export of a sparse model.
pub fn read_model_txt(model_dir: impl AsRef<Path>) -> Result<ColmapModel, ColmapError> {
    let model_dir = model_dir.as_ref();
    Ok(ColmapModel {
        cameras: read_cameras_txt(model_dir.join("cameras.txt"))?,
        images: read_images_txt(model_dir.join("images.txt"))?,
    })
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

fn parse_array<const N: usize>(parts: &[&str], what: &str) -> Result<[f64; N], ColmapError> {
    parts
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ColmapError::ParseError(format!("Invalid number of {what} coordinates")))
}

/// Parse a camera line and return a ColmapCamera struct.
/// NOTE: The number of parameters depends on the camera model.
///       CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    // split the line into parts by whitespace
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model_id: parse_camera_model_id(parts[1])?,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params: parts[4..]
            .iter()
            .map(|s| parse_part(s))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn parse_camera_model_id(model_id: &str) -> Result<CameraModelId, ColmapError> {
    match model_id {
        "SIMPLE_PINHOLE" => Ok(CameraModelId::SimplePinhole),
        "PINHOLE" => Ok(CameraModelId::Pinhole),
        "SIMPLE_RADIAL" => Ok(CameraModelId::SimpleRadial),
        "RADIAL" => Ok(CameraModelId::Radial),
        "OPENCV" => Ok(CameraModelId::OpenCV),
        "OPENCV_FISHEYE" => Ok(CameraModelId::OpenCVFisheye),
        "FULL_OPENCV" => Ok(CameraModelId::FullOpenCV),
        "FOV" => Ok(CameraModelId::Fov),
        "SIMPLE_RADIAL_FISHEYE" => Ok(CameraModelId::SimpleRadialFisheye),
        "RADIAL_FISHEYE" => Ok(CameraModelId::RadialFisheye),
        "THIN_PRISM_FISHEYE" => Ok(CameraModelId::ThinPrismFisheye),
        _ => Err(ColmapError::ParseError(format!(
            "Invalid camera model id: {}",
            model_id
        ))),
    }
}

/// Parse an image line and return a ColmapImage struct.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
fn parse_image_line(line: &str) -> Result<ColmapImage, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    Ok(ColmapImage {
        image_id: parse_part(parts[0])?,
        rotation: parse_array(&parts[1..5], "rotation")?,
        translation: parse_array(&parts[5..8], "translation")?,
        camera_id: parse_part(parts[8])?,
        // names may contain spaces
        name: parts[9..].join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CAMERAS_TXT: &str = "\
# Camera list with one line of data per camera:
#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]
# Number of cameras: 1
1 OPENCV 640 480 500.0 505.0 320.0 240.0 0.01 -0.02 0.001 0.0005
";

    const IMAGES_TXT: &str = "\
# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
#   POINTS2D[] as (X, Y, POINT3D_ID)
# Number of images: 2, mean observations per image: 1
1 1.0 0.0 0.0 0.0 0.1 0.2 0.3 1 frame_00001.png
100.0 200.0 5
2 0.7071067811865476 0.0 0.7071067811865476 0.0 -1.0 0.0 2.0 1 frame_00002.png

";

    #[test]
    fn test_read_model_txt() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        File::create(tmp_dir.path().join("cameras.txt"))?.write_all(CAMERAS_TXT.as_bytes())?;
        File::create(tmp_dir.path().join("images.txt"))?.write_all(IMAGES_TXT.as_bytes())?;

        let model = read_model_txt(tmp_dir.path())?;

        assert_eq!(model.cameras.len(), 1);
        let camera = model.camera(1).ok_or("missing camera")?;
        assert_eq!(camera.model_id, CameraModelId::OpenCV);
        assert_eq!((camera.width, camera.height), (640, 480));
        assert_eq!(camera.params.len(), 8);

        assert_eq!(model.images.len(), 2);
        assert_eq!(model.images[0].name, "frame_00001.png");
        assert_eq!(model.images[0].translation, [0.1, 0.2, 0.3]);
        assert_eq!(model.images[1].image_id, 2);
        assert_eq!(model.images[1].name, "frame_00002.png");
        Ok(())
    }

    #[test]
    fn test_parse_image_line_too_short() {
        assert!(matches!(
            parse_image_line("1 1.0 0.0 0.0"),
            Err(ColmapError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_camera_model_unknown() {
        assert!(parse_camera_line("1 MYSTERY 640 480 1.0").is_err());
    }
}
