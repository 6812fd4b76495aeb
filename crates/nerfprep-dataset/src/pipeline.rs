use std::path::{Path, PathBuf};

use nerfprep_3d::{
    camera::{CameraModel, Intrinsics},
    io::{
        colmap::read_model_txt, opensfm::read_reconstruction_json, polycam::read_camera_json,
        record3d::read_metadata_json,
    },
};
use nerfprep_io::{
    images::{copy_images, crop_images, list_images, list_numbered_images},
    pyramid::{build_pyramid, downscale_summary},
    sfm::{run_colmap, run_opensfm, ColmapOptions, MatchingMethod, SfmMethod},
    video::{extract_insta360_frames, extract_video_frames, insta360_filenames, FrameExtraction},
};

use crate::{
    assemble::{assemble_dataset, normalize_poses, IMAGE_DIR_NAME},
    backend::{
        colmap_capture, opensfm_capture, polycam_capture, record3d_capture, Backend, RawCapture,
        RawFrame,
    },
    descriptor::write_dataset,
    error::DatasetError,
    filter::filter_by_blur,
    report::{Level, Reporter},
    sampler::sample_indices,
    summary::{matching_summary, Summary},
};

/// Pose solver options shared by the image, video and Insta360 pipelines.
#[derive(Debug, Clone)]
pub struct SfmParams {
    /// Camera model of the images.
    pub camera_type: CameraModel,
    /// Structure-from-motion engine.
    pub sfm_method: SfmMethod,
    /// Feature matching strategy of COLMAP.
    pub matching_method: MatchingMethod,
    /// Vocabulary tree file for [`MatchingMethod::VocabTree`].
    pub vocab_tree_path: Option<PathBuf>,
    /// The OpenSfM checkout, required to run OpenSfM.
    pub opensfm_dir: Option<PathBuf>,
    /// Reuse the reconstruction already in the output folder.
    pub skip_colmap: bool,
    /// How to call the COLMAP executable.
    pub colmap_cmd: String,
    /// Use the GPU for COLMAP.
    pub gpu: bool,
}

impl Default for SfmParams {
    fn default() -> Self {
        Self {
            camera_type: CameraModel::Perspective,
            sfm_method: SfmMethod::default(),
            matching_method: MatchingMethod::default(),
            vocab_tree_path: None,
            opensfm_dir: None,
            skip_colmap: false,
            colmap_cmd: "colmap".to_string(),
            gpu: true,
        }
    }
}

impl SfmParams {
    fn colmap_options(&self) -> ColmapOptions {
        ColmapOptions {
            colmap_cmd: self.colmap_cmd.clone(),
            gpu: self.gpu,
            matching_method: self.matching_method,
            vocab_tree_path: self.vocab_tree_path.clone(),
        }
    }
}

/// Parameters of [`process_images`].
#[derive(Debug, Clone)]
pub struct ImagesParams {
    /// Number of pyramid tiers.
    pub num_downscales: u32,
    /// Pose solver options.
    pub sfm: SfmParams,
}

impl Default for ImagesParams {
    fn default() -> Self {
        Self {
            num_downscales: 3,
            sfm: SfmParams::default(),
        }
    }
}

/// Parameters of [`process_video`].
#[derive(Debug, Clone)]
pub struct VideoParams {
    /// Approximate number of frames to extract.
    pub num_frames_target: usize,
    /// Number of pyramid tiers.
    pub num_downscales: u32,
    /// Pose solver options.
    pub sfm: SfmParams,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            num_frames_target: 150,
            num_downscales: 3,
            sfm: SfmParams::default(),
        }
    }
}

/// Parameters of [`process_insta360`].
///
/// The frames are always posed with OpenSfM as equirectangular images, so
/// `sfm.sfm_method` and `sfm.camera_type` are ignored.
#[derive(Debug, Clone)]
pub struct Insta360Params {
    /// Approximate number of frames to extract over both lenses.
    pub num_frames_target: usize,
    /// Number of pyramid tiers.
    pub num_downscales: u32,
    /// Pose solver options.
    pub sfm: SfmParams,
}

impl Default for Insta360Params {
    fn default() -> Self {
        Self {
            num_frames_target: 400,
            num_downscales: 3,
            sfm: SfmParams::default(),
        }
    }
}

/// Parameters of [`process_record3d`].
#[derive(Debug, Clone)]
pub struct Record3dParams {
    /// Number of pyramid tiers.
    pub num_downscales: u32,
    /// Maximum number of frames, `-1` for all of them.
    pub max_dataset_size: i64,
}

impl Default for Record3dParams {
    fn default() -> Self {
        Self {
            num_downscales: 3,
            max_dataset_size: 300,
        }
    }
}

/// Parameters of [`process_polycam`].
#[derive(Debug, Clone)]
pub struct PolycamParams {
    /// Number of pyramid tiers.
    pub num_downscales: u32,
    /// Use the raw keyframes instead of the corrected ones.
    pub use_uncorrected_images: bool,
    /// Maximum number of frames, `-1` for all of them.
    pub max_dataset_size: i64,
    /// Frames with a lower blur score are dropped, zero keeps every frame.
    pub min_blur_score: f64,
    /// Pixels cropped from every border of the corrected images.
    pub crop_border_pixels: u32,
}

impl Default for PolycamParams {
    fn default() -> Self {
        Self {
            num_downscales: 3,
            use_uncorrected_images: false,
            max_dataset_size: 600,
            min_blur_score: 25.0,
            crop_border_pixels: 15,
        }
    }
}

/// The result of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The lines reported at the end of the run.
    pub summary: Summary,
    /// The descriptor, `None` when no reconstruction was found.
    pub descriptor: Option<PathBuf>,
    /// Number of frames in the descriptor.
    pub num_frames: usize,
}

fn prepare_image_dir(output_dir: &Path) -> Result<PathBuf, DatasetError> {
    let image_dir = output_dir.join(IMAGE_DIR_NAME);
    std::fs::create_dir_all(&image_dir)?;
    Ok(image_dir)
}

fn require_dir(dir: &Path) -> Result<(), DatasetError> {
    if !dir.is_dir() {
        return Err(DatasetError::MissingInput(format!(
            "{} doesn't exist",
            dir.display()
        )));
    }
    Ok(())
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

fn dataset_size_hint(max_dataset_size: i64) -> String {
    format!(
        "To change the size of the dataset add the argument --max-dataset-size to larger than \
         the current value ({max_dataset_size}), or -1 to use all images."
    )
}

/// Build the pyramid while the poses are normalized, then write the descriptor.
///
/// # Returns
///
/// The descriptor path and its number of frames.
fn write_posed_dataset(
    backend: Backend,
    intrinsics: Intrinsics,
    frames: &[RawFrame],
    output_dir: &Path,
    num_downscales: u32,
    reporter: &dyn Reporter,
    summary: &mut Summary,
) -> Result<(PathBuf, usize), DatasetError> {
    let image_dir = output_dir.join(IMAGE_DIR_NAME);

    let (pyramid, normalized) = rayon::join(
        || build_pyramid(&image_dir, num_downscales),
        || normalize_poses(frames, reporter),
    );
    pyramid?;
    summary.push(downscale_summary(num_downscales));

    if normalized.num_invalid > 0 {
        summary.push_at(
            Level::Warn,
            format!("Skipped {} frames without a valid pose.", normalized.num_invalid),
        );
    }

    let dataset = assemble_dataset(intrinsics, normalized.frames, backend.orientation_override())?;
    let path = write_dataset(&dataset, output_dir)?;
    reporter.info(&format!("Saved {}", path.display()));

    Ok((path, dataset.frames.len()))
}

/// Run the pose solver of `backend` on `images/`, or reuse its previous results.
fn solve_poses(
    backend: Backend,
    output_dir: &Path,
    camera_model: CameraModel,
    sfm: &SfmParams,
) -> Result<Option<RawCapture>, DatasetError> {
    let image_dir = output_dir.join(IMAGE_DIR_NAME);
    let sfm_method = backend.sfm_method().unwrap_or(sfm.sfm_method);

    match sfm_method {
        SfmMethod::Colmap => {
            let colmap_dir = output_dir.join("colmap");
            let model_dir = colmap_dir.join("sparse").join("0");
            if !sfm.skip_colmap {
                run_colmap(&image_dir, &colmap_dir, camera_model, &sfm.colmap_options())?;
            }
            if !model_dir.join("cameras.txt").exists() {
                return Ok(None);
            }
            let model = read_model_txt(&model_dir)?;
            Ok(Some(colmap_capture(&model)?))
        }
        SfmMethod::OpenSfm => {
            let opensfm_dir = output_dir.join("opensfm");
            let reconstruction = opensfm_dir.join("reconstruction.json");
            if !sfm.skip_colmap {
                let install = sfm.opensfm_dir.as_deref().ok_or_else(|| {
                    DatasetError::MissingInput("OpenSfM requires --opensfm-dir".to_string())
                })?;
                run_opensfm(&image_dir, &opensfm_dir, camera_model, install)?;
            }
            if !reconstruction.exists() {
                return Ok(None);
            }
            let reconstructions = read_reconstruction_json(&reconstruction)?;
            Ok(Some(opensfm_capture(&reconstructions)?))
        }
    }
}

/// Pose the extracted images with a structure-from-motion engine and write the dataset.
fn process_with_sfm(
    backend: Backend,
    output_dir: &Path,
    num_initial: usize,
    num_downscales: u32,
    sfm: &SfmParams,
    reporter: &dyn Reporter,
    mut summary: Summary,
) -> Result<RunOutcome, DatasetError> {
    let camera_model = backend.camera_model(sfm.camera_type);
    let solver = backend.sfm_method().unwrap_or(sfm.sfm_method).name();

    let Some(capture) = solve_poses(backend, output_dir, camera_model, sfm)? else {
        build_pyramid(output_dir.join(IMAGE_DIR_NAME), num_downscales)?;
        summary.push(downscale_summary(num_downscales));
        reporter.warn(&format!(
            "Could not find existing {solver} results. Not generating transforms.json"
        ));
        summary.report(reporter);
        return Ok(RunOutcome {
            summary,
            descriptor: None,
            num_frames: 0,
        });
    };

    let num_matched = capture.frames.len();
    summary.push(format!("{solver} matched {num_matched} images"));
    let (quality, message) = matching_summary(num_initial, num_matched, solver);
    summary.push_at(quality.level(), message);

    let intrinsics = capture.intrinsics.to_intrinsics(camera_model)?;
    let (descriptor, num_frames) = write_posed_dataset(
        backend,
        intrinsics,
        &capture.frames,
        output_dir,
        num_downscales,
        reporter,
        &mut summary,
    )?;

    summary.report(reporter);
    Ok(RunOutcome {
        summary,
        descriptor: Some(descriptor),
        num_frames,
    })
}

fn extraction_summary(extraction: &FrameExtraction) -> Result<Summary, DatasetError> {
    if extraction.num_extracted == 0 {
        return Err(DatasetError::EmptyDataset);
    }
    let mut summary = Summary::new();
    summary.push(format!(
        "Starting with {} video frames",
        extraction.num_video_frames
    ));
    summary.push(format!("We extracted {} images", extraction.num_extracted));
    Ok(summary)
}

/// Process a folder of images into a posed dataset.
///
/// # Arguments
///
/// * `data` - The folder with the images.
/// * `output_dir` - The dataset folder, created if missing.
/// * `params` - The pipeline parameters.
/// * `reporter` - Receives the run messages.
pub fn process_images(
    data: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    params: &ImagesParams,
    reporter: &dyn Reporter,
) -> Result<RunOutcome, DatasetError> {
    let (data, output_dir) = (data.as_ref(), output_dir.as_ref());
    require_dir(data)?;
    let image_dir = prepare_image_dir(output_dir)?;

    let copied = copy_images(&list_images(data)?, &image_dir)?;
    if copied.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    let mut summary = Summary::new();
    summary.push(format!("Starting with {} images", copied.len()));

    process_with_sfm(
        Backend::images(params.sfm.sfm_method),
        output_dir,
        copied.len(),
        params.num_downscales,
        &params.sfm,
        reporter,
        summary,
    )
}

/// Process a video into a posed dataset.
///
/// # Arguments
///
/// * `data` - The video file.
/// * `output_dir` - The dataset folder, created if missing.
/// * `params` - The pipeline parameters.
/// * `reporter` - Receives the run messages.
pub fn process_video(
    data: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    params: &VideoParams,
    reporter: &dyn Reporter,
) -> Result<RunOutcome, DatasetError> {
    let (data, output_dir) = (data.as_ref(), output_dir.as_ref());
    let image_dir = prepare_image_dir(output_dir)?;

    let extraction = extract_video_frames(data, &image_dir, params.num_frames_target)?;
    let summary = extraction_summary(&extraction)?;

    process_with_sfm(
        Backend::video(params.sfm.sfm_method),
        output_dir,
        extraction.num_extracted,
        params.num_downscales,
        &params.sfm,
        reporter,
        summary,
    )
}

/// Process an Insta360 capture into an equirectangular posed dataset.
///
/// # Arguments
///
/// * `data` - Any of the `.insv` files of the capture.
/// * `output_dir` - The dataset folder, created if missing.
/// * `params` - The pipeline parameters.
/// * `reporter` - Receives the run messages.
pub fn process_insta360(
    data: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    params: &Insta360Params,
    reporter: &dyn Reporter,
) -> Result<RunOutcome, DatasetError> {
    let (data, output_dir) = (data.as_ref(), output_dir.as_ref());
    let (back, front) = insta360_filenames(data)?;
    let image_dir = prepare_image_dir(output_dir)?;

    let extraction =
        extract_insta360_frames(&front, &back, &image_dir, params.num_frames_target)?;
    let summary = extraction_summary(&extraction)?;

    process_with_sfm(
        Backend::Insta360OpenSfm,
        output_dir,
        extraction.num_extracted,
        params.num_downscales,
        &params.sfm,
        reporter,
        summary,
    )
}

/// Process a Record3D export into a posed dataset.
///
/// The export holds `rgb/<n>.jpg` and `metadata.json`. Frames are subsampled
/// to `max_dataset_size` before they are copied.
///
/// # Arguments
///
/// * `data` - The export folder.
/// * `output_dir` - The dataset folder, created if missing.
/// * `params` - The pipeline parameters.
/// * `reporter` - Receives the run messages.
pub fn process_record3d(
    data: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    params: &Record3dParams,
    reporter: &dyn Reporter,
) -> Result<RunOutcome, DatasetError> {
    let (data, output_dir) = (data.as_ref(), output_dir.as_ref());
    let rgb_dir = data.join("rgb");
    require_dir(&rgb_dir)?;
    let metadata_path = data.join("metadata.json");
    if !metadata_path.is_file() {
        return Err(DatasetError::MissingInput(format!(
            "{} doesn't exist",
            metadata_path.display()
        )));
    }
    let metadata = read_metadata_json(&metadata_path)?;

    let images = list_numbered_images(&rgb_dir)?;
    let indices = sample_indices(images.len(), params.max_dataset_size)?;
    if indices.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }
    let selected = indices.iter().map(|&i| images[i].clone()).collect::<Vec<_>>();

    let image_dir = prepare_image_dir(output_dir)?;
    let copied = copy_images(&selected, &image_dir)?;

    let mut summary = Summary::new();
    summary.push(format!(
        "Used {} images out of {} total",
        copied.len(),
        images.len()
    ));
    if params.max_dataset_size > 0 {
        summary.push(dataset_size_hint(params.max_dataset_size));
    }

    let capture = record3d_capture(&metadata, &file_names(&copied), &indices)?;
    let backend = Backend::Record3d;
    let intrinsics = capture
        .intrinsics
        .to_intrinsics(backend.camera_model(CameraModel::Perspective))?;

    let (descriptor, num_frames) = write_posed_dataset(
        backend,
        intrinsics,
        &capture.frames,
        output_dir,
        params.num_downscales,
        reporter,
        &mut summary,
    )?;

    summary.report(reporter);
    Ok(RunOutcome {
        summary,
        descriptor: Some(descriptor),
        num_frames,
    })
}

/// Process a Polycam export into a posed dataset.
///
/// The corrected keyframes are used when present. Frames are subsampled to
/// `max_dataset_size`, filtered by blur score, copied and finally cropped by
/// `crop_border_pixels`.
///
/// # Arguments
///
/// * `data` - The export folder.
/// * `output_dir` - The dataset folder, created if missing.
/// * `params` - The pipeline parameters.
/// * `reporter` - Receives the run messages.
pub fn process_polycam(
    data: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    params: &PolycamParams,
    reporter: &dyn Reporter,
) -> Result<RunOutcome, DatasetError> {
    let (data, output_dir) = (data.as_ref(), output_dir.as_ref());
    let keyframes = data.join("keyframes");

    let corrected_dir = keyframes.join("corrected_images");
    let (polycam_image_dir, cameras_dir, crop_border_pixels) =
        if corrected_dir.is_dir() && !params.use_uncorrected_images {
            (
                corrected_dir,
                keyframes.join("corrected_cameras"),
                params.crop_border_pixels,
            )
        } else {
            if !params.use_uncorrected_images {
                reporter.warn("Corrected images not found, using raw images.");
            }
            // the raw keyframes have no black undistortion border
            (keyframes.join("images"), keyframes.join("cameras"), 0)
        };
    require_dir(&polycam_image_dir)?;
    require_dir(&cameras_dir)?;

    let images = list_numbered_images(&polycam_image_dir)?;
    let indices = sample_indices(images.len(), params.max_dataset_size)?;

    let sampled = indices
        .iter()
        .map(|&i| {
            let image = images[i].clone();
            let stem = image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let camera_path = cameras_dir.join(format!("{stem}.json"));
            if !camera_path.is_file() {
                return Err(DatasetError::MissingInput(format!(
                    "{} doesn't exist",
                    camera_path.display()
                )));
            }
            Ok((image, read_camera_json(&camera_path)?))
        })
        .collect::<Result<Vec<_>, DatasetError>>()?;
    let num_sampled = sampled.len();
    let intrinsics_camera = sampled
        .first()
        .map(|(_, camera)| camera.clone())
        .ok_or(DatasetError::EmptyDataset)?;

    let mut summary = Summary::new();
    if params.max_dataset_size > 0 && num_sampled != images.len() {
        summary.push(format!(
            "Started with {num_sampled} images out of {} total",
            images.len()
        ));
        summary.push(dataset_size_hint(params.max_dataset_size));
    } else {
        summary.push(format!("Started with {num_sampled} images"));
    }

    let filtered = filter_by_blur(sampled, params.min_blur_score, |(_, camera)| {
        camera.blur_score
    })?;
    if filtered.num_dropped > 0 {
        summary.push_at(
            Level::Warn,
            format!(
                "Skipped {} frames due to low blur score.",
                filtered.num_dropped
            ),
        );
    }
    summary.push(format!("Final dataset is {} frames.", filtered.kept.len()));

    let (kept_images, cameras): (Vec<_>, Vec<_>) = filtered.kept.into_iter().unzip();
    let image_dir = prepare_image_dir(output_dir)?;
    let copied = copy_images(&kept_images, &image_dir)?;
    crop_images(&copied, crop_border_pixels)?;

    let named_cameras = file_names(&copied)
        .into_iter()
        .zip(cameras)
        .collect::<Vec<_>>();
    let capture = polycam_capture(&intrinsics_camera, &named_cameras)?;

    let backend = Backend::Polycam;
    let mut intrinsics = capture
        .intrinsics
        .to_intrinsics(backend.camera_model(CameraModel::Perspective))?;
    if crop_border_pixels > 0 {
        intrinsics = intrinsics.crop_border(crop_border_pixels)?;
    }

    let (descriptor, num_frames) = write_posed_dataset(
        backend,
        intrinsics,
        &capture.frames,
        output_dir,
        params.num_downscales,
        reporter,
        &mut summary,
    )?;

    summary.report(reporter);
    Ok(RunOutcome {
        summary,
        descriptor: Some(descriptor),
        num_frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let polycam = PolycamParams::default();
        assert_eq!(polycam.max_dataset_size, 600);
        assert_eq!(polycam.crop_border_pixels, 15);
        assert_eq!(polycam.min_blur_score, 25.0);
        assert_eq!(Record3dParams::default().max_dataset_size, 300);
        assert_eq!(VideoParams::default().num_frames_target, 150);
        assert_eq!(Insta360Params::default().num_frames_target, 400);
        assert_eq!(ImagesParams::default().sfm.sfm_method, SfmMethod::Colmap);
    }

    #[test]
    fn test_dataset_size_hint() {
        assert!(dataset_size_hint(300).contains("current value (300)"));
    }
}
