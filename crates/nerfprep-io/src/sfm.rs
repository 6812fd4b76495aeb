use std::{
    path::{Path, PathBuf},
    process::Command,
    str::FromStr,
};

use nerfprep_3d::camera::CameraModel;

use crate::{
    error::IoError,
    images::list_images,
    process::run_command,
};

/// COLMAP version assumed when it cannot be read from the executable.
pub const DEFAULT_COLMAP_VERSION: f64 = 3.8;

/// Feature matching strategy of COLMAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingMethod {
    /// Match every image pair, slow but accurate.
    #[default]
    Exhaustive,
    /// Match neighbouring images, for videos.
    Sequential,
    /// Match images retrieved with a vocabulary tree.
    VocabTree,
}

impl MatchingMethod {
    /// The name used on the command line, also the COLMAP matcher prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingMethod::Exhaustive => "exhaustive",
            MatchingMethod::Sequential => "sequential",
            MatchingMethod::VocabTree => "vocab_tree",
        }
    }
}

impl FromStr for MatchingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exhaustive" => Ok(MatchingMethod::Exhaustive),
            "sequential" => Ok(MatchingMethod::Sequential),
            "vocab_tree" => Ok(MatchingMethod::VocabTree),
            _ => Err(format!(
                "unknown matching method `{s}`, expected exhaustive, sequential or vocab_tree"
            )),
        }
    }
}

/// Structure-from-motion engine used to pose images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SfmMethod {
    /// COLMAP.
    #[default]
    Colmap,
    /// OpenSfM.
    OpenSfm,
}

impl SfmMethod {
    /// Display name of the engine.
    pub fn name(&self) -> &'static str {
        match self {
            SfmMethod::Colmap => "COLMAP",
            SfmMethod::OpenSfm => "OpenSfM",
        }
    }
}

impl FromStr for SfmMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "colmap" => Ok(SfmMethod::Colmap),
            "opensfm" => Ok(SfmMethod::OpenSfm),
            _ => Err(format!("unknown sfm method `{s}`, expected colmap or opensfm")),
        }
    }
}

/// Options of a COLMAP run.
#[derive(Debug, Clone)]
pub struct ColmapOptions {
    /// How to call the COLMAP executable.
    pub colmap_cmd: String,
    /// Use the GPU for feature extraction and matching.
    pub gpu: bool,
    /// Feature matching strategy.
    pub matching_method: MatchingMethod,
    /// Vocabulary tree file, required by [`MatchingMethod::VocabTree`].
    pub vocab_tree_path: Option<PathBuf>,
}

impl Default for ColmapOptions {
    fn default() -> Self {
        Self {
            colmap_cmd: "colmap".to_string(),
            gpu: true,
            matching_method: MatchingMethod::default(),
            vocab_tree_path: None,
        }
    }
}

/// Parse the version out of the banner COLMAP prints when called without arguments,
/// e.g. `COLMAP 3.8 -- Structure-from-Motion and Multi-View Stereo`.
pub fn parse_colmap_version(output: &str) -> Option<f64> {
    output
        .lines()
        .filter(|line| line.starts_with("COLMAP"))
        .find_map(|line| line.split_whitespace().nth(1)?.parse::<f64>().ok())
}

/// The version of the COLMAP executable, [`DEFAULT_COLMAP_VERSION`] if unknown.
pub fn colmap_version(colmap_cmd: &str) -> f64 {
    let version = run_command(&mut Command::new(colmap_cmd))
        .ok()
        .and_then(|output| parse_colmap_version(&output));

    version.unwrap_or_else(|| {
        log::warn!("Could not find COLMAP version. Using default {DEFAULT_COLMAP_VERSION}");
        DEFAULT_COLMAP_VERSION
    })
}

/// Run COLMAP on the images and export the reconstruction as text.
///
/// The steps are feature extraction, matching, mapping, a bundle adjustment
/// that refines the principal point and the text export of `sparse/0`.
///
/// # Arguments
///
/// * `image_dir` - The dataset images.
/// * `colmap_dir` - The COLMAP workspace, created if missing.
/// * `camera_model` - The camera model of the images.
/// * `options` - The run options.
///
/// # Returns
///
/// The folder with `cameras.txt` and `images.txt`.
pub fn run_colmap(
    image_dir: &Path,
    colmap_dir: &Path,
    camera_model: CameraModel,
    options: &ColmapOptions,
) -> Result<PathBuf, IoError> {
    let vocab_tree_path = match options.matching_method {
        MatchingMethod::VocabTree => Some(
            options
                .vocab_tree_path
                .as_ref()
                .ok_or(IoError::MissingVocabTree)?,
        ),
        _ => None,
    };

    std::fs::create_dir_all(colmap_dir)?;
    let version = colmap_version(&options.colmap_cmd);
    let gpu = if options.gpu { "1" } else { "0" };

    let database_path = colmap_dir.join("database.db");
    if database_path.exists() {
        std::fs::remove_file(&database_path)?;
    }

    let colmap = || Command::new(&options.colmap_cmd);

    log::info!("Running COLMAP feature extractor...");
    run_command(
        colmap()
            .arg("feature_extractor")
            .arg("--database_path")
            .arg(&database_path)
            .arg("--image_path")
            .arg(image_dir)
            .args(["--ImageReader.single_camera", "1"])
            .args(["--ImageReader.camera_model", camera_model.as_str()])
            .args(["--SiftExtraction.use_gpu", gpu]),
    )?;
    log::info!("Done extracting COLMAP features.");

    log::info!("Running COLMAP feature matcher...");
    let mut matcher = colmap();
    matcher
        .arg(format!("{}_matcher", options.matching_method.as_str()))
        .arg("--database_path")
        .arg(&database_path)
        .args(["--SiftMatching.use_gpu", gpu]);
    if let Some(path) = vocab_tree_path {
        matcher.arg("--VocabTreeMatching.vocab_tree_path").arg(path);
    }
    run_command(&mut matcher)?;
    log::info!("Done matching COLMAP features.");

    let sparse_dir = colmap_dir.join("sparse");
    std::fs::create_dir_all(&sparse_dir)?;

    log::info!("Running COLMAP bundle adjustment... (This may take a while)");
    let mut mapper = colmap();
    mapper
        .arg("mapper")
        .arg("--database_path")
        .arg(&database_path)
        .arg("--image_path")
        .arg(image_dir)
        .arg("--output_path")
        .arg(&sparse_dir);
    if version >= 3.7 {
        mapper.args(["--Mapper.ba_global_function_tolerance", "1e-6"]);
    }
    run_command(&mut mapper)?;
    log::info!("Done COLMAP bundle adjustment.");

    let model_dir = sparse_dir.join("0");

    log::info!("Refine intrinsics...");
    run_command(
        colmap()
            .arg("bundle_adjuster")
            .arg("--input_path")
            .arg(&model_dir)
            .arg("--output_path")
            .arg(&model_dir)
            .args(["--BundleAdjustment.refine_principal_point", "1"]),
    )?;
    log::info!("Done refining intrinsics.");

    run_command(
        colmap()
            .arg("model_converter")
            .arg("--input_path")
            .arg(&model_dir)
            .arg("--output_path")
            .arg(&model_dir)
            .args(["--output_type", "TXT"]),
    )?;

    Ok(model_dir)
}

/// The OpenSfM projection type of a camera model.
pub fn opensfm_projection_type(camera_model: CameraModel) -> &'static str {
    match camera_model {
        CameraModel::Perspective => "brown",
        CameraModel::Fisheye => "fisheye_opencv",
        CameraModel::Equirectangular => "equirectangular",
    }
}

/// Write `config.yaml` and `camera_models_overrides.json` into an OpenSfM workspace.
///
/// The config is a flat mapping written in the JSON subset of YAML.
pub fn write_opensfm_config(
    opensfm_dir: &Path,
    camera_model: CameraModel,
    width: u32,
    height: u32,
) -> Result<(), IoError> {
    let config = serde_json::json!({
        "processes": 12,
        "matching_order_neighbors": 20,
        "feature_process_size": 1024,
        "triangulation_threshold": 0.006,
        "triangulation_type": "ROBUST",
        "min_track_length": 2,
        "retriangulation_ratio": 1.5,
        "bundle_new_points_ratio": 1.5,
    });
    std::fs::write(
        opensfm_dir.join("config.yaml"),
        serde_json::to_string_pretty(&config)?,
    )?;

    let overrides = serde_json::json!({
        "all": {
            "projection_type": opensfm_projection_type(camera_model),
            "width": width,
            "height": height,
            "focal_x": 0.85,
            "focal_y": 0.85,
        }
    });
    std::fs::write(
        opensfm_dir.join("camera_models_overrides.json"),
        serde_json::to_string(&overrides)?,
    )?;

    Ok(())
}

/// Run OpenSfM on the images.
///
/// # Arguments
///
/// * `image_dir` - The dataset images, copied into the workspace.
/// * `opensfm_dir` - The OpenSfM workspace, created if missing.
/// * `camera_model` - The camera model of the images.
/// * `opensfm_install` - The OpenSfM checkout, the executable is `bin/opensfm`.
///
/// # Returns
///
/// The path of `reconstruction.json`.
pub fn run_opensfm(
    image_dir: &Path,
    opensfm_dir: &Path,
    camera_model: CameraModel,
    opensfm_install: &Path,
) -> Result<PathBuf, IoError> {
    let exe = opensfm_install.join("bin").join("opensfm");
    if !exe.exists() {
        return Err(IoError::CommandNotFound(exe.display().to_string()));
    }

    let images = list_images(image_dir)?;
    let first = images
        .first()
        .ok_or_else(|| IoError::FileDoesNotExist(image_dir.to_path_buf()))?;
    let (width, height) = image::image_dimensions(first)?;

    std::fs::create_dir_all(opensfm_dir)?;
    write_opensfm_config(opensfm_dir, camera_model, width, height)?;

    let workspace_images = opensfm_dir.join("images");
    std::fs::create_dir_all(&workspace_images)?;
    for path in images.iter() {
        if let Some(name) = path.file_name() {
            std::fs::copy(path, workspace_images.join(name))?;
        }
    }

    for (step, message) in [
        ("extract_metadata", "Extracting OpenSfM metadata..."),
        ("detect_features", "Running OpenSfM feature extractor..."),
        ("match_features", "Running OpenSfM feature matcher..."),
        ("create_tracks", "Merging OpenSfM features into tracked points..."),
        ("reconstruct", "Running OpenSfM bundle adjustment..."),
    ] {
        log::info!("{message}");
        let mut cmd = Command::new(&exe);
        cmd.arg(step).arg(opensfm_dir);
        run_command(&mut cmd)?;
    }
    log::info!("Done running bundle adjustment.");

    Ok(opensfm_dir.join("reconstruction.json"))
}
