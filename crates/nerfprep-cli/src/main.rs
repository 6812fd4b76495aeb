use std::{path::PathBuf, process::ExitCode};

use argh::FromArgs;
use nerfprep::{
    dataset::{
        pipeline::{
            process_images, process_insta360, process_polycam, process_record3d, process_video,
            ImagesParams, Insta360Params, PolycamParams, Record3dParams, RunOutcome, SfmParams,
            VideoParams,
        },
        report::LogReporter,
        DatasetError,
    },
    io::sfm::{MatchingMethod, SfmMethod},
    k3d::camera::CameraModel,
};

#[derive(FromArgs, Debug)]
/// Turn a capture into a posed image dataset with a transforms.json descriptor
struct Args {
    /// print debug messages
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Images(ImagesArgs),
    Video(VideoArgs),
    Insta360(Insta360Args),
    Record3d(Record3dArgs),
    Polycam(PolycamArgs),
}

#[derive(FromArgs, Debug)]
/// Process a folder of images, posed with COLMAP or OpenSfM
#[argh(subcommand, name = "images")]
struct ImagesArgs {
    /// the folder with the images
    #[argh(option)]
    data: PathBuf,
    /// the dataset folder
    #[argh(option)]
    output_dir: PathBuf,
    /// number of times the images are downscaled by 2
    #[argh(option, default = "3")]
    num_downscales: u32,
    /// camera model: perspective, fisheye or equirectangular
    #[argh(option, default = "CameraModel::Perspective")]
    camera_type: CameraModel,
    /// structure from motion engine: colmap or opensfm
    #[argh(option, default = "SfmMethod::Colmap")]
    sfm_method: SfmMethod,
    /// feature matching: exhaustive, sequential or vocab_tree
    #[argh(option, default = "MatchingMethod::Exhaustive")]
    matching_method: MatchingMethod,
    /// vocabulary tree file for vocab_tree matching
    #[argh(option)]
    vocab_tree_path: Option<PathBuf>,
    /// the OpenSfM checkout, with the executable in bin/opensfm
    #[argh(option)]
    opensfm_dir: Option<PathBuf>,
    /// reuse the reconstruction already in the output folder
    #[argh(switch)]
    skip_colmap: bool,
    /// how to call the COLMAP executable
    #[argh(option, default = "String::from(\"colmap\")")]
    colmap_cmd: String,
    /// run COLMAP without the GPU
    #[argh(switch)]
    no_gpu: bool,
}

#[derive(FromArgs, Debug)]
/// Extract frames from a video and pose them with COLMAP or OpenSfM
#[argh(subcommand, name = "video")]
struct VideoArgs {
    /// the video file
    #[argh(option)]
    data: PathBuf,
    /// the dataset folder
    #[argh(option)]
    output_dir: PathBuf,
    /// approximate number of frames to extract
    #[argh(option, default = "150")]
    num_frames_target: usize,
    /// number of times the images are downscaled by 2
    #[argh(option, default = "3")]
    num_downscales: u32,
    /// camera model: perspective, fisheye or equirectangular
    #[argh(option, default = "CameraModel::Perspective")]
    camera_type: CameraModel,
    /// structure from motion engine: colmap or opensfm
    #[argh(option, default = "SfmMethod::Colmap")]
    sfm_method: SfmMethod,
    /// feature matching: exhaustive, sequential or vocab_tree
    #[argh(option, default = "MatchingMethod::Exhaustive")]
    matching_method: MatchingMethod,
    /// vocabulary tree file for vocab_tree matching
    #[argh(option)]
    vocab_tree_path: Option<PathBuf>,
    /// the OpenSfM checkout, with the executable in bin/opensfm
    #[argh(option)]
    opensfm_dir: Option<PathBuf>,
    /// reuse the reconstruction already in the output folder
    #[argh(switch)]
    skip_colmap: bool,
    /// how to call the COLMAP executable
    #[argh(option, default = "String::from(\"colmap\")")]
    colmap_cmd: String,
    /// run COLMAP without the GPU
    #[argh(switch)]
    no_gpu: bool,
}

#[derive(FromArgs, Debug)]
/// Extract equirectangular frames from an Insta360 capture and pose them with OpenSfM
#[argh(subcommand, name = "insta360")]
struct Insta360Args {
    /// any of the .insv files of the capture
    #[argh(option)]
    data: PathBuf,
    /// the dataset folder
    #[argh(option)]
    output_dir: PathBuf,
    /// approximate number of frames to extract over both lenses
    #[argh(option, default = "400")]
    num_frames_target: usize,
    /// number of times the images are downscaled by 2
    #[argh(option, default = "3")]
    num_downscales: u32,
    /// the OpenSfM checkout, with the executable in bin/opensfm
    #[argh(option)]
    opensfm_dir: Option<PathBuf>,
    /// reuse the reconstruction already in the output folder
    #[argh(switch)]
    skip_colmap: bool,
}

#[derive(FromArgs, Debug)]
/// Convert a Record3D export
#[argh(subcommand, name = "record3d")]
struct Record3dArgs {
    /// the export folder with rgb/ and metadata.json
    #[argh(option)]
    data: PathBuf,
    /// the dataset folder
    #[argh(option)]
    output_dir: PathBuf,
    /// number of times the images are downscaled by 2
    #[argh(option, default = "3")]
    num_downscales: u32,
    /// maximum number of frames, -1 keeps every frame
    #[argh(option, default = "300")]
    max_dataset_size: i64,
}

#[derive(FromArgs, Debug)]
/// Convert a Polycam export
#[argh(subcommand, name = "polycam")]
struct PolycamArgs {
    /// the export folder with keyframes/
    #[argh(option)]
    data: PathBuf,
    /// the dataset folder
    #[argh(option)]
    output_dir: PathBuf,
    /// number of times the images are downscaled by 2
    #[argh(option, default = "3")]
    num_downscales: u32,
    /// use the raw keyframes instead of the corrected ones
    #[argh(switch)]
    use_uncorrected_images: bool,
    /// maximum number of frames, -1 keeps every frame
    #[argh(option, default = "600")]
    max_dataset_size: i64,
    /// frames with a lower blur score are skipped, 0 keeps every frame
    #[argh(option, default = "25.0")]
    min_blur_score: f64,
    /// pixels cropped from every border of the corrected images
    #[argh(option, default = "15")]
    crop_border_pixels: u32,
}

fn run(command: Command) -> Result<RunOutcome, DatasetError> {
    let reporter = LogReporter;
    match command {
        Command::Images(args) => {
            let params = ImagesParams {
                num_downscales: args.num_downscales,
                sfm: SfmParams {
                    camera_type: args.camera_type,
                    sfm_method: args.sfm_method,
                    matching_method: args.matching_method,
                    vocab_tree_path: args.vocab_tree_path,
                    opensfm_dir: args.opensfm_dir,
                    skip_colmap: args.skip_colmap,
                    colmap_cmd: args.colmap_cmd,
                    gpu: !args.no_gpu,
                },
            };
            process_images(&args.data, &args.output_dir, &params, &reporter)
        }
        Command::Video(args) => {
            let params = VideoParams {
                num_frames_target: args.num_frames_target,
                num_downscales: args.num_downscales,
                sfm: SfmParams {
                    camera_type: args.camera_type,
                    sfm_method: args.sfm_method,
                    matching_method: args.matching_method,
                    vocab_tree_path: args.vocab_tree_path,
                    opensfm_dir: args.opensfm_dir,
                    skip_colmap: args.skip_colmap,
                    colmap_cmd: args.colmap_cmd,
                    gpu: !args.no_gpu,
                },
            };
            process_video(&args.data, &args.output_dir, &params, &reporter)
        }
        Command::Insta360(args) => {
            let params = Insta360Params {
                num_frames_target: args.num_frames_target,
                num_downscales: args.num_downscales,
                sfm: SfmParams {
                    opensfm_dir: args.opensfm_dir,
                    skip_colmap: args.skip_colmap,
                    ..Default::default()
                },
            };
            process_insta360(&args.data, &args.output_dir, &params, &reporter)
        }
        Command::Record3d(args) => {
            let params = Record3dParams {
                num_downscales: args.num_downscales,
                max_dataset_size: args.max_dataset_size,
            };
            process_record3d(&args.data, &args.output_dir, &params, &reporter)
        }
        Command::Polycam(args) => {
            let params = PolycamParams {
                num_downscales: args.num_downscales,
                use_uncorrected_images: args.use_uncorrected_images,
                max_dataset_size: args.max_dataset_size,
                min_blur_score: args.min_blur_score,
                crop_border_pixels: args.crop_border_pixels,
            };
            process_polycam(&args.data, &args.output_dir, &params, &reporter)
        }
    }
}

/// The process exit code of an error.
fn exit_code(error: &DatasetError) -> u8 {
    match error {
        DatasetError::MissingInput(_) => 2,
        DatasetError::EmptyDataset | DatasetError::EmptyVideo(_) => 3,
        DatasetError::ExternalProcess { .. } => 4,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(args.command) {
        Ok(outcome) => {
            if let Some(path) = outcome.descriptor {
                log::debug!("{} frames in {}", outcome.num_frames, path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(exit_code(&e))
        }
    }
}
