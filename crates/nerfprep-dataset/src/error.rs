use std::path::PathBuf;

use nerfprep_3d::{camera::CameraError, io::colmap::ColmapError, io::JsonError};
use nerfprep_io::IoError;

/// An error type for the dataset module.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// A required input file or folder is absent.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// An argument has a value outside its domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The video has no frames.
    #[error("Video has no frames: {0}")]
    EmptyVideo(PathBuf),

    /// No frame is left to build a dataset from.
    #[error("No images remain after filtering, the dataset is empty")]
    EmptyDataset,

    /// An external program exited with a non-zero status.
    #[error("Error running command: {command}\n{stderr}")]
    ExternalProcess {
        /// The command line.
        command: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The capture metadata has no pose for a selected frame.
    #[error("No pose for frame {0} in the capture metadata")]
    MissingPose(usize),

    /// Two frames share a file path.
    #[error("Duplicate frame file path: {0}")]
    DuplicateFilePath(String),

    /// Error reading or writing images and running external tools.
    #[error(transparent)]
    Io(IoError),

    /// Error mapping the intrinsics.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Error reading a COLMAP model.
    #[error(transparent)]
    Colmap(#[from] ColmapError),

    /// Error reading a capture or reconstruction JSON file.
    #[error(transparent)]
    Json(#[from] JsonError),

    /// Error serializing the descriptor.
    #[error("Failed to serialize the dataset descriptor. {0}")]
    Serialize(#[from] serde_json::Error),

    /// Error writing the descriptor.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),
}

impl From<IoError> for DatasetError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::FileDoesNotExist(path) => {
                DatasetError::MissingInput(format!("{} does not exist", path.display()))
            }
            IoError::MissingVocabTree => DatasetError::MissingInput(
                "vocab_tree matching requires --vocab-tree-path".to_string(),
            ),
            IoError::EmptyVideo(path) => DatasetError::EmptyVideo(path),
            IoError::ExternalProcess { command, stderr } => {
                DatasetError::ExternalProcess { command, stderr }
            }
            other => DatasetError::Io(other),
        }
    }
}
