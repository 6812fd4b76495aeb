use std::path::PathBuf;

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to decode or encode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// Error to write a JSON file.
    #[error("Failed to write json. {0}")]
    JsonError(#[from] serde_json::Error),

    /// The border crop removes the whole image.
    #[error("Cannot crop {margin} pixels from each border of {path} ({width}x{height})")]
    CropTooLarge {
        /// The image being cropped.
        path: PathBuf,
        /// Pixels cropped from each border.
        margin: u32,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// The external program could not be started.
    #[error("Failed to run `{0}`, is it installed?")]
    CommandNotFound(String),

    /// The external program exited with a non-zero status.
    #[error("Error running command: {command}\n{stderr}")]
    ExternalProcess {
        /// The command line.
        command: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The external program printed something we cannot interpret.
    #[error("Unexpected output from `{command}`: {output}")]
    InvalidProcessOutput {
        /// The command line.
        command: String,
        /// The offending output.
        output: String,
    },

    /// The video has no frames.
    #[error("Video has no frames: {0}")]
    EmptyVideo(PathBuf),

    /// The file name does not follow the Insta360 naming scheme.
    #[error("Not an Insta360 video name: {0}")]
    InvalidInsta360Name(PathBuf),

    /// Vocabulary tree matching was requested without a vocabulary tree.
    #[error("vocab_tree matching requires a vocabulary tree file")]
    MissingVocabTree,
}
