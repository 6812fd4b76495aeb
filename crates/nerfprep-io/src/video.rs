use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    error::IoError,
    images::frame_file_name,
    process::{command_line, run_command},
};

/// Counts of a frame extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExtraction {
    /// Frames in the source video(s).
    pub num_video_frames: usize,
    /// Images written to the output folder.
    pub num_extracted: usize,
}

/// Number of frames in a video, counted with `ffprobe`.
pub fn count_video_frames(video: impl AsRef<Path>) -> Result<usize, IoError> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-count_packets",
        "-show_entries",
        "stream=nb_read_packets",
        "-of",
        "csv=p=0",
    ])
    .arg(video.as_ref());

    let output = run_command(&mut cmd)?;
    let trimmed = output.trim_matches(|c: char| c == ',' || c.is_whitespace());
    trimmed
        .parse::<usize>()
        .map_err(|_| IoError::InvalidProcessOutput {
            command: command_line(&cmd),
            output: output.clone(),
        })
}

/// Keep one frame out of every `spacing` to approach `num_frames_target`.
///
/// A spacing of at most one extracts every frame.
pub fn frame_spacing(num_frames: usize, num_frames_target: usize) -> usize {
    num_frames.checked_div(num_frames_target).unwrap_or(0)
}

fn remove_pngs(image_dir: &Path) -> Result<(), IoError> {
    for entry in std::fs::read_dir(image_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            log::debug!("Deleting {}", path.display());
            std::fs::remove_file(path)?;
        }
    }
    Ok(())
}

fn count_pngs(image_dir: &Path, prefix: &str) -> Result<usize, IoError> {
    Ok(sorted_pngs(image_dir, prefix)?.len())
}

fn sorted_pngs(image_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, IoError> {
    let mut pngs = Vec::new();
    for entry in std::fs::read_dir(image_dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".png"));
        if matches {
            pngs.push(path);
        }
    }
    pngs.sort();
    Ok(pngs)
}

fn thumbnail_filters(spacing: usize) -> Vec<String> {
    if spacing > 1 {
        vec![format!("thumbnail={spacing}"), "setpts=N/TB".to_string()]
    } else {
        log::warn!("Can't satisfy requested number of frames. Extracting all frames.");
        Vec::new()
    }
}

/// Extract evenly spread frames of a video into `image_dir` as
/// `frame_00001.png`, `frame_00002.png`, ...
///
/// Existing PNG files of `image_dir` are removed first.
///
/// # Arguments
///
/// * `video` - The video file.
/// * `image_dir` - The destination folder, it must exist.
/// * `num_frames_target` - Approximate number of frames to extract.
pub fn extract_video_frames(
    video: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
    num_frames_target: usize,
) -> Result<FrameExtraction, IoError> {
    let (video, image_dir) = (video.as_ref(), image_dir.as_ref());
    if !video.is_file() {
        return Err(IoError::FileDoesNotExist(video.to_path_buf()));
    }

    remove_pngs(image_dir)?;

    let num_video_frames = count_video_frames(video)?;
    if num_video_frames == 0 {
        return Err(IoError::EmptyVideo(video.to_path_buf()));
    }
    log::info!("Number of frames in video: {num_video_frames}");

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i").arg(video);
    let filters = thumbnail_filters(frame_spacing(num_video_frames, num_frames_target));
    if !filters.is_empty() {
        cmd.args(["-vf", &filters.join(","), "-r", "1"]);
    }
    cmd.arg(image_dir.join("frame_%05d.png"));
    run_command(&mut cmd)?;

    let num_extracted = count_pngs(image_dir, "")?;
    log::info!("Done converting video to images.");

    Ok(FrameExtraction {
        num_video_frames,
        num_extracted,
    })
}

/// The back and front lens videos of an Insta360 capture.
///
/// Any of the `.insv` files of a capture can be given, e.g.
/// `VID_20220212_070353_00_003.insv`; the back lens video has `00` in the
/// fourth field and the front lens video `10`.
///
/// # Returns
///
/// `(back, front)` video paths, both must exist.
pub fn insta360_filenames(data: impl AsRef<Path>) -> Result<(PathBuf, PathBuf), IoError> {
    let data = data.as_ref();
    if data.extension().map_or(true, |ext| ext != "insv") {
        return Err(IoError::InvalidFileExtension(data.to_path_buf()));
    }

    let stem = data
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IoError::InvalidInsta360Name(data.to_path_buf()))?;
    let parts = stem.split('_').collect::<Vec<_>>();
    if parts.len() < 5 {
        return Err(IoError::InvalidInsta360Name(data.to_path_buf()));
    }

    let parent = data.parent().unwrap_or_else(|| Path::new(""));
    let back = parent.join(format!("VID_{}_{}_00_{}.insv", parts[1], parts[2], parts[4]));
    let front = parent.join(format!("VID_{}_{}_10_{}.insv", parts[1], parts[2], parts[4]));

    for path in [&back, &front] {
        if !path.exists() {
            return Err(IoError::FileDoesNotExist(path.clone()));
        }
    }

    Ok((back, front))
}

/// Extract equirectangular frames from the two lenses of an Insta360 capture.
///
/// Front lens frames come first; back lens frames are numbered after them.
///
/// # Arguments
///
/// * `front` - The front lens video.
/// * `back` - The back lens video.
/// * `image_dir` - The destination folder, it must exist.
/// * `num_frames_target` - Approximate number of frames to extract over both lenses.
pub fn extract_insta360_frames(
    front: impl AsRef<Path>,
    back: impl AsRef<Path>,
    image_dir: impl AsRef<Path>,
    num_frames_target: usize,
) -> Result<FrameExtraction, IoError> {
    let (front, back, image_dir) = (front.as_ref(), back.as_ref(), image_dir.as_ref());

    remove_pngs(image_dir)?;

    let num_front = count_video_frames(front)?;
    if num_front == 0 {
        return Err(IoError::EmptyVideo(front.to_path_buf()));
    }
    let num_back = count_video_frames(back)?;
    if num_back == 0 {
        return Err(IoError::EmptyVideo(back.to_path_buf()));
    }

    let mut filters = thumbnail_filters(frame_spacing(num_front, num_frames_target / 2));
    filters.push("v360=dfisheye:equirect:ih_fov=190:iv_fov=190:yaw=-90".to_string());

    for (video, transpose, pattern) in [
        (front, "transpose=2", "frame_%05d.png"),
        (back, "transpose=1", "back_frame_%05d.png"),
    ] {
        let vf = filters
            .iter()
            .map(String::as_str)
            .chain([transpose])
            .collect::<Vec<_>>()
            .join(",");
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i")
            .arg(video)
            .args(["-vf", &vf, "-r", "1"])
            .arg(image_dir.join(pattern));
        run_command(&mut cmd)?;
    }

    let num_front_frames = count_pngs(image_dir, "frame_")?;
    for (i, path) in sorted_pngs(image_dir, "back_frame_")?.iter().enumerate() {
        let renamed = image_dir.join(frame_file_name(num_front_frames + i + 1, Some("png")));
        std::fs::rename(path, renamed)?;
    }

    let num_extracted = count_pngs(image_dir, "")?;
    log::info!("Done converting insta360 to images.");

    Ok(FrameExtraction {
        num_video_frames: num_front + num_back,
        num_extracted,
    })
}
