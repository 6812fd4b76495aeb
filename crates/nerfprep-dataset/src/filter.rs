use crate::error::DatasetError;

/// Frames that passed the blur filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered<T> {
    /// Kept frames, in input order.
    pub kept: Vec<T>,
    /// Number of dropped frames.
    pub num_dropped: usize,
}

/// Whether a frame with `blur_score` passes `min_blur_score`.
///
/// Frames without a score always pass, and a threshold of zero or less
/// disables the filter.
pub fn passes_blur_filter(blur_score: Option<f64>, min_blur_score: f64) -> bool {
    match blur_score {
        Some(score) if min_blur_score > 0.0 => score >= min_blur_score,
        _ => true,
    }
}

/// Drop the frames whose blur score is below `min_blur_score`.
///
/// # Arguments
///
/// * `frames` - The frames to filter.
/// * `min_blur_score` - The threshold, zero disables filtering.
/// * `blur_score` - Reads the score of a frame.
///
/// # Errors
///
/// [`DatasetError::EmptyDataset`] if no frame survives.
pub fn filter_by_blur<T>(
    frames: Vec<T>,
    min_blur_score: f64,
    blur_score: impl Fn(&T) -> Option<f64>,
) -> Result<Filtered<T>, DatasetError> {
    let num_frames = frames.len();
    let kept = frames
        .into_iter()
        .filter(|frame| passes_blur_filter(blur_score(frame), min_blur_score))
        .collect::<Vec<_>>();

    if kept.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    Ok(Filtered {
        num_dropped: num_frames - kept.len(),
        kept,
    })
}
