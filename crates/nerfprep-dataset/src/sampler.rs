use crate::error::DatasetError;

/// Select evenly spaced frame indices when `num_frames` exceeds a cap.
///
/// A cap of `-1` keeps every frame, as does any cap of at least
/// `num_frames`. Otherwise the indices are `round(linspace(0, N - 1, cap))`
/// with ties rounded to even; they always include `0` and `N - 1`.
///
/// # Arguments
///
/// * `num_frames` - Number of frames available.
/// * `max_dataset_size` - The cap, `-1` for none.
///
/// # Returns
///
/// The selected indices in increasing order.
///
/// Example:
///
/// ```
/// use nerfprep_dataset::sampler::sample_indices;
///
/// assert_eq!(sample_indices(10, 4).unwrap(), vec![0, 3, 6, 9]);
/// assert_eq!(sample_indices(3, -1).unwrap(), vec![0, 1, 2]);
/// ```
pub fn sample_indices(num_frames: usize, max_dataset_size: i64) -> Result<Vec<usize>, DatasetError> {
    if max_dataset_size < -1 {
        return Err(DatasetError::InvalidArgument(format!(
            "max_dataset_size must be -1 or non-negative, got {max_dataset_size}"
        )));
    }

    let cap = match usize::try_from(max_dataset_size) {
        Ok(cap) if cap < num_frames => cap,
        // uncapped or the cap is not reached
        _ => return Ok((0..num_frames).collect()),
    };

    if cap <= 1 {
        return Ok(vec![0; cap]);
    }

    let last = (num_frames - 1) as f64;
    let step = last / (cap - 1) as f64;
    let mut indices = (0..cap)
        .map(|i| (i as f64 * step).round_ties_even() as usize)
        .collect::<Vec<_>>();
    indices[cap - 1] = num_frames - 1;

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_bounds() -> Result<(), DatasetError> {
        for num_frames in 2..60 {
            for cap in 2..num_frames {
                let indices = sample_indices(num_frames, cap as i64)?;
                assert_eq!(indices.len(), cap);
                assert_eq!(indices[0], 0);
                assert_eq!(indices[cap - 1], num_frames - 1);
                assert!(indices.windows(2).all(|w| w[0] <= w[1]));
            }
        }
        Ok(())
    }

    #[test]
    fn test_sampler_identity() -> Result<(), DatasetError> {
        assert_eq!(sample_indices(5, -1)?, vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_indices(5, 5)?, vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_indices(5, 300)?, vec![0, 1, 2, 3, 4]);
        assert!(sample_indices(0, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_sampler_rounds_half_to_even() -> Result<(), DatasetError> {
        // linspace(0, 5, 3) = [0, 2.5, 5]
        assert_eq!(sample_indices(6, 3)?, vec![0, 2, 5]);
        // linspace(0, 7, 3) = [0, 3.5, 7]
        assert_eq!(sample_indices(8, 3)?, vec![0, 4, 7]);
        Ok(())
    }

    #[test]
    fn test_sampler_scenario() -> Result<(), DatasetError> {
        let indices = sample_indices(240, 150)?;
        assert_eq!(indices.len(), 150);
        assert_eq!(indices.first(), Some(&0));
        assert_eq!(indices.last(), Some(&239));
        Ok(())
    }

    #[test]
    fn test_sampler_small_caps() -> Result<(), DatasetError> {
        assert_eq!(sample_indices(10, 1)?, vec![0]);
        assert!(sample_indices(10, 0)?.is_empty());
        assert!(matches!(
            sample_indices(10, -2),
            Err(DatasetError::InvalidArgument(_))
        ));
        Ok(())
    }
}
