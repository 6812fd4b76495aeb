use crate::report::{Level, Reporter};

/// How many of the input frames a pose solver managed to pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    /// Every frame has a pose.
    AllPosed,
    /// Fewer than 40% of the frames have a pose.
    Low,
    /// Between 40% and 80% of the frames have a pose.
    Medium,
    /// At least 80% of the frames have a pose.
    Success,
}

impl MatchQuality {
    /// Classify `num_matched` posed frames out of `num_initial`.
    pub fn classify(num_initial: usize, num_matched: usize) -> Self {
        let ratio = match_ratio(num_initial, num_matched);
        if ratio == 1.0 {
            MatchQuality::AllPosed
        } else if ratio < 0.4 {
            MatchQuality::Low
        } else if ratio < 0.8 {
            MatchQuality::Medium
        } else {
            MatchQuality::Success
        }
    }

    /// Level the classification is reported at.
    pub fn level(&self) -> Level {
        match self {
            MatchQuality::AllPosed | MatchQuality::Success => Level::Info,
            MatchQuality::Low | MatchQuality::Medium => Level::Warn,
        }
    }
}

/// Fraction of frames posed, zero for an empty input.
pub fn match_ratio(num_initial: usize, num_matched: usize) -> f64 {
    if num_initial == 0 {
        return 0.0;
    }
    num_matched as f64 / num_initial as f64
}

/// Describe the outcome of pose solving.
///
/// # Arguments
///
/// * `num_initial` - Frames handed to the solver.
/// * `num_matched` - Frames the solver posed.
/// * `solver` - Display name of the solver.
///
/// # Returns
///
/// The classification and a message with the posed percentage.
///
/// Example:
///
/// ```
/// use nerfprep_dataset::summary::{matching_summary, MatchQuality};
///
/// let (quality, message) = matching_summary(150, 130, "COLMAP");
/// assert_eq!(quality, MatchQuality::Success);
/// assert_eq!(message, "COLMAP found poses for 86.67% of the images.");
/// ```
pub fn matching_summary(num_initial: usize, num_matched: usize, solver: &str) -> (MatchQuality, String) {
    let quality = MatchQuality::classify(num_initial, num_matched);
    let percent = match_ratio(num_initial, num_matched) * 100.0;

    let message = match quality {
        MatchQuality::AllPosed => format!("{solver} found poses for all images, CONGRATS!"),
        MatchQuality::Low => format!(
            "{solver} only found poses for {percent:.2}% of the images. This is low.\n\
             This can be caused by a variety of reasons, such poor scene coverage, \
             blurry images, or large exposure changes."
        ),
        MatchQuality::Medium => format!(
            "{solver} only found poses for {percent:.2}% of the images.\n\
             This isn't great, but may be ok.\n\
             Missing poses can be caused by a variety of reasons, such poor scene coverage, \
             blurry images, or large exposure changes."
        ),
        MatchQuality::Success => format!("{solver} found poses for {percent:.2}% of the images."),
    };

    (quality, message)
}

/// The human readable lines printed at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    lines: Vec<(Level, String)>,
}

impl Summary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an informational line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push((Level::Info, line.into()));
    }

    /// Append a line at `level`.
    pub fn push_at(&mut self, level: Level, line: impl Into<String>) {
        self.lines.push((level, line.into()));
    }

    /// The lines without their level.
    pub fn lines(&self) -> Vec<&str> {
        self.lines.iter().map(|(_, line)| line.as_str()).collect()
    }

    /// Send every line to `reporter`.
    pub fn report(&self, reporter: &dyn Reporter) {
        reporter.info("All DONE");
        for (level, line) in self.lines.iter() {
            reporter.log(*level, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;

    #[test]
    fn test_match_bands() {
        assert_eq!(MatchQuality::classify(100, 100), MatchQuality::AllPosed);
        assert_eq!(MatchQuality::classify(100, 35), MatchQuality::Low);
        assert_eq!(MatchQuality::classify(100, 60), MatchQuality::Medium);
        assert_eq!(MatchQuality::classify(100, 85), MatchQuality::Success);
        assert_eq!(MatchQuality::classify(100, 40), MatchQuality::Medium);
        assert_eq!(MatchQuality::classify(100, 80), MatchQuality::Success);
    }

    #[test]
    fn test_matching_messages() {
        let (_, message) = matching_summary(100, 100, "COLMAP");
        assert_eq!(message, "COLMAP found poses for all images, CONGRATS!");

        let (quality, message) = matching_summary(100, 35, "COLMAP");
        assert_eq!(quality.level(), Level::Warn);
        assert!(message.starts_with("COLMAP only found poses for 35.00% of the images. This is low."));

        let (_, message) = matching_summary(3, 2, "OpenSfM");
        assert!(message.starts_with("OpenSfM only found poses for 66.67% of the images.\nThis isn't great"));
    }

    #[test]
    fn test_summary_report() {
        let mut summary = Summary::new();
        summary.push("Starting with 3 images");
        summary.push_at(Level::Warn, "Skipped 1 frames due to low blur score.");

        let reporter = MemoryReporter::new();
        summary.report(&reporter);

        assert_eq!(summary.lines(), ["Starting with 3 images", "Skipped 1 frames due to low blur score."]);
        assert!(reporter.contains(Level::Warn, "low blur score"));
        assert_eq!(reporter.messages().len(), 3);
    }
}
