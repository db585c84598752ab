/// Capture pipeline state machine.
///
/// ```text
/// idle → capturing → idle
/// ```
///
/// Device failures stop capture and land back in `Idle`; there is no
/// separate failed state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureState {
    Idle,
    Capturing { frames: usize, duration_secs: f64 },
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Capturing { duration_secs, .. } => Some(*duration_secs),
            Self::Idle => None,
        }
    }
}

/// Playback pipeline state machine.
///
/// ```text
/// idle → playing → idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing { position: usize, total: usize },
}

impl PlaybackState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    /// Fraction of the run already written, if playing.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Playing { total: 0, .. } => Some(1.0),
            Self::Playing { position, total } => Some(*position as f64 / *total as f64),
            Self::Idle => None,
        }
    }
}
