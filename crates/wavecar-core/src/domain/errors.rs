use std::fmt::{Display, Formatter};

pub type WavecarResult<T> = Result<T, WavecarError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Which of the three state indices failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Spin,
    KPoint,
    Band,
}

impl IndexKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spin => "spin",
            Self::KPoint => "k-point",
            Self::Band => "band",
        }
    }
}

impl Display for IndexKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WavecarError {
    #[error("unsupported WAVECAR precision tag {tag}: {reason}")]
    UnsupportedFormat { tag: i64, reason: &'static str },
    #[error("malformed WAVECAR header: {0}")]
    MalformedHeader(String),
    #[error("{index} index {value} is outside the valid range 1..={max}")]
    IndexOutOfRange {
        index: IndexKind,
        value: usize,
        max: usize,
    },
    #[error(
        "plane-wave count mismatch at k-point {kpoint}: generated {generated} G-vectors, WAVECAR records {stored}"
    )]
    PlaneWaveCountMismatch {
        kpoint: usize,
        generated: usize,
        stored: usize,
    },
    #[error("coefficient count mismatch: expected {expected} coefficients, got {actual}")]
    CoefficientCountMismatch { expected: usize, actual: usize },
    #[error(
        "FFT grid {requested:?} is smaller than the minimum grid {minimum:?} on at least one axis"
    )]
    InvalidGridSize {
        requested: [usize; 3],
        minimum: [usize; 3],
    },
    #[error("states on different k-points ({first} and {second}) cannot be paired")]
    KPointMismatch { first: usize, second: usize },
    #[error("{context}: {source}")]
    StreamError {
        context: String,
        source: std::io::Error,
    },
}

impl WavecarError {
    pub fn stream(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::StreamError {
            context: context.into(),
            source,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedHeader(message.into())
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::MalformedHeader(_)
            | Self::IndexOutOfRange { .. }
            | Self::InvalidGridSize { .. }
            | Self::KPointMismatch { .. } => ErrorCategory::InputValidationError,
            Self::StreamError { .. } => ErrorCategory::IoSystemError,
            Self::PlaneWaveCountMismatch { .. } | Self::CoefficientCountMismatch { .. } => {
                ErrorCategory::ComputationError
            }
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "INPUT.WAVECAR_PRECISION",
            Self::MalformedHeader(_) => "INPUT.WAVECAR_HEADER",
            Self::IndexOutOfRange { .. } => "INPUT.WAVECAR_INDEX",
            Self::InvalidGridSize { .. } => "INPUT.WAVECAR_GRID",
            Self::KPointMismatch { .. } => "INPUT.WAVECAR_KPOINT",
            Self::StreamError { .. } => "IO.WAVECAR_READ",
            Self::PlaneWaveCountMismatch { .. } => "RUN.WAVECAR_PLANE_WAVES",
            Self::CoefficientCountMismatch { .. } => "RUN.WAVECAR_COEFFICIENTS",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCategory, IndexKind, WavecarError};

    #[test]
    fn exit_codes_follow_category() {
        let cases = [
            (ErrorCategory::InputValidationError, 2),
            (ErrorCategory::IoSystemError, 3),
            (ErrorCategory::ComputationError, 4),
        ];
        for (category, code) in cases {
            assert_eq!(category.exit_code(), code);
        }
    }

    #[test]
    fn index_errors_name_the_offending_axis() {
        let error = WavecarError::IndexOutOfRange {
            index: IndexKind::Band,
            value: 9,
            max: 8,
        };
        assert_eq!(error.category(), ErrorCategory::InputValidationError);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.WAVECAR_INDEX] band index 9 is outside the valid range 1..=8"
        );
    }

    #[test]
    fn stream_errors_are_io_category() {
        let error = WavecarError::stream(
            "failed to open 'WAVECAR'",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(error.exit_code(), 3);
        assert_eq!(error.placeholder(), "IO.WAVECAR_READ");
        assert!(error.to_string().starts_with("failed to open 'WAVECAR'"));
    }

    #[test]
    fn count_mismatches_are_computation_errors() {
        let error = WavecarError::PlaneWaveCountMismatch {
            kpoint: 2,
            generated: 10,
            stored: 12,
        };
        assert_eq!(error.category(), ErrorCategory::ComputationError);
        assert!(error.to_string().contains("generated 10"));
        assert!(error.to_string().contains("records 12"));
    }
}
