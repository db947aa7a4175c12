// Error taxonomy for the dashboard data layer
use thiserror::Error;

/// Caller supplied something outside the accepted request shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown date range '{0}'")]
    UnknownDateRange(String),

    #[error("malformed project id '{0}'")]
    InvalidProjectId(String),
}

/// A payload that breaks one of the dashboard data invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("kpi {kpi} has change direction inconsistent with its change")]
    ChangeDirection { kpi: &'static str },

    #[error("trend series {series} is empty")]
    EmptySeries { series: &'static str },

    #[error("trend series {series} is not strictly ascending by date")]
    UnorderedSeries { series: &'static str },

    #[error("duplicate activity id {0}")]
    DuplicateActivityId(String),
}

/// Why a single backend fetch did not produce a payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    /// Network unreachable, timed out, or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// 401/403: the credential was rejected.
    #[error("authorization rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Any other non-success status. `structured` is set when the body carried
    /// the `{"error": {"message": ...}}` shape.
    #[error("backend returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        structured: bool,
    },

    #[error("could not decode dashboard response: {0}")]
    Decode(String),

    #[error("backend payload rejected: {0}")]
    Invalid(InvariantViolation),
}

impl FetchFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchFailure::Transport(_) => true,
            FetchFailure::Status {
                status, structured, ..
            } => !structured && *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, FetchFailure::Auth { .. })
    }
}

/// The mock generator failed to produce a payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    #[error("generated payload is invalid: {0}")]
    Invalid(#[from] InvariantViolation),
}

/// Hard failures surfaced to callers of the data layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<GeneratorError> for DashboardError {
    fn from(err: GeneratorError) -> Self {
        DashboardError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchFailure::Transport("connection refused".into()).is_retryable());
        assert!(
            FetchFailure::Status {
                status: 503,
                message: "HTTP Error: 503 Service Unavailable".into(),
                structured: false,
            }
            .is_retryable()
        );
        assert!(
            !FetchFailure::Status {
                status: 500,
                message: "database offline".into(),
                structured: true,
            }
            .is_retryable()
        );
        assert!(
            !FetchFailure::Status {
                status: 404,
                message: "HTTP Error: 404 Not Found".into(),
                structured: false,
            }
            .is_retryable()
        );
        assert!(
            !FetchFailure::Auth {
                status: 401,
                message: "Unauthorized".into(),
            }
            .is_retryable()
        );
        assert!(!FetchFailure::Decode("eof".into()).is_retryable());
    }
}
