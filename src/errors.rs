//! Optimization error taxonomy
//!
//! Every failure that can reach the workflow boundary maps to a stable
//! error code carried in NATS error responses and job status updates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Batch lacks eligible vehicles, drivers, or pending deliveries.
    /// Surfaced synchronously at submit time; batch status is unchanged.
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// Batch status does not allow claiming it for optimization.
    #[error("batch is already optimizing or not in an optimizable state")]
    AlreadyOptimizing,

    /// Unknown batch id.
    #[error("batch not found")]
    BatchNotFound,

    /// Every distance provider in the fallback chain failed.
    #[error("all distance providers failed")]
    MatrixUnavailable,

    /// The solver could not produce a route for any vehicle.
    #[error("no feasible route found for any vehicle")]
    NoSolutionFound,

    /// Writing routes/stops failed after a successful solve. The batch's
    /// prior route data is left untouched; the solve result is discarded.
    #[error("failed to persist optimization result")]
    Persistence(#[source] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OptimizeError {
    /// Stable code for wire responses and job status records.
    pub fn code(&self) -> &'static str {
        match self {
            OptimizeError::PreconditionNotMet(_) => "PRECONDITION_NOT_MET",
            OptimizeError::AlreadyOptimizing => "ALREADY_OPTIMIZING",
            OptimizeError::BatchNotFound => "BATCH_NOT_FOUND",
            OptimizeError::MatrixUnavailable => "MATRIX_UNAVAILABLE",
            OptimizeError::NoSolutionFound => "NO_SOLUTION_FOUND",
            OptimizeError::Persistence(_) => "PERSISTENCE_FAILURE",
            OptimizeError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for OptimizeError {
    fn from(e: sqlx::Error) -> Self {
        OptimizeError::Internal(e.into())
    }
}
