use tonic::Status;

/// Failures that end the worker loop.
///
/// The loop never retries; whoever supervises the process decides whether to
/// start it again.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The configured server URL is not a valid endpoint.
    #[error("Invalid service endpoint: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The call failed, either in transit or with a status from the service.
    #[error("AddProduct failed with {}: {}", .0.code(), .0.message())]
    Call(Status),
}
