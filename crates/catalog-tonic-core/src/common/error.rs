//! Error types for the product catalog service.
//!
//! This module defines the central `Error` enum, which captures every failure
//! the service reports to callers. It implements `From<Error>` for
//! `tonic::Status` so handlers can propagate with `?` and clients receive a
//! structured status code plus a message naming the offending id where one
//! applies.
//!
//! ## Error Cases
//! - `NotFound`: No product exists for the requested id.
//! - `Conflict`: A staged update or delete lost a race with another writer.
//! - `InvalidRequest`: The request was malformed or failed validation.
//! - `Storage`: The underlying store failed.
//! - `RequestCancelled`: The client aborted a streaming request.
//! - `Stream`: Reading a client stream failed for another reason. The
//!   original status is handed back unchanged.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the catalog service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The requested product does not exist.
    #[error("Product with ID={id} is not found.")]
    NotFound { id: i32 },

    /// The row changed or disappeared between read and commit.
    #[error("Product with ID={id} was modified concurrently.")]
    Conflict { id: i32 },

    /// The client request was invalid.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The store could not complete the operation.
    #[error("Storage error: {context}")]
    Storage { context: String },

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,

    /// The client stream yielded an error.
    #[error("Request stream failed: {}", .0.message())]
    Stream(Status),
}

impl Error {
    /// Classifies a status read from a client stream.
    pub fn from_stream(status: Status) -> Self {
        match status.code() {
            tonic::Code::Cancelled => Self::RequestCancelled,
            _ => Self::Stream(status),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::NotFound { .. } => Status::not_found(message),
            Error::Conflict { .. } => Status::aborted(message),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::Storage { .. } => Status::internal(message),
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::Stream(status) => status,
        }
    }
}
