//! Shared contract and error definitions for the catalog server and worker.
//!
//! ## Submodules
//!
//! - [`error`] - Service error type and its `tonic::Status` mapping.
//! - [`proto`] - Generated messages, client and server for
//!   `catalog.ProductProtoService`.

pub mod error;
pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/catalog.proto`.
///
/// - [`ProductModel`](proto::ProductModel) - wire form of a product. Its
///   `created_time` is a protobuf `Timestamp`.
/// - [`product_proto_service_server`](proto::product_proto_service_server) -
///   server trait implemented by the catalog service.
/// - [`product_proto_service_client`](proto::product_proto_service_client) -
///   client used by the worker and integration tests.
pub mod proto {
    tonic::include_proto!("catalog");
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("catalog_descriptor");
}
