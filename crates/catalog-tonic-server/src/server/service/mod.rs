//! gRPC service implementation for the product catalog.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`ProductService`).
//! - [`mapping`] - Wire/storage conversions and input validation.
//! - [`config`] - Service-level settings.

pub mod config;
pub mod handler;
pub mod mapping;

use catalog_tonic_core::proto::product_proto_service_server::ProductProtoServiceServer;
use handler::ProductService;
use tonic::codec::CompressionEncoding;

/// Wraps the service in its generated tonic server with every supported
/// compression encoding enabled.
pub fn build_product_service(service: ProductService) -> ProductProtoServiceServer<ProductService> {
    ProductProtoServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
