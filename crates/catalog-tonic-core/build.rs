/// Builds the gRPC client and server code for the `catalog.proto` definition
/// using `tonic-prost-build`.
///
/// This code generation step processes the Protocol Buffer definitions located
/// in the `proto` directory and emits Rust modules with gRPC bindings into the
/// crate's `OUT_DIR`. A file descriptor set is written next to them so the
/// server can expose reflection.
///
/// # Well-known types
///
/// `created_time` is a `google.protobuf.Timestamp`, which is mapped onto
/// `prost_types::Timestamp` rather than regenerated.
///
/// # Files and Paths
///
/// - Proto file: `proto/catalog.proto`
/// - Includes: `proto/`
///
/// # Output
///
/// Generated code will be accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("catalog");
/// }
/// ```
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("catalog_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/catalog.proto"], &["proto"])
        .unwrap();
}
