use crate::server::service::config::ServiceConfig;
use anyhow::bail;
use clap::{ArgAction, Parser};

/// Runtime configuration for the `catalog-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables, with
/// defaults suitable for local development.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "catalog-tonic-server",
    version,
    about = "A gRPC product catalog service"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix
    /// socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/catalog.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a
    /// file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Number of products buffered between the storage scan and a
    /// `GetAllProducts` reader.
    ///
    /// Lower values apply backpressure sooner; higher values let the scan run
    /// further ahead of a slow client.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 16)]
    pub stream_buffer_size: usize,

    /// Insert the sample products at startup when the store is empty.
    ///
    /// Environment variable: `SEED_DATA`
    #[arg(long, env = "SEED_DATA", default_value_t = true, action = ArgAction::Set)]
    pub seed_data: bool,

    /// Reject products with a blank name or a negative price.
    ///
    /// Environment variable: `VALIDATE_PRODUCTS`
    #[arg(long, env = "VALIDATE_PRODUCTS", default_value_t = true, action = ArgAction::Set)]
    pub validate_products: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub seed_data: bool,
    pub service: ServiceConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.server_addr.trim().is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            seed_data: args.seed_data,
            service: ServiceConfig {
                stream_buffer_size: args.stream_buffer_size,
                validate_products: args.validate_products,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let args = CliArgs::try_parse_from(["catalog-tonic-server"]).unwrap();
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:50051");
        assert!(config.seed_data);
        assert!(config.service.validate_products);
        assert_eq!(config.service.stream_buffer_size, 16);
    }

    #[test]
    fn flags_override_defaults() {
        let args = CliArgs::try_parse_from([
            "catalog-tonic-server",
            "--server-addr",
            "127.0.0.1:6000",
            "--seed-data",
            "false",
            "--validate-products",
            "false",
        ])
        .unwrap();
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:6000");
        assert!(!config.seed_data);
        assert!(!config.service.validate_products);
    }

    #[test]
    fn zero_stream_buffer_is_rejected() {
        let args =
            CliArgs::try_parse_from(["catalog-tonic-server", "--stream-buffer-size", "0"])
                .unwrap();
        assert!(ServerConfig::try_from(args).is_err());
    }
}
