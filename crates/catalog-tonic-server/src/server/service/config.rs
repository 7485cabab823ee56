/// Per-service settings derived from the server configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Products buffered between the scan task and a `GetAllProducts` reader.
    pub stream_buffer_size: usize,
    /// Reject blank names and negative prices on create, update and bulk
    /// insert.
    pub validate_products: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            stream_buffer_size: 16,
            validate_products: true,
        }
    }
}
