use catalog_tonic_core::proto::{AddProductRequest, ProductModel, ProductStatus};
use prost_types::Timestamp;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Builds synthetic `AddProduct` requests.
#[derive(Debug, Clone)]
pub struct ProductFactory {
    worker_id: String,
    generated: u64,
}

impl ProductFactory {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            generated: 0,
        }
    }

    /// Number of requests built so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Returns a request for an in-stock product named after this worker and
    /// the current time, priced between 1 and 1000.
    pub fn generate(&mut self) -> AddProductRequest {
        self.generated += 1;
        let now = SystemTime::now();
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let price: f32 = rand::rng().random_range(1.0..1000.0);

        AddProductRequest {
            product: Some(ProductModel {
                id: 0,
                name: format!("{}_{}", self.worker_id, millis),
                description: format!("Generated by {} (#{})", self.worker_id, self.generated),
                price: (price * 100.0).round() / 100.0,
                status: ProductStatus::InStock as i32,
                created_time: Some(Timestamp::from(now)),
            }),
        }
    }
}
