//! Sample data loaded at startup.

use crate::server::store::{NewProduct, ProductStatus, ProductStore};
use catalog_tonic_core::Result;
use std::time::SystemTime;

const SAMPLE_PRODUCTS: [(&str, &str, f32); 3] = [
    ("Mi10T", "New Xiaomi Phone Mi10T", 699.0),
    ("P40", "New Huawei Phone P40", 899.0),
    ("A50", "New Samsung Phone A50", 399.0),
];

/// Inserts the sample products in one commit if the store is empty.
///
/// Returns the number of rows inserted, which is zero when the store already
/// holds products.
pub async fn seed_products(store: &dyn ProductStore) -> Result<usize> {
    let mut session = store.session();
    if !session.scan().await?.is_empty() {
        return Ok(0);
    }

    let now = SystemTime::now();
    for (name, description, price) in SAMPLE_PRODUCTS {
        session
            .insert(NewProduct {
                name: name.to_string(),
                description: Some(description.to_string()),
                price,
                status: ProductStatus::InStock,
                created_time: now,
            })
            .await?;
    }
    session.commit().await
}
