//! Conversions between the wire `ProductModel` and the stored [`Product`].
//!
//! The wire form carries `created_time` as a protobuf `Timestamp` and uses an
//! empty string for a missing description; the stored form uses `SystemTime`
//! and `Option<String>`. Nothing else in the crate converts between the two.

use crate::server::store::{NewProduct, Product, ProductStatus};
use catalog_tonic_core::{Error, Result, proto};
use prost_types::Timestamp;
use std::time::SystemTime;

pub fn to_model(product: Product) -> proto::ProductModel {
    proto::ProductModel {
        id: product.id,
        name: product.name,
        description: product.description.unwrap_or_default(),
        price: product.price,
        status: proto::ProductStatus::from(product.status) as i32,
        created_time: Some(Timestamp::from(product.created_time)),
    }
}

/// Builds a product to insert. Any `id` or `created_time` sent by the client is
/// ignored; the row is stamped with `now`.
pub fn to_new_product(model: proto::ProductModel, now: SystemTime) -> Result<NewProduct> {
    Ok(NewProduct {
        status: status_of(&model)?,
        name: model.name,
        description: description_of(model.description),
        price: model.price,
        created_time: now,
    })
}

/// Replaces every field of `stored` with the incoming values, keeping its id
/// and creation time.
pub fn replace(stored: Product, model: proto::ProductModel) -> Result<Product> {
    Ok(Product {
        id: stored.id,
        status: status_of(&model)?,
        name: model.name,
        description: description_of(model.description),
        price: model.price,
        created_time: stored.created_time,
    })
}

/// Rejects products with a blank name or a negative or non-finite price.
pub fn validate(model: &proto::ProductModel) -> Result<()> {
    if model.name.trim().is_empty() {
        return Err(Error::InvalidRequest {
            reason: "Product name must not be empty".to_string(),
        });
    }
    if !model.price.is_finite() || model.price < 0.0 {
        return Err(Error::InvalidRequest {
            reason: format!("Product price {} must be a non-negative number", model.price),
        });
    }
    Ok(())
}

fn status_of(model: &proto::ProductModel) -> Result<ProductStatus> {
    proto::ProductStatus::try_from(model.status)
        .map(ProductStatus::from)
        .map_err(|_| Error::InvalidRequest {
            reason: format!("Unknown product status {}", model.status),
        })
}

fn description_of(description: String) -> Option<String> {
    if description.is_empty() {
        None
    } else {
        Some(description)
    }
}

impl From<ProductStatus> for proto::ProductStatus {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::InStock => Self::InStock,
            ProductStatus::OutOfStock => Self::OutOfStock,
        }
    }
}

impl From<proto::ProductStatus> for ProductStatus {
    fn from(status: proto::ProductStatus) -> Self {
        match status {
            proto::ProductStatus::InStock => Self::InStock,
            proto::ProductStatus::OutOfStock => Self::OutOfStock,
        }
    }
}
