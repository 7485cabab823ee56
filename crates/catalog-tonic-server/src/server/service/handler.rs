//! gRPC service implementation for the product catalog.
//!
//! This module defines [`ProductService`], the concrete implementation of the
//! [`ProductProtoService`] gRPC service. Each call opens its own store session,
//! so calls are independent and may run concurrently; the store's commit is
//! the only point where they meet.
//!
//! ## Responsibilities
//!
//! - Validate incoming products and map them to their stored form.
//! - Enforce existence checks before updates and deletes.
//! - Stream `GetAllProducts` through a bounded channel so a slow reader applies
//!   backpressure to the scan task.
//! - Stage every element of `InsertBulkProduct` and commit exactly once, after
//!   the client closes the stream.

use crate::server::{
    service::{config::ServiceConfig, mapping},
    store::ProductStore,
    telemetry::{
        increment_call_errors, increment_products_inserted, increment_products_streamed,
        increment_requests, record_call_duration,
    },
};
use catalog_tonic_core::{
    Error, Result,
    proto::{
        AddProductRequest, DeleteProductRequest, DeleteProductResponse, GetAllProductsRequest,
        GetProductRequest, InsertBulkProductResponse, ProductModel, UpdateProductRequest,
        product_proto_service_server::ProductProtoService,
    },
};
use core::pin::{Pin, pin};
use futures::{Stream, StreamExt};
use std::{
    sync::Arc,
    time::{Instant, SystemTime},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

/// Product catalog service backed by an injected [`ProductStore`].
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    config: ServiceConfig,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Looks up a single product.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ProductModel> {
        let mut session = self.store.session();
        let product = session.find(id).await?.ok_or(Error::NotFound { id })?;
        Ok(mapping::to_model(product))
    }

    /// Scans the store and returns a stream that yields every product in scan
    /// order.
    ///
    /// Products are handed to the stream by a spawned task. If the reader
    /// goes away the task stops quietly.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
    ) -> Result<ReceiverStream<core::result::Result<ProductModel, Status>>> {
        let products = self.store.session().scan().await?;
        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);

        let fut = async move {
            let total = products.len();
            let mut sent = 0_u64;
            for product in products {
                if tx.send(Ok(mapping::to_model(product))).await.is_err() {
                    tracing::debug!(sent, total, "Reader disconnected, abandoning product stream");
                    break;
                }
                sent += 1;
            }
            increment_products_streamed(sent);
        };
        tokio::spawn(fut.instrument(tracing::debug_span!("streaming")));

        Ok(ReceiverStream::new(rx))
    }

    /// Inserts a product and returns it with its assigned id and creation
    /// time.
    #[tracing::instrument(skip_all, fields(name = %model.name))]
    pub async fn add(&self, model: ProductModel) -> Result<ProductModel> {
        self.check(&model)?;
        let mut session = self.store.session();
        let product = session
            .insert(mapping::to_new_product(model, SystemTime::now())?)
            .await?;
        session.commit().await?;
        tracing::debug!(id = product.id, "Product added");
        Ok(mapping::to_model(product))
    }

    /// Replaces an existing product. `id` and `created_time` are kept.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id does not exist and [`Error::Conflict`] if
    /// another writer changed or removed the row before the commit.
    #[tracing::instrument(skip_all, fields(id = model.id))]
    pub async fn update(&self, model: ProductModel) -> Result<ProductModel> {
        let id = model.id;
        let mut session = self.store.session();
        let stored = session.find(id).await?.ok_or(Error::NotFound { id })?;
        self.check(&model)?;
        let product = mapping::replace(stored, model)?;

        session.mark_modified(product.clone());
        session.commit().await?;
        Ok(mapping::to_model(product))
    }

    /// Deletes an existing product.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<DeleteProductResponse> {
        let mut session = self.store.session();
        let product = session.find(id).await?.ok_or(Error::NotFound { id })?;

        session.delete(product);
        let deleted = session.commit().await?;
        Ok(DeleteProductResponse {
            success: deleted > 0,
        })
    }

    /// Stages every product read from `stream` and commits them together once
    /// the stream ends.
    ///
    /// A stream error or an invalid element ends the call before the commit,
    /// and the staged rows are dropped with the session. So does a caller that
    /// goes away mid-stream, since the transport drops the call instead of
    /// letting it reach the commit.
    #[tracing::instrument(skip_all)]
    pub async fn insert_bulk<S>(&self, stream: S) -> Result<InsertBulkProductResponse>
    where
        S: Stream<Item = core::result::Result<ProductModel, Status>> + Send,
    {
        let mut stream = pin!(stream);
        let mut session = self.store.session();
        let mut staged = 0_usize;

        while let Some(item) = stream.next().await {
            let model = item.map_err(|status| {
                tracing::warn!(staged, "Bulk insert stream failed, discarding staged products");
                Error::from_stream(status)
            })?;
            self.check(&model)?;
            session
                .insert(mapping::to_new_product(model, SystemTime::now())?)
                .await?;
            staged += 1;
        }

        // A client that abandons an HTTP/2 call resets the stream, and a
        // CANCEL reset reads as a clean end of body. The transport only checks
        // for a reset while the call is pending, so yield once to let it drop
        // this call before anything is committed.
        tokio::task::yield_now().await;

        let inserted = session.commit().await?;
        increment_products_inserted(inserted as u64);
        let insert_count = i32::try_from(inserted).map_err(|_| Error::Storage {
            context: format!("Insert count {inserted} does not fit the response"),
        })?;

        Ok(InsertBulkProductResponse {
            success: inserted > 0,
            insert_count,
        })
    }

    fn check(&self, model: &ProductModel) -> Result<()> {
        if self.config.validate_products {
            mapping::validate(model)?;
        }
        Ok(())
    }
}

fn require_product(product: Option<ProductModel>) -> Result<ProductModel> {
    product.ok_or_else(|| Error::InvalidRequest {
        reason: "Request is missing `product`".to_string(),
    })
}

/// Records call metrics and converts the outcome into a tonic response.
fn finish<T>(
    method: &'static str,
    start: Instant,
    result: Result<T>,
) -> core::result::Result<Response<T>, Status> {
    record_call_duration(method, start.elapsed().as_secs_f64() * 1000.0);
    match result {
        Ok(value) => Ok(Response::new(value)),
        Err(err) => {
            increment_call_errors(method);
            match &err {
                Error::Storage { .. } => tracing::error!(method, "{err}"),
                _ => tracing::warn!(method, "{err}"),
            }
            Err(err.into())
        }
    }
}

#[tonic::async_trait]
impl ProductProtoService for ProductService {
    type GetAllProductsStream =
        Pin<Box<dyn Stream<Item = core::result::Result<ProductModel, Status>> + Send>>;

    async fn get_product(
        &self,
        req: Request<GetProductRequest>,
    ) -> core::result::Result<Response<ProductModel>, Status> {
        let start = Instant::now();
        increment_requests("GetProduct");
        finish("GetProduct", start, self.get(req.get_ref().id).await)
    }

    async fn get_all_products(
        &self,
        _req: Request<GetAllProductsRequest>,
    ) -> core::result::Result<Response<Self::GetAllProductsStream>, Status> {
        let start = Instant::now();
        increment_requests("GetAllProducts");
        let result = self
            .list()
            .await
            .map(|stream| Box::pin(stream) as Self::GetAllProductsStream);
        finish("GetAllProducts", start, result)
    }

    async fn add_product(
        &self,
        req: Request<AddProductRequest>,
    ) -> core::result::Result<Response<ProductModel>, Status> {
        let start = Instant::now();
        increment_requests("AddProduct");
        let result = match require_product(req.into_inner().product) {
            Ok(model) => self.add(model).await,
            Err(err) => Err(err),
        };
        finish("AddProduct", start, result)
    }

    async fn update_product(
        &self,
        req: Request<UpdateProductRequest>,
    ) -> core::result::Result<Response<ProductModel>, Status> {
        let start = Instant::now();
        increment_requests("UpdateProduct");
        let result = match require_product(req.into_inner().product) {
            Ok(model) => self.update(model).await,
            Err(err) => Err(err),
        };
        finish("UpdateProduct", start, result)
    }

    async fn delete_product(
        &self,
        req: Request<DeleteProductRequest>,
    ) -> core::result::Result<Response<DeleteProductResponse>, Status> {
        let start = Instant::now();
        increment_requests("DeleteProduct");
        finish("DeleteProduct", start, self.delete(req.get_ref().id).await)
    }

    async fn insert_bulk_product(
        &self,
        req: Request<Streaming<ProductModel>>,
    ) -> core::result::Result<Response<InsertBulkProductResponse>, Status> {
        let start = Instant::now();
        increment_requests("InsertBulkProduct");
        let result = self.insert_bulk(req.into_inner()).await;
        finish("InsertBulkProduct", start, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{
        seed::seed_products,
        store::{MemoryStore, NewProduct, Product, StoreSession},
    };
    use catalog_tonic_core::proto::ProductStatus;
    use tonic::Code;

    fn service() -> (MemoryStore, ProductService) {
        let store = MemoryStore::new();
        let service = ProductService::new(Arc::new(store.clone()), ServiceConfig::default());
        (store, service)
    }

    fn model(name: &str, price: f32) -> ProductModel {
        ProductModel {
            id: 0,
            name: name.to_string(),
            description: format!("{name} description"),
            price,
            status: ProductStatus::InStock as i32,
            created_time: None,
        }
    }

    async fn collect(service: &ProductService) -> Vec<ProductModel> {
        service
            .list()
            .await
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn seeded_catalog_walkthrough() {
        let (store, service) = service();
        assert_eq!(seed_products(&store).await.unwrap(), 3);

        let mi10t = service.get(1).await.unwrap();
        assert_eq!(mi10t.name, "Mi10T");
        assert_eq!(mi10t.price, 699.0);

        assert!(service.delete(2).await.unwrap().success);
        let ids: Vec<i32> = collect(&service).await.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let (_store, service) = service();
        let mut update = model("ghost", 1.0);
        update.id = 404;

        assert!(matches!(service.get(404).await, Err(Error::NotFound { id: 404 })));
        assert!(matches!(service.update(update).await, Err(Error::NotFound { id: 404 })));
        assert!(matches!(service.delete(404).await, Err(Error::NotFound { id: 404 })));
    }

    #[tokio::test]
    async fn update_of_missing_id_is_not_found_even_when_invalid() {
        let (_store, service) = service();
        let mut update = model("", -1.0);
        update.id = 404;

        assert!(matches!(service.update(update).await, Err(Error::NotFound { id: 404 })));
    }

    #[tokio::test]
    async fn get_product_reports_not_found_status() {
        let (_store, service) = service();
        let status = service
            .get_product(Request::new(GetProductRequest { id: 9 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "Product with ID=9 is not found.");
    }

    #[tokio::test]
    async fn added_product_reads_back_unchanged() {
        let (store, service) = service();
        let added = service.add(model("Mi10T", 699.0)).await.unwrap();
        assert_eq!(added.id, 1);
        assert!(added.created_time.is_some());
        assert_eq!(store.len(), 1);

        assert_eq!(service.get(added.id).await.unwrap(), added);
    }

    #[tokio::test]
    async fn add_product_without_payload_is_invalid() {
        let (store, service) = service();
        let status = service
            .add_product(Request::new(AddProductRequest { product: None }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_everything_but_id_and_creation_time() {
        let (_store, service) = service();
        let added = service.add(model("Mi10T", 699.0)).await.unwrap();

        let replacement = ProductModel {
            id: added.id,
            name: "Mi10T Pro".to_string(),
            description: String::new(),
            price: 749.0,
            status: ProductStatus::OutOfStock as i32,
            created_time: Some(prost_types::Timestamp {
                seconds: 0,
                nanos: 0,
            }),
        };
        let updated = service.update(replacement).await.unwrap();

        assert_eq!(updated.id, added.id);
        assert_eq!(updated.created_time, added.created_time);
        assert_eq!(updated.name, "Mi10T Pro");
        assert_eq!(updated.description, "");
        assert_eq!(updated.price, 749.0);
        assert_eq!(updated.status(), ProductStatus::OutOfStock);
        assert_eq!(service.get(added.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (_store, service) = service();
        let added = service.add(model("P40", 899.0)).await.unwrap();

        assert!(service.delete(added.id).await.unwrap().success);
        assert!(matches!(service.get(added.id).await, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn list_on_empty_store_yields_nothing() {
        let (_store, service) = service();
        assert!(collect(&service).await.is_empty());
    }

    #[tokio::test]
    async fn list_streams_every_product_in_order() {
        let (_store, service) = service();
        for i in 0..40 {
            service.add(model(&format!("p{i}"), i as f32)).await.unwrap();
        }
        let products = collect(&service).await;
        assert_eq!(products.len(), 40);
        assert!(products.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn dropping_the_list_stream_early_is_harmless() {
        let (_store, service) = service();
        for i in 0..64 {
            service.add(model(&format!("p{i}"), 1.0)).await.unwrap();
        }
        let mut stream = service.list().await.unwrap();
        assert!(stream.next().await.is_some());
        drop(stream);

        // The store stays usable after the producer gives up.
        assert_eq!(service.get(1).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn bulk_insert_commits_every_element() {
        let (store, service) = service();
        let input = (0..5).map(|i| Ok::<_, Status>(model(&format!("bulk{i}"), 10.0)));

        let response = service.insert_bulk(tokio_stream::iter(input)).await.unwrap();
        assert!(response.success);
        assert_eq!(response.insert_count, 5);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn empty_bulk_insert_reports_no_success() {
        let (_store, service) = service();
        let input: Vec<core::result::Result<ProductModel, Status>> = Vec::new();

        let response = service.insert_bulk(tokio_stream::iter(input)).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.insert_count, 0);
    }

    #[tokio::test]
    async fn aborted_bulk_insert_commits_nothing() {
        let (store, service) = service();
        let input = vec![
            Ok(model("a", 1.0)),
            Ok(model("b", 2.0)),
            Err(Status::cancelled("client disconnected")),
            Ok(model("c", 3.0)),
        ];

        let result = service.insert_bulk(tokio_stream::iter(input)).await;
        assert!(matches!(result, Err(Error::RequestCancelled)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalid_element_rejects_whole_bulk_insert() {
        let (store, service) = service();
        let input: Vec<core::result::Result<ProductModel, Status>> =
            vec![Ok(model("a", 1.0)), Ok(model("", 2.0))];

        let result = service.insert_bulk(tokio_stream::iter(input)).await;
        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn validation_can_be_switched_off() {
        let store = MemoryStore::new();
        let service = ProductService::new(
            Arc::new(store.clone()),
            ServiceConfig {
                validate_products: false,
                ..ServiceConfig::default()
            },
        );
        let added = service.add(model("", -5.0)).await.unwrap();
        assert_eq!(added.price, -5.0);
    }

    #[derive(Clone, Copy)]
    enum Competitor {
        Reprice,
        Remove,
    }

    /// Store whose sessions let another writer commit a change to every row
    /// they touch just before their own commit.
    struct RacingStore {
        inner: MemoryStore,
        competitor: Competitor,
    }

    struct RacingSession {
        inner: Box<dyn StoreSession>,
        store: MemoryStore,
        competitor: Competitor,
        touched: Vec<i32>,
    }

    impl ProductStore for RacingStore {
        fn session(&self) -> Box<dyn StoreSession> {
            Box::new(RacingSession {
                inner: self.inner.session(),
                store: self.inner.clone(),
                competitor: self.competitor,
                touched: Vec::new(),
            })
        }
    }

    #[tonic::async_trait]
    impl StoreSession for RacingSession {
        async fn find(&mut self, id: i32) -> Result<Option<Product>> {
            self.inner.find(id).await
        }

        async fn scan(&mut self) -> Result<Vec<Product>> {
            self.inner.scan().await
        }

        async fn insert(&mut self, product: NewProduct) -> Result<Product> {
            self.inner.insert(product).await
        }

        fn mark_modified(&mut self, product: Product) {
            self.touched.push(product.id);
            self.inner.mark_modified(product);
        }

        fn delete(&mut self, product: Product) {
            self.touched.push(product.id);
            self.inner.delete(product);
        }

        async fn commit(&mut self) -> Result<usize> {
            for id in self.touched.drain(..) {
                let mut other = self.store.session();
                if let Some(mut product) = other.find(id).await? {
                    match self.competitor {
                        Competitor::Reprice => {
                            product.price = 1.0;
                            other.mark_modified(product);
                        }
                        Competitor::Remove => other.delete(product),
                    }
                    other.commit().await?;
                }
            }
            self.inner.commit().await
        }
    }

    async fn racing(competitor: Competitor) -> (MemoryStore, ProductService, ProductModel) {
        let store = MemoryStore::new();
        let added = ProductService::new(Arc::new(store.clone()), ServiceConfig::default())
            .add(model("A50", 399.0))
            .await
            .unwrap();
        let service = ProductService::new(
            Arc::new(RacingStore {
                inner: store.clone(),
                competitor,
            }),
            ServiceConfig::default(),
        );
        (store, service, added)
    }

    #[tokio::test]
    async fn update_racing_a_concurrent_write_is_aborted() {
        let (store, service, added) = racing(Competitor::Reprice).await;
        let mut fresh = added.clone();
        fresh.price = 379.0;

        let status = service
            .update_product(Request::new(UpdateProductRequest {
                product: Some(fresh),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Aborted);
        assert_eq!(
            status.message(),
            format!("Product with ID={} was modified concurrently.", added.id)
        );

        // The competing write wins.
        let stored = store.session().find(added.id).await.unwrap().unwrap();
        assert_eq!(stored.price, 1.0);
    }

    #[tokio::test]
    async fn update_racing_a_concurrent_delete_is_aborted() {
        let (store, service, added) = racing(Competitor::Remove).await;

        let status = service
            .update_product(Request::new(UpdateProductRequest {
                product: Some(added),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Aborted);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_racing_a_concurrent_delete_is_aborted() {
        let (store, service, added) = racing(Competitor::Remove).await;

        let status = service
            .delete_product(Request::new(DeleteProductRequest { id: added.id }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Aborted);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_racing_a_concurrent_write_is_aborted() {
        let (store, service, added) = racing(Competitor::Reprice).await;

        let status = service
            .delete_product(Request::new(DeleteProductRequest { id: added.id }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Aborted);
        assert_eq!(store.len(), 1);
    }

    struct UnavailableStore;

    struct UnavailableSession;

    fn unavailable() -> Error {
        Error::Storage {
            context: "database is down".to_string(),
        }
    }

    impl ProductStore for UnavailableStore {
        fn session(&self) -> Box<dyn StoreSession> {
            Box::new(UnavailableSession)
        }
    }

    #[tonic::async_trait]
    impl StoreSession for UnavailableSession {
        async fn find(&mut self, _id: i32) -> Result<Option<Product>> {
            Err(unavailable())
        }

        async fn scan(&mut self) -> Result<Vec<Product>> {
            Err(unavailable())
        }

        async fn insert(&mut self, _product: NewProduct) -> Result<Product> {
            Err(unavailable())
        }

        fn mark_modified(&mut self, _product: Product) {}

        fn delete(&mut self, _product: Product) {}

        async fn commit(&mut self) -> Result<usize> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn storage_failures_are_internal() {
        let service = ProductService::new(Arc::new(UnavailableStore), ServiceConfig::default());

        let status = service
            .get_product(Request::new(GetProductRequest { id: 1 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);

        let status = service
            .add_product(Request::new(AddProductRequest {
                product: Some(model("Mi10T", 699.0)),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);

        let status = match service
            .get_all_products(Request::new(GetAllProductsRequest {}))
            .await
        {
            Ok(_) => panic!("scan should fail"),
            Err(status) => status,
        };
        assert_eq!(status.code(), Code::Internal);
    }
}
