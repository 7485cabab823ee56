use crate::worker::{WorkerError, config::WorkerConfig, factory::ProductFactory};
use catalog_tonic_core::proto::product_proto_service_client::ProductProtoServiceClient;
use tokio_util::sync::CancellationToken;
use tonic::{
    codec::CompressionEncoding,
    transport::{Channel, Endpoint},
};

/// Runs the tick loop until it is cancelled, reaches `max_ticks`, or a call
/// fails.
///
/// Each tick sends one `AddProduct` request and then sleeps for
/// `task_interval`. Cancellation is observed both while a call is in flight
/// and during the sleep. A failed call is logged and returned; it is never
/// retried.
///
/// Returns the number of products the service accepted.
pub async fn run_worker(
    config: &WorkerConfig,
    factory: &mut ProductFactory,
    shutdown: CancellationToken,
) -> Result<u64, WorkerError> {
    let mut client = connect(&config.server_url)?;
    let mut added = 0u64;

    tracing::info!(
        "Worker {} started against {} (interval {:?})",
        config.worker_id,
        config.server_url,
        config.task_interval
    );

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let request = factory.generate();
        tracing::info!("Worker {} tick #{}", config.worker_id, factory.generated());

        let response = tokio::select! {
            () = shutdown.cancelled() => break,
            response = client.add_product(request) => response,
        };

        match response {
            Ok(response) => {
                let product = response.into_inner();
                tracing::info!(
                    "Added product {} (id={}, price={:.2})",
                    product.name,
                    product.id,
                    product.price
                );
                added += 1;
            }
            Err(status) => {
                tracing::error!(
                    "Worker {} stopping after AddProduct failed with {}: {}",
                    config.worker_id,
                    status.code(),
                    status.message()
                );
                return Err(WorkerError::Call(status));
            }
        }

        if config.max_ticks.is_some_and(|max| added >= max) {
            tracing::info!("Worker {} reached its tick limit", config.worker_id);
            break;
        }

        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(config.task_interval) => {}
        }
    }

    tracing::info!(
        "Worker {} stopped after adding {} products",
        config.worker_id,
        added
    );
    Ok(added)
}

fn connect(url: &str) -> Result<ProductProtoServiceClient<Channel>, WorkerError> {
    let channel = Endpoint::from_shared(url.to_string())?.connect_lazy();
    Ok(ProductProtoServiceClient::new(channel)
        .send_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip))
}
