use crate::{
    config::{Config, ModelConfig, StorageConfig},
    model_service::ModelService,
    ort_service::OrtModelService,
    pipeline::Preprocessing,
    routes::api_routes,
    state::ServiceContext,
    storage::{FirebaseStorage, ObjectStore},
    telemetry::Metrics,
};
use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router<M: ModelService, S: ObjectStore>(
    context: ServiceContext<M, S>,
    max_upload_bytes: usize,
) -> Router {
    Router::new()
        .merge(api_routes::<M, S>())
        .with_state(context)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(router: Router, addr: &str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received, starting graceful shutdown");
            })
            .await?;

        Ok(())
    }
}

/// Startup failures here leave the service degraded instead of aborting.
fn load_model(config: &ModelConfig) -> Option<OrtModelService> {
    match OrtModelService::new(config) {
        Ok(model) => {
            tracing::info!(
                "Model {} loaded, input shape {:?}",
                config.onnx_file,
                model.input_shape()
            );
            Some(model)
        }
        Err(e) => {
            tracing::error!("Model unavailable, predictions will fail: {}", e);
            None
        }
    }
}

fn connect_storage(config: &StorageConfig) -> Option<FirebaseStorage> {
    match FirebaseStorage::from_config(config) {
        Ok(Some(storage)) => Some(storage),
        Ok(None) => {
            tracing::warn!(
                "No storage credentials found (environment or {}), images cannot be downloaded",
                config.credentials_file.display()
            );
            None
        }
        Err(e) => {
            tracing::error!("Failed to connect to storage bucket {}: {}", config.bucket, e);
            None
        }
    }
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let storage = connect_storage(&config.storage);
    let model = load_model(&config.model);
    let metrics = Arc::new(Metrics::new()?);

    let preprocessing = Preprocessing {
        image_size: config.model.image_size,
        layout: config.model.layout,
    };
    let context = ServiceContext::new(
        model,
        storage,
        config.model.onnx_file.clone(),
        preprocessing,
        metrics,
    );

    let router = build_router(context, config.server.max_upload_bytes);
    let addr = config.server.get_address();
    let server = HttpServer::new(router, &addr).await?;
    tracing::info!("Listening on {}", &addr);

    server.run().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
