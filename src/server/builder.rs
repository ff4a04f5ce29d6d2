//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::resource_registry::{ControllerDescriptor, ResourceDescriptor, ResourceRegistry};
use crate::config::AppConfig;
use crate::controller::ResourceController;
use crate::core::entity::Entity;
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers exposing resource controllers
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(AppConfig::from_yaml_file("config.yaml")?)
///     .register_resource(ResourceController::with_json_forms(manager, form))?
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    registry: ResourceRegistry,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            registry: ResourceRegistry::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Use `config` for the bind address and route prefix overrides
    ///
    /// Call this before registering resources so their overrides apply.
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Expose a controller under its plural name, or the configured override
    ///
    /// Fails when the plural is already taken by another resource type.
    pub fn register_resource<T: Entity>(mut self, controller: ResourceController<T>) -> Result<Self> {
        let plural = self
            .config
            .plural_for(T::resource_name_singular())
            .unwrap_or(T::resource_name())
            .to_string();
        self.registry
            .register(Box::new(ControllerDescriptor::with_plural(plural, controller)))?;
        Ok(self)
    }

    /// Register a hand-written descriptor
    pub fn register_descriptor(mut self, descriptor: impl ResourceDescriptor + 'static) -> Result<Self> {
        self.registry.register(Box::new(descriptor))?;
        Ok(self)
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints that don't fit the resource pattern, such as
    /// authentication or webhooks.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Build the final REST router with tracing and CORS layers
    pub fn build(self) -> Result<Router> {
        let app = RestExposure::build_router(&self.registry, self.custom_routes);

        Ok(app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(default_cors()),
        ))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C) for graceful shutdown.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on the address from the configuration
    pub async fn serve_configured(self) -> Result<()> {
        let addr = self.config.server.socket_addr()?.to_string();
        self.serve(&addr).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
