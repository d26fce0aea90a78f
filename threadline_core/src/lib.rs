pub mod entity;
pub mod ids;
pub mod models;
pub mod thread;
use tokio::sync::OnceCell;

use std::{sync::Arc, time::Duration};

use iroh::Endpoint;
use tracing::info;
use zel_core::{prelude::RpcServerBuilder, protocol::RpcClient, IrohBundle};

use crate::service::{
    authors::{AuthorsClient, AuthorsServer, AuthorsService},
    channels::{ChannelsClient, ChannelsServer, ChannelsService, StoredChannels},
    reactions::{ReactionsClient, ReactionsServer, ReactionsService},
    threads::{ThreadsClient, ThreadsServer, ThreadsService},
    views::{ViewsClient, ViewsServer, ViewsService},
};

pub mod service;

pub mod error;

pub mod config;

#[cfg(test)]
pub(crate) mod test_utils;

static THREADLINE_CORE: OnceCell<Arc<ThreadCore>> = OnceCell::const_new();
static ALPN: &[u8] = b"threadline::0.1.0";

pub async fn core() -> Arc<ThreadCore> {
    THREADLINE_CORE
        .get_or_init(|| async move { Arc::new(ThreadCore::start().await.expect("failed to init")) })
        .await
        .clone()
}

/// Installs the global `tracing` subscriber unless the host already did.
/// `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &config::ThreadConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter().into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .ok();
}

/// Main runtime handle for the discussion engine.
pub struct ThreadCore {
    pub config: config::ThreadConfig,

    /// Server bundle that accepts inbound RPC traffic.
    pub server: IrohBundle,

    /// Client-side endpoint used by the transport layer to reach the local server.
    pub client_endpoint: Endpoint,

    /// Typed clients for the local server.
    pub channels: ChannelsClient,
    pub authors: AuthorsClient,
    pub threads: ThreadsClient,
    pub reactions: ReactionsClient,
    pub views: ViewsClient,
}

impl ThreadCore {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::get_or_init().await?;
        init_tracing(&config);
        info!(database = %config.database_path().display(), "starting threadline core");
        // ----------------
        // Server endpoint
        // ----------------
        let mut server_builder = IrohBundle::builder(Some(config.secret_key.clone())).await?;
        let server_endpoint = server_builder.endpoint().clone();

        // DB + migrations
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        let deadline = config.operation_timeout();
        let channels_service = ChannelsService::new(db.clone());
        if let Some(channel) = channels_service._ensure_default_channel().await? {
            info!(channel = %channel.id, "seeded default channel");
        }
        let directory = StoredChannels::shared(db.clone());
        let authors_service = AuthorsService::new(db.clone()).with_deadline(deadline);
        let threads_service =
            ThreadsService::with_channels(db.clone(), directory.clone()).with_deadline(deadline);
        let reactions_service = ReactionsService::new(db.clone()).with_deadline(deadline);
        let views_service =
            ViewsService::with_channels(db.clone(), directory).with_deadline(deadline);

        // Register RPC servers
        let rpc_server_builder = RpcServerBuilder::new(ALPN, server_endpoint.clone());

        let rpc_server_builder = channels_service.register_service(rpc_server_builder);
        let rpc_server_builder = authors_service.register_service(rpc_server_builder);
        let rpc_server_builder = threads_service.register_service(rpc_server_builder);
        let rpc_server_builder = reactions_service.register_service(rpc_server_builder);
        let rpc_server_builder = views_service.register_service(rpc_server_builder);

        let rpc_server = rpc_server_builder.build();

        let server = server_builder.accept(ALPN, rpc_server).finish().await;

        server.wait_online().await;

        // ----------------
        // Client endpoint (for the transport layer)
        // ----------------
        let client_endpoint = Endpoint::builder()
            .secret_key(config.client_secret_key.clone())
            .alpns(vec![ALPN.to_vec()])
            .bind()
            .await?;

        client_endpoint.online().await;

        // Connect client endpoint -> server endpoint
        let conn = client_endpoint
            .connect(server.endpoint.addr(), ALPN)
            .await?;

        let rpc = RpcClient::new(conn).await?;
        let channels = ChannelsClient::new(rpc.clone());
        let authors = AuthorsClient::new(rpc.clone());
        let threads = ThreadsClient::new(rpc.clone());
        let reactions = ReactionsClient::new(rpc.clone());
        let views = ViewsClient::new(rpc);

        info!("threadline core online");
        Ok(Self {
            config,
            server,
            client_endpoint,
            channels,
            authors,
            threads,
            reactions,
            views,
        })
    }

    pub async fn shutdown(self) -> Result<(), Box<dyn std::error::Error>> {
        // Close client endpoint
        self.client_endpoint.close().await;

        // Shutdown server bundle
        self.server.shutdown(Duration::from_secs(5)).await?;
        info!("threadline core stopped");
        Ok(())
    }
}

pub mod prelude {
    pub use super::ids;
    pub use super::entity;
    pub use super::models;
    pub use super::thread;

    pub use super::service;

    pub use super::error;

    pub use super::config;

    pub use zel_core;
}
