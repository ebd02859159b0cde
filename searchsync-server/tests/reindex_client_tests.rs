//! `searchsync reindex` against a live listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use searchsync::cache::backend::MemoryCacheBackend;
use searchsync::index::RebuildOutcome;
use searchsync::{
    EntityRow, MemoryPrimaryStore, MemorySearchEngine, RebuildTrigger, ServiceConfig,
    SyncCoordinator,
};
use searchsync_server::cli;
use searchsync_server::{build_router, AdminClient, AppState};

const TOKEN: &str = "s3cret";

struct LiveServer {
    addr: SocketAddr,
    coordinator: Arc<SyncCoordinator>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl LiveServer {
    async fn start() -> Self {
        let rows = vec![
            EntityRow::new("p1", "Classic Hoodie").with_brand("Northwind"),
            EntityRow::new("p2", "Trail Running Shoe").with_brand("Acme"),
            EntityRow::new("p3", "Rain Shell").with_brand("Northwind"),
        ];
        let mut config = ServiceConfig::in_memory();
        config.index.retry_backoff = Duration::from_millis(1);
        let coordinator = SyncCoordinator::from_parts(
            config,
            Arc::new(MemorySearchEngine::new()),
            Arc::new(MemoryPrimaryStore::with_rows(rows)),
            Arc::new(MemoryCacheBackend::new(1000)),
        )
        .await
        .expect("coordinator");

        let router = build_router(AppState {
            coordinator: coordinator.clone(),
            admin_token: Some(TOKEN.to_string()),
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            coordinator,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(2), &mut self.handle).await;
        self.coordinator.shutdown().await;
    }
}

#[tokio::test]
async fn test_client_triggers_rebuild_on_running_service() {
    let server = LiveServer::start().await;
    let before = server.coordinator.index_manager().current();

    let client = AdminClient::new(server.url(), TOKEN, Duration::from_secs(2)).expect("client");
    let trigger = client.trigger_reindex().await.expect("trigger");
    assert!(matches!(
        trigger,
        RebuildTrigger::Started | RebuildTrigger::AlreadyRunning
    ));

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        client.wait_for_rebuild(Duration::from_millis(20)),
    )
    .await
    .expect("rebuild finished")
    .expect("status");

    assert!(!status.running);
    let report = status.last_report.expect("report");
    assert_eq!(report.outcome, RebuildOutcome::Succeeded);
    assert_eq!(report.documents_indexed, 3);

    // The service's own index moved to the new generation
    let after = server.coordinator.index_manager().current();
    assert_ne!(after, before);
    assert_eq!(after.map(|g| g.name.clone()), report.generation);

    server.stop().await;
}

#[tokio::test]
async fn test_client_rejected_without_valid_token() {
    let server = LiveServer::start().await;

    let client = AdminClient::new(server.url(), "wrong", Duration::from_secs(2)).expect("client");
    let err = client.trigger_reindex().await.expect_err("unauthorized");
    assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
    assert!(!server.coordinator.index_manager().is_rebuilding());

    server.stop().await;
}

#[tokio::test]
async fn test_reindex_command_waits_for_report() {
    let server = LiveServer::start().await;
    let before = server
        .coordinator
        .index_manager()
        .current()
        .map(|g| g.name.clone());

    cli::handle_reindex(None, Some(server.url()), Some(TOKEN.to_string()), true, 30)
        .await
        .expect("reindex command");

    let status = server.coordinator.index_manager().status();
    assert!(!status.running);
    assert_ne!(status.current.map(|g| g.name), before);

    server.stop().await;
}

#[tokio::test]
async fn test_reindex_command_fails_when_service_is_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let result = cli::handle_reindex(
        None,
        Some(format!("http://{}", addr)),
        Some(TOKEN.to_string()),
        false,
        5,
    )
    .await;
    assert!(result.is_err());
}
