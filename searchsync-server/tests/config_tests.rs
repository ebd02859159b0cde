//! Configuration loading and persistent-store startup

use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use searchsync::config::{ENV_ADMIN_TOKEN, ENV_BIND, ENV_CONFIG, ENV_DATA_DIR, ENV_STORE};
use searchsync::cache::backend::MemoryCacheBackend;
use searchsync::store::StoreKind;
use searchsync::{
    EntityRow, MemoryPrimaryStore, MemorySearchEngine, PrimaryStore, ServiceConfig,
    SyncCoordinator,
};

fn clear_env() {
    for var in [ENV_CONFIG, ENV_BIND, ENV_ADMIN_TOKEN, ENV_DATA_DIR, ENV_STORE] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"server": {{"bind_addr": "127.0.0.1:7000", "admin_token": "from-file"}}}}"#
    )
    .unwrap();

    std::env::set_var(ENV_BIND, "0.0.0.0:9090");
    std::env::set_var(ENV_ADMIN_TOKEN, "from-env");
    let config = ServiceConfig::load(Some(file.path())).unwrap();
    clear_env();

    assert_eq!(config.server.bind_addr, "0.0.0.0:9090");
    assert_eq!(config.server.admin_token.as_deref(), Some("from-env"));
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"index": {{"base_name": "catalog"}}}}"#).unwrap();

    std::env::set_var(ENV_CONFIG, file.path());
    let config = ServiceConfig::load(None).unwrap();
    clear_env();

    assert_eq!(config.index.base_name, "catalog");
}

#[test]
#[serial]
fn test_sled_store_without_data_dir_rejected() {
    clear_env();
    std::env::set_var(ENV_STORE, "sled");
    let result = ServiceConfig::load(None);
    clear_env();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_sled_backed_service_indexes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::default();
    config.server.store = StoreKind::Sled;
    config.server.data_dir = Some(dir.path().to_path_buf());
    config.index.retry_backoff = Duration::from_millis(1);

    let coordinator = SyncCoordinator::from_config(config).await.unwrap();
    assert_eq!(coordinator.store().kind(), StoreKind::Sled);
    assert_eq!(coordinator.cache().backend_name(), "tiered");

    coordinator
        .store()
        .upsert(EntityRow::new("p1", "Classic Hoodie").with_price(59.0))
        .await
        .unwrap();
    assert_eq!(coordinator.store().count().await.unwrap(), 1);

    let report = coordinator.index_manager().rebuild().await.unwrap();
    assert_eq!(report.documents_indexed, 1);
    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_versions_restored_from_shared_backend() {
    let backend = Arc::new(MemoryCacheBackend::new(100));
    let start = || {
        SyncCoordinator::from_parts(
            ServiceConfig::in_memory(),
            Arc::new(MemorySearchEngine::new()),
            Arc::new(MemoryPrimaryStore::new()),
            backend.clone(),
        )
    };

    let first = start().await.unwrap();
    first.dispatcher().invalidate_namespace("search").await;
    first.dispatcher().invalidate_namespace("search").await;
    assert_eq!(first.cache().versions().current("search"), 3);
    first.shutdown().await;

    let second = start().await.unwrap();
    assert_eq!(second.cache().versions().current("search"), 3);
    assert_eq!(second.cache().versions().current("listing"), 1);
    second.shutdown().await;
}
