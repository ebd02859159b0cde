//! Blue/green rebuild tests under concurrent change traffic

#[path = "testutils/mod.rs"]
mod testutils;

use searchsync::index::{RebuildOutcome, RebuildStep};
use searchsync::{
    EntityRow, Freshness, PrimaryStore, QueryOutput, RebuildTrigger, SearchEngine,
};
use std::sync::Arc;
use std::time::Duration;
use testutils::{catalog, eventually, test_config, TestFixture};

async fn wait_for_rebuild(fixture: &TestFixture) {
    let manager = fixture.coordinator.index_manager();
    assert!(eventually(|| async { !manager.is_rebuilding() }).await);
}

#[tokio::test]
async fn test_changes_during_rebuild_survive_swap() {
    let fixture = TestFixture::new(catalog()).await;
    let manager = fixture.coordinator.index_manager();
    let before = manager.current().unwrap();

    fixture.engine.set_latency(Duration::from_millis(20));
    assert_eq!(manager.trigger(), RebuildTrigger::Started);
    assert_eq!(manager.trigger(), RebuildTrigger::AlreadyRunning);

    fixture
        .store
        .upsert(EntityRow::new("p1", "Classic Hoodie").with_price(1.0))
        .await
        .unwrap();
    fixture.store.delete("p2").await.unwrap();
    fixture
        .store
        .upsert(EntityRow::new("p10", "Packable Vest").with_price(75.0))
        .await
        .unwrap();

    wait_for_rebuild(&fixture).await;
    let listener = fixture.coordinator.listener();
    assert!(
        eventually(|| async {
            let stats = listener.stats();
            stats.upserts + stats.deletes == 3
        })
        .await
    );
    fixture.engine.set_latency(Duration::ZERO);

    let status = manager.status();
    let report = status.last_report.unwrap();
    assert!(report.succeeded(), "rebuild failed: {:?}", report.outcome);
    let after = manager.current().unwrap();
    assert_eq!(after.version, before.version + 1);

    let p1 = fixture.engine.get("products", "p1").await.unwrap().unwrap();
    assert_eq!(p1.price, 1.0);
    assert!(fixture.engine.get("products", "p2").await.unwrap().is_none());
    assert!(fixture.engine.get("products", "p10").await.unwrap().is_some());
    assert_eq!(fixture.engine.count("products").await.unwrap(), 4);
    assert_eq!(
        fixture.engine.list_indexes().await.unwrap(),
        vec![after.name.clone()]
    );
}

#[tokio::test]
async fn test_reads_never_lose_the_alias() {
    let mut config = test_config();
    config.cache.enabled = false;
    let fixture = TestFixture::with_config(catalog(), config).await;
    let manager = Arc::clone(fixture.coordinator.index_manager());
    let router = Arc::clone(fixture.coordinator.router());

    fixture.engine.set_latency(Duration::from_millis(5));
    for _ in 0..3 {
        assert_eq!(manager.trigger(), RebuildTrigger::Started);
        while manager.is_rebuilding() {
            let response = router.entity("p3").await.unwrap();
            assert_eq!(response.freshness, Freshness::Fresh);
            assert!(matches!(response.output, QueryOutput::Entity(Some(_))));
        }
    }
    assert_eq!(router.stats().degraded, 0);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_serving_current() {
    let fixture = TestFixture::new(catalog()).await;
    let manager = fixture.coordinator.index_manager();
    let before = manager.current().unwrap();

    fixture.engine.set_fail_bulk(true);
    assert!(manager.rebuild().await.is_err());
    fixture.engine.set_fail_bulk(false);

    assert_eq!(manager.current().unwrap().name, before.name);
    assert!(matches!(
        manager.status().last_report.unwrap().outcome,
        RebuildOutcome::Failed { step: RebuildStep::AwaitBulk, .. }
    ));
    let response = fixture.coordinator.router().entity("p4").await.unwrap();
    assert_eq!(response.freshness, Freshness::Fresh);
    assert!(matches!(response.output, QueryOutput::Entity(Some(_))));
}

#[tokio::test]
async fn test_cancelled_rebuild_discards_temp() {
    let fixture = TestFixture::new(catalog()).await;
    let manager = fixture.coordinator.index_manager();
    let before = manager.current().unwrap();

    fixture.engine.set_latency(Duration::from_millis(20));
    assert_eq!(manager.trigger(), RebuildTrigger::Started);
    assert!(manager.cancel());
    wait_for_rebuild(&fixture).await;
    fixture.engine.set_latency(Duration::ZERO);

    assert_eq!(
        manager.status().last_report.unwrap().outcome,
        RebuildOutcome::Cancelled
    );
    assert_eq!(manager.current().unwrap().name, before.name);
    assert_eq!(
        fixture.engine.list_indexes().await.unwrap(),
        vec![before.name.clone()]
    );
    assert!(!manager.cancel());
}
