mod common;

use std::sync::Arc;

use mirrorbot::ingestion::{EventIngestor, IngestorConfig};
use mirrorbot::services::MirrorService;

use common::{position, FakeVenue, Harness};

fn service(h: &Harness) -> MirrorService {
    let ingestor = EventIngestor::new(
        Arc::new(FakeVenue::default()),
        h.dispatcher.clone(),
        IngestorConfig::default(),
    );
    MirrorService::new(h.registry.clone(), ingestor, h.positions.clone())
}

#[tokio::test]
async fn test_rehydrate_loads_active_positions_and_subscribes() {
    let h = Harness::new();
    h.positions.seed(position("p1", "0xa", "M1", 50));
    h.positions.seed(position("p2", "0xb", "M1", 25));
    let mut closed = position("p3", "0xc", "M2", 10);
    closed.active = false;
    h.positions.seed(closed);

    let svc = service(&h);
    let loaded = svc.rehydrate().await.unwrap();

    assert_eq!(loaded, 2);
    assert_eq!(h.registry.len(), 2);
    assert!(h.registry.find_by_id("p3").is_none());
    assert_eq!(
        svc.ingestor().subscriptions(),
        vec![("M1".to_string(), vec!["0xa".to_string(), "0xb".to_string()])]
    );
}

#[tokio::test]
async fn test_open_persists_registers_and_subscribes() {
    let h = Harness::new();
    let svc = service(&h);

    svc.open_position(position("p1", "0xa", "M1", 50)).await.unwrap();

    assert!(h.positions.stored.lock().contains_key("p1"));
    assert!(h.registry.find_by_id("p1").is_some());
    assert_eq!(svc.ingestor().subscriptions().len(), 1);
}

#[tokio::test]
async fn test_open_leaves_registry_untouched_when_storage_fails() {
    let h = Harness::new();
    *h.positions.fail_saves.lock() = true;
    let svc = service(&h);

    assert!(svc.open_position(position("p1", "0xa", "M1", 50)).await.is_err());
    assert!(h.registry.is_empty());
    assert!(svc.ingestor().subscriptions().is_empty());
}

#[tokio::test]
async fn test_moving_a_position_releases_the_old_subscription() {
    let h = Harness::new();
    let svc = service(&h);

    svc.open_position(position("p1", "0xa", "M1", 50)).await.unwrap();
    svc.open_position(position("p1", "0xb", "M2", 50)).await.unwrap();

    assert_eq!(
        svc.ingestor().subscriptions(),
        vec![("M2".to_string(), vec!["0xb".to_string()])]
    );
}

#[tokio::test]
async fn test_close_is_idempotent_and_keeps_shared_subscriptions() {
    let h = Harness::new();
    let svc = service(&h);
    svc.open_position(position("p1", "0xa", "M1", 50)).await.unwrap();
    svc.open_position(position("p2", "0xa", "M1", 20)).await.unwrap();

    assert!(svc.close_position("p1").await.unwrap());
    assert!(!svc.close_position("p1").await.unwrap());
    // p2 still mirrors 0xa on M1
    assert_eq!(svc.ingestor().subscriptions().len(), 1);

    assert!(svc.close_position("p2").await.unwrap());
    assert!(svc.ingestor().subscriptions().is_empty());
    assert_eq!(h.positions.deactivated.lock().len(), 2);
    assert_eq!(h.positions.deactivated.lock()[0].1, "closed");
}
