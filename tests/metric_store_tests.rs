//! Integration tests for the metric store: batched writes, the rollup
//! cache, and the middleware fan-out across resolutions.

use cyanite::agg::AggregationMethod;
use cyanite::clock::Clock;
use cyanite::config::{MetricStoreConfig, MiddlewareConfig};
use cyanite::stats::Stats;
use cyanite::store::{
    CachingMetricstore, MemorySession, MetricWriter, Metricstore, Resolution, Sample,
};

use std::sync::Arc;
use std::time::Duration;

const T0: i64 = 1_700_000_040; // 60-aligned

fn base_sample(path: &str, time: i64, metric: f64) -> Sample {
    Sample {
        tenant: "acme".into(),
        path: path.into(),
        time,
        metric,
        rollup: 10,
        period: 100,
        ttl: 1_000,
    }
}

fn store_config() -> MetricStoreConfig {
    MetricStoreConfig {
        batch_interval: Duration::from_millis(20),
        ..MetricStoreConfig::default()
    }
}

fn middleware_config() -> MiddlewareConfig {
    MiddlewareConfig {
        grace: Duration::from_secs(5),
        sweep_interval: Duration::from_millis(20),
        rollups: vec![Resolution::new(10, 100), Resolution::new(60, 100)],
        ..MiddlewareConfig::default()
    }
}

fn middleware(
    session: Arc<MemorySession>,
    clock: Arc<Clock>,
) -> (CachingMetricstore, Arc<Stats>) {
    let stats = Arc::new(Stats::new());
    let store = CachingMetricstore::new(
        middleware_config(),
        &store_config(),
        session,
        stats.clone(),
        clock,
    )
    .unwrap();
    (store, stats)
}

#[tokio::test]
async fn test_writer_accumulates_identical_samples() {
    let session = Arc::new(MemorySession::new());
    let stats = Arc::new(Stats::new());
    let writer = MetricWriter::new(&store_config(), session.clone(), stats.clone());

    let mut sample = base_sample("web.srv1.cpu.user", T0, 0.0);
    sample.rollup = 60;
    sample.period = 1440;
    for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
        writer.insert(Sample { metric: v, ..sample.clone() }).await.unwrap();
    }
    writer.shutdown().await;

    assert_eq!(
        session.cell("acme", 60, 1440, "web.srv1.cpu.user", T0),
        Some(vec![1.0, 2.0, 3.0, 4.0, 5.0])
    );

    let snap = stats.snapshot();
    assert_eq!(snap.store_success, 5);
    assert_eq!(snap.store_error, 0);
    assert_eq!(snap.tenant_writes.get("acme"), Some(&5));
}

#[tokio::test]
async fn test_writer_rejects_after_shutdown() {
    let session = Arc::new(MemorySession::new());
    let writer = MetricWriter::new(&store_config(), session, Arc::new(Stats::new()));
    writer.shutdown().await;

    assert!(writer.insert(base_sample("a.b", T0, 1.0)).await.is_err());
    assert!(writer.channel().is_err());
}

#[tokio::test]
async fn test_middleware_fans_base_samples_into_rollups() {
    let session = Arc::new(MemorySession::new());
    let clock = Arc::new(Clock::fixed(T0));
    let (store, _) = middleware(session.clone(), clock);

    // Six base samples across one 60s window
    for i in 0..6 {
        store
            .insert(base_sample("web.srv1.cpu.user", T0 + i * 10, (i + 1) as f64))
            .await
            .unwrap();
    }
    assert_eq!(store.open_buckets(), 1);
    store.shutdown().await;

    // Base resolution written raw, one cell per sample time
    for i in 0..6 {
        assert_eq!(
            session.cell("acme", 10, 100, "web.srv1.cpu.user", T0 + i * 10),
            Some(vec![(i + 1) as f64]),
            "base cell at offset {i}"
        );
    }

    // The 60s window closed into exactly one averaged sample
    assert_eq!(
        session.cell("acme", 60, 100, "web.srv1.cpu.user", T0),
        Some(vec![3.5])
    );
}

#[tokio::test]
async fn test_middleware_routes_non_base_samples_to_cache_only() {
    let session = Arc::new(MemorySession::new());
    let clock = Arc::new(Clock::fixed(T0));
    let (store, _) = middleware(session.clone(), clock);

    let mut sample = base_sample("web.srv1.cpu.user", T0 + 7, 9.0);
    sample.rollup = 60;
    store.insert(sample).await.unwrap();
    store.shutdown().await;

    // Nothing at the base resolution, one aligned 60s cell
    assert!(session.cell("acme", 10, 100, "web.srv1.cpu.user", T0 + 7).is_none());
    assert_eq!(
        session.cell("acme", 60, 100, "web.srv1.cpu.user", T0),
        Some(vec![9.0])
    );
}

#[tokio::test]
async fn test_sweeper_flushes_closed_buckets_without_shutdown() {
    let session = Arc::new(MemorySession::new());
    let clock = Arc::new(Clock::fixed(T0));
    let (store, _) = middleware(session.clone(), clock.clone());

    store
        .insert(base_sample("web.srv1.cpu.user", T0, 2.0))
        .await
        .unwrap();
    store
        .insert(base_sample("web.srv1.cpu.user", T0 + 10, 4.0))
        .await
        .unwrap();

    // Window [T0, T0+60) closes once the clock passes T0 + 60 + grace
    clock.advance(120);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if session
            .cell("acme", 60, 100, "web.srv1.cpu.user", T0)
            .is_some()
        {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for sweeper flush"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(
        session.cell("acme", 60, 100, "web.srv1.cpu.user", T0),
        Some(vec![3.0])
    );
    assert_eq!(store.open_buckets(), 0);
    store.shutdown().await;
}

#[tokio::test]
async fn test_streaming_ingress_dispatches_like_insert() {
    let session = Arc::new(MemorySession::new());
    let clock = Arc::new(Clock::fixed(T0));
    let (store, stats) = middleware(session.clone(), clock);

    let tx = store.channel().unwrap();
    for i in 0..6 {
        tx.send(base_sample("web.srv1.net.rx", T0 + i * 10, 1.0))
            .await
            .unwrap();
    }
    drop(tx);
    store.shutdown().await;

    assert_eq!(
        session.cell("acme", 60, 100, "web.srv1.net.rx", T0),
        Some(vec![1.0])
    );
    // 6 raw writes plus 1 rollup flush
    assert_eq!(stats.snapshot().store_success, 7);
}

#[tokio::test]
async fn test_redelivered_sample_inflates_cell_list() {
    let session = Arc::new(MemorySession::new());
    let clock = Arc::new(Clock::fixed(T0));
    let (store, _) = middleware(session.clone(), clock);

    let sample = base_sample("web.srv1.cpu.user", T0, 5.0);
    store.insert(sample.clone()).await.unwrap();
    store.insert(sample).await.unwrap();
    store.shutdown().await;

    // At-least-once delivery accumulates; read-side reducers absorb it
    assert_eq!(
        session.cell("acme", 10, 100, "web.srv1.cpu.user", T0),
        Some(vec![5.0, 5.0])
    );
}

#[tokio::test]
async fn test_rollup_uses_configured_reducer() {
    let session = Arc::new(MemorySession::new());
    let clock = Arc::new(Clock::fixed(T0));
    let stats = Arc::new(Stats::new());
    let config = MiddlewareConfig {
        rollup_method: AggregationMethod::Max,
        ..middleware_config()
    };
    let store =
        CachingMetricstore::new(config, &store_config(), session.clone(), stats, clock).unwrap();

    for v in [1.0, 7.0, 3.0] {
        store
            .insert(base_sample("web.srv1.cpu.user", T0, v))
            .await
            .unwrap();
    }
    store.shutdown().await;

    assert_eq!(
        session.cell("acme", 60, 100, "web.srv1.cpu.user", T0),
        Some(vec![7.0])
    );
}
