#![allow(clippy::unwrap_used)]
// Integration tests for `MeasurementEngine` with fake link sources, a local
// TCP listener for latency and wiremock speed-test endpoints.

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wlanmeter_core::{
    EngineState, Endpoints, LinkInfoSource, LinkReading, MeasurementEngine, MeasurementMode,
    ProbeError, SizeClass, SpeedClient, SpeedTestConfig, SpeedTester, WlanProbe,
};

// ── Fake link sources ───────────────────────────────────────────────

struct FixedSource(Option<LinkReading>);

impl LinkInfoSource for FixedSource {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>> {
        let reading = self.0.clone();
        Box::pin(async move { reading.ok_or(ProbeError::NotConnected) })
    }
}

/// A wireless query that never answers.
struct HungSource;

impl LinkInfoSource for HungSource {
    fn name(&self) -> &'static str {
        "hung"
    }

    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>> {
        Box::pin(std::future::pending())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn home_reading() -> LinkReading {
    LinkReading {
        interface: Some("wlan0".into()),
        ssid: Some("HomeNet".into()),
        signal_dbm: Some(-62),
        frequency_mhz: Some(2437),
        link_speed_mbps: Some(144.4),
        ..LinkReading::default()
    }
}

fn speed_tester() -> SpeedTester {
    SpeedTester::new(SpeedClient::from_reqwest(reqwest::Client::new()))
        .with_latency_timeout(Duration::from_millis(500))
}

fn engine(source: impl LinkInfoSource + 'static, probe_timeout: Duration) -> MeasurementEngine {
    MeasurementEngine::with_parts(
        WlanProbe::new(Box::new(source), probe_timeout),
        speed_tester(),
    )
}

/// Speed-test endpoints backed by a mock server and a live TCP listener.
async fn local_endpoints() -> (MockServer, TcpListener, SpeedTestConfig) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1_000_000]))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = SpeedTestConfig {
        size: SizeClass::Small,
        skip_upload: false,
        endpoints: Endpoints {
            download: vec![format!("{}/__down?bytes={{bytes}}", server.uri())],
            upload: vec![format!("{}/__up", server.uri())],
            latency_target: listener.local_addr().unwrap().to_string(),
        },
        latency_samples: 3,
    };
    (server, listener, config)
}

/// Endpoints nothing listens on.
async fn dead_endpoints() -> SpeedTestConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    SpeedTestConfig {
        size: SizeClass::Small,
        skip_upload: false,
        endpoints: Endpoints {
            download: vec![format!("http://{addr}/__down?bytes={{bytes}}")],
            upload: vec![format!("http://{addr}/__up")],
            latency_target: addr.to_string(),
        },
        latency_samples: 3,
    }
}

// ── Mode guarantees ─────────────────────────────────────────────────

#[tokio::test]
async fn test_wlan_only_never_has_speed() {
    let (_server, _listener, config) = local_endpoints().await;
    let engine = engine(FixedSource(Some(home_reading())), Duration::from_secs(5));

    let sample = engine.run_once(MeasurementMode::WlanOnly, &config).await;

    let wlan = sample.wlan.unwrap();
    assert_eq!(wlan.ssid, "HomeNet");
    assert_eq!(wlan.channel, 6);
    assert!(sample.speed.is_none());
}

#[tokio::test]
async fn test_speed_only_never_has_wlan() {
    let (_server, _listener, config) = local_endpoints().await;
    let engine = engine(FixedSource(Some(home_reading())), Duration::from_secs(5));

    let sample = engine.run_once(MeasurementMode::SpeedOnly, &config).await;

    assert!(sample.wlan.is_none());
    let speed = sample.speed.unwrap();
    assert!(speed.download_mbps.unwrap() > 0.0);
    assert!(speed.upload_mbps.unwrap() > 0.0);
    assert!(speed.ping_ms.unwrap() >= 0.0);
    assert!(speed.jitter_ms.unwrap() >= 0.0);
    assert_eq!(speed.bytes_downloaded, Some(1_000_000));
    assert_eq!(speed.bytes_uploaded, Some(1_000_000));
    assert_eq!(speed.server.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn test_both_runs_probe_and_speed_test() {
    let (_server, _listener, config) = local_endpoints().await;
    let engine = engine(FixedSource(Some(home_reading())), Duration::from_secs(5));

    let sample = engine.run_once(MeasurementMode::Both, &config).await;

    assert!(sample.wlan.is_some());
    assert!(sample.speed.is_some());
    assert_eq!(*engine.state().borrow(), EngineState::Idle);
}

#[tokio::test]
async fn test_skip_upload_leaves_upload_absent() {
    let (_server, _listener, mut config) = local_endpoints().await;
    config.skip_upload = true;
    let engine = engine(FixedSource(None), Duration::from_secs(5));

    let speed = engine
        .run_once(MeasurementMode::SpeedOnly, &config)
        .await
        .speed
        .unwrap();

    assert!(speed.download_mbps.is_some());
    assert!(speed.upload_mbps.is_none());
    assert!(speed.bytes_uploaded.is_none());
}

#[tokio::test]
async fn test_total_failure_still_yields_a_sample() {
    let config = dead_endpoints().await;
    let engine = engine(FixedSource(None), Duration::from_secs(5));

    let sample = engine.run_once(MeasurementMode::Both, &config).await;

    assert!(sample.wlan.is_none());
    assert!(sample.speed.is_none());
    assert_eq!(sample.to_csv_row().matches(';').count(), 12);
}

// ── Endpoint fallback ───────────────────────────────────────────────

#[tokio::test]
async fn test_download_falls_back_to_next_endpoint() {
    let (server, _listener, mut config) = local_endpoints().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    config.endpoints.download.insert(0, format!("{}/broken", server.uri()));
    config.skip_upload = true;

    let engine = engine(FixedSource(None), Duration::from_secs(5));
    let speed = engine
        .run_once(MeasurementMode::SpeedOnly, &config)
        .await
        .speed
        .unwrap();

    assert_eq!(speed.bytes_downloaded, Some(1_000_000));
}

#[tokio::test]
async fn test_non_2xx_everywhere_leaves_download_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = SpeedTestConfig {
        size: SizeClass::Small,
        skip_upload: true,
        endpoints: Endpoints {
            download: vec![format!("{}/__down", server.uri())],
            upload: Vec::new(),
            latency_target: listener.local_addr().unwrap().to_string(),
        },
        latency_samples: 3,
    };

    let engine = engine(FixedSource(None), Duration::from_secs(5));
    let speed = engine
        .run_once(MeasurementMode::SpeedOnly, &config)
        .await
        .speed
        .unwrap();

    assert!(speed.download_mbps.is_none());
    assert!(speed.ping_ms.is_some());
}

// ── Timeouts & cancellation ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_hung_probe_is_unavailable_within_timeout() {
    let config = SpeedTestConfig::default();
    let engine = engine(HungSource, Duration::from_secs(3));

    let started = tokio::time::Instant::now();
    let sample = engine.run_once(MeasurementMode::WlanOnly, &config).await;

    assert!(sample.wlan.is_none());
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_download_fallbacks_share_one_size_class_timeout() {
    // Accepts connections into the backlog but never answers a request.
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();
    let urls: Vec<Url> = (1..=3)
        .map(|n| Url::parse(&format!("http://{addr}/mirror{n}")).unwrap())
        .collect();

    let started = tokio::time::Instant::now();
    let result = speed_tester()
        .measure_download(&urls, SizeClass::Small, &CancellationToken::new())
        .await;
    let elapsed = started.elapsed();

    assert!(result.is_none());
    assert!(elapsed >= SizeClass::Small.timeout(), "elapsed {elapsed:?}");
    assert!(
        elapsed < SizeClass::Small.timeout() + Duration::from_secs(1),
        "elapsed {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_upload_fallbacks_share_one_size_class_timeout() {
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();
    let urls: Vec<Url> = (1..=3)
        .map(|n| Url::parse(&format!("http://{addr}/up{n}")).unwrap())
        .collect();

    let started = tokio::time::Instant::now();
    let result = speed_tester()
        .measure_upload(&urls, SizeClass::Small, &CancellationToken::new())
        .await;

    assert!(result.is_none());
    assert!(started.elapsed() < SizeClass::Small.timeout() + Duration::from_secs(1));
}

#[tokio::test]
async fn test_cancel_interrupts_running_tick() {
    let config = SpeedTestConfig::default();
    let engine = engine(HungSource, Duration::from_secs(600));

    let running = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run_once(MeasurementMode::WlanOnly, &config).await }
    });

    let mut state = engine.state();
    state
        .wait_for(|s| *s == EngineState::Probing)
        .await
        .unwrap();
    engine.cancel();

    let sample = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .unwrap()
        .unwrap();
    assert!(sample.wlan.is_none());
    assert!(engine.is_cancelled());
}

#[tokio::test]
async fn test_concurrent_ticks_are_serialized() {
    let (_server, _listener, config) = local_endpoints().await;
    let engine = engine(FixedSource(Some(home_reading())), Duration::from_secs(5));

    let (a, b) = tokio::join!(
        engine.run_once(MeasurementMode::WlanOnly, &config),
        engine.run_once(MeasurementMode::WlanOnly, &config),
    );

    assert!(a.wlan.is_some() && b.wlan.is_some());
    assert!(a.timestamp <= b.timestamp);
}
