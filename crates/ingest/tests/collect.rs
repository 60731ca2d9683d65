use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use ambari2graphite_core::config::Config;
use ambari2graphite_core::error::BridgeError;
use ambari2graphite_core::model::PublishedPoint;
use ambari2graphite_ingest::ambari::AmbariCollector;
use ambari2graphite_ingest::pipeline::Publisher;
use axum::Router;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;

#[derive(Clone, Default)]
struct MockAmbari {
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

async fn cluster_module(
    State(state): State<MockAmbari>,
    UrlPath(module): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Basic YWRtaW46c2VjcmV0" {
        return (StatusCode::FORBIDDEN, String::new());
    }

    state.requests.lock().unwrap().push((
        module.clone(),
        params.get("fields").cloned().unwrap_or_default(),
    ));

    match module.as_str() {
        "services/HDFS/components/NAMENODE" => {
            (StatusCode::OK, testkit::component_document().to_string())
        }
        "host_components" => (StatusCode::OK, testkit::host_list_document().to_string()),
        "broken" => (StatusCode::OK, "<html>maintenance</html>".to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, String::new()),
    }
}

async fn spawn_mock() -> (SocketAddr, MockAmbari) {
    let state = MockAmbari::default();
    let app = Router::new()
        .route("/api/v1/clusters/hdi/{*module}", get(cluster_module))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn config(addr: SocketAddr, cache_dir: &Path, packages: &str) -> Config {
    let raw = format!(
        r#"
cache_dir = "{}"

[ambari]
cluster_name = "hdi"
username = "admin"
password = "secret"
base_url = "http://{addr}"

[graphite]
url = "127.0.0.1:2003"
base_prefix = "hdinsight.{{}}"

{packages}
"#,
        cache_dir.display()
    );
    Config::from_toml_str(&raw, "test").unwrap()
}

#[tokio::test]
async fn collects_batches_caches_and_publishes() -> anyhow::Result<()> {
    let (addr, mock) = spawn_mock().await;
    let cache = tempfile::tempdir()?;

    let metrics: Vec<String> = (0..12)
        .map(|i| format!("\"metrics/jvm/m{i}\""))
        .collect();
    let packages = format!(
        r#"
[[packages]]
module = "services/HDFS/components/NAMENODE"
metrics = [{}]

[[packages]]
module = "host_components"
metrics = ["metrics/disk/read_bytes"]
params = {{ "HostRoles/component_name" = "DATANODE" }}
"#,
        metrics.join(", ")
    );
    let cfg = config(addr, cache.path(), &packages);

    let collector = AmbariCollector::from_config(&cfg)?;
    let mut publisher = Publisher::new(Vec::<PublishedPoint>::new(), None);
    collector.collect(None, &mut publisher).await?;

    let requests = mock.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].1.split(',').count(), 10);
    assert_eq!(requests[1].1, "metrics/jvm/m10._avg,metrics/jvm/m11._avg");
    assert_eq!(requests[2].0, "host_components");

    for name in ["hdi___0___0", "hdi___0___1", "hdi___1___0"] {
        assert!(cache.path().join(name).is_file(), "missing cache file {name}");
    }

    let summary = publisher.summary();
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.skipped, 0);

    let points = publisher.into_sink();
    assert_eq!(&points[..2], testkit::component_points().as_slice());
    assert!(points.iter().any(|p| p.path == "wn0.DATANODEMetrics.disk.read_bytes"));
    assert_eq!(points.len(), 8);
    Ok(())
}

#[tokio::test]
async fn http_errors_abort_collection() -> anyhow::Result<()> {
    let (addr, _mock) = spawn_mock().await;
    let cache = tempfile::tempdir()?;
    let cfg = config(
        addr,
        cache.path(),
        "[[packages]]\nmodule = \"services/UNKNOWN\"\nmetrics = [\"metrics/x\"]\n",
    );

    let collector = AmbariCollector::from_config(&cfg)?;
    let mut publisher = Publisher::new(Vec::<PublishedPoint>::new(), None);
    let err = collector.collect(None, &mut publisher).await.unwrap_err();
    assert!(matches!(err, BridgeError::DataCollection(ref msg) if msg.contains("500")));
    Ok(())
}

#[tokio::test]
async fn non_json_body_is_collection_error() -> anyhow::Result<()> {
    let (addr, _mock) = spawn_mock().await;
    let cache = tempfile::tempdir()?;
    let cfg = config(
        addr,
        cache.path(),
        "[[packages]]\nmodule = \"broken\"\nmetrics = [\"metrics/x\"]\n",
    );

    let collector = AmbariCollector::from_config(&cfg)?;
    let mut publisher = Publisher::new(Vec::<PublishedPoint>::new(), None);
    let err = collector.collect(None, &mut publisher).await.unwrap_err();
    assert!(matches!(err, BridgeError::DataCollection(_)));
    assert!(!cache.path().join("hdi___0___0").exists());
    Ok(())
}

#[tokio::test]
async fn rejected_credentials_surface_status() -> anyhow::Result<()> {
    let (addr, _mock) = spawn_mock().await;
    let cache = tempfile::tempdir()?;
    let mut cfg = config(
        addr,
        cache.path(),
        "[[packages]]\nmodule = \"host_components\"\nmetrics = [\"metrics/x\"]\n",
    );
    cfg.ambari.password = Some("wrong".to_string());

    let collector = AmbariCollector::from_config(&cfg)?;
    let mut publisher = Publisher::new(Vec::<PublishedPoint>::new(), None);
    let err = collector.collect(None, &mut publisher).await.unwrap_err();
    assert!(matches!(err, BridgeError::DataCollection(ref msg) if msg.contains("403")));
    Ok(())
}
