use std::path::{Path, PathBuf};

use ambari2graphite_core::catalog::{MetricPackage, QueryWindow};
use ambari2graphite_core::config::Config;
use ambari2graphite_core::error::{BridgeError, Result};
use ambari2graphite_core::sink::PointSink;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::pipeline::Publisher;

/// Polls the Ambari REST API package by package, ten metric paths per call.
pub struct AmbariCollector {
    client: Client,
    cluster_url: String,
    username: String,
    password: String,
    packages: Vec<MetricPackage>,
    cache_dir: PathBuf,
    cache_stem: String,
}

impl AmbariCollector {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let (username, password) = cfg.ambari_credentials()?;
        let client = Client::builder()
            .timeout(cfg.ambari.timeout)
            .build()
            .map_err(|e| BridgeError::DataCollection(format!("build http client failed: {e}")))?;

        Ok(Self {
            client,
            cluster_url: cfg.ambari_cluster_url()?,
            username: username.to_string(),
            password: password.to_string(),
            packages: cfg.packages(),
            cache_dir: cfg.cache_dir.clone(),
            cache_stem: cfg.output_file_path()?.to_string(),
        })
    }

    pub fn packages(&self) -> &[MetricPackage] {
        &self.packages
    }

    /// `{cluster_url}/{module}`, tolerating a leading slash on `module`.
    pub fn module_url(&self, module: &str) -> String {
        format!("{}/{}", self.cluster_url, module.trim_start_matches('/'))
    }

    /// Fetches every batch, caches the raw body and publishes the decoded
    /// document. Collection failures abort; document failures are skipped by
    /// the publisher.
    pub async fn collect<S: PointSink>(
        &self,
        window: Option<QueryWindow>,
        publisher: &mut Publisher<S>,
    ) -> Result<()> {
        for (package_idx, package) in self.packages.iter().enumerate() {
            for (batch_idx, batch) in package.batches().enumerate() {
                let body = self.fetch(package, batch, window.as_ref()).await?;
                let doc: Value = serde_json::from_str(&body).map_err(|e| {
                    BridgeError::DataCollection(format!(
                        "ambari returned invalid JSON for {}: {e}",
                        package.module
                    ))
                })?;

                let path = cache_file_path(&self.cache_dir, &self.cache_stem, package_idx, batch_idx);
                write_cache(&path, &body).await?;

                let label = path.display().to_string();
                publisher.publish_value(&label, &doc)?;
            }
        }
        Ok(())
    }

    /// One authenticated GET for a batch; returns the raw response body.
    pub async fn fetch(
        &self,
        package: &MetricPackage,
        batch: &[String],
        window: Option<&QueryWindow>,
    ) -> Result<String> {
        let url = self.module_url(&package.module);
        let params = package.query_params(batch, window);
        debug!(url = %url, metrics = batch.len(), "requesting ambari metrics");

        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&params)
            .send()
            .await
            .map_err(|e| BridgeError::DataCollection(format!("GET {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BridgeError::DataCollection(format!(
                "GET {url} returned {status}"
            )));
        }

        resp.text()
            .await
            .map_err(|e| BridgeError::DataCollection(format!("read body of {url} failed: {e}")))
    }
}

/// Window covering `start..now` when a start date was requested.
pub fn query_window(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<QueryWindow> {
    start.map(|start| QueryWindow::new(start.timestamp(), now.timestamp()))
}

/// `{cache_dir}/{stem}___{package_idx}___{batch_idx}`
pub fn cache_file_path(cache_dir: &Path, stem: &str, package_idx: usize, batch_idx: usize) -> PathBuf {
    cache_dir.join(format!("{stem}___{package_idx}___{batch_idx}"))
}

async fn write_cache(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BridgeError::Io(format!("create {} failed: {e}", parent.display())))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| BridgeError::Io(format!("write {} failed: {e}", path.display())))
}
