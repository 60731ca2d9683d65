use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::{MetricPackage, default_packages};
use crate::error::{BridgeError, Result};

pub const DEFAULT_GRAPHITE_PORT: u16 = 2003;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ambari: AmbariConfig,
    pub graphite: GraphiteConfig,
    pub cache_dir: PathBuf,
    pub packages: Vec<MetricPackage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbariConfig {
    pub subdomain: Option<String>,
    pub cluster_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_url: Option<String>,
    pub cluster_label: Option<String>,
    pub output_file_path: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphiteConfig {
    pub url: Option<String>,
    pub base_prefix: Option<String>,
    pub protocol: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ambari: AmbariConfig {
                subdomain: None,
                cluster_name: None,
                username: None,
                password: None,
                base_url: None,
                cluster_label: None,
                output_file_path: None,
                timeout: Duration::from_secs(30),
            },
            graphite: GraphiteConfig {
                url: None,
                base_prefix: None,
                protocol: "tcp".to_string(),
                timeout: Duration::from_secs(5),
            },
            cache_dir: PathBuf::from("."),
            packages: Vec::new(),
        }
    }
}

impl Config {
    /// Reads the config file, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            BridgeError::Configuration(format!("failed reading {}: {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&raw, &path.display().to_string())?;
        apply_overrides(&mut cfg, load_env_overrides(), "environment")?;
        Ok(cfg)
    }

    pub fn from_toml_str(raw: &str, source: &str) -> Result<Self> {
        let parsed: ConfigFile = toml::from_str(raw)
            .map_err(|e| BridgeError::Configuration(format!("failed parsing {source}: {e}")))?;

        let mut cfg = Self::default();
        if let Some(packages) = parsed.packages {
            cfg.packages = packages;
        }
        if let Some(dir) = parsed.cache_dir {
            cfg.cache_dir = dir;
        }
        let overrides = ConfigOverrides::from_sections(parsed.ambari, parsed.graphite);
        apply_overrides(&mut cfg, overrides, source)?;
        Ok(cfg)
    }

    pub fn cluster_name(&self) -> Result<&str> {
        require(&self.ambari.cluster_name, "ambari.cluster_name")
    }

    /// Label substituted into `graphite.base_prefix`.
    pub fn cluster_label(&self) -> Result<&str> {
        match non_empty(&self.ambari.cluster_label) {
            Some(label) => Ok(label),
            None => self.cluster_name(),
        }
    }

    /// Stem of cached response file names.
    pub fn output_file_path(&self) -> Result<&str> {
        match non_empty(&self.ambari.output_file_path) {
            Some(path) => Ok(path),
            None => self.cluster_name(),
        }
    }

    pub fn ambari_credentials(&self) -> Result<(&str, &str)> {
        Ok((
            require(&self.ambari.username, "ambari.username")?,
            require(&self.ambari.password, "ambari.password")?,
        ))
    }

    /// Base of the cluster REST API, without a trailing slash.
    pub fn ambari_cluster_url(&self) -> Result<String> {
        let cluster = self.cluster_name()?;
        let root = match non_empty(&self.ambari.base_url) {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let subdomain = require(&self.ambari.subdomain, "ambari.subdomain")?;
                format!("https://{subdomain}.azurehdinsight.net")
            }
        };
        Ok(format!("{root}/api/v1/clusters/{cluster}"))
    }

    /// `host:port` of the Graphite receiver.
    pub fn graphite_addr(&self) -> Result<String> {
        let url = require(&self.graphite.url, "graphite.url")?;
        let bare = url
            .trim_start_matches("tcp://")
            .trim_start_matches("udp://")
            .trim_end_matches('/');
        // A bare IPv6 host has several colons; a port needs brackets there.
        let has_port = bare.rsplit_once(':').is_some_and(|(host, port)| {
            port.parse::<u16>().is_ok() && (host.ends_with(']') || !host.contains(':'))
        });
        if has_port {
            Ok(bare.to_string())
        } else if bare.contains(':') && !bare.starts_with('[') {
            Ok(format!("[{bare}]:{DEFAULT_GRAPHITE_PORT}"))
        } else {
            Ok(format!("{bare}:{DEFAULT_GRAPHITE_PORT}"))
        }
    }

    /// `graphite.base_prefix` with the cluster label substituted.
    pub fn graphite_prefix(&self) -> Result<String> {
        let template = require(&self.graphite.base_prefix, "graphite.base_prefix")?;
        Ok(render_prefix(template, self.cluster_label()?))
    }

    /// Configured packages, or the built-in catalog when none are listed.
    pub fn packages(&self) -> Vec<MetricPackage> {
        if self.packages.is_empty() {
            default_packages()
        } else {
            self.packages.clone()
        }
    }
}

/// Substitutes `{}` and `{0}` placeholders with `label`.
pub fn render_prefix(template: &str, label: &str) -> String {
    template.replace("{0}", label).replace("{}", label)
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    ambari: Option<AmbariSection>,
    graphite: Option<GraphiteSection>,
    cache_dir: Option<PathBuf>,
    packages: Option<Vec<MetricPackage>>,
}

#[derive(Debug, Default, Deserialize)]
struct AmbariSection {
    subdomain: Option<String>,
    cluster_name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    base_url: Option<String>,
    cluster_label: Option<String>,
    output_file_path: Option<String>,
    timeout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphiteSection {
    url: Option<String>,
    base_prefix: Option<String>,
    protocol: Option<String>,
    timeout: Option<String>,
}

#[derive(Debug, Default)]
struct ConfigOverrides {
    ambari: AmbariSection,
    graphite: GraphiteSection,
}

impl ConfigOverrides {
    fn from_sections(ambari: Option<AmbariSection>, graphite: Option<GraphiteSection>) -> Self {
        Self {
            ambari: ambari.unwrap_or_default(),
            graphite: graphite.unwrap_or_default(),
        }
    }
}

fn load_env_overrides() -> ConfigOverrides {
    ConfigOverrides {
        ambari: AmbariSection {
            username: env::var("AMBARI2GRAPHITE_AMBARI_USERNAME").ok(),
            password: env::var("AMBARI2GRAPHITE_AMBARI_PASSWORD").ok(),
            ..AmbariSection::default()
        },
        graphite: GraphiteSection {
            url: env::var("AMBARI2GRAPHITE_GRAPHITE_URL").ok(),
            ..GraphiteSection::default()
        },
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    let ConfigOverrides { ambari, graphite } = overrides;

    if let Some(v) = ambari.subdomain {
        cfg.ambari.subdomain = Some(v);
    }
    if let Some(v) = ambari.cluster_name {
        cfg.ambari.cluster_name = Some(v);
    }
    if let Some(v) = ambari.username {
        cfg.ambari.username = Some(v);
    }
    if let Some(v) = ambari.password {
        cfg.ambari.password = Some(v);
    }
    if let Some(v) = ambari.base_url {
        cfg.ambari.base_url = Some(v);
    }
    if let Some(v) = ambari.cluster_label {
        cfg.ambari.cluster_label = Some(v);
    }
    if let Some(v) = ambari.output_file_path {
        cfg.ambari.output_file_path = Some(v);
    }
    if let Some(v) = ambari.timeout {
        cfg.ambari.timeout = humantime::parse_duration(&v).map_err(|e| {
            BridgeError::Configuration(format!("bad ambari.timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = graphite.url {
        cfg.graphite.url = Some(v);
    }
    if let Some(v) = graphite.base_prefix {
        cfg.graphite.base_prefix = Some(v);
    }
    if let Some(v) = graphite.protocol {
        match v.to_ascii_lowercase().as_str() {
            "tcp" | "udp" => cfg.graphite.protocol = v.to_ascii_lowercase(),
            _ => {
                return Err(BridgeError::Configuration(format!(
                    "bad graphite.protocol in {source}: expected tcp or udp (value={v})"
                )));
            }
        }
    }
    if let Some(v) = graphite.timeout {
        cfg.graphite.timeout = humantime::parse_duration(&v).map_err(|e| {
            BridgeError::Configuration(format!(
                "bad graphite.timeout in {source}: {e} (value={v})"
            ))
        })?;
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    non_empty(value)
        .ok_or_else(|| BridgeError::Configuration(format!("missing required key {key}")))
}
