use std::net::SocketAddr;
use std::time::Duration;

use ambari2graphite_core::config::Config;
use ambari2graphite_core::error::{BridgeError, Result};
use ambari2graphite_core::model::PublishedPoint;
use ambari2graphite_core::sink::PointSink;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct ForwardConfig {
    pub addr: String,
    pub prefix: String,
    pub protocol: ForwardProtocol,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardProtocol {
    Tcp,
    Udp,
}

impl ForwardProtocol {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Self::Udp,
            _ => Self::Tcp,
        }
    }
}

impl ForwardConfig {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            addr: cfg.graphite_addr()?,
            prefix: cfg.graphite_prefix()?,
            protocol: ForwardProtocol::parse(&cfg.graphite.protocol),
            timeout: cfg.graphite.timeout,
        })
    }
}

/// Graphite plaintext sink. Lines are queued by `emit` and written in order
/// by a background task owning the socket.
pub struct GraphiteSink {
    prefix: String,
    tx: mpsc::UnboundedSender<String>,
    writer: JoinHandle<Result<u64>>,
}

impl GraphiteSink {
    pub async fn connect(cfg: ForwardConfig) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer = match cfg.protocol {
            ForwardProtocol::Tcp => {
                let stream = tokio::time::timeout(cfg.timeout, TcpStream::connect(&cfg.addr))
                    .await
                    .map_err(|_| {
                        BridgeError::Sink(format!("timed out connecting to graphite {}", cfg.addr))
                    })?
                    .map_err(|e| {
                        BridgeError::Sink(format!("connect graphite {} failed: {e}", cfg.addr))
                    })?;
                tokio::spawn(run_tcp_writer(stream, rx))
            }
            ForwardProtocol::Udp => {
                let target = resolve(&cfg.addr).await?;
                let bind_addr = if target.is_ipv4() {
                    "0.0.0.0:0"
                } else {
                    "[::]:0"
                };
                let socket = UdpSocket::bind(bind_addr)
                    .await
                    .map_err(|e| BridgeError::Sink(format!("bind udp socket failed: {e}")))?;
                socket.connect(target).await.map_err(|e| {
                    BridgeError::Sink(format!("connect graphite {target} failed: {e}"))
                })?;
                tokio::spawn(run_udp_writer(socket, rx))
            }
        };

        tracing::info!(addr = %cfg.addr, prefix = %cfg.prefix, protocol = ?cfg.protocol, "graphite sink ready");
        Ok(Self {
            prefix: cfg.prefix,
            tx,
            writer,
        })
    }

    /// Closes the queue, waits for the writer to drain it and returns the
    /// number of lines sent.
    pub async fn shutdown(self) -> Result<u64> {
        drop(self.tx);
        self.writer
            .await
            .map_err(|e| BridgeError::Sink(format!("graphite writer join failed: {e}")))?
    }
}

impl PointSink for GraphiteSink {
    fn emit(&mut self, point: PublishedPoint) -> Result<()> {
        self.tx
            .send(format_line(&self.prefix, &point))
            .map_err(|_| BridgeError::Sink("graphite writer stopped".to_string()))
    }
}

/// `"{prefix}.{path} {value} {timestamp}\n"`; whitespace in the path is
/// replaced with `_` since it would split the line.
pub fn format_line(prefix: &str, point: &PublishedPoint) -> String {
    let path: String = point
        .path
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if prefix.is_empty() {
        format!("{path} {} {}\n", point.value, point.timestamp)
    } else {
        format!("{prefix}.{path} {} {}\n", point.value, point.timestamp)
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(addr)
        .await
        .map_err(|e| BridgeError::Sink(format!("resolve graphite {addr} failed: {e}")))?
        .next()
        .ok_or_else(|| BridgeError::Sink(format!("graphite {addr} resolved to no address")))
}

async fn run_tcp_writer(stream: TcpStream, mut rx: mpsc::UnboundedReceiver<String>) -> Result<u64> {
    let mut stream = BufWriter::new(stream);
    let mut sent = 0;
    while let Some(line) = rx.recv().await {
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BridgeError::Sink(format!("graphite write failed: {e}")))?;
        sent += 1;
        if rx.is_empty() {
            stream
                .flush()
                .await
                .map_err(|e| BridgeError::Sink(format!("graphite flush failed: {e}")))?;
        }
    }
    stream
        .shutdown()
        .await
        .map_err(|e| BridgeError::Sink(format!("graphite shutdown failed: {e}")))?;
    Ok(sent)
}

async fn run_udp_writer(socket: UdpSocket, mut rx: mpsc::UnboundedReceiver<String>) -> Result<u64> {
    let mut sent = 0;
    while let Some(line) = rx.recv().await {
        socket
            .send(line.as_bytes())
            .await
            .map_err(|e| BridgeError::Sink(format!("graphite send failed: {e}")))?;
        sent += 1;
    }
    Ok(sent)
}
