//! HTTP connection pool settings and request counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub struct ConnectionPoolConfig {
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

impl ConnectionPoolConfig {
    pub fn build_client(&self, insecure: bool) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(self.request_timeout)
            .connect_timeout(self.connection_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_connections);

        if let Some(keepalive) = self.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub failed_requests: u64,
}

/// Lock-free request counters shared by every clone of a client
#[derive(Default)]
pub struct RequestCounters {
    total: AtomicU64,
    failed: AtomicU64,
}

impl RequestCounters {
    pub fn record(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            total_requests: self.total.load(Ordering::Relaxed),
            failed_requests: self.failed.load(Ordering::Relaxed),
        }
    }
}
