//! Network reachability probe (DNS resolution followed by a TCP connect)

use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use super::{elapsed_ms, Probe, ProbeResult, LAYER_SYSTEM_PROBE};

pub const DEFAULT_DNS_HOST: &str = "api.telegram.org";
pub const DEFAULT_TCP_HOST: &str = "1.1.1.1";
pub const DEFAULT_TCP_PORT: u16 = 53;

/// Where the network probe points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTarget {
    pub dns_host: String,
    pub tcp_host: String,
    pub tcp_port: u16,
}

impl Default for NetworkTarget {
    fn default() -> Self {
        Self {
            dns_host: DEFAULT_DNS_HOST.to_string(),
            tcp_host: DEFAULT_TCP_HOST.to_string(),
            tcp_port: DEFAULT_TCP_PORT,
        }
    }
}

#[async_trait]
pub trait NetProbeTransport: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<()>;

    async fn connect(&self, host: &str, port: u16) -> io::Result<()>;
}

/// Real resolver and connector backed by tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTransport;

#[async_trait]
impl NetProbeTransport for TokioTransport {
    async fn resolve(&self, host: &str) -> io::Result<()> {
        let mut addrs = lookup_host((host, 0)).await?;
        match addrs.next() {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for {}", host),
            )),
        }
    }

    async fn connect(&self, host: &str, port: u16) -> io::Result<()> {
        // Dropping the stream closes it.
        TcpStream::connect((host, port)).await.map(drop)
    }
}

async fn bounded<F>(timeout: Duration, fut: F) -> io::Result<()>
where
    F: std::future::Future<Output = io::Result<()>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
    }
}

pub struct NetworkProbe {
    target: NetworkTarget,
    timeout: Duration,
    transport: Arc<dyn NetProbeTransport>,
}

impl NetworkProbe {
    pub fn new(target: NetworkTarget, timeout: Duration) -> Self {
        Self::with_transport(target, timeout, Arc::new(TokioTransport))
    }

    pub fn with_transport(
        target: NetworkTarget,
        timeout: Duration,
        transport: Arc<dyn NetProbeTransport>,
    ) -> Self {
        Self {
            target,
            timeout,
            transport,
        }
    }
}

#[async_trait]
impl Probe for NetworkProbe {
    fn layer(&self) -> &str {
        LAYER_SYSTEM_PROBE
    }

    async fn check(&self) -> ProbeResult {
        let started = Instant::now();
        let target = &self.target;

        if let Err(e) = bounded(self.timeout, self.transport.resolve(&target.dns_host)).await {
            debug!(host = %target.dns_host, error = %e, "dns probe failed");
            return ProbeResult::failure(
                LAYER_SYSTEM_PROBE,
                format!("dns probe failed: {}", e),
                1,
                elapsed_ms(started),
                "",
            );
        }

        if let Err(e) = bounded(
            self.timeout,
            self.transport.connect(&target.tcp_host, target.tcp_port),
        )
        .await
        {
            debug!(host = %target.tcp_host, port = target.tcp_port, error = %e, "tcp probe failed");
            return ProbeResult::failure(
                LAYER_SYSTEM_PROBE,
                format!("tcp probe failed: {}", e),
                1,
                elapsed_ms(started),
                "",
            );
        }

        ProbeResult::success(
            LAYER_SYSTEM_PROBE,
            0,
            elapsed_ms(started),
            format!(
                "dns={} tcp={}:{}",
                target.dns_host, target.tcp_host, target.tcp_port
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeTransport {
        dns_fails: bool,
        tcp_fails: bool,
        hang: bool,
        connect_hangs: bool,
        connects: AtomicUsize,
    }

    #[async_trait]
    impl NetProbeTransport for FakeTransport {
        async fn resolve(&self, _host: &str) -> io::Result<()> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.dns_fails {
                return Err(io::Error::new(io::ErrorKind::Other, "no dns"));
            }
            Ok(())
        }

        async fn connect(&self, _host: &str, _port: u16) -> io::Result<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.connect_hangs {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.tcp_fails {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            Ok(())
        }
    }

    fn probe(transport: Arc<FakeTransport>) -> NetworkProbe {
        NetworkProbe::with_transport(
            NetworkTarget::default(),
            Duration::from_millis(200),
            transport,
        )
    }

    #[tokio::test]
    async fn test_dns_failure_marks_failure_and_skips_tcp() {
        let transport = Arc::new(FakeTransport {
            dns_fails: true,
            ..Default::default()
        });
        let result = probe(transport.clone()).check().await;
        assert!(!result.ok);
        assert!(result.reason.to_lowercase().contains("dns"));
        assert_eq!(result.code, 1);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tcp_failure_marks_failure() {
        let transport = Arc::new(FakeTransport {
            tcp_fails: true,
            ..Default::default()
        });
        let result = probe(transport).check().await;
        assert!(!result.ok);
        assert!(result.reason.starts_with("tcp probe failed:"));
    }

    #[tokio::test]
    async fn test_success_reports_target() {
        let result = probe(Arc::new(FakeTransport::default())).check().await;
        assert!(result.ok);
        assert_eq!(result.reason, "ok");
        assert_eq!(result.raw_excerpt, "dns=api.telegram.org tcp=1.1.1.1:53");
    }

    #[tokio::test]
    async fn test_hung_resolver_is_bounded_by_timeout() {
        let transport = Arc::new(FakeTransport {
            hang: true,
            ..Default::default()
        });
        let result = probe(transport).check().await;
        assert!(!result.ok);
        assert!(result.reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_hung_connect_is_bounded_by_timeout() {
        let transport = Arc::new(FakeTransport {
            connect_hangs: true,
            ..Default::default()
        });
        let started = Instant::now();
        let result = probe(transport.clone()).check().await;
        assert!(!result.ok);
        assert!(result.reason.starts_with("tcp probe failed:"));
        assert!(result.reason.contains("timed out"));
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connects_to_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = NetworkTarget {
            dns_host: "localhost".to_string(),
            tcp_host: "127.0.0.1".to_string(),
            tcp_port: port,
        };
        let result = NetworkProbe::new(target, Duration::from_secs(2)).check().await;
        assert!(result.ok, "unexpected failure: {}", result.reason);
    }
}
