use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::Instant;
use tokio_rustls::client::TlsStream;

use crate::capture::FinObserver;
use crate::context::ProbeContext;
use crate::error::ProberError;
use crate::parsers::{h1_alpn_h2, h1_close, h1_incomplete, overbuffer_incomplete, short_alpn_h2};
use crate::probe::{load_probe_definition, ProbeName};
use crate::tls::{DialOutcome, TlsDialer};
use crate::debug;

/// Orchestrates a single probe end to end: parse the target, optionally
/// start the FIN Observer, dial TLS, send the payload, dispatch to the
/// matching parser.
pub struct Runner {
    dialer: TlsDialer,
    probe_dir: PathBuf,
    capture_interface: Option<String>,
}

impl Runner {
    pub fn new(probe_dir: impl Into<PathBuf>, capture_interface: Option<String>) -> Result<Self> {
        Ok(Self {
            dialer: TlsDialer::new()?,
            probe_dir: probe_dir.into(),
            capture_interface,
        })
    }

    pub async fn run_probe(
        &self,
        ctx: &ProbeContext,
        probe: ProbeName,
        server_addr: &str,
        server_name: &str,
    ) -> Result<()> {
        let definition = load_probe_definition(&self.probe_dir, probe)?;

        let mut fin_observer = if probe.needs_fin_observer() {
            let target_ip = resolve_target_ip(server_addr).await?;
            let target_port = parse_port(server_addr)?;
            Some(
                FinObserver::start(self.capture_interface.as_deref(), target_ip, target_port)
                    .await?,
            )
        } else {
            None
        };

        let start_time = fin_observer
            .as_ref()
            .map(|o| o.start_time)
            .unwrap_or_else(Instant::now);

        let outcome = self
            .dialer
            .dial(server_addr, server_name, &definition.alpn)
            .await?;

        let stream = match outcome {
            DialOutcome::Connected(stream) => stream,
            DialOutcome::Categorized(handshake_outcome) => {
                ctx.apply_handshake_outcome(&handshake_outcome);
                if let Some(observer) = fin_observer.take() {
                    observer.stop().await;
                }
                return Ok(());
            }
        };

        let payload = definition.build_payload();
        let stream = send_payload(stream, payload).await?;

        match probe {
            ProbeName::H1Close => {
                let observer = fin_observer
                    .as_mut()
                    .expect("H1-Close always starts a FIN observer");
                h1_close::parse(ctx, stream, observer, start_time).await?;
            }
            ProbeName::OverbufferIncomplete => {
                overbuffer_incomplete::parse(ctx, stream).await?;
            }
            ProbeName::ShortAlpnH2 => {
                short_alpn_h2::parse(ctx, stream).await?;
            }
            ProbeName::H1AlpnH2 => {
                h1_alpn_h2::parse(ctx, stream).await?;
            }
            ProbeName::H1Incomplete => {
                let observer = fin_observer
                    .as_mut()
                    .expect("H1-Incomplete always starts a FIN observer");
                h1_incomplete::parse(ctx, stream, observer).await?;
            }
        }

        if let Some(observer) = fin_observer.take() {
            observer.stop().await;
        }
        Ok(())
    }
}

/// Send the full payload on a separate task, joining on it before handing
/// the recombined stream back to the caller so the parser never reads
/// before the write finishes. A broken pipe is logged and swallowed rather
/// than treated as fatal: the server may legitimately close early after
/// reading enough of a malformed request, and the parser still needs to run
/// its read against the same stream — for Overbuffer-Incomplete that read
/// coming back as EOF is itself the positive Trojan-RS signal. Any other
/// send error is fatal.
async fn send_payload(
    stream: TlsStream<TcpStream>,
    payload: Vec<u8>,
) -> Result<TlsStream<TcpStream>> {
    let (read_half, mut write_half) = tokio::io::split(stream);

    let (write_half, result) = tokio::spawn(async move {
        let result = write_half.write_all(&payload).await.and(write_half.flush().await);
        (write_half, result)
    })
    .await
    .context("payload sender task panicked")?;

    let stream = read_half.unsplit(write_half);

    match result {
        Ok(()) => Ok(stream),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("send error: broken pipe (server likely closed early)");
            Ok(stream)
        }
        Err(err) => Err(ProberError::Fatal(format!("error sending payload: {err}")).into()),
    }
}

fn parse_port(server_addr: &str) -> Result<u16> {
    let (_, port) = server_addr
        .rsplit_once(':')
        .with_context(|| format!("expected host:port, got {server_addr}"))?;
    port.parse::<u16>()
        .with_context(|| format!("invalid port in {server_addr}"))
}

/// Resolve `server_addr`'s host to the IPv4 address the FIN Observer should
/// filter on. The BPF filter is IPv4-only (a bare `src host <ip>`), matching
/// the source tool's scope.
async fn resolve_target_ip(server_addr: &str) -> Result<Ipv4Addr> {
    let mut addrs = lookup_host(server_addr)
        .await
        .with_context(|| format!("error resolving {server_addr}"))?;
    addrs
        .find_map(|addr| match addr.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ProberError::Config(format!("no IPv4 address found for {server_addr}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_rejects_missing_colon() {
        assert!(parse_port("example.com").is_err());
    }

    #[test]
    fn parse_port_reads_trailing_port() {
        assert_eq!(parse_port("example.com:443").unwrap(), 443);
    }

    #[test]
    fn parse_port_rejects_non_numeric_port() {
        assert!(parse_port("example.com:https").is_err());
    }
}
