use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use pcap::{Active, Capture, Device};
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::frame;
use crate::error::ProberError;

/// How long a single blocking read waits before the capture loop re-checks
/// the cancellation token. Keeps the capture thread responsive to shutdown
/// without busy-looping.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

const SNAPLEN: i32 = 1600;

/// Passively captures the first TCP FIN on the target flow and records its
/// arrival time relative to capture start.
///
/// Runs on a blocking thread (libpcap's capture API is synchronous) and
/// publishes `fin_duration` through a `watch` channel the async side can
/// poll or wait on.
pub struct FinObserver {
    pub start_time: Instant,
    fin_duration: watch::Receiver<Option<Duration>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl FinObserver {
    /// Open the capture and start watching for a FIN from `target_ip:target_port`.
    /// `interface` of `None` captures on the pseudo-device `any`, listening
    /// across every interface by default.
    pub async fn start(interface: Option<&str>, target_ip: Ipv4Addr, target_port: u16) -> Result<Self> {
        let filter = format!("tcp and src host {target_ip} and src port {target_port}");
        let device = resolve_device(interface)?;

        let (ready_tx, ready_rx) = oneshot::channel::<Result<Instant, String>>();
        let (fin_tx, fin_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_for_task = cancel.clone();

        let task = tokio::task::spawn_blocking(move || {
            capture_loop(device, filter, target_ip, target_port, ready_tx, fin_tx, cancel_for_task)
        });

        let start_time = ready_rx
            .await
            .context("fin observer task dropped before signaling readiness")?
            .map_err(ProberError::Capture)?;

        Ok(Self {
            start_time,
            fin_duration: fin_rx,
            cancel,
            task,
        })
    }

    /// Non-blocking read of the current `fin_duration`, if the FIN has
    /// already been observed.
    pub fn fin_duration(&self) -> Option<Duration> {
        *self.fin_duration.borrow()
    }

    /// Block (cooperatively) until `fin_duration` is set, polling once a
    /// second — the async equivalent of the original's `for finTime.IsZero()
    /// { time.Sleep(1 * time.Second) }`.
    pub async fn wait_for_fin(&mut self) -> Duration {
        loop {
            if let Some(d) = *self.fin_duration.borrow() {
                return d;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// Stop the capture thread. Safe to call more than once and safe to
    /// skip — the thread also stops on its own once the underlying
    /// `JoinHandle` is dropped at process exit, but probes that no longer
    /// need the observer should call this promptly to free the capture
    /// handle.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

#[cfg(test)]
impl FinObserver {
    /// Build an observer whose `fin_duration` is driven directly through the
    /// returned sender, bypassing a live packet capture entirely — for
    /// tests that need to correlate a parser's timing logic against a
    /// chosen FIN arrival without a capture device.
    pub(crate) fn mock(start_time: Instant) -> (Self, watch::Sender<Option<Duration>>) {
        let (fin_tx, fin_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(async {});
        (
            Self {
                start_time,
                fin_duration: fin_rx,
                cancel,
                task,
            },
            fin_tx,
        )
    }
}

fn resolve_device(interface: Option<&str>) -> Result<Device> {
    match interface {
        Some(name) => Device::list()
            .context("failed to list capture devices")?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ProberError::Capture(format!("no such capture device: {name}")).into()),
        None => Ok(Device {
            name: "any".to_string(),
            desc: None,
            addresses: Vec::new(),
            flags: pcap::DeviceFlags::empty(),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn capture_loop(
    device: Device,
    filter: String,
    target_ip: Ipv4Addr,
    target_port: u16,
    ready_tx: oneshot::Sender<Result<Instant, String>>,
    fin_tx: watch::Sender<Option<Duration>>,
    cancel: CancellationToken,
) {
    let mut capture: Capture<Active> = match Capture::from_device(device)
        .and_then(|c| c.promisc(true).snaplen(SNAPLEN).timeout(POLL_TIMEOUT.as_millis() as i32).open())
    {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("error opening capture device: {e}")));
            return;
        }
    };

    if let Err(e) = capture.filter(&filter, true) {
        let _ = ready_tx.send(Err(format!("error setting BPF filter: {e}")));
        return;
    }

    let linktype = capture.get_datalink();
    let start = Instant::now();
    if ready_tx.send(Ok(start)).is_err() {
        return;
    }

    loop {
        if cancel.is_cancelled() {
            return;
        }
        match capture.next_packet() {
            Ok(packet) => {
                if let Some(obs) = frame::parse(linktype, packet.data) {
                    if frame::is_target_fin(&obs, target_ip, target_port) {
                        let _ = fin_tx.send(Some(start.elapsed()));
                        return;
                    }
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(_) => return,
        }
    }
}
