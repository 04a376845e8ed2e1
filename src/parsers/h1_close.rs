use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncRead;
use tokio::time::Instant;

use super::{read_once, ReadOutcome};
use crate::backend::{extract_backend_type, update_web_server_state};
use crate::belief::Belief;
use crate::capture::FinObserver;
use crate::context::ProbeContext;
use crate::info;

const GAP_LOWER: Duration = Duration::from_secs(29);
const GAP_UPPER: Duration = Duration::from_secs(31);

/// Correlates the application-level response with the TCP FIN the FIN
/// Observer records on the same flow. Trojan-GFW forwards the request to
/// its backend, then tears the backend connection down roughly 30 seconds
/// later — a gap of 29-31s between response and FIN is that fingerprint.
pub async fn parse<S>(
    ctx: &ProbeContext,
    mut stream: S,
    fin_observer: &mut FinObserver,
    start_time: Instant,
) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let outcome = read_once(&mut stream).await;
    let response_time = Instant::now();
    let response_duration = response_time.saturating_duration_since(start_time);

    let body = match outcome {
        ReadOutcome::Data(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        ReadOutcome::Eof => String::new(),
        ReadOutcome::Other(err) => {
            info!("error reading from server: {err}");
            String::new()
        }
    };
    info!("response from server:\n{body}");

    let fin_duration = fin_observer.wait_for_fin().await;
    let gap = fin_duration.saturating_sub(response_duration);

    if gap >= GAP_LOWER && gap <= GAP_UPPER {
        info!("time difference: {:.1}s. definitely a Trojan-GFW.", gap.as_secs_f64());
        ctx.trojans.trojan_gfw.update(Belief::Definitely);
        return Ok(());
    }

    info!("time difference: {:.1}s. definitely not a Trojan-GFW server.", gap.as_secs_f64());
    ctx.trojans.trojan_gfw.update(Belief::DefinitelyNot);
    ctx.trojans.trojan_go.update(Belief::Possibly);
    ctx.trojans.caddy_trojan.update(Belief::Possibly);
    ctx.trojans.trojan_r.update(Belief::Possibly);
    ctx.trojans.trojan_rs.update(Belief::Possibly);

    let backend = extract_backend_type(&body);
    update_web_server_state(&backend, &ctx.web_servers);
    Ok(())
}
