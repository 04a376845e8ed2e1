use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncRead;

use super::{spawn_single_read, ReadOutcome};
use crate::belief::Belief;
use crate::capture::FinObserver;
use crate::context::ProbeContext;
use crate::{debug, info};

const FIRST_TIMER: Duration = Duration::from_secs(150);
/// Measured from when the first timer fires, so the cumulative wait is
/// 150s + 445s = 595s from send time.
const SECOND_TIMER: Duration = Duration::from_secs(445);
const THIRD_TIMER: Duration = Duration::from_secs(10);

const RS_WINDOW_LOWER: Duration = Duration::from_secs(595);
const RS_WINDOW_UPPER: Duration = Duration::from_secs(605);

/// The most patient of the five probes: a genuine Trojan-Go or Caddy-Trojan
/// backend can sit on an incomplete HTTP/1.x request for minutes without
/// closing, so this parser nests three timers (150s, 595s, 605s) around a
/// single read, narrowing the candidate set at each boundary.
pub async fn parse<S>(ctx: &ProbeContext, stream: S, fin_observer: &mut FinObserver) -> Result<()>
where
    S: AsyncRead + Unpin + Send + 'static,
{
    let (cancel, mut rx) = spawn_single_read(stream);

    tokio::select! {
        result = &mut rx => {
            log_result(&result);
            read_completed_definitely_not(ctx);
            return Ok(());
        }
        _ = tokio::time::sleep(FIRST_TIMER) => {
            info!("no response received within 150 seconds. possible Trojan-Go, Caddy-Trojan, another Trojan with a Caddy backend, or Caddy itself.");
            ctx.trojans.trojan_go.update(Belief::Possibly);
            ctx.trojans.caddy_trojan.update(Belief::Possibly);
        }
    }

    tokio::select! {
        result = &mut rx => {
            log_result(&result);
            read_completed_definitely_not(ctx);
            return Ok(());
        }
        _ = tokio::time::sleep(SECOND_TIMER) => {
            info!("no response received within 595 seconds. arming a 10-second Trojan-RS check.");
        }
    }

    tokio::select! {
        result = &mut rx => {
            log_result(&result);
            tokio::time::sleep(Duration::from_secs(2)).await;
            match fin_observer.fin_duration() {
                Some(d) if d >= RS_WINDOW_LOWER && d <= RS_WINDOW_UPPER => {
                    info!("response received within 595-605 seconds. definitely Trojan-RS.");
                    ctx.trojans.trojan_rs.update(Belief::Definitely);
                }
                _ => read_completed_definitely_not(ctx),
            }
        }
        _ = tokio::time::sleep(THIRD_TIMER) => {
            info!("no response received within 605 seconds. definitely not Trojan-RS.");
            ctx.trojans.trojan_rs.update(Belief::DefinitelyNot);
            ctx.trojans.trojan_go.update(Belief::Possibly);
            ctx.trojans.caddy_trojan.update(Belief::Possibly);
            cancel.cancel();
        }
    }
    Ok(())
}

fn read_completed_definitely_not(ctx: &ProbeContext) {
    info!("response received. definitely not Trojan-Go or Caddy-Trojan.");
    ctx.trojans.trojan_go.update(Belief::DefinitelyNot);
    ctx.trojans.caddy_trojan.update(Belief::DefinitelyNot);
}

fn log_result(result: &Result<ReadOutcome, tokio::sync::oneshot::error::RecvError>) {
    match result {
        Ok(ReadOutcome::Data(bytes)) => {
            info!("response from server:\n{}", String::from_utf8_lossy(bytes));
        }
        Ok(ReadOutcome::Eof) => debug!("error reading from server: connection closed"),
        Ok(ReadOutcome::Other(err)) => debug!("error reading from server: {err}"),
        Err(_) => debug!("reader task dropped without a result"),
    }
}
