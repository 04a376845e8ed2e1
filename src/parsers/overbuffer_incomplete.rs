use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncRead;

use super::{spawn_single_read, starts_with_http, ReadOutcome};
use crate::backend::{extract_backend_type, update_web_server_state};
use crate::belief::Belief;
use crate::context::ProbeContext;
use crate::{debug, info};

const TIMER: Duration = Duration::from_secs(20);

/// A true Trojan-Go never replies to an oversized, malformed request; a
/// genuine HTTP server or another Trojan implementation either answers or
/// drops the connection well inside 20 seconds.
pub async fn parse<S>(ctx: &ProbeContext, stream: S) -> Result<()>
where
    S: AsyncRead + Unpin + Send + 'static,
{
    let (cancel, mut rx) = spawn_single_read(stream);

    tokio::select! {
        _ = tokio::time::sleep(TIMER) => {
            info!("no response received within 20 seconds. definitely a Trojan-Go.");
            ctx.trojans.trojan_go.update(Belief::Definitely);
            cancel.cancel();
        }
        result = &mut rx => {
            let outcome = result.context("reader task dropped without a result")?;
            handle(ctx, outcome);
        }
    }
    Ok(())
}

fn handle(ctx: &ProbeContext, outcome: ReadOutcome) {
    match outcome {
        ReadOutcome::Eof => {
            info!("error reading from server: connection closed. likely Trojan-RS.");
            ctx.trojans.trojan_rs.update(Belief::Definitely);
        }
        ReadOutcome::Other(err) => {
            debug!("error reading from server: {err}");
        }
        ReadOutcome::Data(bytes) => {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            info!("response from server:\n{body}");
            if starts_with_http(&bytes) {
                info!("received HTTP response. definitely not a Trojan-Go.");
                ctx.trojans.trojan_go.update(Belief::DefinitelyNot);
                ctx.trojans.trojan_gfw.update(Belief::Possibly);
                ctx.trojans.caddy_trojan.update(Belief::Possibly);
                ctx.trojans.trojan_r.update(Belief::Possibly);
                ctx.trojans.trojan_rs.update(Belief::Possibly);

                let backend = extract_backend_type(&body);
                update_web_server_state(&backend, &ctx.web_servers);
            } else {
                info!("no HTTP prefix found. possible Trojan-RS.");
                ctx.trojans.trojan_rs.update(Belief::Definitely);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_prefixed_data_flips_go_to_definitely_not() {
        let ctx = ProbeContext::new();
        handle(&ctx, ReadOutcome::Data(b"HTTP/1.1 200 OK\r\n\r\n".to_vec()));
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.trojans.trojan_rs.get(), Belief::Possibly);
    }

    #[test]
    fn non_http_data_marks_trojan_rs_definitely() {
        let ctx = ProbeContext::new();
        handle(&ctx, ReadOutcome::Data(b"garbage".to_vec()));
        assert_eq!(ctx.trojans.trojan_rs.get(), Belief::Definitely);
    }

    #[test]
    fn eof_marks_trojan_rs_definitely() {
        let ctx = ProbeContext::new();
        handle(&ctx, ReadOutcome::Eof);
        assert_eq!(ctx.trojans.trojan_rs.get(), Belief::Definitely);
    }

    #[test]
    fn other_read_error_leaves_beliefs_untouched() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Other(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        );
        assert_eq!(ctx.trojans.trojan_rs.get(), Belief::Initially);
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::Initially);
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_second_timer_wins_when_nothing_ever_arrives() {
        let ctx = ProbeContext::new();
        let (_keep_alive, server) = tokio::io::duplex(64);
        parse(&ctx, server).await.unwrap();
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::Definitely);
    }

    #[tokio::test(start_paused = true)]
    async fn http_response_arriving_before_the_timer_wins_the_race() {
        use tokio::io::AsyncWriteExt;

        let ctx = ProbeContext::new();
        let (mut client, server) = tokio::io::duplex(256);
        client
            .write_all(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n")
            .await
            .unwrap();

        parse(&ctx, server).await.unwrap();
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.web_servers.nginx.get(), Belief::Possibly);
    }
}
