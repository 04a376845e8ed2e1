use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncRead;

use super::{spawn_single_read, starts_with_http, ReadOutcome};
use crate::backend::{extract_backend_type, update_web_server_state};
use crate::belief::Belief;
use crate::context::ProbeContext;
use crate::{debug, info};

const TIMER: Duration = Duration::from_secs(150);

/// Requests `h2` over ALPN but sends an HTTP/1.x payload. A real Caddy or
/// IIS backend would speak HTTP/2 here; seeing it fall back to HTTP/1.x
/// means something downgraded the ALPN negotiation — a Trojan in front of
/// that backend.
pub async fn parse<S>(ctx: &ProbeContext, stream: S) -> Result<()>
where
    S: AsyncRead + Unpin + Send + 'static,
{
    let (cancel, mut rx) = spawn_single_read(stream);

    tokio::select! {
        _ = tokio::time::sleep(TIMER) => {
            info!("no response within 150 seconds. target is definitely a Trojan, likely Caddy-Trojan or another Trojan with a Caddy backend.");
            ctx.is_trojan.update(Belief::Definitely);
            ctx.trojans.caddy_trojan.update(Belief::Possibly);
            ctx.trojans.trojan_gfw.update(Belief::Possibly);
            ctx.trojans.trojan_r.update(Belief::Possibly);
            ctx.trojans.trojan_rs.update(Belief::Possibly);
            cancel.cancel();
        }
        result = &mut rx => {
            match result {
                Ok(outcome) => handle(ctx, outcome),
                Err(_) => handle(ctx, ReadOutcome::Eof),
            }
        }
    }
    Ok(())
}

fn handle(ctx: &ProbeContext, outcome: ReadOutcome) {
    let mut backend_type = String::new();

    match outcome {
        ReadOutcome::Data(bytes) => {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            info!("response from server: {body}");

            if !starts_with_http(&bytes) {
                info!("response doesn't contain an HTTP prefix. definitely not a Trojan server.");
                ctx.trojans.update_all(Belief::DefinitelyNot);
                ctx.is_trojan.update(Belief::DefinitelyNot);
                return;
            }

            backend_type = extract_backend_type(&body);
            if backend_type == "caddy" || backend_type == "iis" {
                ctx.is_trojan.update(Belief::Definitely);
            }
        }
        ReadOutcome::Eof => {
            debug!("error reading from server: connection closed");
        }
        ReadOutcome::Other(err) => {
            debug!("error reading from server: {err}");
        }
    }

    info!("response received within 150 seconds. definitely not a Caddy-Trojan.");
    ctx.trojans.caddy_trojan.update(Belief::DefinitelyNot);
    update_web_server_state(&backend_type, &ctx.web_servers);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_response_rules_out_every_trojan_and_sets_is_trojan_false() {
        let ctx = ProbeContext::new();
        handle(&ctx, ReadOutcome::Data(b"not an http response".to_vec()));
        assert!(ctx.trojans.all_definitely_not());
        assert_eq!(ctx.is_trojan.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn caddy_backend_over_h2_alpn_marks_is_trojan_definitely() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Data(b"HTTP/1.1 200 OK\r\nServer: Caddy\r\n\r\n".to_vec()),
        );
        assert_eq!(ctx.is_trojan.get(), Belief::Definitely);
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.web_servers.caddy.get(), Belief::Possibly);
    }

    #[test]
    fn plain_nginx_backend_leaves_is_trojan_undecided() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Data(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n".to_vec()),
        );
        assert_eq!(ctx.is_trojan.get(), Belief::Initially);
        assert_eq!(ctx.web_servers.nginx.get(), Belief::Possibly);
        assert_eq!(ctx.web_servers.apache.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn read_error_still_runs_the_shared_tail_with_an_empty_backend() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Other(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        );
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.is_trojan.get(), Belief::Initially);
        assert_eq!(ctx.web_servers.nginx.get(), Belief::Initially);
    }

    #[tokio::test(start_paused = true)]
    async fn hundred_fifty_second_timer_wins_when_nothing_ever_arrives() {
        let ctx = ProbeContext::new();
        let (_keep_alive, server) = tokio::io::duplex(64);
        parse(&ctx, server).await.unwrap();
        assert_eq!(ctx.is_trojan.get(), Belief::Definitely);
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::Possibly);
    }

    #[tokio::test(start_paused = true)]
    async fn caddy_response_arriving_before_the_timer_wins_the_race() {
        use tokio::io::AsyncWriteExt;

        let ctx = ProbeContext::new();
        let (mut client, server) = tokio::io::duplex(256);
        client
            .write_all(b"HTTP/1.1 200 OK\r\nServer: Caddy\r\n\r\n")
            .await
            .unwrap();

        parse(&ctx, server).await.unwrap();
        assert_eq!(ctx.is_trojan.get(), Belief::Definitely);
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::DefinitelyNot);
    }
}
