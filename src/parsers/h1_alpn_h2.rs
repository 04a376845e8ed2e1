use anyhow::Result;
use tokio::io::AsyncRead;

use super::{read_once, starts_with_http, ReadOutcome};
use crate::backend::{extract_backend_type, update_web_server_state};
use crate::belief::Belief;
use crate::context::ProbeContext;
use crate::{debug, info};

/// Same ALPN-downgrade idea as Short-ALPN-h2 but without the 150-second
/// patience: a short, clearly malformed request is enough to tell whether
/// the peer ever intended to speak HTTP/2 at all.
pub async fn parse<S>(ctx: &ProbeContext, mut stream: S) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let outcome = read_once(&mut stream).await;
    handle(ctx, outcome);
    Ok(())
}

fn handle(ctx: &ProbeContext, outcome: ReadOutcome) {
    let bytes = match outcome {
        ReadOutcome::Data(bytes) => bytes,
        ReadOutcome::Eof => {
            debug!("error reading from server: connection closed");
            return;
        }
        ReadOutcome::Other(err) => {
            debug!("error reading from server: {err}");
            return;
        }
    };
    let body = String::from_utf8_lossy(&bytes).into_owned();
    info!("response from server:\n{body}");

    if !starts_with_http(&bytes) {
        info!("response doesn't contain an HTTP prefix.");
        ctx.trojans.caddy_trojan.update(Belief::Possibly);
        ctx.trojans.trojan_gfw.update(Belief::DefinitelyNot);
        ctx.trojans.trojan_go.update(Belief::DefinitelyNot);
        ctx.trojans.trojan_r.update(Belief::DefinitelyNot);
        ctx.trojans.trojan_rs.update(Belief::DefinitelyNot);
        return;
    }

    info!("response is in HTTP/1.x format.");
    ctx.trojans.caddy_trojan.update(Belief::DefinitelyNot);
    ctx.trojans.trojan_gfw.update(Belief::Possibly);
    ctx.trojans.trojan_go.update(Belief::Possibly);
    ctx.trojans.trojan_r.update(Belief::Possibly);
    ctx.trojans.trojan_rs.update(Belief::Possibly);

    let backend_type = extract_backend_type(&body);
    update_web_server_state(&backend_type, &ctx.web_servers);

    if backend_type == "caddy" || backend_type == "iis" {
        ctx.is_trojan.update(Belief::Definitely);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_leaves_beliefs_untouched() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Other(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        );
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::Initially);
    }

    #[test]
    fn non_http_response_marks_caddy_trojan_possibly_and_rest_definitely_not() {
        let ctx = ProbeContext::new();
        handle(&ctx, ReadOutcome::Data(b"not http".to_vec()));
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::Possibly);
        assert_eq!(ctx.trojans.trojan_gfw.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn http_response_with_caddy_backend_sets_is_trojan_definitely() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Data(b"HTTP/1.1 200 OK\r\nServer: Caddy\r\n\r\n".to_vec()),
        );
        assert_eq!(ctx.trojans.caddy_trojan.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.trojans.trojan_gfw.get(), Belief::Possibly);
        assert_eq!(ctx.is_trojan.get(), Belief::Definitely);
        assert_eq!(ctx.web_servers.caddy.get(), Belief::Possibly);
    }

    #[test]
    fn http_response_with_nginx_backend_leaves_is_trojan_undecided() {
        let ctx = ProbeContext::new();
        handle(
            &ctx,
            ReadOutcome::Data(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n".to_vec()),
        );
        assert_eq!(ctx.is_trojan.get(), Belief::Initially);
        assert_eq!(ctx.web_servers.nginx.get(), Belief::Possibly);
    }
}
