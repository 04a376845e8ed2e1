pub mod h1_alpn_h2;
pub mod h1_close;
pub mod h1_incomplete;
pub mod overbuffer_incomplete;
pub mod short_alpn_h2;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Read up to 4096 bytes in one shot, the read size every parser uses ("one
/// read is sufficient; no framing is expected").
pub const READ_BUF_SIZE: usize = 4096;

/// Outcome of the single read every parser performs.
pub enum ReadOutcome {
    Data(Vec<u8>),
    /// Clean end-of-stream (`Ok(0)` or an EOF-flavored error). Distinguished
    /// from other errors because Overbuffer-Incomplete treats it as a
    /// positive Trojan-RS signal while every other parser treats it as a
    /// benign termination.
    Eof,
    Other(std::io::Error),
}

/// Generic over the stream type so tests can drive parsers with an
/// in-memory `tokio::io::duplex` pair instead of a live `TlsStream`.
pub async fn read_once<S>(stream: &mut S) -> ReadOutcome
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    match stream.read(&mut buf).await {
        Ok(0) => ReadOutcome::Eof,
        Ok(n) => {
            buf.truncate(n);
            ReadOutcome::Data(buf)
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => ReadOutcome::Eof,
        Err(e) => ReadOutcome::Other(e),
    }
}

pub fn starts_with_http(body: &[u8]) -> bool {
    body.starts_with(b"HTTP/")
}

/// Move `stream` onto a background task that performs the parser's single
/// read, and hand back a cancellation token plus the channel the result
/// arrives on.
///
/// This is the Rust shape of a goroutine-plus-channel-plus-select pattern:
/// whichever `select!` branch wins a timer race calls `cancel()` before
/// returning, and the reader checks the token right after its read resolves
/// so a late result is dropped instead of published.
pub fn spawn_single_read<S>(mut stream: S) -> (CancellationToken, oneshot::Receiver<ReadOutcome>)
where
    S: AsyncRead + Unpin + Send + 'static,
{
    let cancel = CancellationToken::new();
    let reader_cancel = cancel.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = read_once(&mut stream).await;
        if reader_cancel.is_cancelled() {
            return;
        }
        let _ = tx.send(outcome);
    });
    (cancel, rx)
}
