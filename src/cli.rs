use clap::Parser;

/// trojan-prober — active TLS probe that fingerprints a remote endpoint as
/// a known Trojan proxy implementation or a genuine HTTPS server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "trojan-prober",
    version,
    about = "Active TLS probe that fingerprints a remote endpoint as a known Trojan proxy implementation or a genuine HTTPS server.",
    long_about = None
)]
pub struct Cli {
    /// Probe to run: one of H1-Close, Overbuffer-Incomplete, Short-ALPN-h2,
    /// H1-ALPN-h2, H1-Incomplete, or `all` to run the full sequence.
    #[arg(long = "probe")]
    pub probe: String,

    /// Target in `host:port` form.
    #[arg(long = "serverAddr")]
    pub server_addr: String,

    /// SNI to present during the TLS handshake.
    #[arg(long = "serverName")]
    pub server_name: String,

    /// 0 = print all log levels, 1 = Crucial only.
    #[arg(long = "log", default_value_t = 1)]
    pub log: u8,
}
