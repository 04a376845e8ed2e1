use crate::belief::{Belief, BeliefCell};
use crate::tls::dialer::HandshakeOutcome;

/// Belief table for the five Trojan implementations this tool can tell apart.
#[derive(Debug, Default)]
pub struct TrojanTable {
    pub trojan_gfw: BeliefCell,
    pub trojan_go: BeliefCell,
    pub trojan_r: BeliefCell,
    pub trojan_rs: BeliefCell,
    pub caddy_trojan: BeliefCell,
}

impl TrojanTable {
    /// Update every Trojan candidate to `belief` (subject to monotonicity).
    pub fn update_all(&self, belief: Belief) {
        self.trojan_gfw.update(belief);
        self.trojan_go.update(belief);
        self.trojan_r.update(belief);
        self.trojan_rs.update(belief);
        self.caddy_trojan.update(belief);
    }

    /// Candidates currently holding `state`, in table order, by display name.
    pub fn matching(&self, state: Belief) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.trojan_gfw.get() == state {
            out.push("Trojan-GFW");
        }
        if self.trojan_go.get() == state {
            out.push("Trojan-Go");
        }
        if self.trojan_r.get() == state {
            out.push("Trojan-R");
        }
        if self.trojan_rs.get() == state {
            out.push("Trojan-RS");
        }
        if self.caddy_trojan.get() == state {
            out.push("Caddy-Trojan");
        }
        out
    }

    pub fn all_definitely_not(&self) -> bool {
        self.trojan_gfw.get() == Belief::DefinitelyNot
            && self.trojan_go.get() == Belief::DefinitelyNot
            && self.trojan_r.get() == Belief::DefinitelyNot
            && self.trojan_rs.get() == Belief::DefinitelyNot
            && self.caddy_trojan.get() == Belief::DefinitelyNot
    }
}

/// Belief table for the genuine-HTTPS-server candidates behind a non-Trojan
/// (or Trojan-forwarded) connection.
#[derive(Debug, Default)]
pub struct WebServerTable {
    pub nginx: BeliefCell,
    pub apache: BeliefCell,
    pub caddy: BeliefCell,
    pub tomcat: BeliefCell,
    pub lighttpd: BeliefCell,
    pub iis: BeliefCell,
}

impl WebServerTable {
    pub fn matching(&self, state: Belief) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.nginx.get() == state {
            out.push("Nginx");
        }
        if self.apache.get() == state {
            out.push("Apache");
        }
        if self.caddy.get() == state {
            out.push("Caddy");
        }
        if self.tomcat.get() == state {
            out.push("Tomcat");
        }
        if self.lighttpd.get() == state {
            out.push("Lighttpd");
        }
        if self.iis.get() == state {
            out.push("IIS");
        }
        out
    }
}

/// Process-wide belief state, created once at startup and threaded
/// explicitly through the Runner and every parser.
///
/// This replaces the original tool's package-level mutable globals with an
/// owned struct: nothing here is a singleton, so tests can spin up as many
/// independent contexts as they like.
#[derive(Debug, Default)]
pub struct ProbeContext {
    pub trojans: TrojanTable,
    pub web_servers: WebServerTable,
    /// Short-circuit flag used by Short-ALPN-h2 and H1-ALPN-h2 when the
    /// backend identity contradicts the observed HTTP response. Only
    /// `Initially`, `Definitely`, and `DefinitelyNot` are ever written here.
    pub is_trojan: BeliefCell,
}

impl ProbeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the handshake-outcome rules from the spec's Belief Store
    /// section: every categorized handshake failure immediately rules out
    /// four of the five Trojan candidates, then branches on which ALPN
    /// problem was observed.
    pub fn apply_handshake_outcome(&self, outcome: &HandshakeOutcome) {
        self.trojans.trojan_gfw.update(Belief::DefinitelyNot);
        self.trojans.caddy_trojan.update(Belief::DefinitelyNot);
        self.trojans.trojan_r.update(Belief::DefinitelyNot);
        self.trojans.trojan_rs.update(Belief::DefinitelyNot);

        match outcome {
            HandshakeOutcome::AlpnMissing => {
                self.trojans.trojan_go.update(Belief::Possibly);
                self.web_servers.nginx.update(Belief::Possibly);
                self.web_servers.lighttpd.update(Belief::Possibly);
            }
            HandshakeOutcome::AlpnUnadvertised => {
                self.trojans.trojan_go.update(Belief::DefinitelyNot);
                self.web_servers.apache.update(Belief::Possibly);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_all_respects_prior_terminal_state() {
        let table = TrojanTable::default();
        table.trojan_gfw.update(Belief::Definitely);
        table.update_all(Belief::DefinitelyNot);
        assert_eq!(table.trojan_gfw.get(), Belief::Definitely);
        assert_eq!(table.trojan_go.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn alpn_missing_marks_trojan_go_possibly_and_apache_untouched() {
        let ctx = ProbeContext::new();
        ctx.apply_handshake_outcome(&HandshakeOutcome::AlpnMissing);
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::Possibly);
        assert_eq!(ctx.web_servers.nginx.get(), Belief::Possibly);
        assert_eq!(ctx.web_servers.lighttpd.get(), Belief::Possibly);
        assert_eq!(ctx.web_servers.apache.get(), Belief::Initially);
        assert_eq!(ctx.trojans.trojan_gfw.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn alpn_unadvertised_marks_apache_possibly_and_go_definitely_not() {
        let ctx = ProbeContext::new();
        ctx.apply_handshake_outcome(&HandshakeOutcome::AlpnUnadvertised);
        assert_eq!(ctx.trojans.trojan_go.get(), Belief::DefinitelyNot);
        assert_eq!(ctx.web_servers.apache.get(), Belief::Possibly);
    }

    #[test]
    fn all_definitely_not_requires_every_candidate() {
        let table = TrojanTable::default();
        table.update_all(Belief::DefinitelyNot);
        assert!(table.all_definitely_not());

        let table = TrojanTable::default();
        table.trojan_gfw.update(Belief::DefinitelyNot);
        assert!(!table.all_definitely_not());
    }
}
