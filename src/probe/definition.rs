use serde::Deserialize;

/// Which of the five fixed probes to run. Carries its own display name so
/// logging and file lookups agree on spelling with the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeName {
    H1Close,
    OverbufferIncomplete,
    ShortAlpnH2,
    H1AlpnH2,
    H1Incomplete,
}

impl ProbeName {
    pub const SEQUENCE: [ProbeName; 5] = [
        ProbeName::H1Close,
        ProbeName::OverbufferIncomplete,
        ProbeName::ShortAlpnH2,
        ProbeName::H1AlpnH2,
        ProbeName::H1Incomplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProbeName::H1Close => "H1-Close",
            ProbeName::OverbufferIncomplete => "Overbuffer-Incomplete",
            ProbeName::ShortAlpnH2 => "Short-ALPN-h2",
            ProbeName::H1AlpnH2 => "H1-ALPN-h2",
            ProbeName::H1Incomplete => "H1-Incomplete",
        }
    }

    /// Probes that depend on the FIN Observer's timing and therefore need
    /// the capture started before the TLS dial.
    pub fn needs_fin_observer(self) -> bool {
        matches!(self, ProbeName::H1Close | ProbeName::H1Incomplete)
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::SEQUENCE.into_iter().find(|p| p.as_str() == name)
    }
}

impl std::fmt::Display for ProbeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of a `probe_json/<name>.json` file.
///
/// The transmitted payload is `decode(base_content) ++ decode(repeat_content)
/// repeated `repeat_num` times, where `decode` turns the literal two-byte
/// escape sequences `\r` and `\n` into the corresponding single byte.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeDefinition {
    pub alpn: String,
    pub base_content: String,
    pub repeat_content: String,
    pub repeat_num: usize,
}

impl ProbeDefinition {
    /// Build the raw bytes to send on the wire.
    pub fn build_payload(&self) -> Vec<u8> {
        let mut payload = decode_escapes(&self.base_content);
        let repeat = decode_escapes(&self.repeat_content);
        payload.reserve(repeat.len() * self.repeat_num);
        for _ in 0..self.repeat_num {
            payload.extend_from_slice(&repeat);
        }
        payload
    }
}

/// Replace literal two-character `\r` and `\n` sequences with their single
/// byte equivalents (0x0D and 0x0A). Any other backslash sequence is left
/// untouched, matching the original's two independent string replacements.
fn decode_escapes(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'r' {
            out.push(b'\r');
            i += 2;
        } else if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'n' {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_crlf_escapes() {
        let decoded = decode_escapes(r"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(decoded, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn leaves_unrelated_backslashes_alone() {
        let decoded = decode_escapes(r"C:\foo\bar");
        assert_eq!(decoded, b"C:\\foo\\bar");
    }

    #[test]
    fn build_payload_repeats_tail_exactly_repeat_num_times() {
        let def = ProbeDefinition {
            alpn: "http/1.1".into(),
            base_content: r"BASE\r\n".into(),
            repeat_content: "X".into(),
            repeat_num: 3,
        };
        assert_eq!(def.build_payload(), b"BASE\r\nXXX");
    }

    #[test]
    fn build_payload_with_zero_repeat_num_is_just_base() {
        let def = ProbeDefinition {
            alpn: "http/1.1".into(),
            base_content: "BASE".into(),
            repeat_content: "X".into(),
            repeat_num: 0,
        };
        assert_eq!(def.build_payload(), b"BASE");
    }

    #[test]
    fn probe_name_round_trips_through_display_and_parse() {
        for name in ProbeName::SEQUENCE {
            assert_eq!(ProbeName::parse(name.as_str()), Some(name));
        }
        assert_eq!(ProbeName::parse("not-a-probe"), None);
    }
}
