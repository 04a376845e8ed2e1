use std::net::Ipv4Addr;

use etherparse::{InternetSlice, SlicedPacket, TransportSlice};

/// Linux "cooked capture" used by pcap's pseudo-device `any`: a 16-byte
/// link-layer header standing in for a real Ethernet header.
const LINUX_SLL_HEADER_LEN: usize = 16;

/// What we care about from one captured frame: whether it is a TCP segment
/// carrying the FIN flag, and who it claims to be from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpObservation {
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub fin: bool,
}

/// Parse one captured frame for the given pcap link type, extracting the
/// IPv4 source and the TCP FIN flag.
///
/// Returns `None` for anything that isn't an IPv4-over-TCP frame (ARP,
/// IPv6, fragments we can't parse, etc.) — those are simply not
/// interesting to the FIN Observer.
pub fn parse(linktype: pcap::Linktype, data: &[u8]) -> Option<TcpObservation> {
    let sliced = if linktype == pcap::Linktype::LINUX_SLL {
        let payload = data.get(LINUX_SLL_HEADER_LEN..)?;
        SlicedPacket::from_ip(payload).ok()?
    } else {
        SlicedPacket::from_ethernet(data).ok()?
    };

    let InternetSlice::Ipv4(ipv4, _) = sliced.ip? else {
        return None;
    };
    let TransportSlice::Tcp(tcp) = sliced.transport? else {
        return None;
    };

    Some(TcpObservation {
        src_ip: ipv4.source_addr(),
        src_port: tcp.source_port(),
        fin: tcp.fin(),
    })
}

/// Does this observation represent a FIN arriving from the target flow?
/// The kernel-compiled BPF filter already restricts captured packets to the
/// target's source IP and port, but we re-check here rather than trust it
/// blindly.
pub fn is_target_fin(obs: &TcpObservation, target_ip: Ipv4Addr, target_port: u16) -> bool {
    obs.fin && obs.src_ip == target_ip && obs.src_port == target_port
}
