pub mod dialer;

pub use dialer::{DialOutcome, HandshakeOutcome, TlsDialer};
