use crate::belief::Belief;
use crate::context::ProbeContext;

/// Result of consulting the Decision Engine after a probe (or at the end of
/// the sequence). Only `Detected` and `Possible` are terminal for the
/// purposes of the sequence short-circuit — `NotATrojan` and `Uncertain`
/// let the next probe run, since a later probe may still add information
/// before the run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A Trojan candidate reached `Definitely`. `rs_rerun_hint` is set only
    /// for Trojan-RS, whose detection is the least reliable of the five.
    Detected { candidate: &'static str, rs_rerun_hint: bool },
    /// `isTrojan` reached `Definitely` but no single Trojan candidate did;
    /// `possible` lists every Trojan candidate currently at `Possibly`.
    Possible { possible: Vec<&'static str> },
    /// Every Trojan candidate reached `DefinitelyNot`.
    NotATrojan { web_servers_possible: Vec<&'static str> },
    /// Neither of the above; the sequence should continue if there are
    /// probes left to run.
    Uncertain {
        trojans_ruled_out: Vec<&'static str>,
        trojans_possible: Vec<&'static str>,
        web_servers_possible: Vec<&'static str>,
    },
}

impl Verdict {
    /// Whether reaching this verdict should stop an `all`-sequence run
    /// early. Only `Detected` and `Possible` short-circuit — `NotATrojan`
    /// and `Uncertain` let the remaining probes run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Verdict::Detected { .. } | Verdict::Possible { .. })
    }
}

/// Compute the current verdict from a probe context's belief tables, in a
/// fixed priority order: any single `Definitely` Trojan wins first, then
/// the `isTrojan` flag, then a clean sweep of `DefinitelyNot`, else
/// uncertain.
pub fn compute_verdict(ctx: &ProbeContext) -> Verdict {
    if let Some(candidate) = first_definitely_trojan(ctx) {
        return Verdict::Detected {
            candidate,
            rs_rerun_hint: candidate == "Trojan-RS",
        };
    }

    if ctx.is_trojan.get() == Belief::Definitely {
        return Verdict::Possible {
            possible: ctx.trojans.matching(Belief::Possibly),
        };
    }

    if ctx.trojans.all_definitely_not() {
        return Verdict::NotATrojan {
            web_servers_possible: ctx.web_servers.matching(Belief::Possibly),
        };
    }

    Verdict::Uncertain {
        trojans_ruled_out: ctx.trojans.matching(Belief::DefinitelyNot),
        trojans_possible: ctx.trojans.matching(Belief::Possibly),
        web_servers_possible: ctx.web_servers.matching(Belief::Possibly),
    }
}

fn first_definitely_trojan(ctx: &ProbeContext) -> Option<&'static str> {
    ctx.trojans
        .matching(Belief::Definitely)
        .into_iter()
        .next()
}
