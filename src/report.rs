use crate::crucial;
use crate::decision::Verdict;

/// Render a verdict as the Crucial-level lines a human reads at the end of
/// a run, matching the wording of the original tool's `print*` family.
pub fn render(verdict: &Verdict) {
    match verdict {
        Verdict::Detected { candidate, rs_rerun_hint } => {
            if *rs_rerun_hint {
                crucial!(
                    "the target server is highly likely to be Trojan-RS. it is recommended to run the Overbuffer-Incomplete probe several more times to observe its response distribution."
                );
            } else {
                crucial!("the target server is a Trojan, its type is: {candidate}");
            }
        }
        Verdict::Possible { possible } => {
            crucial!("the target server is a Trojan");
            if !possible.is_empty() {
                crucial!("possible Trojans: {}", possible.join(", "));
            }
        }
        Verdict::NotATrojan { web_servers_possible } => {
            if web_servers_possible.is_empty() {
                crucial!("the target server is not a Trojan. no possible web server type detected.");
            } else {
                crucial!(
                    "the target server is not a Trojan. possible web servers: {}",
                    web_servers_possible.join(", ")
                );
            }
        }
        Verdict::Uncertain { trojans_ruled_out, trojans_possible, web_servers_possible } => {
            crucial!("uncertain if the target server is a Trojan or an HTTPS server.");
            if !trojans_ruled_out.is_empty() {
                crucial!("impossible Trojans: {}", trojans_ruled_out.join(", "));
            }
            if !trojans_possible.is_empty() {
                crucial!("possible Trojans: {}", trojans_possible.join(", "));
            }
            if web_servers_possible.is_empty() {
                crucial!("no identifiable HTTPS servers.");
            } else {
                crucial!("possible HTTPS servers: {}", web_servers_possible.join(", "));
            }
        }
    }
}
