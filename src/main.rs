use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use trojan_prober::cli::Cli;
use trojan_prober::context::ProbeContext;
use trojan_prober::decision::compute_verdict;
use trojan_prober::logging::{print_banner, set_log_level};
use trojan_prober::probe::ProbeName;
use trojan_prober::report;
use trojan_prober::runner::Runner;
use trojan_prober::error;

const INTER_PROBE_DELAY: Duration = Duration::from_secs(3);
const PROBE_JSON_DIR: &str = "probe_json";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    set_log_level(cli.log);

    let runner = match Runner::new(PROBE_JSON_DIR, None) {
        Ok(runner) => runner,
        Err(err) => {
            error!("{err:#}");
            unreachable!("error! exits the process");
        }
    };
    let ctx = ProbeContext::new();

    if cli.probe == "all" {
        for probe in ProbeName::SEQUENCE {
            print_banner(&format!("---------- executing probe: {probe} ----------"));
            if let Err(err) = runner
                .run_probe(&ctx, probe, &cli.server_addr, &cli.server_name)
                .await
            {
                error!("{err:#}");
                unreachable!("error! exits the process");
            }

            let verdict = compute_verdict(&ctx);
            if verdict.is_terminal() {
                report::render(&verdict);
                return Ok(());
            }
            tokio::time::sleep(INTER_PROBE_DELAY).await;
        }
    } else {
        let probe = match ProbeName::parse(&cli.probe) {
            Some(probe) => probe,
            None => {
                error!("unknown probe: {}", cli.probe);
                unreachable!("error! exits the process");
            }
        };
        print_banner(&format!("---------- executing probe: {probe} ----------"));
        if let Err(err) = runner
            .run_probe(&ctx, probe, &cli.server_addr, &cli.server_name)
            .await
        {
            error!("{err:#}");
            unreachable!("error! exits the process");
        }
    }

    let verdict = compute_verdict(&ctx);
    report::render(&verdict);
    Ok(())
}
