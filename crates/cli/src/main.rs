// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! lakeguard binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lakeguard::cli::Cli;
use lakeguard::output::{print_error, print_warning, terminal_width, Palette};
use lakeguard::report::exit_codes;
use lakeguard::runner::Runner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let runner = match Runner::from_cli(cli) {
        Ok(runner) => runner,
        Err(e) => {
            print_error(e.to_string());
            std::process::exit(exit_codes::CONFIG);
        }
    };

    let report = runner.execute().await;
    print!(
        "{}",
        report.render(Palette::for_stdout(runner.cli().no_color), terminal_width())
    );

    if let Some(ref path) = runner.cli().report_json {
        if let Err(e) = report.write_json(path) {
            print_warning(format_args!(
                "Failed to write JSON report '{}': {}",
                path.display(),
                e
            ));
        }
    }

    std::process::exit(report.exit_code());
}

/// Log to stderr so stdout carries only the report. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
