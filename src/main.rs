use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use offline_fetch::{logging, FetchCommand, FetchRunner};

fn main() -> ExitCode {
    let args = match FetchCommand::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version are not usage errors
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    logging::init(args.verbose);

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::from(2)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run(args: FetchCommand) -> Result<u8> {
    let runner = FetchRunner::new(args.to_config())?;

    // Ctrl-C stops the batch before the next URL starts
    let cancelled = runner.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Interrupt received, finishing the current URL");
            cancelled.store(true, Ordering::SeqCst);
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let summary = runner.run(&args.urls).await;
    Ok(summary.exit_code())
}
