use clap::Parser;
use zuora_import::config::cli::{CliArgs, LogFormat};
use zuora_import::utils::{logger, validation::Validate};
use zuora_import::{ImportEngine, ImportError};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    match args.log_format {
        LogFormat::Text => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(args.verbose),
    }

    tracing::info!("Starting zuora-import");

    let invocation = match args.resolve() {
        Ok(invocation) => invocation,
        Err(e) => fail(e),
    };
    tracing::debug!("Resolved config: {:?}", invocation.config);

    if let Err(e) = invocation.config.validate() {
        fail(e);
    }

    tracing::info!("Reading CSV from: {}", invocation.csv_path.display());
    let csv = match tokio::fs::read(&invocation.csv_path).await {
        Ok(bytes) => bytes,
        Err(e) => fail(ImportError::IoError(e)),
    };

    let engine = match ImportEngine::new(invocation.config) {
        Ok(engine) => engine,
        Err(e) => fail(e),
    };

    let result = if invocation.dry_run {
        engine.plan(&csv)
    } else {
        engine.run(&csv).await
    };

    match result {
        Ok(report) => {
            let elapsed = report.finished_at - report.started_at;
            println!(
                "{} {} finished in {}ms: {} records succeeded, {} records failed",
                report.action,
                report.object,
                elapsed.num_milliseconds(),
                report.succeeded_record_count(),
                report.failed_record_count()
            );
            if let Some(id) = &report.last_successful_id {
                println!(
                    "Last successful record ID: {} (resume with --skip {})",
                    id, report.resume_offset
                );
            }
            if report.token_refreshes > 0 {
                println!("Token refreshed {} time(s)", report.token_refreshes);
            }
        }
        Err(e) => fail(e),
    }
}

/// Reports an error that ended the run and exits with its code.
fn fail(e: ImportError) -> ! {
    if e.is_fatal() {
        tracing::error!("Import aborted: {} (Category: {:?})", e, e.category());
    } else {
        tracing::error!("Import stopped unexpectedly: {} (Category: {:?})", e, e.category());
    }
    tracing::error!("Suggestion: {}", e.recovery_suggestion());
    eprintln!("{}", e);
    std::process::exit(e.exit_code());
}
