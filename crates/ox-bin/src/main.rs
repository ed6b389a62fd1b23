use anyhow::Result;
use clap::Parser;
use oxvi::{Args, Session, run_keys};
use std::io::Write;
use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "oxvi.log";

/// Fresh `oxvi.log` in the working directory. `RUST_LOG` wins over
/// `--log-level`. The guard must outlive every log call.
fn configure_logging(level: &str) -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging(&args.log_level);
    install_panic_hook();

    let Some(keys) = args.keys.as_deref() else {
        let mut session = Session::open(&args)?;
        oxvi::interactive::run(&mut session)?;
        if let Some(text) = session.finish(args.in_place)? {
            print!("{text}");
        }
        return Ok(());
    };

    let (output, feedback) = run_keys(&args, keys)?;
    let mut stderr = std::io::stderr().lock();
    for line in feedback {
        writeln!(stderr, "{line}")?;
    }
    if let Some(text) = output {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}
