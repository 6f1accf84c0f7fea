use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();
static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

const CRASH_LOG: &str = "crash.log";
const MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;
const KEEP_LOGS: usize = 5;

/// Install the tracing subscriber (stderr plus `<data_dir>/logs/crash.log`)
/// and the panic hook. Must be called early, before any async work.
/// `RUST_LOG` overrides the level chosen from `debug`.
pub fn init(data_dir: &Path, debug: bool) {
    let log_dir = data_dir.join("logs");
    let _ = fs::create_dir_all(&log_dir);

    rotate_logs(&log_dir);
    LOG_DIR.set(log_dir.clone()).ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(debug));
    let (filter, handle) = reload::Layer::new(filter);

    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(CRASH_LOG))
        .ok()
        .map(|f| fmt::layer().with_ansi(false).with_writer(Mutex::new(f)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    if installed.is_ok() {
        FILTER.set(handle).ok();
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = format_panic(info);
        if let Some(dir) = LOG_DIR.get() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(CRASH_LOG));
            if let Ok(mut f) = file {
                let _ = f.write_all(msg.as_bytes());
                let _ = f.write_all(b"\n");
            }
        }
        eprintln!("{}", msg);
        prev_hook(info);
    }));
}

/// Switch between `info` and `debug` at runtime, following the
/// `debugLogging` setting.
pub fn set_debug(enabled: bool) {
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(e) = handle.modify(|f| *f = level_filter(enabled)) {
        tracing::warn!("could not change log level: {}", e);
    }
}

fn level_filter(debug: bool) -> EnvFilter {
    EnvFilter::new(if debug { "debug" } else { "info" })
}

fn format_panic(info: &std::panic::PanicHookInfo) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown".into());
    let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".into()
    };

    let bt = std::backtrace::Backtrace::force_capture();

    format!(
        "=== TABGROUPS CRASH ===\n\
         Timestamp: {}\n\
         Location:  {}\n\
         Message:   {}\n\
         Thread:    {}\n\
         PID:       {}\n\
         \n\
         Backtrace:\n{}\n\
         === END CRASH ===\n",
        timestamp,
        location,
        payload,
        std::thread::current().name().unwrap_or("unnamed"),
        std::process::id(),
        bt
    )
}

fn rotate_logs(log_dir: &Path) {
    let crash_log = log_dir.join(CRASH_LOG);
    let Ok(meta) = fs::metadata(&crash_log) else {
        return;
    };
    if meta.len() <= MAX_LOG_BYTES {
        return;
    }
    for i in (1..KEEP_LOGS).rev() {
        let from = log_dir.join(format!("crash.{}.log", i));
        let to = log_dir.join(format!("crash.{}.log", i + 1));
        let _ = fs::rename(&from, &to);
    }
    let _ = fs::rename(&crash_log, log_dir.join("crash.1.log"));
}
