use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the log directory, the tracing file sink and the panic hook.
/// Must be called early by the host, before any store is opened.
pub fn init(data_dir: &Path) {
    let log_dir = data_dir.join("logs");
    let _ = fs::create_dir_all(&log_dir);
    LOG_DIR.set(log_dir.clone()).ok();

    // Rotate: keep last 5 crash logs
    rotate_logs(&log_dir);

    // Store/sync events go through tracing into logs/pixlet.log
    if let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("pixlet.log"))
    {
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .finish();
        // ignore failure if the host already installed one
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Write to crash log file
        let msg = format_panic(info);
        if let Some(dir) = LOG_DIR.get() {
            let path = dir.join("crash.log");
            if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&path) {
                let _ = f.write_all(msg.as_bytes());
                let _ = f.write_all(b"\n");
            }
        }
        // Also write to stderr for dev console
        eprintln!("{}", msg);
        prev_hook(info);
    }));
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
        "=== PIXLET CRASH ===\n\
         Timestamp: {}\n\
         Location:  {}\n\
         Message:   {}\n\
         Thread:    {:?}\n\
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
    let crash_log = log_dir.join("crash.log");
    if let Ok(meta) = fs::metadata(&crash_log) {
        // Rotate if > 2MB
        if meta.len() > 2 * 1024 * 1024 {
            for i in (1..5).rev() {
                let from = log_dir.join(format!("crash.{}.log", i));
                let to = log_dir.join(format!("crash.{}.log", i + 1));
                let _ = fs::rename(&from, &to);
            }
            let _ = fs::rename(&crash_log, log_dir.join("crash.1.log"));
        }
    }
}

/// Read the crash log for display in the host UI.
pub fn read_crash_log() -> std::io::Result<String> {
    let dir = LOG_DIR
        .get()
        .ok_or_else(|| std::io::Error::other("log dir not initialized"))?;
    fs::read_to_string(dir.join("crash.log"))
}

/// Clear the crash log.
pub fn clear_crash_log() -> std::io::Result<()> {
    let dir = LOG_DIR
        .get()
        .ok_or_else(|| std::io::Error::other("log dir not initialized"))?;
    fs::write(dir.join("crash.log"), "")
}
