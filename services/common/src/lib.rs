use std::{
    env, fs, io,
    net::SocketAddr,
    panic,
    path::{Path, PathBuf},
    str::FromStr,
    thread,
    time::{Duration, SystemTime},
};
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const DEFAULT_LOG_DIR: &str = "/var/log/kiosk";

/// Keeps the non-blocking file writer alive; drop it only at process exit.
pub struct TracingGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Log file placement and pruning, read from the environment.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub root: PathBuf,
    pub retention_days: u64,
    pub cleanup_interval_minutes: u64,
}

impl LogSettings {
    pub fn from_env(service_name: &str) -> Self {
        let dir = env_string("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());
        Self {
            root: PathBuf::from(dir).join(service_name),
            retention_days: env_or("LOG_RETENTION_DAYS", 14u64),
            cleanup_interval_minutes: env_or("LOG_CLEANUP_INTERVAL_MINUTES", 360u64),
        }
    }

    fn pruning_enabled(&self) -> bool {
        self.retention_days > 0 && self.cleanup_interval_minutes > 0
    }
}

pub fn init_tracing(service_name: &str) -> TracingGuards {
    let settings = LogSettings::from_env(service_name);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(io::stdout);

    // Fall back to stdout only when the log directory is not writable.
    let file_writer = fs::create_dir_all(&settings.root)
        .ok()
        .and_then(|_| {
            let root = settings.root.clone();
            let file_name = format!("{service_name}.log");
            panic::catch_unwind(move || tracing_appender::rolling::daily(root, file_name)).ok()
        })
        .map(tracing_appender::non_blocking);

    let file_guard = match file_writer {
        Some((writer, guard)) => {
            let subscriber = Registry::default()
                .with(filter)
                .with(stdout_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer));
            let _ = tracing::subscriber::set_global_default(subscriber);
            if settings.pruning_enabled() {
                spawn_log_pruner(settings);
            }
            Some(guard)
        }
        None => {
            let subscriber = Registry::default().with(filter).with(stdout_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
            None
        }
    };

    TracingGuards {
        _file_guard: file_guard,
    }
}

/// Parses `key` from the environment, falling back to `default` when unset or invalid.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

/// Returns the variable only when it is set to a non-blank value.
pub fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn spawn_log_pruner(settings: LogSettings) {
    let retention = Duration::from_secs(settings.retention_days * 24 * 60 * 60);
    let interval = Duration::from_secs(settings.cleanup_interval_minutes * 60);

    thread::spawn(move || loop {
        if let Some(cutoff) = SystemTime::now().checked_sub(retention) {
            let removed = prune_logs(&settings.root, cutoff);
            if removed > 0 {
                tracing::info!(removed, root = %settings.root.display(), "pruned old log files");
            }
        }
        thread::sleep(interval);
    });
}

/// Removes files under `root` last modified before `cutoff`. Returns how many were removed.
pub fn prune_logs(root: &Path, cutoff: SystemTime) -> usize {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };

    let mut removed = 0;
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            removed += prune_logs(&path, cutoff);
            continue;
        }
        let modified = fs::metadata(&path).and_then(|metadata| metadata.modified());
        if matches!(modified, Ok(modified) if modified < cutoff) && fs::remove_file(&path).is_ok()
        {
            removed += 1;
        }
    }
    removed
}

pub async fn bind_listener(port: u16) -> io::Result<TcpListener> {
    // Kiosks reach the service over the LAN, so listen on every interface.
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "sigterm handler unavailable");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    tracing::info!("shutdown signal received");
}
