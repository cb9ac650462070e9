use crate::capture::ship_lines;
use crate::cli::CliError;
use crate::config::parse::load_config;
use crate::config::types::Config;
use crate::shipper::{LogLevel, Shipper, ShipperHandle, ShutdownReport};
use crate::store::HttpAttributeStore;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::process::Command;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Ship stdin line by line until EOF, Ctrl-C or SIGTERM, then flush.
pub async fn run_stdin(
    config_path: Option<PathBuf>,
    level: LogLevel,
    logger: Option<String>,
) -> Result<(), CliError> {
    let shutdown = shutdown_signal();
    let shipper = start_shipper(config_path).await?;

    ship_until(shipper, tokio::io::stdin(), level, logger, shutdown).await?;
    Ok(())
}

/// Ship `reader` until it ends or `shutdown` resolves, then shut the
/// shipper down. The flush runs on both paths.
pub async fn ship_until<R, F>(
    shipper: Shipper,
    reader: R,
    level: LogLevel,
    logger: Option<String>,
    shutdown: F,
) -> Result<ShutdownReport, CliError>
where
    R: AsyncRead + Unpin,
    F: Future<Output = &'static str>,
{
    let handle = shipper.handle();

    let outcome = tokio::select! {
        result = ship_lines(reader, level, logger, &handle) => result.map(|lines| {
            info!(lines, "Reached end of input");
        }),
        signal = shutdown => {
            info!(signal, "Received shutdown signal");
            Ok(())
        }
    };

    let report = shipper.shutdown().await;
    outcome?;
    Ok(report)
}

/// Resolves with the signal name on Ctrl-C or, on unix, SIGTERM.
///
/// The SIGTERM handler is installed by this call rather than on first poll,
/// so a termination request that arrives during startup is not lost.
pub fn shutdown_signal() -> impl Future<Output = &'static str> {
    #[cfg(unix)]
    let terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };

    async move {
        let interrupt = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match terminate {
                Some(mut stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => "SIGINT",
            _ = terminate => "SIGTERM",
        }
    }
}

/// Run `command` as a child, shipping its stdout at INFO and its stderr at
/// ERROR. Returns the child's exit code once everything is flushed. Ctrl-C
/// or SIGTERM stops the child first.
pub async fn run_exec(config_path: Option<PathBuf>, command: Vec<String>) -> Result<i32, CliError> {
    let (program, args) = command.split_first().ok_or(CliError::EmptyCommand)?;

    let shutdown = shutdown_signal();
    let shipper = start_shipper(config_path).await?;
    let handle = shipper.handle();
    let logger = program_name(program);

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            shipper.shutdown().await;
            return Err(e.into());
        }
    };
    info!(program = %program, pid = ?child.id(), "Started child process");

    let stdout_task = child
        .stdout
        .take()
        .map(|out| spawn_pipe(out, LogLevel::Info, &logger, &handle));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| spawn_pipe(err, LogLevel::Error, &logger, &handle));

    let exited = tokio::select! {
        status = child.wait() => Ok(status),
        signal = shutdown => Err(signal),
    };
    let status = match exited {
        Ok(status) => status,
        Err(signal) => {
            warn!(program = %program, signal, "Received shutdown signal, stopping child process");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill child process");
            }
            child.wait().await
        }
    };

    // The pipes close once the child is gone; collect whatever it wrote last
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        match task.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed reading child output"),
            Err(e) => error!(error = %e, "Child output reader panicked"),
        }
    }

    shipper.shutdown().await;

    let status = status?;
    let code = status.code().unwrap_or(1);
    info!(program = %program, code, "Child process exited");
    Ok(code)
}

fn spawn_pipe<R>(
    reader: R,
    level: LogLevel,
    logger: &str,
    handle: &ShipperHandle,
) -> JoinHandle<std::io::Result<usize>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let handle = handle.clone();
    let logger = logger.to_string();
    tokio::spawn(async move { ship_lines(reader, level, Some(logger), &handle).await })
}

/// Logger name for a child: the file name of the program it runs
fn program_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string())
}

async fn start_shipper(config_path: Option<PathBuf>) -> Result<Shipper, CliError> {
    let config_path = config_path.ok_or(CliError::ConfigNotFound)?;

    info!(config_path = %config_path.display(), "Loading configuration");
    let mut config = load_config(&config_path)?;
    fill_origin(&mut config);

    let store = Arc::new(HttpAttributeStore::new(
        &config.destination,
        &config.credentials,
    )?);
    Ok(Shipper::start(&config, store).await?)
}

/// Fall back to the machine hostname when no origin is configured
fn fill_origin(config: &mut Config) {
    if config.origin.is_some() {
        return;
    }
    match hostname::get() {
        Ok(name) => config.origin = Some(name.to_string_lossy().into_owned()),
        Err(e) => warn!(error = %e, "Could not determine hostname, records will have no host"),
    }
}
