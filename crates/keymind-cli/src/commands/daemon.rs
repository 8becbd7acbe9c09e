/// Daemon lifecycle management commands
use anyhow::Result;
use chrono::Utc;
use keymind_core::{
    config::{log_path, pid_path, socket_path},
    enforcement::LogDisplay,
    ipc::{IpcClient, IpcRequest, IpcResponse},
    Daemon, EnforcementConfig, LoopStatus,
};
use keymind_storage::JsonSettingsStore;
use std::{env, fs, process::Command, sync::Arc, thread::sleep, time};
use sysinfo::{Pid, System};

/// PID of a live daemon, removing a stale pid file on the way
pub fn running_pid() -> Result<Option<usize>> {
    let pid_file_path = pid_path()?;
    if !pid_file_path.exists() {
        return Ok(None);
    }

    if let Ok(pid_str) = fs::read_to_string(&pid_file_path) {
        if let Ok(pid) = pid_str.trim().parse::<usize>() {
            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                return Ok(Some(pid));
            }
        }
    }

    log::warn!("Removing stale PID file.");
    let _ = fs::remove_file(&pid_file_path);
    Ok(None)
}

pub fn start_daemon() -> Result<()> {
    // 1. Check if daemon is already running
    if let Some(pid) = running_pid()? {
        log::info!("Daemon is already running (PID: {pid}).");
        return Ok(());
    }

    // 2. Clean up old socket if it exists
    let sock_path = socket_path()?;
    if sock_path.exists() {
        log::warn!("Removing stale socket file.");
        fs::remove_file(&sock_path)?;
    }

    log::info!("Starting KeyMind daemon...");

    // 3. Spawn a new process for the daemon
    let current_exe = env::current_exe()?;
    let current_dir = env::current_dir()?;
    let child = Command::new(current_exe)
        .arg("daemon-internal-start")
        .current_dir(current_dir)
        .spawn()?;

    // 4. In parent process, write PID and exit
    let pid_file_path = pid_path()?;
    if let Some(parent) = pid_file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;
    println!("Daemon started. Begin a session with `keymind focus <TASK>`.");

    Ok(())
}

pub async fn run_daemon_process() -> Result<()> {
    // Detached process: nothing is attached to stderr any more
    if let Err(e) = setup_daemon_logging() {
        eprintln!("Failed to set up daemon logging: {e:#}");
        return Err(e);
    }
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic().await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic() -> Result<()> {
    let store = JsonSettingsStore::open_default()?;
    let daemon = Daemon::new(
        &EnforcementConfig::default(),
        Arc::new(store),
        Box::new(LogDisplay),
    )?;
    daemon.run_with_signals().await
}

pub async fn stop_daemon() -> Result<()> {
    let pid_file_path = pid_path()?;
    let sock_path = socket_path()?;

    let Some(pid) = running_pid()? else {
        log::info!("Daemon is not running (no PID file).");
        if sock_path.exists() {
            fs::remove_file(&sock_path)?;
        }
        return Ok(());
    };

    log::info!("Stopping KeyMind daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            sleep(time::Duration::from_secs(2));

            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                }
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                    log::info!("Process killed.");
                }
            }
        }
    }

    // Cleanup
    if pid_file_path.exists() {
        fs::remove_file(&pid_file_path)?;
    }
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }

    Ok(())
}

pub async fn show_status() -> Result<()> {
    let sock_path = socket_path()?;

    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status(status)) => print_status(&status),
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

pub async fn focus(task: String) -> Result<()> {
    if task.trim().is_empty() {
        anyhow::bail!("Task description must not be empty");
    }
    let description = task.trim().to_string();
    send_session_command(IpcRequest::StartTask {
        description: description.clone(),
    })
    .await?;
    println!("Focusing on: {description}");
    Ok(())
}

pub async fn unfocus() -> Result<()> {
    send_session_command(IpcRequest::StopTask).await?;
    println!("Focus session stopped.");
    Ok(())
}

async fn send_session_command(request: IpcRequest) -> Result<()> {
    let sock_path = socket_path()?;
    if !sock_path.exists() {
        anyhow::bail!("Daemon is not running. Start it with `keymind daemon start`.");
    }

    match IpcClient::new(&sock_path).send_command(request).await? {
        IpcResponse::Ack => Ok(()),
        IpcResponse::Error(e) => anyhow::bail!("Daemon refused the request: {e}"),
        resp => anyhow::bail!("Unexpected response from daemon: {resp:?}"),
    }
}

fn print_status(status: &LoopStatus) {
    println!("Daemon Status: Running");
    println!("\nFocus Session:");
    println!(
        "  Task: {}",
        status.task.as_deref().unwrap_or("None (use `keymind focus <TASK>`)")
    );
    println!(
        "  Window: {}",
        status.current_activity.as_deref().unwrap_or("None")
    );
    println!("  Actions taken: {}", status.actions_taken);

    let session_duration = status.session_seconds(Utc::now());
    let hours = session_duration / 3600;
    let minutes = (session_duration % 3600) / 60;
    let seconds = session_duration % 60;
    println!("\nSession Duration: {hours:02}:{minutes:02}:{seconds:02}");
}

fn setup_daemon_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = log_path()?;

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();

    Ok(())
}
