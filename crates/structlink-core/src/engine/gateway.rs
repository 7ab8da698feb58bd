//! Ownership of the viewer process and of the single text channel to it.
//!
//! Commands are written one line at a time. The viewer echoes `CMD <command>`
//! before the reply to each command and terminates the reply with `END`.
//! Lines announcing model or selection changes may arrive at any moment,
//! including in the middle of a reply block; a dedicated reader thread routes
//! them to a notification queue and hands complete reply blocks to the caller
//! waiting for them.

use super::config::GatewayConfig;
use super::error::GatewayError;
use crate::core::io::commands;
use crate::core::io::records::parse_preset_line;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const BLOCK_START: &str = "CMD";
const BLOCK_END: &str = "END";

/// Unsolicited events reported by the viewer, plus loss of the viewer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    ModelChanged,
    SelectionChanged,
    Lost,
}

impl Notification {
    fn parse(line: &str) -> Option<Self> {
        if line.starts_with("ModelChanged") {
            Some(Notification::ModelChanged)
        } else if line.starts_with("SelectionChanged") {
            Some(Notification::SelectionChanged)
        } else {
            None
        }
    }
}

type Reply = Result<Vec<String>, GatewayError>;

struct Waiter {
    command: String,
    sender: Sender<Reply>,
}

struct Shared {
    alive: AtomicBool,
    pending: Mutex<Option<Waiter>>,
    notifications: Sender<Notification>,
}

impl Shared {
    fn deliver(&self, command: &str, lines: Vec<String>) {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        let matches = pending
            .as_ref()
            .is_some_and(|w| w.command.trim() == command.trim());
        if matches {
            if let Some(waiter) = pending.take() {
                let _ = waiter.sender.send(Ok(lines));
            }
        } else {
            debug!(command, lines = lines.len(), "Discarding unawaited reply block");
        }
    }

    fn fail_pending(&self, error: impl FnOnce(String) -> GatewayError) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(waiter) = pending.take() {
                let _ = waiter.sender.send(Err(error(waiter.command)));
            }
        }
    }

    fn clear_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.take();
        }
    }

    fn notify(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }

    /// Marks the viewer as gone. Only the first call has any effect.
    fn mark_lost(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            warn!("Lost connection to the viewer.");
            self.notify(Notification::Lost);
            self.fail_pending(|_| GatewayError::Lost);
        }
    }
}

/// Bytes that are not valid UTF-8 are decoded lossily; only end of stream
/// or a failed read ends the loop.
fn read_loop(mut reader: impl BufRead, shared: Arc<Shared>) {
    let mut block: Option<(String, Vec<String>)> = None;
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "Failed to read from the viewer");
                break;
            }
        }
        let decoded = String::from_utf8_lossy(&buffer);
        let line = decoded.trim_end();
        trace!(line, "viewer");

        if let Some(notification) = Notification::parse(line) {
            shared.notify(notification);
            continue;
        }
        if line == BLOCK_START || line.starts_with("CMD ") {
            let command = line[BLOCK_START.len()..].trim().to_string();
            block = Some((command, Vec::new()));
            continue;
        }
        if line == BLOCK_END {
            if let Some((command, lines)) = block.take() {
                shared.deliver(&command, lines);
            }
            continue;
        }
        match block.as_mut() {
            Some((_, lines)) => lines.push(line.to_string()),
            None => trace!(line, "Dropping line outside a reply block"),
        }
    }
    shared.mark_lost();
}

/// Aborts the reply wait in progress, if any, from another thread.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.shared
            .fail_pending(|command| GatewayError::Cancelled { command });
    }
}

pub struct Gateway {
    writer: Mutex<Box<dyn Write + Send>>,
    shared: Arc<Shared>,
    notifications: Mutex<Receiver<Notification>>,
    listen_depth: AtomicUsize,
    reply_timeout: Duration,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
}

impl Gateway {
    /// Launches the viewer from the first candidate path that spawns and
    /// enables change notifications.
    pub fn start(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut last_error = None;
        for path in &config.candidate_paths {
            let spawned = Command::new(path)
                .args(&config.launch_args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn();
            let mut child = match spawned {
                Ok(child) => child,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Launch candidate failed");
                    last_error = Some(e);
                    continue;
                }
            };
            let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
                let _ = child.kill();
                let _ = child.wait();
                continue;
            };
            info!(path = %path.display(), "Launched viewer");
            let mut gateway = match Self::attach(stdout, stdin, config.reply_timeout) {
                Ok(gateway) => gateway,
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e);
                }
            };
            gateway.child = Some(child);
            gateway.listen(true)?;
            return Ok(gateway);
        }
        Err(GatewayError::Launch {
            attempted: config
                .candidate_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            source: last_error,
        })
    }

    /// Attaches to a viewer that is already running behind `reader`/`writer`.
    pub fn attach<R, W>(reader: R, writer: W, reply_timeout: Duration) -> Result<Self, GatewayError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            alive: AtomicBool::new(true),
            pending: Mutex::new(None),
            notifications: sender,
        });
        let reader_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("viewer-reader".to_string())
            .spawn(move || read_loop(BufReader::new(reader), reader_shared))?;
        Ok(Self {
            writer: Mutex::new(Box::new(writer)),
            shared,
            notifications: Mutex::new(receiver),
            listen_depth: AtomicUsize::new(0),
            reply_timeout,
            child: None,
            reader: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Sends one command. With `expect_reply`, blocks until the reply block
    /// echoing this exact command has been read and returns its lines.
    pub fn send_command(&self, command: &str, expect_reply: bool) -> Result<Vec<String>, GatewayError> {
        if !self.is_running() {
            return Err(GatewayError::NotRunning);
        }
        let mut writer = self.writer.lock().map_err(|_| GatewayError::Poisoned)?;

        let receiver = if expect_reply {
            let (sender, receiver) = mpsc::channel();
            let mut pending = self.shared.pending.lock().map_err(|_| GatewayError::Poisoned)?;
            *pending = Some(Waiter {
                command: command.to_string(),
                sender,
            });
            Some(receiver)
        } else {
            None
        };

        debug!(command, "Sending command");
        if let Err(e) = writeln!(writer, "{command}").and_then(|_| writer.flush()) {
            self.shared.mark_lost();
            return Err(GatewayError::Io(e));
        }

        let Some(receiver) = receiver else {
            return Ok(Vec::new());
        };
        match receiver.recv_timeout(self.reply_timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                self.shared.clear_pending();
                warn!(command, timeout = ?self.reply_timeout, "Reply timed out");
                Err(GatewayError::ReplyTimeout {
                    command: command.to_string(),
                    timeout: self.reply_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(GatewayError::Lost),
        }
    }

    pub fn listen(&self, enable: bool) -> Result<(), GatewayError> {
        self.send_command(commands::listen(enable), false).map(|_| ())
    }

    /// Suspends change notifications until the returned guard is dropped.
    /// Guards nest; listening resumes when the outermost one drops.
    pub fn listen_guard(&self) -> Result<ListenGuard<'_>, GatewayError> {
        if self.listen_depth.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Err(e) = self.listen(false) {
                self.listen_depth.fetch_sub(1, Ordering::SeqCst);
                return Err(e);
            }
        }
        Ok(ListenGuard { gateway: self })
    }

    /// Replaces the viewer's selection; an empty expression clears it.
    pub fn select(&self, expression: &str) -> Result<(), GatewayError> {
        self.send_command(&commands::select(expression), false)
            .map(|_| ())
    }

    /// Depiction presets, formatted as `<type> <number> (<description>)`.
    pub fn presets(&self) -> Result<Vec<String>, GatewayError> {
        let reply = self.send_command(commands::LIST_PRESETS, true)?;
        Ok(reply.iter().filter_map(|l| parse_preset_line(l)).collect())
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(receiver) => receiver.try_iter().collect(),
            Err(_) => vec![Notification::Lost],
        }
    }

    /// Asks the viewer to quit, then terminates it. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.shared.alive.swap(false, Ordering::SeqCst) {
            info!("Stopping viewer.");
            if let Ok(mut writer) = self.writer.lock() {
                let _ = writeln!(writer, "{}", commands::STOP).and_then(|_| writer.flush());
            }
        }
        self.shared.fail_pending(|_| GatewayError::Lost);
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            if let Some(handle) = self.reader.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct ListenGuard<'a> {
    gateway: &'a Gateway,
}

impl Drop for ListenGuard<'_> {
    fn drop(&mut self) {
        if self.gateway.listen_depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Err(e) = self.gateway.listen(true) {
                debug!(error = %e, "Could not resume listening");
            }
        }
    }
}
