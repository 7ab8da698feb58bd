//! An in-memory stand-in for the viewer, speaking the same framed protocol.

use super::gateway::Gateway;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ScriptState {
    responses: HashMap<String, VecDeque<(Vec<String>, bool)>>,
    silent: HashSet<String>,
    raw: HashMap<String, Vec<u8>>,
    commands: Vec<String>,
    output: Option<Sender<Vec<u8>>>,
    fail_writes: bool,
    close_after_next: bool,
}

impl ScriptState {
    /// Queued replies are consumed in order; the last one keeps answering
    /// until a newer reply is queued.
    fn reply_for(&mut self, command: &str) -> Vec<String> {
        let Some(queue) = self.responses.get_mut(command) else {
            return Vec::new();
        };
        if queue.len() > 1 {
            return queue.pop_front().map(|(lines, _)| lines).unwrap_or_default();
        }
        match queue.front_mut() {
            Some((lines, served)) => {
                *served = true;
                lines.clone()
            }
            None => Vec::new(),
        }
    }

    fn emit(&self, text: String) {
        self.emit_bytes(text.into_bytes());
    }

    fn emit_bytes(&self, bytes: Vec<u8>) {
        if let Some(output) = &self.output {
            let _ = output.send(bytes);
        }
    }

    fn handle(&mut self, command: &str) {
        self.commands.push(command.to_string());
        if command == "stop really" || self.close_after_next {
            self.output = None;
            return;
        }
        if self.silent.contains(command) {
            return;
        }
        if let Some(body) = self.raw.get(command) {
            let mut block = format!("CMD {command}\n").into_bytes();
            block.extend_from_slice(body);
            block.extend_from_slice(b"END\n");
            self.emit_bytes(block);
            return;
        }
        let mut block = format!("CMD {command}\n");
        for line in self.reply_for(command) {
            block.push_str(&line);
            block.push('\n');
        }
        block.push_str("END\n");
        self.emit(block);
    }
}

#[derive(Clone)]
pub(crate) struct ScriptedTool {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTool {
    pub(crate) fn spawn() -> (Self, Gateway) {
        Self::spawn_with_timeout(TEST_TIMEOUT)
    }

    pub(crate) fn spawn_with_timeout(timeout: Duration) -> (Self, Gateway) {
        let (sender, receiver) = mpsc::channel();
        let state = Arc::new(Mutex::new(ScriptState {
            output: Some(sender),
            ..Default::default()
        }));
        let tool = Self { state };
        let writer = ToolInput {
            state: Arc::clone(&tool.state),
            buffer: Vec::new(),
        };
        let reader = ToolOutput {
            receiver,
            chunk: Vec::new(),
            position: 0,
        };
        let gateway = Gateway::attach(reader, writer, timeout).unwrap();
        (tool, gateway)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Queues a reply for `command`.
    pub(crate) fn respond(&self, command: &str, lines: &[&str]) {
        let lines = lines.iter().map(|s| s.to_string()).collect();
        self.with_state(|s| {
            let queue = s.responses.entry(command.to_string()).or_default();
            queue.retain(|(_, served)| !served);
            queue.push_back((lines, false));
        });
    }

    /// Answers `command` with `body` exactly as given, byte for byte.
    pub(crate) fn respond_bytes(&self, command: &str, body: &[u8]) {
        self.with_state(|s| s.raw.insert(command.to_string(), body.to_vec()));
    }

    /// Never answers `command`.
    pub(crate) fn silence(&self, command: &str) {
        self.with_state(|s| s.silent.insert(command.to_string()));
    }

    pub(crate) fn notify(&self, line: &str) {
        self.with_state(|s| s.emit(format!("{line}\n")));
    }

    pub(crate) fn fail_writes(&self) {
        self.with_state(|s| s.fail_writes = true);
    }

    pub(crate) fn close_after_next_command(&self) {
        self.with_state(|s| s.close_after_next = true);
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.with_state(|s| s.commands.clone())
    }

    pub(crate) fn clear_commands(&self) {
        self.with_state(|s| s.commands.clear());
    }
}

struct ToolInput {
    state: Arc<Mutex<ScriptState>>,
    buffer: Vec<u8>,
}

impl Write for ToolInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("script state poisoned"))?;
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "viewer closed stdin"));
        }
        self.buffer.extend_from_slice(buf);
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let command = String::from_utf8_lossy(&line).trim().to_string();
            state.handle(&command);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ToolOutput {
    receiver: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    position: usize,
}

impl Read for ToolOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.chunk.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.position = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.position);
        buf[..n].copy_from_slice(&self.chunk[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}
