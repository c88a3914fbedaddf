//! In-process fake broker for connection and dispatch tests.
//!
//! The broker accepts a single connection on an ephemeral loopback port,
//! greets it, records every command it receives and answers according to a
//! [`BrokerScript`]. Tests can push arbitrary server frames at any time with
//! [`FakeBroker::send`].

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Replies the fake broker sends for each kind of command.
#[derive(Debug, Clone)]
pub struct BrokerScript {
    greeting: String,
    connect_reply: Option<String>,
    command_reply: Option<String>,
}

impl BrokerScript {
    /// Broker that greets with `INFO` and never acknowledges.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            greeting: String::from(
                "INFO {\"server_id\":\"fake-broker\",\"max_payload\":1048576}\r\n",
            ),
            connect_reply: None,
            command_reply: None,
        }
    }

    /// Broker that answers `+OK` to `CONNECT`, `PUB`, `SUB` and `UNSUB`.
    #[must_use]
    pub fn verbose() -> Self {
        Self::quiet()
            .with_connect_reply("+OK\r\n")
            .with_command_reply("+OK\r\n")
    }

    /// Replaces the greeting sent right after accepting.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Sets the raw reply to `CONNECT`.
    #[must_use]
    pub fn with_connect_reply(mut self, reply: impl Into<String>) -> Self {
        self.connect_reply = Some(reply.into());
        self
    }

    /// Sets the raw reply to `PUB`, `SUB` and `UNSUB`.
    #[must_use]
    pub fn with_command_reply(mut self, reply: impl Into<String>) -> Self {
        self.command_reply = Some(reply.into());
        self
    }
}

type Shared<T> = Arc<Mutex<T>>;

/// Single-connection broker running on a background thread.
pub struct FakeBroker {
    port: u16,
    commands: Shared<Vec<String>>,
    stream: Shared<Option<TcpStream>>,
    stopping: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeBroker {
    /// Binds an ephemeral port and starts serving `script`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub fn spawn(script: BrokerScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake broker")?;
        listener
            .set_nonblocking(true)
            .context("fake broker nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let commands: Shared<Vec<String>> = Arc::default();
        let stream: Shared<Option<TcpStream>> = Arc::default();
        let stopping = Arc::new(AtomicBool::new(false));
        let session = Session {
            script,
            commands: Arc::clone(&commands),
            stream: Arc::clone(&stream),
            stopping: Arc::clone(&stopping),
        };
        let handle = thread::Builder::new()
            .name(String::from("fake-broker"))
            .spawn(move || session.run(&listener))
            .context("spawn fake broker")?;
        Ok(Self {
            port,
            commands,
            stream,
            stopping,
            handle: Some(handle),
        })
    }

    /// Port the broker listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Commands received so far, one entry per command. `PUB` entries include
    /// the payload block.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Polls until at least `count` commands have arrived or `timeout`
    /// elapses, then returns what was received.
    #[must_use]
    pub fn wait_for_commands(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let received = self.commands();
            if received.len() >= count || Instant::now() >= deadline {
                return received;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Writes raw bytes to the connected client.
    ///
    /// # Errors
    ///
    /// Returns an error if no client is connected or the write fails.
    pub fn send(&self, frame: impl AsRef<[u8]>) -> Result<()> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = guard
            .as_mut()
            .ok_or_else(|| anyhow!("no client connected to fake broker"))?;
        stream.write_all(frame.as_ref()).context("write frame")?;
        stream.flush().context("flush frame")
    }

    /// Hangs up on the connected client.
    pub fn disconnect(&self) {
        let guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = guard.as_ref() {
            drop(stream.shutdown(Shutdown::Both));
        }
    }

    /// Stops the broker and reports any failure from its thread.
    ///
    /// # Errors
    ///
    /// Returns the session error, or an error if the thread panicked.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.stopping.store(true, Ordering::SeqCst);
        self.disconnect();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("fake broker thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        drop(self.stop());
    }
}

struct Session {
    script: BrokerScript,
    commands: Shared<Vec<String>>,
    stream: Shared<Option<TcpStream>>,
    stopping: Arc<AtomicBool>,
}

impl Session {
    fn run(self, listener: &TcpListener) -> Result<()> {
        let Some(stream) = self.accept(listener)? else {
            return Ok(());
        };
        stream.set_nonblocking(false).context("client blocking")?;
        let reader = stream.try_clone().context("clone client stream")?;
        *self.stream.lock().unwrap_or_else(PoisonError::into_inner) = Some(stream);
        self.reply(self.script.greeting.as_bytes())?;
        self.serve(BufReader::new(reader))
    }

    fn accept(&self, listener: &TcpListener) -> Result<Option<TcpStream>> {
        let deadline = Instant::now() + ACCEPT_DEADLINE;
        loop {
            match listener.accept() {
                Ok((stream, _)) => return Ok(Some(stream)),
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => {
                    if self.stopping.load(Ordering::SeqCst) || Instant::now() >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }

    fn serve(&self, mut reader: BufReader<TcpStream>) -> Result<()> {
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                Err(_) if self.stopping.load(Ordering::SeqCst) => return Ok(()),
                Err(error) => return Err(error).context("read command"),
            }
            let mut command = String::from_utf8_lossy(&line).into_owned();
            let keyword = command
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();
            if keyword == "PUB" {
                command.push_str(&read_payload(&mut reader, &command)?);
            }
            self.record(command);
            let reply = match keyword.as_str() {
                "CONNECT" => self.script.connect_reply.as_deref(),
                "PUB" | "SUB" | "UNSUB" => self.script.command_reply.as_deref(),
                "PING" => Some("PONG\r\n"),
                _ => None,
            };
            if let Some(bytes) = reply {
                self.reply(bytes.as_bytes())?;
            }
        }
    }

    fn record(&self, command: String) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    fn reply(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(stream) = guard.as_mut() else {
            return Ok(());
        };
        stream.write_all(bytes).context("write reply")?;
        stream.flush().context("flush reply")
    }
}

/// Reads the payload block announced by a `PUB` header, terminator included.
fn read_payload(reader: &mut impl Read, header: &str) -> Result<String> {
    let size: usize = header
        .split_whitespace()
        .last()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| anyhow!("PUB header without payload size: {header:?}"))?;
    let mut block = vec![0; size.saturating_add(2)];
    reader.read_exact(&mut block).context("read PUB payload")?;
    Ok(String::from_utf8_lossy(&block).into_owned())
}
