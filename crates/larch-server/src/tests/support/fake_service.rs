//! Fake listeners for probe and lifecycle tests.
//!
//! [`FakeService`] accepts connections on an ephemeral port and answers each
//! request line according to its [`Behaviour`]. It records the methods it
//! receives so tests can assert which remote calls the controller made.

use std::io::{self, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use larch_protocol::{ClientInfo, ErrorCode, Request, Response, methods, read_frame, write_frame};
use serde_json::{Value, json};

const ACCEPT_POLL: Duration = Duration::from_millis(5);

/// How a [`FakeService`] answers.
#[derive(Debug, Clone)]
pub(in crate::tests) enum Behaviour {
    /// Speaks the full protocol and stops listening after `shutdown`.
    Compatible(ClientInfo),
    /// Speaks the full protocol but keeps listening after `shutdown`.
    Lingering(ClientInfo),
    /// Writes each request straight back.
    Echo,
    /// Replies with a line that is not JSON.
    Garbage,
    /// Closes the connection without reading.
    HangUp,
    /// Advertises only part of the required method list.
    MissingMethods,
    /// Speaks the protocol but answers `shutdown` with an error.
    RefusesShutdown,
}

/// A threaded fake of `larchd` or of some unrelated listener.
pub(in crate::tests) struct FakeService {
    port: u16,
    calls: Arc<Mutex<Vec<String>>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeService {
    pub fn spawn(behaviour: Behaviour) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake service")?;
        listener
            .set_nonblocking(true)
            .context("fake service nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let calls = Arc::clone(&calls);
            let stop = Arc::clone(&stop);
            thread::spawn(move || serve(listener, &behaviour, &calls, &stop))
        };
        Ok(Self {
            port,
            calls,
            stop,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Methods received so far, in arrival order.
    pub fn calls(&self) -> Result<Vec<String>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .map_err(|error| anyhow!("lock calls: {error}"))
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Session record whose last activity was `idle_secs` ago.
pub(in crate::tests) fn client_info(port: u16, keepalive_secs: f64, idle_secs: f64) -> ClientInfo {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64());
    ClientInfo {
        pid_server: 4242,
        port,
        pid: 77,
        app: String::from("notebook"),
        machine: String::from("bench"),
        user: String::from("analyst"),
        last_event: now - idle_secs,
        keepalive_time: keepalive_secs,
    }
}

fn serve(
    listener: TcpListener,
    behaviour: &Behaviour,
    calls: &Mutex<Vec<String>>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => match answer(stream, behaviour, calls) {
                Ok(Outcome::Continue) | Err(_) => {}
                Ok(Outcome::Stop) => return,
            },
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(_) => return,
        }
    }
}

enum Outcome {
    Continue,
    Stop,
}

fn answer(mut stream: TcpStream, behaviour: &Behaviour, calls: &Mutex<Vec<String>>) -> Result<Outcome> {
    if matches!(behaviour, Behaviour::HangUp) {
        return Ok(Outcome::Continue);
    }
    stream.set_nonblocking(false).context("blocking stream")?;
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .context("read timeout")?;
    let Some(frame) = read_frame(&mut stream).context("read request")? else {
        return Ok(Outcome::Continue);
    };
    match behaviour {
        Behaviour::Echo => {
            stream.write_all(&frame).context("echo request")?;
            return Ok(Outcome::Continue);
        }
        Behaviour::Garbage => {
            stream.write_all(b"not json\n").context("write garbage")?;
            return Ok(Outcome::Continue);
        }
        _ => {}
    }

    let request: Request = serde_json::from_slice(&frame).context("decode request")?;
    calls
        .lock()
        .map_err(|error| anyhow!("lock calls: {error}"))?
        .push(request.method.clone());
    if matches!(behaviour, Behaviour::RefusesShutdown) && request.method == methods::SHUTDOWN {
        let refusal = Response::failure(request.id, ErrorCode::InternalError, "busy");
        write_frame(&mut stream, &refusal).context("write refusal")?;
        return Ok(Outcome::Continue);
    }
    let result = match (behaviour, request.method.as_str()) {
        (Behaviour::MissingMethods, methods::LIST_METHODS) => {
            json!([methods::LIST_METHODS, methods::GET_CLIENT_INFO])
        }
        (_, methods::LIST_METHODS) => json!(methods::ALL),
        (Behaviour::Compatible(info) | Behaviour::Lingering(info), methods::GET_CLIENT_INFO) => {
            serde_json::to_value(info).context("encode client info")?
        }
        _ => Value::Bool(true),
    };
    write_frame(&mut stream, &Response::success(request.id, result)).context("write response")?;

    let stops = matches!(behaviour, Behaviour::Compatible(_)) && request.method == methods::SHUTDOWN;
    Ok(if stops { Outcome::Stop } else { Outcome::Continue })
}

/// Binds a listener that never accepts, so connects succeed and reads stall.
pub(in crate::tests) fn silent_listener() -> Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind silent listener")?;
    let port = listener.local_addr().context("local addr")?.port();
    Ok((listener, port))
}

/// Returns a port that was free a moment ago.
pub(in crate::tests) fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind probe listener")?;
    let port = listener.local_addr().context("local addr")?.port();
    drop(listener);
    Ok(port)
}

/// Binds `count` consecutive ports and checks the port after them is free.
pub(in crate::tests) fn occupy_consecutive(count: u16) -> Result<(Vec<TcpListener>, u16)> {
    for _ in 0..64 {
        let first = TcpListener::bind(("127.0.0.1", 0)).context("bind first port")?;
        let base = first.local_addr().context("local addr")?.port();
        let Some(after) = base.checked_add(count) else {
            continue;
        };
        let mut listeners = vec![first];
        for offset in 1..count {
            match TcpListener::bind(("127.0.0.1", base + offset)) {
                Ok(listener) => listeners.push(listener),
                Err(_) => break,
            }
        }
        if listeners.len() == usize::from(count) && TcpListener::bind(("127.0.0.1", after)).is_ok()
        {
            return Ok((listeners, base));
        }
    }
    Err(anyhow!("could not reserve {count} consecutive ports"))
}
