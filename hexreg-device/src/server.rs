//! TCP server: one listener, one client at a time.

use std::{
    io::{ErrorKind, Read, Write},
    net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use hexreg_protocol::{EXIT_TOKEN, GREETING};

use crate::engine::Engine;

/// Well-known port the device listens on by default.
pub const DEFAULT_PORT: u16 = 8989;

/// Largest payload accepted in a single receive.
const RECV_BUFFER_SIZE: usize = 255;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind; all interfaces on the well-known port by default.
    /// Port 0 binds an ephemeral port, readable through
    /// [`DeviceServer::local_addr`] once started.
    pub addr: SocketAddr,
    /// How often the accept loop re-checks the running flag while idle.
    pub accept_poll: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            accept_poll: Duration::from_millis(10),
        }
    }
}

/// The device's network frontend.
///
/// `start` binds the listener and spawns the accept loop on a background
/// thread; `stop` tears the loop down and joins it. Dropping a running
/// server stops it. At most one client is served at a time: a second
/// connection is accepted only after the current client's socket closes.
pub struct DeviceServer {
    engine: Arc<Engine>,
    config: Config,
    running: Arc<AtomicBool>,
    client: Arc<Mutex<Option<TcpStream>>>,
    local_addr: Option<SocketAddr>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceServer {
    pub fn new(engine: Arc<Engine>, config: Config) -> DeviceServer {
        DeviceServer {
            engine,
            config,
            running: Arc::new(AtomicBool::new(false)),
            client: Arc::new(Mutex::new(None)),
            local_addr: None,
            handle: None,
        }
    }

    /// Binds the listener and spawns the accept loop.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let listener = TcpListener::bind(self.config.addr)?;
        // Nonblocking so the loop can observe the running flag between
        // accept attempts.
        listener.set_nonblocking(true)?;
        self.local_addr = Some(listener.local_addr()?);
        log::info!("device listening on {}", self.local_addr.unwrap_or(self.config.addr));

        self.running.store(true, Ordering::SeqCst);
        let engine = Arc::clone(&self.engine);
        let running = Arc::clone(&self.running);
        let client = Arc::clone(&self.client);
        let poll = self.config.accept_poll;

        self.handle = Some(thread::spawn(move || {
            accept_loop(listener, engine, running, client, poll);
        }));
        Ok(())
    }

    /// The address the listener actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stops accepting, disconnects the current client and joins the
    /// server thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(stream) = self
            .client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("server thread panicked");
            }
        }
        self.local_addr = None;
        log::info!("device stopped");
    }

    /// Runs the server on the calling thread until the process is killed
    /// or another thread stops it.
    pub fn run(mut self) -> std::io::Result<()> {
        self.start()?;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for DeviceServer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

fn accept_loop(
    listener: TcpListener,
    engine: Arc<Engine>,
    running: Arc<AtomicBool>,
    client: Arc<Mutex<Option<TcpStream>>>,
    poll: Duration,
) {
    log::debug!("server thread started");

    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                log::info!("client connected from {}", peer);
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                match stream.try_clone() {
                    Ok(clone) => {
                        *client.lock().unwrap_or_else(|e| e.into_inner()) = Some(clone);
                    }
                    Err(error) => {
                        log::error!("failed to retain client handle: {}", error);
                        continue;
                    }
                }
                handle_client(&engine, stream, &running);
                *client.lock().unwrap_or_else(|e| e.into_inner()) = None;
                log::info!("client disconnected");
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                thread::sleep(poll);
            }
            Err(error) => {
                if running.load(Ordering::SeqCst) {
                    log::error!("accept failed: {}", error);
                }
            }
        }
    }

    log::debug!("server thread stopped");
}

fn handle_client(engine: &Engine, mut stream: TcpStream, running: &AtomicBool) {
    if let Err(error) = stream.write_all(GREETING) {
        log::error!("failed to send greeting: {}", error);
        return;
    }

    let mut buffer = [0u8; RECV_BUFFER_SIZE];
    while running.load(Ordering::SeqCst) {
        let received = match stream.read(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(received) => received,
            Err(error)
                if error.kind() == ErrorKind::ConnectionAborted
                    || error.kind() == ErrorKind::ConnectionReset =>
            {
                break;
            }
            Err(error) => {
                if running.load(Ordering::SeqCst) {
                    log::error!("client read failed: {}", error);
                }
                break;
            }
        };

        let payload = &buffer[..received];
        if payload == EXIT_TOKEN {
            log::info!("exit requested by client");
            break;
        }

        log::debug!("received payload {:?}", String::from_utf8_lossy(payload));
        let response = engine.process(payload);
        if let Err(error) = stream.write_all(response.as_bytes()) {
            log::error!("failed to send response: {}", error);
            break;
        }
        log::debug!("sent response {}", response);
    }
}
