//! Test server and fake engine.

use marga_path::core::Point3;
use marga_server::engine::{EngineError, EngineResult, NavEngine};
use marga_server::protocol::Request;
use marga_server::protocol::wire::encode_frame;
use marga_server::{Listener, ServerConfig, ServerContext};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Map id the fake engine refuses to load
pub const MISSING_MAP: i32 = 404;

/// Shared view of what the fake engine saw
#[derive(Clone, Default)]
pub struct EngineProbe {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub loads: Arc<Mutex<HashMap<i32, usize>>>,
    in_flight: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
}

impl EngineProbe {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn loads_of(&self, map_id: i32) -> usize {
        self.loads.lock().get(&map_id).copied().unwrap_or(0)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

/// Engine that answers with fixed geometry and flags reentrant calls
pub struct FakeEngine {
    probe: EngineProbe,
    delay: Duration,
}

impl FakeEngine {
    pub fn new(probe: EngineProbe) -> Self {
        Self {
            probe,
            delay: Duration::ZERO,
        }
    }

    /// Hold each call for `delay` to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn enter(&self, call: String) {
        if self.probe.in_flight.swap(true, Ordering::SeqCst) {
            self.probe.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.probe.calls.lock().push(call);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    fn leave(&self) {
        self.probe.in_flight.store(false, Ordering::SeqCst);
    }

    fn call<T>(&self, name: String, f: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        self.enter(name);
        let result = f();
        self.leave();
        result
    }
}

impl NavEngine for FakeEngine {
    fn load_map(&mut self, map_id: i32) -> EngineResult<()> {
        let loads = Arc::clone(&self.probe.loads);
        self.call(format!("load {}", map_id), || {
            if map_id == MISSING_MAP {
                return Err(EngineError::MapNotFound(map_id));
            }
            *loads.lock().entry(map_id).or_insert(0) += 1;
            Ok(())
        })
    }

    fn find_path(&mut self, _: i32, start: Point3, end: Point3) -> EngineResult<Vec<f32>> {
        self.call("find_path".to_string(), || {
            let mid = (start + end) * 0.5;
            Ok(marga_path::points_to_flat(&[start, mid, end]))
        })
    }

    fn move_along_surface(&mut self, _: i32, _: Point3, end: Point3) -> EngineResult<Point3> {
        self.call("move_along_surface".to_string(), || Ok(end))
    }

    fn cast_ray(&mut self, _: i32, _: Point3, _: Point3) -> EngineResult<bool> {
        self.call("cast_ray".to_string(), || Ok(true))
    }

    fn random_point(&mut self, _: i32) -> EngineResult<Point3> {
        self.call("random_point".to_string(), || Ok(Point3::new(1.0, 2.0, 3.0)))
    }

    fn random_point_around(&mut self, _: i32, center: Point3, radius: f32) -> EngineResult<Point3> {
        self.call(format!("random_point_around {}", radius), || Ok(center))
    }
}

/// Listener on an ephemeral localhost port
pub struct TestServer {
    pub ctx: Arc<ServerContext>,
    pub addr: SocketAddr,
    pub probe: EngineProbe,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with(ServerConfig::default(), Duration::ZERO)
    }

    pub fn start_with(mut config: ServerConfig, delay: Duration) -> Self {
        config.network.bind_address = "127.0.0.1".to_string();
        config.network.port = 0;
        config.smoothing.steering_seed = 9;

        let probe = EngineProbe::default();
        let engine = FakeEngine::new(probe.clone()).with_delay(delay);
        let ctx = Arc::new(ServerContext::new(config, Box::new(engine)));

        let listener = Listener::bind(Arc::clone(&ctx)).expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            listener.run().expect("listener");
        });

        Self {
            ctx,
            addr,
            probe,
            handle: Some(handle),
        }
    }

    pub fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        stream
    }

    /// Wait until the live connection count reaches `expected`.
    pub fn wait_for_connections(&self, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.ctx.connections().live() == expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.ctx.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn send_raw(stream: &mut TcpStream, payload: &[u8]) {
    stream.write_all(&encode_frame(payload)).expect("write");
}

pub fn send(stream: &mut TcpStream, request: &Request) {
    send_raw(stream, &request.encode());
}

/// Read one response frame, returning its payload.
pub fn read_payload(stream: &mut TcpStream) -> Vec<u8> {
    let mut len = [0u8; 4];
    stream.read_exact(&mut len).expect("length prefix");
    let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
    stream.read_exact(&mut payload).expect("payload");
    payload
}
