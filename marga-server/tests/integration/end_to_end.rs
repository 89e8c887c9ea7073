//! Request/response behaviour over TCP.

use crate::harness::{MISSING_MAP, TestServer, read_payload, send, send_raw};
use marga_path::core::Point3;
use marga_path::transform::PathFlags;
use marga_server::ServerConfig;
use marga_server::protocol::messages::decode_points;
use marga_server::protocol::{MovementType, PathRequest, RandomPointRequest, Request};
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

fn find_path(map_id: i32, flags: PathFlags) -> Request {
    Request::Path(PathRequest {
        start: Point3::new(0.0, 0.0, 0.0),
        end: Point3::new(10.0, 0.0, 0.0),
        map_id,
        flags,
        movement: MovementType::FindPath,
    })
}

fn random_point(max_radius: f32) -> Request {
    Request::RandomPoint(RandomPointRequest {
        map_id: 1,
        start: Point3::new(5.0, 5.0, 0.0),
        max_radius,
    })
}

#[test]
fn keep_alive_reply_is_exact() {
    let server = TestServer::start();
    let mut stream = server.connect();

    send(&mut stream, &Request::KeepAlive);
    let mut reply = [0u8; 5];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(reply, [1, 0, 0, 0, 1]);
}

#[test]
fn find_path_without_flags_returns_raw_nodes() {
    let server = TestServer::start();
    let mut stream = server.connect();

    send(&mut stream, &find_path(1, PathFlags::NONE));
    let payload = read_payload(&mut stream);
    assert_eq!(payload.len(), 36);
    assert_eq!(
        decode_points(&payload).unwrap(),
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ]
    );
}

#[test]
fn find_path_with_chaikin_returns_five_nodes() {
    let server = TestServer::start();
    let mut stream = server.connect();

    send(&mut stream, &find_path(1, PathFlags::CHAIKIN));
    let points = decode_points(&read_payload(&mut stream)).unwrap();
    assert_eq!(points.len(), 5);
    assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
    assert_eq!(points[4], Point3::new(10.0, 0.0, 0.0));
}

#[test]
fn server_side_stages_apply_without_client_flags() {
    let mut config = ServerConfig::default();
    config.smoothing.node_reduction = true;
    let server = TestServer::start_with(config, Duration::ZERO);
    let mut stream = server.connect();

    send(&mut stream, &find_path(1, PathFlags::NONE));
    let points = decode_points(&read_payload(&mut stream)).unwrap();
    // Colinear midpoint is pruned
    assert_eq!(points.len(), 2);
}

#[test]
fn random_point_radius_selects_query() {
    let server = TestServer::start();
    let mut stream = server.connect();

    send(&mut stream, &random_point(0.0));
    let unconstrained = decode_points(&read_payload(&mut stream)).unwrap();
    assert_eq!(unconstrained, vec![Point3::new(1.0, 2.0, 3.0)]);

    send(&mut stream, &random_point(5.0));
    let around = decode_points(&read_payload(&mut stream)).unwrap();
    assert_eq!(around, vec![Point3::new(5.0, 5.0, 0.0)]);

    let calls = server.probe.calls();
    let queries: Vec<&String> = calls.iter().filter(|c| c.starts_with("random")).collect();
    assert_eq!(queries, vec!["random_point", "random_point_around 5"]);
}

#[test]
fn malformed_request_is_skipped() {
    let server = TestServer::start();
    let mut stream = server.connect();

    // Path tag with a 36-byte body
    let mut short = find_path(1, PathFlags::NONE).encode();
    short.truncate(36);
    send_raw(&mut stream, &short);

    // Unknown movement type
    let mut bad_movement = find_path(1, PathFlags::NONE).encode();
    bad_movement[36..40].copy_from_slice(&7i32.to_le_bytes());
    send_raw(&mut stream, &bad_movement);

    send(&mut stream, &Request::KeepAlive);
    assert_eq!(read_payload(&mut stream), vec![1]);

    send(&mut stream, &find_path(1, PathFlags::NONE));
    assert_eq!(read_payload(&mut stream).len(), 36);
}

#[test]
fn missing_map_returns_zero_point() {
    let server = TestServer::start();
    let mut stream = server.connect();

    send(&mut stream, &find_path(MISSING_MAP, PathFlags::CHAIKIN));
    assert_eq!(
        decode_points(&read_payload(&mut stream)).unwrap(),
        vec![Point3::ZERO]
    );
}

#[test]
fn oversized_frame_closes_connection() {
    let server = TestServer::start();
    let mut stream = server.connect();

    stream
        .write_all(&(2 * 1024 * 1024u32).to_le_bytes())
        .unwrap();
    let mut buf = [0u8; 1];
    // Either a clean EOF or a reset, never a reply
    match stream.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::WouldBlock),
    }
}

#[test]
fn connection_count_tracks_clients() {
    let server = TestServer::start();

    let a = server.connect();
    let b = server.connect();
    assert!(server.wait_for_connections(2));

    drop(a);
    drop(b);
    assert!(server.wait_for_connections(0));
}

#[test]
fn idle_client_dropped_after_read_timeout() {
    let mut config = ServerConfig::default();
    config.network.read_timeout_secs = 1;
    let server = TestServer::start_with(config, Duration::ZERO);

    let mut stream = server.connect();
    assert!(server.wait_for_connections(1));
    assert!(server.wait_for_connections(0));

    // Server side is closed: EOF or reset, never a reply
    let mut buf = [0u8; 1];
    match stream.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::WouldBlock),
    }
}

#[test]
fn concurrent_clients_never_overlap_engine_calls() {
    let server = TestServer::start_with(ServerConfig::default(), Duration::from_micros(200));

    let clients: Vec<_> = (0..6)
        .map(|i| {
            let mut stream = server.connect();
            thread::spawn(move || {
                for _ in 0..15 {
                    let flags = if i % 2 == 0 {
                        PathFlags::CHAIKIN
                    } else {
                        PathFlags::NONE
                    };
                    send(&mut stream, &find_path(1 + i % 3, flags));
                    let points = decode_points(&read_payload(&mut stream)).unwrap();
                    assert!(points.len() == 3 || points.len() == 5);
                }
            })
        })
        .collect();

    for client in clients {
        client.join().unwrap();
    }

    assert_eq!(server.probe.overlaps(), 0);
    for map_id in 1..=3 {
        assert_eq!(server.probe.loads_of(map_id), 1);
    }
}
