//! Integration tests for marga-server
//!
//! A fake engine stands in for the navmesh so the tests exercise framing,
//! dispatch, serialization and the transform pipeline over real sockets.

mod end_to_end;
mod harness;
mod map_access;
