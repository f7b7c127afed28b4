//! Mock service servers for integration tests
//!
//! - WebSocket: the Watson `/v1/recognize` interface
//!
//! REST status endpoints are mocked with `wiremock` directly in the tests.

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod websocket_mock;
