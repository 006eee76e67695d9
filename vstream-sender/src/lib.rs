//! # vstream-sender
//!
//! Frame sender service.
//!
//! Serves raw video frames to a `vstream-receiver` over TCP, one frame
//! per connection. Frames come from a synthetic test pattern standing in
//! for a capture device; the relay itself lives in `vstream-core`.

pub mod config;
pub mod service;
pub mod source;
