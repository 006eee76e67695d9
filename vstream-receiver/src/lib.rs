//! # vstream-receiver
//!
//! Frame receiver service. Pulls raw frames from a `vstream-sender`,
//! one TCP connection per frame, and hands them to a display sink that
//! reports the stream status and can dump the newest frame to disk.

pub mod config;
pub mod service;
pub mod sink;
