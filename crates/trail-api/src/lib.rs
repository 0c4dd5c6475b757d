//! HTTP host for field history sessions.

pub mod server;
