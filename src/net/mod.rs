//! Outbound transport for the transcript stream.

pub mod connection;

pub use connection::Connection;
