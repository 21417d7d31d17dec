//! Download streaming service for a game-server node daemon.
//!
//! Serves backup archives and server files over HTTP to holders of
//! single-use signed tokens, with byte-range support and streaming bodies
//! that release their file handle as soon as the client goes away.

pub mod config;
pub mod download;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
pub mod token;
