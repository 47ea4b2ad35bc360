//! Ripple Server
//!
//! Social network API for Users, their friends, and the Thoughts they post.

pub mod api;
pub mod config;
pub mod db;
