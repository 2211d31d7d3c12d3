//! HTTP front of quill: post feeds, group and profile listings, post pages,
//! and the create/edit flows.

pub mod config;
pub mod server;
