//! Types shared between the database layer, the HTTP handlers and the server
//! binary.

pub mod api;
pub mod models;
