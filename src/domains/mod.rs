//! Domains module containing business logic organized by bounded contexts.
//!
//! - **npm**: package registry lookups and dependency tree analysis
//! - **tools**: MCP tools exposing the npm domain to clients

pub mod npm;
pub mod tools;
