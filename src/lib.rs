//! aap-bridge: MCP tool bridge for an Ansible Automation Platform controller.
//!
//! Chat clients speak MCP over stdio; each tool call is validated, routed to
//! a handler, and turned into one or more REST calls against the controller.
//! Jobs launched through the bridge are tracked locally so their status can
//! be polled by id.

pub mod config;
pub mod controller;
pub mod jobs;
pub mod server;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
