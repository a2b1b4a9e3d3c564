//! # Brain MCP Server
//!
//! Model Context Protocol (MCP) server for WorldQuant Brain alpha simulations.
//!
//! This crate exposes [`brain_client::SimulationClient`] through the MCP
//! protocol so AI assistants can submit alpha expressions, wait for their
//! simulations and inspect the resulting alphas.
//!
//! ## Tools
//!
//! - **submit_alpha**: submit, wait for completion, fetch alpha metrics
//! - **get_alpha** / **get_simulation**: alpha details by id
//! - **list_alphas**: paged listing of the account's alphas
//! - **get_simulation_status**: raw status of a running simulation
//! - **check_expression**: guidance for validating an expression
//!
//! ## Quick Start
//!
//! ```bash
//! export WORLDQUANT_EMAIL=... WORLDQUANT_PASSWORD=...
//!
//! # Run with stdio transport (for Claude Desktop)
//! brain-mcp-server
//!
//! # Run with HTTP transport (for remote hosting)
//! brain-mcp-server --http --port 8080
//! ```

#![warn(missing_docs)]

pub mod server;

pub use server::BrainMcpServer;

/// Server name for MCP protocol
pub const SERVER_NAME: &str = "brain-mcp";

/// Server version (same as crate version)
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
