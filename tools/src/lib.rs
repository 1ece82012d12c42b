//! Tool subsystem (spec §4.5): the `ToolExecutor`/`FunctionProvider`
//! contracts, allow-list filtering, the MCP client, and built-in providers.

pub mod builtin;
pub mod error;
pub mod executor;
pub mod mcp;
pub mod provider;

pub use error::ToolSourceError;
pub use executor::{filter_allowed_calls, Kind, ToolExecutor};
pub use provider::{Collector, FunctionProvider, ManagementRoute};
