//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Services depend
//! only on these traits, not on the HTTP client or the local store.

mod board_gateway;

pub use board_gateway::BoardGateway;
