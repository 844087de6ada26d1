//! Adapter implementations
//!
//! Adapters implement the [`BoardGateway`](crate::ports::BoardGateway) port:
//! - REST client for the board API
//! - DuckDB board store for demo mode, seeded from the demo board

pub mod demo;
pub mod duckdb;
pub mod http;

#[cfg(test)]
pub mod mock_server;
