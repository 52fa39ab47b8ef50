//! HTTP surface for the Nurture engine: the scheduler-invoked recovery run,
//! milestone lookup, catalog reads, and operational probes.

pub mod auth;
pub mod models;
pub mod rest;
pub mod server;

pub use rest::AppState;
pub use server::ApiServer;
