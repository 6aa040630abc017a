//! Infrastructure layer - Cache clients, environment provider and logging

pub mod cache;
pub mod environment;
pub mod logging;
