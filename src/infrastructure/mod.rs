// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod in_memory_backend;
pub mod tracing_overlays;
