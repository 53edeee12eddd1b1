//! # Core Engine Module
//!
//! Shared abstractions used by every other subsystem.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration structures for renderer, assets and logging
//! - **Foundation**: Low-level utilities (math, time, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    RendererConfig,
    AssetConfig,
    LoggingConfig,
    Config,
    ConfigError,
};
