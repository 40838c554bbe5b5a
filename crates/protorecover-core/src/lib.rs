//! # protorecover-core
//!
//! A library for recovering Protocol Buffer definitions from a running gRPC
//! server through its reflection service.
//!
//! This crate provides the core functionality for:
//! - Discovering services and every file descriptor reachable from them
//! - Reconstructing human-readable `.proto` source files
//! - Handing the recovered files to a storage sink
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`reflection`]: The reflection walk and the channel abstraction
//! - [`proto`]: Proto definition rendering
//! - [`sink`]: Destinations for recovered files
//! - [`recovery`]: The resolve, render, persist pipeline
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use protorecover_core::{
//!     DirectorySink, GrpcReflectionChannel, ProtoRenderer, Recovery, ReflectionResolver,
//! };
//! use tonic::transport::Endpoint;
//!
//! # async fn run() -> protorecover_core::Result<()> {
//! let endpoint = Endpoint::from_static("http://localhost:50051");
//! let channel = GrpcReflectionChannel::connect(endpoint).await?;
//!
//! let mut recovery = Recovery::new(
//!     ReflectionResolver::new(channel),
//!     ProtoRenderer::new(),
//!     DirectorySink::new("protos"),
//! );
//! let summary = recovery.run().await?;
//! println!("recovered {} files", summary.files_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Extensibility
//!
//! The library provides two traits at its boundaries:
//!
//! - [`ReflectionChannel`]: How reflection queries reach the server
//! - [`ProtoSink`]: Where recovered files go
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod proto;
pub mod recovery;
pub mod reflection;
pub mod sink;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use proto::{
    logical_name, resolve_type_name, ProtoRenderer, ProtoSyntax, RenderedFile, RendererConfig,
};
pub use recovery::{Recovery, RecoverySummary};
pub use reflection::{
    DescriptorCache, GrpcReflectionChannel, ReflectionChannel, ReflectionQuery, ReflectionReply,
    ReflectionResolver,
};
pub use sink::{DirectorySink, MemorySink, ProtoSink};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid protobuf field number (2^29 - 1)
/// Used for `reserved X to max` ranges
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
