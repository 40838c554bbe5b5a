//! Error types for the protorecover-core library.
//!
//! A single [`Error`] enum covers the whole recovery pipeline: talking to the
//! reflection service, decoding the descriptors it returns, rendering them and
//! handing the result to a sink.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protorecover operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all protorecover operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Could not establish a channel to the target server
    #[error("failed to connect to '{target}': {source}")]
    Connect {
        /// The target that was dialed
        target: String,
        /// Underlying transport error
        #[source]
        source: tonic::transport::Error,
    },

    /// A reflection RPC failed at the transport or status level
    #[error("reflection call failed while {context}: {source}")]
    Rpc {
        /// What the resolver was doing when the call failed
        context: String,
        /// Status returned by the channel
        #[source]
        source: tonic::Status,
    },

    /// The server answered a reflection query with an error response
    #[error("reflection server returned error {code} while {context}: {message}")]
    ServerError {
        /// What the resolver was doing when the error was returned
        context: String,
        /// gRPC status code carried by the error response
        code: i32,
        /// Error message carried by the error response
        message: String,
    },

    /// The server answered with a reply that does not match the query
    #[error("unexpected reflection response while {context}: {details}")]
    UnexpectedResponse {
        /// What the resolver was doing when the reply arrived
        context: String,
        /// Description of the mismatch
        details: String,
    },

    /// Failed to parse FileDescriptorProto
    #[error("failed to parse FileDescriptorProto while {context}: {source}")]
    DescriptorParse {
        /// The query whose reply carried the bad blob
        context: String,
        /// Underlying decode error
        #[source]
        source: prost::DecodeError,
    },

    /// A descriptor violates an assumption the renderer relies on
    #[error("failed to render '{file}': {details}")]
    Render {
        /// Name of the file descriptor being rendered
        file: String,
        /// What was wrong with it
        details: String,
    },

    /// Unsupported proto syntax version
    #[error("unsupported proto syntax: '{syntax}'")]
    UnsupportedSyntax {
        /// The unsupported syntax string
        syntax: String,
    },

    /// A logical file name cannot be mapped to a storage location
    #[error("invalid logical file name '{name}': {reason}")]
    InvalidLogicalName {
        /// The offending logical name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Path traversal attempt detected (security error)
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// Refused to replace an existing file
    #[error("file already exists: '{path}'")]
    FileExists {
        /// Path of the existing file
        path: PathBuf,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new connection error
    pub fn connect(target: impl Into<String>, source: tonic::transport::Error) -> Self {
        Self::Connect {
            target: target.into(),
            source,
        }
    }

    /// Creates a new RPC error
    pub fn rpc(context: impl Into<String>, source: tonic::Status) -> Self {
        Self::Rpc {
            context: context.into(),
            source,
        }
    }

    /// Creates a new server error from a reflection error response
    pub fn server_error(context: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self::ServerError {
            context: context.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates a new descriptor parse error
    pub fn descriptor_parse(context: impl Into<String>, source: prost::DecodeError) -> Self {
        Self::DescriptorParse {
            context: context.into(),
            source,
        }
    }

    /// Creates a new unexpected response error
    pub fn unexpected_response(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            context: context.into(),
            details: details.into(),
        }
    }

    /// Creates a new render error
    pub fn render(file: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Render {
            file: file.into(),
            details: details.into(),
        }
    }

    /// Creates a new invalid logical name error
    pub fn invalid_logical_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidLogicalName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new file-exists error
    pub fn file_exists(path: impl Into<PathBuf>) -> Self {
        Self::FileExists { path: path.into() }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the failure happened while talking to the server
    pub fn is_reflection(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Rpc { .. }
                | Self::ServerError { .. }
                | Self::UnexpectedResponse { .. }
                | Self::DescriptorParse { .. }
        )
    }

    /// Returns true if the failure happened while persisting a rendered file
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::InvalidLogicalName { .. }
                | Self::PathTraversal { .. }
                | Self::FileExists { .. }
                | Self::FileWrite { .. }
                | Self::DirectoryCreate { .. }
        )
    }
}
