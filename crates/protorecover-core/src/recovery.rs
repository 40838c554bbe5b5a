//! End-to-end recovery: resolve, render, persist.

use crate::error::Result;
use crate::proto::ProtoRenderer;
use crate::reflection::{ReflectionChannel, ReflectionResolver};
use crate::sink::ProtoSink;
use tracing::{error, info, warn};

/// Outcome of a [`Recovery::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    /// Number of files handed to the sink
    pub files_written: usize,
    /// Number of services the server listed
    pub services: usize,
}

/// Drives a [`ReflectionResolver`], renders every resolved descriptor and
/// hands the text to a [`ProtoSink`].
///
/// The run is all-or-nothing from the caller's point of view: the first file
/// that fails to render or persist aborts the batch and its error is returned.
#[derive(Debug)]
pub struct Recovery<C, S> {
    resolver: ReflectionResolver<C>,
    renderer: ProtoRenderer,
    sink: S,
}

impl<C: ReflectionChannel, S: ProtoSink> Recovery<C, S> {
    /// Creates a recovery over the given components
    pub fn new(resolver: ReflectionResolver<C>, renderer: ProtoRenderer, sink: S) -> Self {
        Self {
            resolver,
            renderer,
            sink,
        }
    }

    /// Resolve, render and persist every file the server exposes
    pub async fn run(&mut self) -> Result<RecoverySummary> {
        self.resolver.resolve().await?;
        let cache = self.resolver.cache();
        let services = self.resolver.services().len();

        if cache.is_empty() {
            warn!("no proto descriptors found on the server");
            return Ok(RecoverySummary {
                files_written: 0,
                services,
            });
        }

        let mut files_written = 0;
        for (name, descriptor) in cache.iter() {
            info!(file = name, "recovering proto");

            let rendered = self.renderer.render(descriptor).map_err(|e| {
                error!(file = name, error = %e, "failed to render descriptor");
                e
            })?;

            self.sink
                .write(&rendered.name, &rendered.content)
                .map_err(|e| {
                    error!(file = name, error = %e, "failed to persist recovered file");
                    e
                })?;

            files_written += 1;
        }

        info!(files = files_written, services, "recovery complete");
        Ok(RecoverySummary {
            files_written,
            services,
        })
    }

    /// The resolver, e.g. to export its cache after a run
    pub fn resolver(&self) -> &ReflectionResolver<C> {
        &self.resolver
    }

    /// The sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the recovery, returning its sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}
