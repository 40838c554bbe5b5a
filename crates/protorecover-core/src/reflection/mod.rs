//! gRPC server reflection walk.
//!
//! [`ReflectionResolver`] asks a server which services it exposes, fetches the
//! file defining each one, then follows `dependency` edges until every
//! reachable file descriptor is in its [`DescriptorCache`].
//!
//! The resolver is written against the [`ReflectionChannel`] trait, so it does
//! not care how queries reach the server. [`GrpcReflectionChannel`] is the
//! implementation over a connected `tonic` channel.
//!
//! ## Termination
//!
//! The import graph may contain diamonds and even cycles. Dependency names go
//! on an explicit work stack, and a name is only requested when it is neither
//! cached nor already requested. Every distinct file name therefore costs at
//! most one round trip no matter how many edges point at it.

mod grpc;

use crate::error::{Error, Result};
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{btree_map, BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info, trace};

pub use grpc::GrpcReflectionChannel;

/// One reflection query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReflectionQuery {
    /// List every service the server exposes
    ListServices,
    /// The file defining the given fully-qualified symbol, plus its imports
    FileContainingSymbol(String),
    /// The file with exactly this name, plus its imports
    FileByFilename(String),
}

impl fmt::Display for ReflectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListServices => write!(f, "listing services"),
            Self::FileContainingSymbol(symbol) => {
                write!(f, "resolving file containing symbol '{}'", symbol)
            }
            Self::FileByFilename(name) => write!(f, "resolving file '{}'", name),
        }
    }
}

/// A successful reply to a [`ReflectionQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectionReply {
    /// Fully-qualified service names
    Services(Vec<String>),
    /// Serialized `FileDescriptorProto` blobs
    FileDescriptors(Vec<Vec<u8>>),
}

/// A request/response capable reflection transport.
///
/// Each call is a single-shot exchange: one query out, at most one reply
/// back. `Ok(None)` means the stream ended without a reply, which is a valid
/// outcome and not an error. Server-side error responses should be surfaced
/// as [`Error::ServerError`].
#[allow(async_fn_in_trait)]
pub trait ReflectionChannel {
    /// Sends one query and waits for its reply
    async fn exchange(&mut self, query: ReflectionQuery) -> Result<Option<ReflectionReply>>;
}

impl<C: ReflectionChannel + ?Sized> ReflectionChannel for &mut C {
    async fn exchange(&mut self, query: ReflectionQuery) -> Result<Option<ReflectionReply>> {
        (**self).exchange(query).await
    }
}

/// File descriptors keyed by file name.
///
/// Append-only: once a name is present it is never replaced. Iteration is
/// sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct DescriptorCache {
    files: BTreeMap<String, FileDescriptorProto>,
}

impl DescriptorCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a descriptor unless its name is already cached.
    ///
    /// Returns false, leaving the cached entry untouched, if the name was
    /// already present.
    pub fn insert(&mut self, descriptor: FileDescriptorProto) -> bool {
        match self.files.entry(descriptor.name().to_string()) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(descriptor);
                true
            }
        }
    }

    /// Looks up a descriptor by file name
    pub fn get(&self, name: &str) -> Option<&FileDescriptorProto> {
        self.files.get(name)
    }

    /// Returns true if a descriptor with this file name is cached
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if nothing has been cached
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over `(file name, descriptor)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileDescriptorProto)> {
        self.files.iter().map(|(name, file)| (name.as_str(), file))
    }

    /// Cached file names in name order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Collects every cached descriptor into a `FileDescriptorSet`
    pub fn to_file_descriptor_set(&self) -> FileDescriptorSet {
        FileDescriptorSet {
            file: self.files.values().cloned().collect(),
        }
    }
}

/// Walks the reflection service and collects every reachable file descriptor
#[derive(Debug)]
pub struct ReflectionResolver<C> {
    channel: C,
    cache: DescriptorCache,
    services: BTreeSet<String>,
    requested: HashSet<String>,
    resolved: bool,
}

impl<C: ReflectionChannel> ReflectionResolver<C> {
    /// Creates a resolver over an already-connected channel
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            cache: DescriptorCache::new(),
            services: BTreeSet::new(),
            requested: HashSet::new(),
            resolved: false,
        }
    }

    /// Resolve every file reachable from the server's services.
    ///
    /// Only the first call talks to the server; later calls return the same
    /// cache. RPC failures are not retried.
    pub async fn resolve(&mut self) -> Result<&DescriptorCache> {
        if self.resolved {
            trace!("descriptors already resolved, reusing cache");
            return Ok(&self.cache);
        }

        let services = self.list_services().await?;
        if services.is_empty() {
            info!("server lists no services");
        }

        for service in services {
            if !self.services.insert(service.clone()) {
                continue;
            }
            let query = ReflectionQuery::FileContainingSymbol(service);
            let blobs = self.fetch_descriptors(&query).await?;
            self.absorb(&query, blobs).await?;
        }

        self.resolved = true;
        info!(
            services = self.services.len(),
            files = self.cache.len(),
            "reflection walk complete"
        );
        Ok(&self.cache)
    }

    /// Service names discovered by the last [`resolve`](Self::resolve)
    pub fn services(&self) -> &BTreeSet<String> {
        &self.services
    }

    /// The descriptors cached so far
    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// Consumes the resolver, returning its cache
    pub fn into_cache(self) -> DescriptorCache {
        self.cache
    }

    async fn list_services(&mut self) -> Result<Vec<String>> {
        let query = ReflectionQuery::ListServices;
        debug!("{}", query);
        match self.channel.exchange(query.clone()).await? {
            None => Ok(Vec::new()),
            Some(ReflectionReply::Services(names)) => Ok(names),
            Some(ReflectionReply::FileDescriptors(_)) => Err(Error::unexpected_response(
                query.to_string(),
                "expected a service list, got file descriptors",
            )),
        }
    }

    async fn fetch_descriptors(&mut self, query: &ReflectionQuery) -> Result<Vec<Vec<u8>>> {
        debug!("{}", query);
        match self.channel.exchange(query.clone()).await? {
            None => {
                debug!("no reply while {}", query);
                Ok(Vec::new())
            }
            Some(ReflectionReply::FileDescriptors(blobs)) => Ok(blobs),
            Some(ReflectionReply::Services(_)) => Err(Error::unexpected_response(
                query.to_string(),
                "expected file descriptors, got a service list",
            )),
        }
    }

    /// Caches every new descriptor in `blobs`, then fetches their missing
    /// dependencies until nothing is left to request.
    async fn absorb(&mut self, query: &ReflectionQuery, blobs: Vec<Vec<u8>>) -> Result<()> {
        let mut pending = Vec::new();
        self.cache_blobs(query, blobs, &mut pending)?;

        while let Some(name) = pending.pop() {
            if self.cache.contains(&name) || !self.requested.insert(name.clone()) {
                continue;
            }
            let query = ReflectionQuery::FileByFilename(name);
            let blobs = self.fetch_descriptors(&query).await?;
            self.cache_blobs(&query, blobs, &mut pending)?;
        }

        Ok(())
    }

    fn cache_blobs(
        &mut self,
        query: &ReflectionQuery,
        blobs: Vec<Vec<u8>>,
        pending: &mut Vec<String>,
    ) -> Result<()> {
        for blob in blobs {
            let descriptor = FileDescriptorProto::decode(blob.as_slice())
                .map_err(|e| Error::descriptor_parse(query.to_string(), e))?;
            let name = descriptor.name().to_string();
            let dependencies = descriptor.dependency.clone();

            if !self.cache.insert(descriptor) {
                trace!(file = %name, "descriptor already cached, skipping");
                continue;
            }

            debug!(
                file = %name,
                dependencies = dependencies.len(),
                "cached file descriptor"
            );
            pending.extend(
                dependencies
                    .into_iter()
                    .filter(|dep| !self.cache.contains(dep)),
            );
        }
        Ok(())
    }
}
