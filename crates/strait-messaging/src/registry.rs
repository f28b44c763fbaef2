//! The handler registry: a process-wide multimap from struct id to the
//! handlers subscribed to it.
//!
//! Registration and removal write; dispatch snapshots the matching
//! handlers and releases the shard lock before anyone is invoked, so a
//! handler may re-enter the registry from its own callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use strait_core::{Id, Result, Status};

use crate::handler::DataHandler;

/// Groups registrations owned by one logical service so they can be torn
/// down together when the service goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceTag(u64);

struct Entry {
    multicast: bool,
    service: Option<ServiceTag>,
    handler: Arc<dyn DataHandler>,
}

/// Maps struct ids to subscribed handlers. Injected into a
/// [`Server`](crate::server::Server) at construction; nothing here is a
/// process global.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: DashMap<Id, Vec<Entry>>,
    next_service_tag: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_service_tag(&self) -> ServiceTag {
        ServiceTag(self.next_service_tag.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe a handler to `id`. Several handlers may share an id only
    /// when every one of them declares `multicast`.
    pub fn register(&self, id: Id, multicast: bool, handler: Arc<dyn DataHandler>) -> Result {
        self.register_entry(id, multicast, None, handler)
    }

    /// [`register`](Self::register), with the registration owned by a
    /// service for later bulk removal.
    pub fn register_for_service(
        &self,
        id: Id,
        multicast: bool,
        service: ServiceTag,
        handler: Arc<dyn DataHandler>,
    ) -> Result {
        self.register_entry(id, multicast, Some(service), handler)
    }

    fn register_entry(
        &self,
        id: Id,
        multicast: bool,
        service: Option<ServiceTag>,
        handler: Arc<dyn DataHandler>,
    ) -> Result {
        let mut entries = self.entries.entry(id).or_default();
        if !entries.is_empty() && (!multicast || entries.iter().any(|e| !e.multicast)) {
            tracing::warn!(%id, "refusing conflicting handler registration");
            return Err(Status::ErrorInvalidArgument);
        }
        entries.push(Entry {
            multicast,
            service,
            handler,
        });
        Ok(())
    }

    /// Remove every registration owned by `service`, across all ids.
    /// Idempotent.
    pub fn unregister_service(&self, service: ServiceTag) {
        self.entries.retain(|_, entries| {
            entries.retain(|e| e.service != Some(service));
            !entries.is_empty()
        });
    }

    /// Remove every `(id, handler)` pair for this exact handler instance.
    /// Idempotent.
    pub fn unregister(&self, id: Id, handler: &Arc<dyn DataHandler>) {
        if let Some(mut entries) = self.entries.get_mut(&id) {
            entries.retain(|e| !Arc::ptr_eq(&e.handler, handler));
        }
        self.entries.remove_if(&id, |_, entries| entries.is_empty());
    }

    /// The single subscriber for `id`. `ErrorMoreEntries` can only occur
    /// with multicast subscriptions.
    pub fn find_one(&self, id: Id) -> Result<Arc<dyn DataHandler>> {
        let entries = self.entries.get(&id).ok_or(Status::ErrorNoSuchHandler)?;
        match entries.len() {
            0 => Err(Status::ErrorNoSuchHandler),
            1 => Ok(entries[0].handler.clone()),
            _ => Err(Status::ErrorMoreEntries),
        }
    }

    /// Snapshot of every subscriber for `id`, empty never (no subscriber
    /// is `ErrorNoSuchHandler`). The shard lock is released before this
    /// returns.
    pub fn find_all(&self, id: Id) -> Result<Vec<Arc<dyn DataHandler>>> {
        let handlers: Vec<_> = self
            .entries
            .get(&id)
            .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
            .unwrap_or_default();
        if handlers.is_empty() {
            Err(Status::ErrorNoSuchHandler)
        } else {
            Ok(handlers)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("ids", &self.entries.len())
            .finish()
    }
}
