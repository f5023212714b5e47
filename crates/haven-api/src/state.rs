//! # Application State
//!
//! Shared state for the Axum application: configuration, the four entity
//! stores, the two uniqueness indexes, and the optional Postgres pool.
//!
//! ## Stores and compare-and-set
//!
//! Each [`Store`] wraps a `parking_lot::RwLock<HashMap>`. All transitions
//! run through [`Store::try_update`], which executes the caller's
//! read-validate-mutate closure under a single write lock — two racing
//! transition requests on the same entity serialize, and the loser
//! revalidates against the fresh status. No handler ever reads a status
//! and writes it back outside the closure.
//!
//! ## Persistence
//!
//! When a Postgres pool is configured, every committed mutation is written
//! through to the database and the stores are re-hydrated from it on
//! startup. Without a pool the service runs in-memory only — the demo
//! profile — behind exactly the same interface.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use haven_core::{ActorId, ApplicationId};
use haven_state::{Application, Lease, Notification, Payment};

use crate::auth::SecretString;
use crate::error::AppError;

/// Runtime configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// TCP port the server binds.
    pub port: u16,
    /// Shared auth secret; `None` enables the demo header profile.
    pub auth_token: Option<SecretString>,
    /// Seconds between overdue-sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            sweep_interval_secs: 3600,
        }
    }
}

/// A clonable, lock-guarded map of one entity type.
#[derive(Debug)]
pub struct Store<T> {
    inner: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch a clone of an entity.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.inner.read().get(id).cloned()
    }

    /// Insert or replace an entity.
    pub fn insert(&self, id: Uuid, value: T) {
        self.inner.write().insert(id, value);
    }

    /// Clone out all entities, in arbitrary order.
    pub fn list(&self) -> Vec<T> {
        self.inner.read().values().cloned().collect()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Atomically read-validate-mutate one entity under the write lock.
    ///
    /// Returns `None` when the id is absent; otherwise the closure's
    /// result. A closure error leaves the entity untouched only if the
    /// closure itself did not mutate before failing — transition closures
    /// validate first and mutate last, which the state machines' methods
    /// already guarantee.
    pub fn try_update<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, AppError>,
    ) -> Option<Result<R, AppError>> {
        let mut guard = self.inner.write();
        guard.get_mut(id).map(f)
    }

    /// Mutate every entity under one write lock; returns how many
    /// closures reported a change.
    pub fn update_each(&self, mut f: impl FnMut(&mut T) -> bool) -> usize {
        let mut guard = self.inner.write();
        let mut changed = 0;
        for value in guard.values_mut() {
            if f(value) {
                changed += 1;
            }
        }
        changed
    }
}

impl<T: Clone> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration.
    pub config: AppConfig,
    /// Application store.
    pub applications: Store<Application>,
    /// Lease store.
    pub leases: Store<Lease>,
    /// Payment store.
    pub payments: Store<Payment>,
    /// Notification store.
    pub notifications: Store<Notification>,
    /// One-lease-per-application index: application id → lease id.
    lease_by_application: Arc<RwLock<HashMap<Uuid, Uuid>>>,
    /// Notification idempotency keys already dispatched.
    notification_keys: Arc<RwLock<HashSet<String>>>,
    /// Optional Postgres write-through pool.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State with explicit configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            config,
            applications: Store::new(),
            leases: Store::new(),
            payments: Store::new(),
            notifications: Store::new(),
            lease_by_application: Arc::new(RwLock::new(HashMap::new())),
            notification_keys: Arc::new(RwLock::new(HashSet::new())),
            db_pool,
        }
    }

    /// Insert a lease, enforcing the one-lease-per-application invariant.
    pub fn insert_lease(&self, lease: Lease) -> Result<(), AppError> {
        let mut index = self.lease_by_application.write();
        let app_key = *lease.application_id.as_uuid();
        if index.contains_key(&app_key) {
            return Err(AppError::AlreadyExists(format!(
                "application {} already has a lease",
                lease.application_id
            )));
        }
        index.insert(app_key, *lease.id.as_uuid());
        self.leases.insert(*lease.id.as_uuid(), lease);
        Ok(())
    }

    /// The lease derived from an application, if one exists.
    pub fn lease_for_application(&self, id: &ApplicationId) -> Option<Lease> {
        let lease_id = *self.lease_by_application.read().get(id.as_uuid())?;
        self.leases.get(&lease_id)
    }

    /// Insert a notification unless its idempotency key was already
    /// dispatched. The key set is the at-most-once gate: membership is
    /// checked and claimed under one write lock.
    pub fn try_insert_notification(&self, notification: Notification) -> bool {
        {
            let mut keys = self.notification_keys.write();
            if !keys.insert(notification.idempotency_key.clone()) {
                return false;
            }
        }
        self.notifications
            .insert(*notification.id.as_uuid(), notification);
        true
    }

    /// All payments on a lease, ordered by due date.
    pub fn payments_for_lease(&self, lease_id: &haven_core::LeaseId) -> Vec<Payment> {
        let mut out: Vec<Payment> = self
            .payments
            .list()
            .into_iter()
            .filter(|p| p.lease_id == *lease_id)
            .collect();
        out.sort_by_key(|p| p.due_date);
        out
    }

    /// Notifications addressed to one recipient, newest first.
    pub fn notifications_for(&self, recipient: ActorId, unread_only: bool) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .notifications
            .list()
            .into_iter()
            .filter(|n| n.recipient_id == recipient && (!unread_only || n.read_at.is_none()))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Re-hydrate stores and indexes from previously persisted rows.
    /// Called once at startup, before the server accepts traffic.
    pub fn hydrate(
        &self,
        applications: Vec<Application>,
        leases: Vec<Lease>,
        payments: Vec<Payment>,
        notifications: Vec<Notification>,
    ) {
        for app in applications {
            self.applications.insert(*app.id.as_uuid(), app);
        }
        {
            let mut index = self.lease_by_application.write();
            for lease in leases {
                index.insert(*lease.application_id.as_uuid(), *lease.id.as_uuid());
                self.leases.insert(*lease.id.as_uuid(), lease);
            }
        }
        for payment in payments {
            self.payments.insert(*payment.id.as_uuid(), payment);
        }
        {
            let mut keys = self.notification_keys.write();
            for n in notifications {
                keys.insert(n.idempotency_key.clone());
                self.notifications.insert(*n.id.as_uuid(), n);
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
