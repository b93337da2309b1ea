use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::types::{AgentError, EntityAccessor};

use super::types::{Category, Handle};

/// `Outcome` is returned by a transition executed through [`HandleRegistry::update`]
///
/// - `Commit` replaces the stored entity and returns the result
/// - `CommitFailed` replaces the stored entity but still reports the error, used when a transition
///   moves the entity into its terminal error state
/// - `Rollback` keeps the previous entity untouched
pub enum Outcome<T, R> {
    Commit(T, R),
    CommitFailed(T, AgentError),
    Rollback(AgentError),
}

impl<T, R> Outcome<T, R>
where
    T: EntityAccessor,
{
    /// `from_result` commits a successful transition, a failed transition is only committed when
    /// it moved the entity into its terminal error state
    pub fn from_result(entity: T, result: Result<R, AgentError>) -> Self {
        match result {
            Ok(value) => Outcome::Commit(entity, value),
            Err(err) if entity.is_failed() => Outcome::CommitFailed(entity, err),
            Err(err) => Outcome::Rollback(err),
        }
    }
}

struct Slot<T> {
    released: AtomicBool,
    entity: Mutex<T>,
}

impl<T> Slot<T> {
    fn new(entity: T) -> Self {
        Self {
            released: AtomicBool::new(false),
            entity: Mutex::new(entity),
        }
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// `HandleRegistry` is an arena mapping handles of a single [`Category`] to their owned entities
pub struct HandleRegistry<T> {
    category: Category,
    next: AtomicU32,
    table: RwLock<HashMap<Handle, Arc<Slot<T>>>>,
}

impl<T> HandleRegistry<T>
where
    T: Clone + Send,
{
    pub fn new(category: Category) -> Self {
        Self {
            category,
            next: AtomicU32::new(1),
            table: RwLock::new(HashMap::new()),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn add(&self, entity: T) -> Result<Handle, AgentError> {
        // the counter stops at u32::MAX instead of wrapping onto live handles
        let value = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map_err(|_| AgentError::Unknown(format!("{} handles exhausted", self.category)))?;

        let handle = Handle::from(value);
        let mut table = self
            .table
            .write()
            .map_err(|err| AgentError::Unknown(err.to_string()))?;

        table.insert(handle, Arc::new(Slot::new(entity)));
        debug!("[{}:{}] allocated", self.category, handle);
        Ok(handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.table
            .read()
            .map(|table| table.contains_key(&handle))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.table.read().map(|table| table.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `get` waits for any in-flight transition on the handle and returns a snapshot of the entity
    pub async fn get(&self, handle: Handle) -> Result<T, AgentError> {
        let slot = self.slot(handle)?;
        let guard = slot.entity.lock().await;
        if slot.is_released() {
            return Err(self.invalid(handle));
        }

        Ok(guard.clone())
    }

    /// `with` runs a synchronous accessor against the entity without waiting
    ///
    /// It fails with `AgentError::HandleBusy` when a transition currently owns the handle
    pub fn with<F, R>(&self, handle: Handle, accessor: F) -> Result<R, AgentError>
    where
        F: FnOnce(&T) -> R,
    {
        let slot = self.slot(handle)?;
        let guard = slot.entity.try_lock().map_err(|_| {
            AgentError::HandleBusy(format!(
                "{} handle {} is being updated",
                self.category, handle
            ))
        })?;

        if slot.is_released() {
            return Err(self.invalid(handle));
        }

        Ok(accessor(&guard))
    }

    pub async fn replace(&self, handle: Handle, entity: T) -> Result<(), AgentError> {
        let slot = self.slot(handle)?;
        let mut guard = slot.entity.lock().await;
        if slot.is_released() {
            return Err(self.invalid(handle));
        }

        *guard = entity;
        Ok(())
    }

    /// `update` executes a transition while owning the handle's lock
    ///
    /// The transition receives a copy of the current entity, the stored entity is only replaced
    /// when the transition returns [`Outcome::Commit`] or [`Outcome::CommitFailed`]. A handle
    /// released while the transition was in flight makes the result `AgentError::InvalidHandle`
    /// and the transition output is dropped
    pub async fn update<F, Fut, R>(&self, handle: Handle, transition: F) -> Result<R, AgentError>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Outcome<T, R>>,
    {
        let slot = self.slot(handle)?;
        let mut guard = slot.entity.lock().await;
        if slot.is_released() {
            return Err(self.invalid(handle));
        }

        trace!("[{}:{}] transition started", self.category, handle);
        let outcome = transition(guard.clone()).await;

        if slot.is_released() {
            debug!(
                "[{}:{}] released while a transition was in flight",
                self.category, handle
            );
            return Err(self.invalid(handle));
        }

        match outcome {
            Outcome::Commit(next, result) => {
                *guard = next;
                Ok(result)
            }
            Outcome::CommitFailed(next, err) => {
                *guard = next;
                Err(err)
            }
            Outcome::Rollback(err) => Err(err),
        }
    }

    /// `release` invalidates the handle immediately, even when a transition is still running
    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        let mut table = self
            .table
            .write()
            .map_err(|err| AgentError::Unknown(err.to_string()))?;

        match table.remove(&handle) {
            Some(slot) => {
                slot.released.store(true, Ordering::SeqCst);
                debug!("[{}:{}] released", self.category, handle);
                Ok(())
            }
            None => Err(self.invalid(handle)),
        }
    }

    pub fn release_all(&self) {
        if let Ok(mut table) = self.table.write() {
            for (_, slot) in table.drain() {
                slot.released.store(true, Ordering::SeqCst);
            }
        }
    }

    fn slot(&self, handle: Handle) -> Result<Arc<Slot<T>>, AgentError> {
        let table = self
            .table
            .read()
            .map_err(|err| AgentError::Unknown(err.to_string()))?;

        table
            .get(&handle)
            .cloned()
            .ok_or_else(|| self.invalid(handle))
    }

    fn invalid(&self, handle: Handle) -> AgentError {
        AgentError::InvalidHandle(format!(
            "{} object not found for handle: {}",
            self.category, handle
        ))
    }
}
