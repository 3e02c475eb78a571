//! Opening and closing of peripherals.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use crate::backend::RawHandle;
use crate::error::*;

/// A peripheral that must be opened before use and closed afterwards.
pub trait Resource: fmt::Display + Send + Sync {
    /// Acquire the resource. Fails with `Error::AlreadyOpen` if it is already held.
    fn open(&self) -> Result<()>;

    /// Release the resource. Closing a resource that is not open does nothing.
    fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Holds the native handle of a wrapper.
///
/// Calls through the handle take the read side of the lock while `open` and `close` take the
/// write side, so a handle is never freed while a call on it is in progress.
pub(crate) struct Slot {
    handle: RwLock<Option<RawHandle>>,
}

impl Slot {
    pub fn new() -> Slot {
        Slot {
            handle: RwLock::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.read().is_some()
    }

    /// Stores the handle produced by `acquire`.
    ///
    /// `acquire` runs with the write lock held and must not call back into the owning wrapper.
    pub fn open<F>(&self, acquire: F) -> Result<()>
    where
        F: FnOnce() -> Result<RawHandle>,
    {
        let mut slot = self.write();
        if slot.is_some() {
            return Err(Error::AlreadyOpen);
        }
        *slot = Some(acquire()?);
        Ok(())
    }

    pub fn close<F>(&self, release: F) -> Result<()>
    where
        F: FnOnce(RawHandle) -> Result<()>,
    {
        let handle = self.write().take();
        match handle {
            Some(handle) => release(handle),
            None => Ok(()),
        }
    }

    /// Runs `f` with the handle, fails with `Error::Closed` if there is none.
    ///
    /// `f` must not call other methods of the owning wrapper that use the slot.
    pub fn with<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(RawHandle) -> Result<T>,
    {
        match *self.read() {
            Some(handle) => f(handle),
            None => Err(Error::Closed),
        }
    }

    fn read(&self) -> RwLockReadGuard<Option<RawHandle>> {
        self.handle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<Option<RawHandle>> {
        self.handle.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Maps a libsoc status code to a result.
pub(crate) fn check<F>(status: i32, message: F) -> Result<()>
where
    F: FnOnce() -> String,
{
    if status == 0 {
        Ok(())
    } else {
        Err(Error::Operation(message()))
    }
}

/// Resources opened by `request_all`.
///
/// The resources are closed in reverse order when this value is dropped.
pub struct Requested<'a> {
    resources: Vec<&'a dyn Resource>,
}

impl<'a> Requested<'a> {
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Closes all resources in reverse order and returns the first error encountered.
    ///
    /// Every resource is closed regardless of earlier failures.
    pub fn release(mut self) -> Result<()> {
        let mut result = Ok(());
        while let Some(resource) = self.resources.pop() {
            if let Err(err) = resource.close() {
                warn!(%resource, %err, "could not close");
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }
}

impl<'a> Drop for Requested<'a> {
    fn drop(&mut self) {
        while let Some(resource) = self.resources.pop() {
            if let Err(err) = resource.close() {
                warn!(%resource, %err, "could not close");
            }
        }
    }
}

/// Opens all resources in order.
///
/// If one of them fails to open, the ones opened before it are closed in reverse order before the
/// error is returned.
pub fn request_all<'a>(resources: &[&'a dyn Resource]) -> Result<Requested<'a>> {
    let mut requested = Requested {
        resources: Vec::with_capacity(resources.len()),
    };
    for &resource in resources {
        if let Err(err) = resource.open() {
            debug!(%resource, %err, opened = requested.len(), "request failed, releasing");
            return Err(err);
        }
        requested.resources.push(resource);
    }
    Ok(requested)
}

/// Runs `f` while all resources are open.
///
/// The resources are closed in reverse order afterwards, also when `f` fails or panics. An error
/// returned by `f` takes precedence over one raised while closing.
pub fn with_resources<T, F>(resources: &[&dyn Resource], f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let requested = request_all(resources)?;
    let result = f();
    let released = requested.release();
    let value = result?;
    released?;
    Ok(value)
}
