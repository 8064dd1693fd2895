use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Import,
    Export,
    Add,
    Clear,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Import => "import",
            OperationKind::Export => "export",
            OperationKind::Add => "add",
            OperationKind::Clear => "clear",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("an {current} operation is already in progress")]
pub struct Busy {
    pub current: OperationKind,
}

/// At-most-one-operation token held by the calling layer.
///
/// The store itself never locks; a front end takes a guard from here before
/// starting any operation and refuses to start another while it is held.
#[derive(Debug, Default)]
pub struct OperationLock {
    current: Mutex<Option<OperationKind>>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, kind: OperationKind) -> Result<OperationGuard<'_>, Busy> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *current {
            return Err(Busy { current: running });
        }
        *current = Some(kind);
        Ok(OperationGuard { lock: self, kind })
    }

    pub fn current(&self) -> Option<OperationKind> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the lock when dropped
#[derive(Debug)]
pub struct OperationGuard<'a> {
    lock: &'a OperationLock,
    kind: OperationKind,
}

impl OperationGuard<'_> {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        *self.lock.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Shared flag polled between import batches
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lowers the flag so the next operation can run
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
