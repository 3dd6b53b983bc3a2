//! Fixed-size pool of page sessions
//!
//! A checked-out session is exclusive to its holder and goes back to the pool
//! when the guard is dropped, including when the holding task is cancelled.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

pub struct SessionPool<S> {
    idle: Arc<Mutex<Vec<S>>>,
    permits: Arc<Semaphore>,
    size: usize,
    checkout_timeout: Duration,
}

impl<S> Clone for SessionPool<S> {
    fn clone(&self) -> Self {
        Self {
            idle: Arc::clone(&self.idle),
            permits: Arc::clone(&self.permits),
            size: self.size,
            checkout_timeout: self.checkout_timeout,
        }
    }
}

impl<S: Send + 'static> SessionPool<S> {
    pub fn new(sessions: Vec<S>, checkout_timeout: Duration) -> Self {
        let size = sessions.len();
        Self {
            idle: Arc::new(Mutex::new(sessions)),
            permits: Arc::new(Semaphore::new(size)),
            size,
            checkout_timeout,
        }
    }

    /// Total number of sessions owned by the pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sessions not currently checked out
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Remove every idle session from the pool, for shutdown
    ///
    /// Sessions still checked out are not returned; later checkouts fail.
    pub fn take_idle(&self) -> Vec<S> {
        self.permits.close();
        std::mem::take(&mut *self.idle.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Take a session, waiting at most the checkout timeout
    pub async fn checkout(&self) -> Result<PooledSession<S>> {
        let permit = tokio::time::timeout(
            self.checkout_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| Error::SessionUnavailable(self.checkout_timeout))?
        .map_err(|_| Error::SessionUnavailable(self.checkout_timeout))?;

        let session = self
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .ok_or(Error::SessionUnavailable(self.checkout_timeout))?;

        Ok(PooledSession {
            session: Some(session),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }
}

/// Exclusive handle on a pooled session
pub struct PooledSession<S> {
    session: Option<S>,
    idle: Arc<Mutex<Vec<S>>>,
    // Released after the session is back in the idle list
    _permit: OwnedSemaphorePermit,
}

impl<S: fmt::Debug> fmt::Debug for PooledSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledSession")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<S> Deref for PooledSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session.as_ref().expect("session present until drop")
    }
}

impl<S> DerefMut for PooledSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("session present until drop")
    }
}

impl<S> Drop for PooledSession<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.idle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(session);
        }
    }
}
