//! Backend sessions.
//!
//! A process holds at most one active session. `acquire_or_create` hands out
//! the active one when present (the config passed in is then ignored) and
//! otherwise builds a backend from the config. Either way the returned
//! session carries the required settings: an active session installed
//! without them is replaced by one over the same backend with them overlaid.

use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use pitjoin_core::backend::ExecutionBackend;
use pitjoin_core::config::SessionConfig;
use pitjoin_core::error::{Error, Result};

use crate::backend::MemoryBackend;
use crate::ExecError;

/// A configured backend shared by every retrieval of a session.
pub struct Session {
    config: SessionConfig,
    backend: Arc<dyn ExecutionBackend>,
}

impl Session {
    pub fn new(config: SessionConfig, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Builds the backend for a new session.
pub type BackendFactory<'a> = dyn FnOnce(&SessionConfig) -> Result<Arc<dyn ExecutionBackend>> + 'a;

/// Backends this crate ships, selected by `SessionConfig::backend`.
pub fn default_backend_factory(config: &SessionConfig) -> Result<Arc<dyn ExecutionBackend>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryBackend::with_conf(config.conf.clone()))),
        other => Err(Error::Config(format!("unknown backend '{other}'"))),
    }
}

/// Holder of the active session.
#[derive(Debug, Default)]
pub struct SessionHandle {
    active: Mutex<Option<Arc<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Option<Arc<Session>>>, ExecError> {
        self.active
            .lock()
            .map_err(|_| ExecError::Session("session lock poisoned".into()))
    }

    /// The active session, or a new one built by `factory`.
    pub fn acquire_or_create(
        &self,
        config: SessionConfig,
        factory: Box<BackendFactory<'_>>,
    ) -> std::result::Result<Arc<Session>, ExecError> {
        let mut active = self.lock()?;
        let stale = match active.as_ref() {
            Some(session) if session.config().has_required_conf() => return Ok(Arc::clone(session)),
            Some(session) => Some(Arc::clone(session)),
            None => None,
        };
        if let Some(stale) = stale {
            let session = Arc::new(Session::new(
                stale.config().clone().with_required_conf(),
                Arc::clone(stale.backend()),
            ));
            *active = Some(Arc::clone(&session));
            return Ok(session);
        }

        let config = config.with_required_conf();
        let backend = factory(&config)?;

        #[cfg(feature = "tracing")]
        tracing::info!(backend = backend.name(), "created session");

        let session = Arc::new(Session::new(config, backend));
        *active = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Like `acquire_or_create` with the built-in backends.
    pub fn acquire(&self, config: SessionConfig) -> std::result::Result<Arc<Session>, ExecError> {
        self.acquire_or_create(config, Box::new(default_backend_factory))
    }

    /// Make `session` the active one, as is, returning the previous one.
    pub fn install(&self, session: Arc<Session>) -> std::result::Result<Option<Arc<Session>>, ExecError> {
        Ok(self.lock()?.replace(session))
    }

    pub fn active(&self) -> Option<Arc<Session>> {
        self.lock().ok().and_then(|a| a.clone())
    }

    /// Forget the active session; outstanding `Arc`s stay usable.
    pub fn release(&self) -> Option<Arc<Session>> {
        self.lock().ok().and_then(|mut a| a.take())
    }
}

static PROCESS_SESSION: Lazy<SessionHandle> = Lazy::new(SessionHandle::new);

/// The process-wide session holder.
pub fn process_session() -> &'static SessionHandle {
    &PROCESS_SESSION
}
