use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{Span, info_span, trace};

use skiff_model::{ProgramRun, Properties, RunId};

/// Diagnostic tags of one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingContext {
    pub run_id: RunId,
    pub namespace: String,
    pub application: String,
    pub program: String,
    pub cluster: String,
    /// Run arguments, attached as extra tags.
    pub tags: Properties,
}

impl LoggingContext {
    pub fn for_run(run: &ProgramRun) -> Self {
        Self {
            run_id: run.run_id,
            namespace: run.namespace.clone(),
            application: run.application.clone(),
            program: run.program.clone(),
            cluster: run.cluster.name.clone(),
            tags: run.arguments.clone(),
        }
    }

    /// Span carrying the context fields; launch work is instrumented with it.
    pub fn span(&self) -> Span {
        info_span!(
            "launch",
            run_id = %self.run_id,
            namespace = %self.namespace,
            application = %self.application,
            program = %self.program,
            cluster = %self.cluster,
        )
    }

    /// Publish the context in `registry` until the returned scope is dropped.
    pub fn enter(self, registry: &ContextRegistry) -> LoggingScope {
        let run_id = self.run_id;
        registry.insert(Arc::new(self));
        trace!(%run_id, "logging context entered");
        LoggingScope {
            run_id,
            registry: registry.clone(),
        }
    }
}

impl fmt::Display for LoggingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}.{}#{}",
            self.namespace, self.application, self.program, self.run_id
        )
    }
}

/// Contexts of launches in flight, keyed by run id.
///
/// Log sinks that do not see tracing spans (child process output, remote appenders) look up
/// the tags of a run here.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    inner: Arc<Mutex<HashMap<RunId, Arc<LoggingContext>>>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, ctx: Arc<LoggingContext>) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(ctx.run_id, ctx);
    }

    fn remove(&self, run_id: &RunId) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(run_id);
    }

    pub fn get(&self, run_id: &RunId) -> Option<Arc<LoggingContext>> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(run_id).cloned()
    }

    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Keeps a [`LoggingContext`] published; removes it on drop.
#[must_use = "the context is released as soon as the scope is dropped"]
#[derive(Debug)]
pub struct LoggingScope {
    run_id: RunId,
    registry: ContextRegistry,
}

impl LoggingScope {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }
}

impl Drop for LoggingScope {
    fn drop(&mut self) {
        self.registry.remove(&self.run_id);
        trace!(run_id = %self.run_id, "logging context released");
    }
}
