//! Observer registries notified around every provider call.
//!
//! Hooks are plain closures kept in three append-only lists. Dispatch is synchronous
//! and in registration order. A hook that returns `Err` or panics is logged and
//! skipped; it never changes the outcome of the call it observes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::config::ClientConfig;
use crate::error::LLMError;
use crate::types::{ChatRequest, ChatResponse};

/// Error type a hook may return; it is logged and discarded.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;
/// Return type of every hook.
pub type HookResult = Result<(), HookError>;

/// Observer invoked before the provider is called.
pub type RequestHook = Arc<dyn Fn(&ClientConfig, &ChatRequest) -> HookResult + Send + Sync>;
/// Observer invoked with the decorated response after a successful call.
pub type ResponseHook = Arc<dyn Fn(&ChatResponse) -> HookResult + Send + Sync>;
/// Observer invoked once per failed attempt.
pub type ErrorHook = Arc<dyn Fn(&LLMError) -> HookResult + Send + Sync>;

/// The three hook registries owned by a client.
#[derive(Default)]
pub struct Hooks {
    request: RwLock<Vec<RequestHook>>,
    response: RwLock<Vec<ResponseHook>>,
    error: RwLock<Vec<ErrorHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request<F>(&self, hook: F)
    where
        F: Fn(&ClientConfig, &ChatRequest) -> HookResult + Send + Sync + 'static,
    {
        append(&self.request, Arc::new(hook));
    }

    pub fn add_response<F>(&self, hook: F)
    where
        F: Fn(&ChatResponse) -> HookResult + Send + Sync + 'static,
    {
        append(&self.response, Arc::new(hook));
    }

    pub fn add_error<F>(&self, hook: F)
    where
        F: Fn(&LLMError) -> HookResult + Send + Sync + 'static,
    {
        append(&self.error, Arc::new(hook));
    }

    pub fn dispatch_request(&self, config: &ClientConfig, request: &ChatRequest) {
        for (index, hook) in snapshot(&self.request).iter().enumerate() {
            isolate("request", index, || hook(config, request));
        }
    }

    pub fn dispatch_response(&self, response: &ChatResponse) {
        for (index, hook) in snapshot(&self.response).iter().enumerate() {
            isolate("response", index, || hook(response));
        }
    }

    pub fn dispatch_error(&self, error: &LLMError) {
        for (index, hook) in snapshot(&self.error).iter().enumerate() {
            isolate("error", index, || hook(error));
        }
    }

    /// Number of registered hooks as `(request, response, error)`.
    #[cfg(test)]
    pub(crate) fn counts(&self) -> (usize, usize, usize) {
        (
            snapshot(&self.request).len(),
            snapshot(&self.response).len(),
            snapshot(&self.error).len(),
        )
    }
}

fn append<T>(registry: &RwLock<Vec<T>>, hook: T) {
    registry
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(hook);
}

// Cloned out of the lock so a hook can register further hooks without deadlocking.
fn snapshot<T: Clone>(registry: &RwLock<Vec<T>>) -> Vec<T> {
    registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn isolate(kind: &'static str, index: usize, call: impl FnOnce() -> HookResult) {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(hook = kind, index, error = %err, "hook failed, ignoring"),
        Err(_) => warn!(hook = kind, index, "hook panicked, ignoring"),
    }
}
