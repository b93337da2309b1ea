//! `dispatcher` executes the commands of the agent on its own worker pool
//!
//! Every accepted command owns a [`Completion`], a single-use continuation. It is consumed when
//! the command finishes, and fires with an error if it is dropped before, for example when the
//! command panicked or the runtime was shut down. Either way the continuation is invoked exactly
//! once.
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, trace, warn};

use prople_agent_core::types::AgentError;

use crate::errors;

/// `CommandHandle` is the correlation token chosen by the caller and given back to its
/// continuation
pub type CommandHandle = u32;

pub type Callback<T> = Box<dyn FnOnce(CommandHandle, Result<T, AgentError>) + Send + 'static>;

/// `Continuation` is implemented by every closure accepted as a command callback
pub trait Continuation<T>: FnOnce(CommandHandle, Result<T, AgentError>) + Send + 'static {}

impl<T, F> Continuation<T> for F where F: FnOnce(CommandHandle, Result<T, AgentError>) + Send + 'static {}

/// `Completion` is the pending command, it can only be completed once
pub struct Completion<T> {
    token: CommandHandle,
    command: &'static str,
    created_at: Instant,
    callback: Option<Callback<T>>,
}

impl<T> Completion<T> {
    pub fn new<C>(token: CommandHandle, command: &'static str, callback: C) -> Self
    where
        C: FnOnce(CommandHandle, Result<T, AgentError>) + Send + 'static,
    {
        Self {
            token,
            command,
            created_at: Instant::now(),
            callback: Some(Box::new(callback)),
        }
    }

    pub fn token(&self) -> CommandHandle {
        self.token
    }

    /// `complete` consumes the completion and fires its continuation
    pub fn complete(mut self, result: Result<T, AgentError>) {
        self.fire(result)
    }

    /// `dismiss` drops a completion that was never accepted, its continuation will never fire
    fn dismiss(mut self) {
        self.callback = None;
    }

    fn fire(&mut self, result: Result<T, AgentError>) {
        let callback = match self.callback.take() {
            Some(callback) => callback,
            None => return,
        };

        match &result {
            Ok(_) => debug!(
                "[command:{}] {} completed in {:?}",
                self.token,
                self.command,
                self.created_at.elapsed()
            ),
            Err(err) => {
                debug!(
                    "[command:{}] {} failed in {:?}: {}",
                    self.token,
                    self.command,
                    self.created_at.elapsed(),
                    err
                );
                errors::set_current_error(err);
            }
        }

        callback(self.token, result)
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if self.callback.is_some() {
            warn!(
                "[command:{}] {} dropped before its completion",
                self.token, self.command
            );
            self.fire(Err(AgentError::Unknown(format!(
                "{} was interrupted before its completion",
                self.command
            ))));
        }
    }
}

/// `Dispatcher` owns the worker pool executing the accepted commands
pub struct Dispatcher {
    runtime: Option<Runtime>,
    timeout: Option<Duration>,
    accepting: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(worker_threads: usize, timeout: Option<Duration>) -> Result<Self, AgentError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("agent-worker")
            .enable_all()
            .build()
            .map_err(|err| AgentError::Unknown(format!("unable to start the workers: {}", err)))?;

        Ok(Self {
            runtime: Some(runtime),
            timeout,
            accepting: AtomicBool::new(true),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// `execute` queues the command, an error means the command was rejected immediately and its
    /// continuation will never fire
    pub fn execute<T, Fut>(&self, completion: Completion<T>, command: Fut) -> Result<(), AgentError>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, AgentError>> + Send + 'static,
    {
        let runtime = match (&self.runtime, self.is_accepting()) {
            (Some(runtime), true) => runtime,
            _ => {
                completion.dismiss();
                return Err(AgentError::InvalidState(
                    "the agent is shutting down".to_string(),
                ));
            }
        };

        let timeout = self.timeout;
        let in_flight = InFlight::enter(self.in_flight.clone());
        trace!("[command:{}] {} queued", completion.token(), completion.command);

        runtime.spawn(async move {
            let _in_flight = in_flight;
            let result = match timeout {
                Some(timeout) => match tokio::time::timeout(timeout, command).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::TransportFailure(format!(
                        "{} timed out after {:?}",
                        completion.command, timeout
                    ))),
                },
                None => command.await,
            };

            completion.complete(result);
        });

        Ok(())
    }

    /// `block_on` runs a future to its end on the worker pool, it must never be called from a
    /// continuation or a worker thread
    pub fn block_on<T, Fut>(&self, future: Fut) -> Result<T, AgentError>
    where
        Fut: Future<Output = Result<T, AgentError>>,
    {
        Self::ensure_blocking_allowed()?;

        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("the workers are stopped".to_string()))?;

        runtime.block_on(future)
    }

    /// `ensure_blocking_allowed` fails when called from inside a runtime
    pub fn ensure_blocking_allowed() -> Result<(), AgentError> {
        match tokio::runtime::Handle::try_current() {
            Ok(_) => Err(AgentError::InvalidState(
                "blocking operation called from a worker thread".to_string(),
            )),
            Err(_) => Ok(()),
        }
    }

    /// `stop_accepting` rejects every command queued from now on
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// `drain` waits until every accepted command completed or the grace period elapsed, it returns
    /// the number of commands still running
    pub fn drain(&self, grace: Duration) -> Result<usize, AgentError> {
        let in_flight = self.in_flight.clone();
        self.block_on(async move {
            let started = Instant::now();
            while in_flight.load(Ordering::SeqCst) > 0 && started.elapsed() < grace {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }

            Ok(in_flight.load(Ordering::SeqCst))
        })
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
