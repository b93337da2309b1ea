use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use prople_agent_core::capability::{
    Capabilities, CryptoBuilder, LedgerBuilder, TransportBuilder, WalletBuilder,
};
use prople_agent_core::connection::{CompletedConnection, Connection};
use prople_agent_core::handle::{Category, Handle, HandleRegistry, Outcome};
use prople_agent_core::issuance::{Holder, Issuer};
use prople_agent_core::ledger::{CredentialDef, Schema};
use prople_agent_core::presentation::{Prover, Verifier};
use prople_agent_core::types::{AgentError, EntityAccessor, FromJSON, ProtocolVariant, ToJSON};

use crate::api::wallet_search::WalletSearch;
use crate::common::helpers;
use crate::config::AgentConfig;
use crate::dispatcher::{CommandHandle, Completion, Dispatcher};
use crate::errors;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// `Context` owns everything an agent needs: the external capabilities, the worker pool and one
/// handle registry per entity category
///
/// It is built explicitly by the host application and torn down with [`Context::shutdown`]
pub struct Context {
    config: AgentConfig,
    protocol: ProtocolVariant,
    caps: Capabilities,
    dispatcher: Dispatcher,
    closed: AtomicBool,

    pub(crate) connections: HandleRegistry<Connection>,
    pub(crate) issuer_credentials: HandleRegistry<Issuer>,
    pub(crate) credentials: HandleRegistry<Holder>,
    pub(crate) proofs: HandleRegistry<Verifier>,
    pub(crate) disclosed_proofs: HandleRegistry<Prover>,
    pub(crate) schemas: HandleRegistry<Schema>,
    pub(crate) credential_defs: HandleRegistry<CredentialDef>,
    pub(crate) wallet_searches: HandleRegistry<WalletSearch>,
}

impl Context {
    pub fn new(
        config: AgentConfig,
        wallet: Arc<dyn WalletBuilder>,
        ledger: Arc<dyn LedgerBuilder>,
        transport: Arc<dyn TransportBuilder>,
        crypto: Arc<dyn CryptoBuilder>,
    ) -> Result<Arc<Self>, AgentError> {
        helpers::validate(&config)?;

        let protocol = config.agent().protocol()?;
        let caps = Capabilities::new(wallet, ledger, transport, crypto, config.agent().profile())
            .with_cache(config.cache().clone());

        let dispatcher = Dispatcher::new(
            config.runtime().worker_threads(),
            config.runtime().command_timeout(),
        )?;

        info!(
            "agent context started, label: {}, protocol: {:?}",
            config.agent().profile().label,
            protocol
        );

        Ok(Arc::new(Self {
            config,
            protocol,
            caps,
            dispatcher,
            closed: AtomicBool::new(false),
            connections: HandleRegistry::new(Category::Connection),
            issuer_credentials: HandleRegistry::new(Category::IssuerCredential),
            credentials: HandleRegistry::new(Category::Credential),
            proofs: HandleRegistry::new(Category::Proof),
            disclosed_proofs: HandleRegistry::new(Category::DisclosedProof),
            schemas: HandleRegistry::new(Category::Schema),
            credential_defs: HandleRegistry::new(Category::CredentialDef),
            wallet_searches: HandleRegistry::new(Category::WalletSearch),
        }))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// `protocol` is the variant given to the entities created locally
    pub fn protocol(&self) -> ProtocolVariant {
        self.protocol
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// `shutdown` tears the context down
    ///
    /// New commands are rejected first, running commands get a grace period, then every handle is
    /// released, the ledger is closed and the wallet is closed last. It must not be called from a
    /// continuation
    pub fn shutdown(&self) -> Result<(), AgentError> {
        Dispatcher::ensure_blocking_allowed()?;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(AgentError::InvalidState(
                "the agent is already shut down".to_string(),
            ));
        }

        self.dispatcher.stop_accepting();
        let running = self.dispatcher.drain(SHUTDOWN_GRACE)?;
        if running > 0 {
            warn!("shutting down with {} commands still running", running);
        }

        self.connections.release_all();
        self.issuer_credentials.release_all();
        self.credentials.release_all();
        self.proofs.release_all();
        self.disclosed_proofs.release_all();
        self.schemas.release_all();
        self.credential_defs.release_all();
        self.wallet_searches.release_all();

        let ledger = self.caps.ledger.clone();
        let wallet = self.caps.wallet.clone();
        self.dispatcher.block_on(async move {
            ledger.close().await?;
            wallet.close().await?;
            Ok(())
        })?;

        info!("agent context shut down");
        Ok(())
    }

    /// `dispatch` queues a command, the continuation receives its result exactly once
    pub(crate) fn dispatch<T, C, F, Fut>(
        self: &Arc<Self>,
        token: CommandHandle,
        command: &'static str,
        callback: C,
        operation: F,
    ) -> Result<(), AgentError>
    where
        T: Send + 'static,
        C: FnOnce(CommandHandle, Result<T, AgentError>) + Send + 'static,
        F: FnOnce(Arc<Context>) -> Fut,
        Fut: Future<Output = Result<T, AgentError>> + Send + 'static,
    {
        let completion = Completion::new(token, command, callback);
        errors::track(self.dispatcher.execute(completion, operation(self.clone())))
    }

    /// `completed_connection` waits for any transition of the connection and returns its
    /// completed snapshot
    pub(crate) async fn completed_connection(
        &self,
        handle: Handle,
    ) -> Result<CompletedConnection, AgentError> {
        self.connections.get(handle).await?.completed()
    }
}

/// `transition` runs an entity operation under the handle lock, the entity is only stored back
/// when the operation succeeded or moved it into its error state
pub(crate) async fn transition<T, R, F, Fut>(
    registry: &HandleRegistry<T>,
    handle: Handle,
    operation: F,
) -> Result<R, AgentError>
where
    T: EntityAccessor,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = (T, Result<R, AgentError>)>,
{
    registry
        .update(handle, |entity| async move {
            let (entity, result) = operation(entity).await;
            Outcome::from_result(entity, result)
        })
        .await
}

/// `serialize` returns the snapshot of an entity without waiting for a running transition
pub(crate) fn serialize<T>(registry: &HandleRegistry<T>, handle: Handle) -> Result<String, AgentError>
where
    T: EntityAccessor + ToJSON,
{
    errors::track(
        registry
            .with(handle, |entity| entity.to_json())
            .and_then(|json| json.map_err(AgentError::from)),
    )
}

pub(crate) fn deserialize<T>(registry: &HandleRegistry<T>, json: &str) -> Result<Handle, AgentError>
where
    T: EntityAccessor + FromJSON,
{
    errors::track(T::from_json(json).and_then(|entity| registry.add(entity)))
}

pub(crate) fn read<T, R, F>(registry: &HandleRegistry<T>, handle: Handle, accessor: F) -> Result<R, AgentError>
where
    T: Clone + Send,
    F: FnOnce(&T) -> Result<R, AgentError>,
{
    errors::track(registry.with(handle, accessor).and_then(|result| result))
}

pub(crate) fn release<T>(registry: &HandleRegistry<T>, handle: Handle) -> Result<(), AgentError>
where
    T: Clone + Send,
{
    errors::track(registry.release(handle))
}
