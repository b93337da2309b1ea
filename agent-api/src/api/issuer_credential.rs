use std::sync::Arc;

use serde_json::Value;

use prople_agent_core::handle::Handle;
use prople_agent_core::issuance::Issuer;
use prople_agent_core::types::{AgentError, EntityAccessor};

use crate::common::helpers;
use crate::context::{self, transition, Context};
use crate::dispatcher::{CommandHandle, Continuation};
use crate::errors;

/// `IssuerCredentialApi` drives the credential exchanges where the agent is the issuer
pub struct IssuerCredentialApi {
    ctx: Arc<Context>,
}

impl IssuerCredentialApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// `create` prepares a credential of the given credential definition, `values` is a JSON object
    /// mapping every attribute name to its value
    pub fn create(
        &self,
        token: CommandHandle,
        source_id: &str,
        cred_def_handle: Handle,
        values: &str,
        comment: Option<String>,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let values: Value = errors::track(helpers::parse_json("credential values", values))?;
        let source_id = source_id.to_string();

        self.ctx
            .dispatch(token, "issuer_credential_create", callback, move |ctx| async move {
                let cred_def = ctx.credential_defs.get(cred_def_handle).await?;
                let issuer =
                    Issuer::create(&source_id, &cred_def, &values, comment, ctx.protocol())?;
                ctx.issuer_credentials.add(issuer)
            })
    }

    pub fn send_offer(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "issuer_credential_send_offer", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.issuer_credentials, handle, |mut issuer| async move {
                    let result = issuer.send_offer(caps, connection).await;
                    (issuer, result)
                })
                .await
            })
    }

    pub fn send_credential(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx.dispatch(
            token,
            "issuer_credential_send_credential",
            callback,
            move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.issuer_credentials, handle, |mut issuer| async move {
                    let result = issuer.send_credential(caps, connection).await;
                    (issuer, result)
                })
                .await
            },
        )
    }

    pub fn update_state(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<u32>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "issuer_credential_update_state", callback, move |ctx| async move {
                let caps = ctx.caps();
                let state = transition(&ctx.issuer_credentials, handle, |mut issuer| async move {
                    let result = issuer.update_state(caps).await;
                    (issuer, result)
                })
                .await?;

                Ok(state.code())
            })
    }

    pub fn update_state_with_message(
        &self,
        token: CommandHandle,
        handle: Handle,
        message: &str,
        callback: impl Continuation<u32>,
    ) -> Result<(), AgentError> {
        let message = message.to_string();
        self.ctx.dispatch(
            token,
            "issuer_credential_update_state_with_message",
            callback,
            move |ctx| async move {
                let (caps, message) = (ctx.caps(), &message);
                let state = transition(&ctx.issuer_credentials, handle, |mut issuer| async move {
                    let result = issuer.update_state_with_message(caps, message).await;
                    (issuer, result)
                })
                .await?;

                Ok(state.code())
            },
        )
    }

    pub fn get_state(&self, handle: Handle) -> Result<u32, AgentError> {
        context::read(&self.ctx.issuer_credentials, handle, |issuer| {
            Ok(issuer.get_state().code())
        })
    }

    /// `get_credential_offer` returns the last offer, encoded for the protocol of the exchange
    pub fn get_credential_offer(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.issuer_credentials, handle, Issuer::get_credential_offer)
    }

    /// `get_revocation_info` returns the revocation details recorded at issuance, `None` when the
    /// credential is not revocable or not issued yet
    pub fn get_revocation_info(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.issuer_credentials, handle, |issuer| {
            issuer
                .get_revocation_info()
                .map(|info| {
                    serde_json::to_string(&info)
                        .map_err(|err| AgentError::SerializationError(err.to_string()))
                })
                .transpose()
        })
    }

    pub fn get_problem(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.issuer_credentials, handle, |issuer| {
            Ok(issuer.get_problem())
        })
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.issuer_credentials, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.issuer_credentials, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.issuer_credentials, handle)
    }
}
