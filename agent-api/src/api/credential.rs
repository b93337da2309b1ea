use std::sync::Arc;

use serde_json::Value;

use prople_agent_core::handle::Handle;
use prople_agent_core::issuance::Holder;
use prople_agent_core::types::{AgentError, EntityAccessor};

use crate::common::helpers;
use crate::context::{self, transition, Context};
use crate::dispatcher::{CommandHandle, Continuation};
use crate::errors;

/// `CredentialApi` drives the credential exchanges where the agent is the holder
pub struct CredentialApi {
    ctx: Arc<Context>,
}

impl CredentialApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub fn create_with_offer(
        &self,
        token: CommandHandle,
        source_id: &str,
        offer: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let source_id = source_id.to_string();
        let offer = offer.to_string();
        self.ctx
            .dispatch(token, "credential_create_with_offer", callback, move |ctx| async move {
                let holder = Holder::create_with_offer(&source_id, &offer)?;
                ctx.credentials.add(holder)
            })
    }

    pub fn create_with_proposal(
        &self,
        token: CommandHandle,
        source_id: &str,
        schema_id: &str,
        cred_def_id: &str,
        values: &str,
        comment: Option<String>,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let values: Value = errors::track(helpers::parse_json("credential values", values))?;
        let (source_id, schema_id, cred_def_id) = (
            source_id.to_string(),
            schema_id.to_string(),
            cred_def_id.to_string(),
        );

        self.ctx.dispatch(
            token,
            "credential_create_with_proposal",
            callback,
            move |ctx| async move {
                let holder = Holder::create_with_proposal(
                    &source_id,
                    &schema_id,
                    &cred_def_id,
                    &values,
                    comment,
                )?;
                ctx.credentials.add(holder)
            },
        )
    }

    pub fn send_proposal(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "credential_send_proposal", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.credentials, handle, |mut holder| async move {
                    let result = holder.send_proposal(caps, connection).await;
                    (holder, result)
                })
                .await
            })
    }

    pub fn send_request(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "credential_send_request", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.credentials, handle, |mut holder| async move {
                    let result = holder.send_request(caps, connection).await;
                    (holder, result)
                })
                .await
            })
    }

    /// `decline` refuses the offer, the optional `proposal` is a JSON object of attribute values
    /// sent back as a counter proposal
    pub fn decline(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        comment: Option<String>,
        proposal: Option<&str>,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        let proposal: Option<Value> =
            errors::track(helpers::parse_optional_json("counter proposal", proposal))?;

        self.ctx
            .dispatch(token, "credential_decline", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.credentials, handle, |mut holder| async move {
                    let result = holder.decline(caps, connection, comment, proposal).await;
                    (holder, result)
                })
                .await
            })
    }

    pub fn reject(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        comment: Option<String>,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "credential_reject", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.credentials, handle, |mut holder| async move {
                    let result = holder.reject(caps, connection, comment).await;
                    (holder, result)
                })
                .await
            })
    }

    pub fn update_state(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<u32>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "credential_update_state", callback, move |ctx| async move {
                let caps = ctx.caps();
                let state = transition(&ctx.credentials, handle, |mut holder| async move {
                    let result = holder.update_state(caps).await;
                    (holder, result)
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
            "credential_update_state_with_message",
            callback,
            move |ctx| async move {
                let (caps, message) = (ctx.caps(), &message);
                let state = transition(&ctx.credentials, handle, |mut holder| async move {
                    let result = holder.update_state_with_message(caps, message).await;
                    (holder, result)
                })
                .await?;

                Ok(state.code())
            },
        )
    }

    pub fn get_state(&self, handle: Handle) -> Result<u32, AgentError> {
        context::read(&self.ctx.credentials, handle, |holder| {
            Ok(holder.get_state().code())
        })
    }

    pub fn get_offer(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.credentials, handle, Holder::get_offer)
    }

    /// `get_credential` returns the stored credential, only available once accepted
    pub fn get_credential(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.credentials, handle, |holder| {
            holder.get_credential().map(|credential| credential.to_string())
        })
    }

    pub fn get_attributes(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.credentials, handle, |holder| {
            holder.get_attributes().map(|attributes| attributes.to_string())
        })
    }

    /// `get_credential_id` returns the wallet record id of the stored credential
    pub fn get_credential_id(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.credentials, handle, |holder| {
            Ok(holder.get_credential_id())
        })
    }

    pub fn get_problem(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.credentials, handle, |holder| Ok(holder.get_problem()))
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.credentials, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.credentials, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.credentials, handle)
    }
}
