use std::sync::Arc;

use serde_json::Value;

use prople_agent_core::handle::Handle;
use prople_agent_core::presentation::Verifier;
use prople_agent_core::types::{AgentError, EntityAccessor};

use crate::common::helpers;
use crate::context::{self, transition, Context};
use crate::dispatcher::{CommandHandle, Continuation};
use crate::errors;

/// `ProofApi` drives the proof exchanges where the agent is the verifier
pub struct ProofApi {
    ctx: Arc<Context>,
}

impl ProofApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// `create` builds a proof request
    ///
    /// `requested_attrs` and `requested_predicates` are JSON arrays, `revocation_interval` is a JSON
    /// object with optional `from` and `to` bounds, an empty string means no interval
    pub fn create(
        &self,
        token: CommandHandle,
        source_id: &str,
        requested_attrs: &str,
        requested_predicates: &str,
        revocation_interval: &str,
        name: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let attrs: Value = errors::track(helpers::parse_json("requested attributes", requested_attrs))?;
        let predicates: Value =
            errors::track(helpers::parse_json("requested predicates", requested_predicates))?;
        let interval: Value = errors::track(helpers::parse_optional_json(
            "revocation interval",
            Some(revocation_interval),
        ))?
        .unwrap_or(Value::Null);

        let (source_id, name) = (source_id.to_string(), name.to_string());
        self.ctx
            .dispatch(token, "proof_create", callback, move |ctx| async move {
                let verifier = Verifier::create(
                    ctx.caps(),
                    &source_id,
                    &attrs,
                    &predicates,
                    &interval,
                    &name,
                    ctx.protocol(),
                )
                .await?;
                ctx.proofs.add(verifier)
            })
    }

    /// `create_with_proposal` starts from a presentation proposal received from the prover
    pub fn create_with_proposal(
        &self,
        token: CommandHandle,
        source_id: &str,
        proposal: &str,
        name: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let (source_id, proposal, name) =
            (source_id.to_string(), proposal.to_string(), name.to_string());
        self.ctx
            .dispatch(token, "proof_create_with_proposal", callback, move |ctx| async move {
                let verifier = Verifier::create_with_proposal(&source_id, &proposal, &name)?;
                ctx.proofs.add(verifier)
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
            .dispatch(token, "proof_send_request", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.proofs, handle, |mut verifier| async move {
                    let result = verifier.send_request(caps, connection).await;
                    (verifier, result)
                })
                .await
            })
    }

    pub fn request_for_proposal(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "proof_request_for_proposal", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.proofs, handle, |mut verifier| async move {
                    let result = verifier.request_for_proposal(caps, connection).await;
                    (verifier, result)
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
            .dispatch(token, "proof_update_state", callback, move |ctx| async move {
                let caps = ctx.caps();
                let state = transition(&ctx.proofs, handle, |mut verifier| async move {
                    let result = verifier.update_state(caps).await;
                    (verifier, result)
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
            "proof_update_state_with_message",
            callback,
            move |ctx| async move {
                let (caps, message) = (ctx.caps(), &message);
                let state = transition(&ctx.proofs, handle, |mut verifier| async move {
                    let result = verifier.update_state_with_message(caps, message).await;
                    (verifier, result)
                })
                .await?;

                Ok(state.code())
            },
        )
    }

    pub fn get_state(&self, handle: Handle) -> Result<u32, AgentError> {
        context::read(&self.ctx.proofs, handle, |verifier| {
            Ok(verifier.get_state().code())
        })
    }

    /// `get_presentation` returns the received proof along with its verification result
    pub fn get_presentation(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.proofs, handle, |verifier| {
            verifier.get_presentation().map(|presentation| presentation.to_string())
        })
    }

    pub fn get_verification_result(&self, handle: Handle) -> Result<u32, AgentError> {
        context::read(&self.ctx.proofs, handle, |verifier| {
            Ok(verifier.get_verification_result().code())
        })
    }

    pub fn get_presentation_request(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.proofs, handle, Verifier::get_presentation_request)
    }

    pub fn get_problem(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.proofs, handle, |verifier| Ok(verifier.get_problem()))
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.proofs, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.proofs, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.proofs, handle)
    }
}
