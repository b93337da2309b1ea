use std::sync::Arc;

use serde_json::Value;

use prople_agent_core::handle::Handle;
use prople_agent_core::messages::presentation::PresentationPreview;
use prople_agent_core::presentation::Prover;
use prople_agent_core::types::{AgentError, EntityAccessor};

use crate::common::helpers;
use crate::context::{self, transition, Context};
use crate::dispatcher::{CommandHandle, Continuation};
use crate::errors;

/// `DisclosedProofApi` drives the proof exchanges where the agent is the prover
pub struct DisclosedProofApi {
    ctx: Arc<Context>,
}

impl DisclosedProofApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub fn create_with_request(
        &self,
        token: CommandHandle,
        source_id: &str,
        request: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let (source_id, request) = (source_id.to_string(), request.to_string());
        self.ctx.dispatch(
            token,
            "disclosed_proof_create_with_request",
            callback,
            move |ctx| async move {
                let prover = Prover::create_with_request(&source_id, &request)?;
                ctx.disclosed_proofs.add(prover)
            },
        )
    }

    /// `create_with_proposal` starts the exchange from our side, `preview` is a JSON presentation
    /// preview with its `attributes` and `predicates`
    pub fn create_with_proposal(
        &self,
        token: CommandHandle,
        source_id: &str,
        preview: &str,
        comment: Option<String>,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let preview: PresentationPreview =
            errors::track(helpers::parse_json("presentation preview", preview))?;
        let source_id = source_id.to_string();

        self.ctx.dispatch(
            token,
            "disclosed_proof_create_with_proposal",
            callback,
            move |ctx| async move {
                let prover = Prover::create_with_proposal(&source_id, preview, comment)?;
                ctx.disclosed_proofs.add(prover)
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
            .dispatch(token, "disclosed_proof_send_proposal", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover.send_proposal(caps, connection).await;
                    (prover, result)
                })
                .await
            })
    }

    /// `retrieve_credentials` lists the wallet credentials matching the request, the exchange
    /// itself is left untouched
    pub fn retrieve_credentials(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        self.ctx.dispatch(
            token,
            "disclosed_proof_retrieve_credentials",
            callback,
            move |ctx| async move {
                let prover = ctx.disclosed_proofs.get(handle).await?;
                let credentials = prover.retrieve_credentials(ctx.caps()).await?;
                Ok(credentials.to_string())
            },
        )
    }

    /// `generate_presentation` builds the proof, `selected` maps every requested referent to a
    /// credential and `self_attested` maps referents to plain values
    pub fn generate_presentation(
        &self,
        token: CommandHandle,
        handle: Handle,
        selected: &str,
        self_attested: &str,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        let selected: Value = errors::track(helpers::parse_json("selected credentials", selected))?;
        let self_attested: Value = errors::track(helpers::parse_optional_json(
            "self attested attributes",
            Some(self_attested),
        ))?
        .unwrap_or_else(|| Value::Object(Default::default()));

        self.ctx.dispatch(
            token,
            "disclosed_proof_generate_presentation",
            callback,
            move |ctx| async move {
                let (caps, selected, self_attested) = (ctx.caps(), &selected, &self_attested);
                transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover
                        .generate_presentation(caps, selected, self_attested)
                        .await;
                    (prover, result)
                })
                .await
            },
        )
    }

    pub fn send_presentation(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx.dispatch(
            token,
            "disclosed_proof_send_presentation",
            callback,
            move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover.send_presentation(caps, connection).await;
                    (prover, result)
                })
                .await
            },
        )
    }

    /// `decline_request` refuses the proof request, an optional JSON presentation preview is sent
    /// back as a counter proposal
    pub fn decline_request(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        reason: Option<String>,
        proposal: Option<&str>,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        let proposal: Option<PresentationPreview> =
            errors::track(helpers::parse_optional_json("counter proposal", proposal))?;

        self.ctx.dispatch(
            token,
            "disclosed_proof_decline_request",
            callback,
            move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover
                        .decline_request(caps, connection, reason, proposal)
                        .await;
                    (prover, result)
                })
                .await
            },
        )
    }

    pub fn reject(
        &self,
        token: CommandHandle,
        handle: Handle,
        connection_handle: Handle,
        reason: Option<String>,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "disclosed_proof_reject", callback, move |ctx| async move {
                let connection = ctx.completed_connection(connection_handle).await?;
                let (caps, connection) = (ctx.caps(), &connection);
                transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover.reject(caps, connection, reason).await;
                    (prover, result)
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
            .dispatch(token, "disclosed_proof_update_state", callback, move |ctx| async move {
                let caps = ctx.caps();
                let state = transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover.update_state(caps).await;
                    (prover, result)
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
            "disclosed_proof_update_state_with_message",
            callback,
            move |ctx| async move {
                let (caps, message) = (ctx.caps(), &message);
                let state = transition(&ctx.disclosed_proofs, handle, |mut prover| async move {
                    let result = prover.update_state_with_message(caps, message).await;
                    (prover, result)
                })
                .await?;

                Ok(state.code())
            },
        )
    }

    pub fn get_state(&self, handle: Handle) -> Result<u32, AgentError> {
        context::read(&self.ctx.disclosed_proofs, handle, |prover| {
            Ok(prover.get_state().code())
        })
    }

    pub fn get_presentation(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.disclosed_proofs, handle, |prover| {
            prover.get_presentation().map(|presentation| presentation.to_string())
        })
    }

    pub fn get_request(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.disclosed_proofs, handle, |prover| {
            prover.get_request().map(|request| request.to_string())
        })
    }

    pub fn get_problem(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.disclosed_proofs, handle, |prover| Ok(prover.get_problem()))
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.disclosed_proofs, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.disclosed_proofs, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.disclosed_proofs, handle)
    }
}
