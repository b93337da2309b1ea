use std::sync::Arc;

use prople_agent_core::connection::{Connection, ConnectionEntityAccessor};
use prople_agent_core::handle::Handle;
use prople_agent_core::messages::{self, Addressing};
use prople_agent_core::types::{AgentError, EntityAccessor, ProtocolVariant};

use crate::context::{self, transition, Context};
use crate::dispatcher::{CommandHandle, Continuation};

/// `ConnectionApi` drives the pairwise connections
pub struct ConnectionApi {
    ctx: Arc<Context>,
}

impl ConnectionApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// `create` builds an inviter connection, it is `Invited` once the continuation fires
    pub fn create(
        &self,
        token: CommandHandle,
        source_id: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let source_id = source_id.to_string();
        self.ctx
            .dispatch(token, "connection_create", callback, move |ctx| async move {
                let connection =
                    Connection::create_inviter(ctx.caps(), &source_id, ctx.protocol()).await?;
                ctx.connections.add(connection)
            })
    }

    /// `create_outofband` builds an out-of-band invitation, `attachment` is an encoded protocol
    /// message carried by the invitation
    pub fn create_outofband(
        &self,
        token: CommandHandle,
        source_id: &str,
        goal_code: Option<String>,
        goal: Option<String>,
        attachment: Option<String>,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let source_id = source_id.to_string();
        self.ctx
            .dispatch(token, "connection_create_outofband", callback, move |ctx| async move {
                let attachment = attachment
                    .map(|raw| messages::decode(&raw).map(|decoded| decoded.message))
                    .transpose()?;

                let connection = Connection::create_outofband(
                    ctx.caps(),
                    &source_id,
                    goal_code,
                    goal,
                    attachment,
                )
                .await?;
                ctx.connections.add(connection)
            })
    }

    pub fn create_with_invite(
        &self,
        token: CommandHandle,
        source_id: &str,
        invite: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let source_id = source_id.to_string();
        let invite = invite.to_string();
        self.ctx
            .dispatch(token, "connection_create_with_invite", callback, move |ctx| async move {
                let connection = Connection::create_with_invite(&source_id, &invite)?;
                ctx.connections.add(connection)
            })
    }

    pub fn connect(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "connection_connect", callback, move |ctx| async move {
                let caps = ctx.caps();
                transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.connect(caps).await;
                    (connection, result)
                })
                .await
            })
    }

    /// `accept_one_time` completes a one-time out-of-band connection and returns its attached
    /// request encoded as an Aries message
    pub fn accept_one_time(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "connection_accept_one_time", callback, move |ctx| async move {
                let caps = ctx.caps();
                let attached = transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.accept_one_time(caps).await;
                    (connection, result)
                })
                .await?;

                messages::encode(ProtocolVariant::Aries, &attached, &Addressing::default())
            })
    }

    /// `update_state` polls the transport, the continuation receives the state code
    pub fn update_state(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<u32>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "connection_update_state", callback, move |ctx| async move {
                let caps = ctx.caps();
                let state = transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.update_state(caps).await;
                    (connection, result)
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
            "connection_update_state_with_message",
            callback,
            move |ctx| async move {
                let caps = ctx.caps();
                let message = &message;
                let state = transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.update_state_with_message(caps, message).await;
                    (connection, result)
                })
                .await?;

                Ok(state.code())
            },
        )
    }

    /// `send_ping` returns the id of the ping thread
    pub fn send_ping(
        &self,
        token: CommandHandle,
        handle: Handle,
        comment: Option<String>,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "connection_send_ping", callback, move |ctx| async move {
                let caps = ctx.caps();
                transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.send_ping(caps, comment).await;
                    (connection, result)
                })
                .await
            })
    }

    pub fn send_discovery_features(
        &self,
        token: CommandHandle,
        handle: Handle,
        query: Option<String>,
        comment: Option<String>,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        self.ctx.dispatch(
            token,
            "connection_send_discovery_features",
            callback,
            move |ctx| async move {
                let caps = ctx.caps();
                transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.send_discovery_features(caps, query, comment).await;
                    (connection, result)
                })
                .await
            },
        )
    }

    pub fn send_answer(
        &self,
        token: CommandHandle,
        handle: Handle,
        question: &str,
        response: &str,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        let question = question.to_string();
        let response = response.to_string();
        self.ctx
            .dispatch(token, "connection_send_answer", callback, move |ctx| async move {
                let caps = ctx.caps();
                let (question, response) = (&question, &response);
                transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.send_answer(caps, question, response).await;
                    (connection, result)
                })
                .await
            })
    }

    pub fn send_reuse(
        &self,
        token: CommandHandle,
        handle: Handle,
        invitation: &str,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        let invitation = invitation.to_string();
        self.ctx
            .dispatch(token, "connection_send_reuse", callback, move |ctx| async move {
                let caps = ctx.caps();
                let invitation = &invitation;
                transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.send_reuse(caps, invitation).await;
                    (connection, result)
                })
                .await
            })
    }

    /// `send_message` sends a basic message and returns its id
    pub fn send_message(
        &self,
        token: CommandHandle,
        handle: Handle,
        content: &str,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        let content = content.to_string();
        self.ctx
            .dispatch(token, "connection_send_message", callback, move |ctx| async move {
                let caps = ctx.caps();
                let content = &content;
                transition(&ctx.connections, handle, |mut connection| async move {
                    let result = connection.send_message(caps, content).await;
                    (connection, result)
                })
                .await
            })
    }

    pub fn get_state(&self, handle: Handle) -> Result<u32, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            Ok(connection.get_state().code())
        })
    }

    pub fn invite_details(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.connections, handle, Connection::get_invite_details)
    }

    pub fn get_my_pw_did(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            Ok(connection.get_my_did())
        })
    }

    pub fn get_their_pw_did(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            Ok(connection.get_their_did())
        })
    }

    pub fn get_their_verkey(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            Ok(connection.get_their_verkey())
        })
    }

    /// `get_remote_protocols` returns the protocols disclosed by the peer as a JSON array
    pub fn get_remote_protocols(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            serde_json::to_string(&connection.get_remote_protocols())
                .map_err(|err| AgentError::SerializationError(err.to_string()))
        })
    }

    /// `get_pending_messages` returns the threads waiting for a reply keyed by their id
    pub fn get_pending_messages(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            serde_json::to_string(&connection.get_pending_messages())
                .map_err(|err| AgentError::SerializationError(err.to_string()))
        })
    }

    pub fn get_problem(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.connections, handle, |connection| {
            Ok(connection.get_problem())
        })
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.connections, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.connections, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.connections, handle)
    }
}
