use std::sync::Arc;

use prople_agent_core::capability::crypto::RevocationConfig;
use prople_agent_core::handle::Handle;
use prople_agent_core::ledger::CredentialDef;
use prople_agent_core::types::AgentError;

use crate::context::{self, Context};
use crate::dispatcher::{CommandHandle, Continuation};

/// `CredentialDefApi` keeps the credential definitions an issuer offers credentials for
pub struct CredentialDefApi {
    ctx: Arc<Context>,
}

impl CredentialDefApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// `lookup` resolves a published credential definition, the revocation registry is given when
    /// the issued credentials must be revocable
    pub fn lookup(
        &self,
        token: CommandHandle,
        source_id: &str,
        cred_def_id: &str,
        revocation: Option<RevocationConfig>,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let (source_id, cred_def_id) = (source_id.to_string(), cred_def_id.to_string());
        self.ctx
            .dispatch(token, "credential_def_lookup", callback, move |ctx| async move {
                let cred_def =
                    CredentialDef::lookup(ctx.caps(), &source_id, &cred_def_id, revocation).await?;
                ctx.credential_defs.add(cred_def)
            })
    }

    pub fn get_cred_def_id(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.credential_defs, handle, |cred_def| {
            Ok(cred_def.get_cred_def_id())
        })
    }

    pub fn get_schema_id(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.credential_defs, handle, |cred_def| {
            Ok(cred_def.get_schema_id())
        })
    }

    pub fn get_rev_reg_id(&self, handle: Handle) -> Result<Option<String>, AgentError> {
        context::read(&self.ctx.credential_defs, handle, |cred_def| {
            Ok(cred_def.get_revocation().map(|config| config.rev_reg_id))
        })
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.credential_defs, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.credential_defs, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.credential_defs, handle)
    }
}
