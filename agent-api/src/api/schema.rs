use std::sync::Arc;

use prople_agent_core::handle::Handle;
use prople_agent_core::ledger::Schema;
use prople_agent_core::types::AgentError;

use crate::context::{self, Context};
use crate::dispatcher::{CommandHandle, Continuation};

/// `SchemaApi` keeps the schemas resolved from the ledger
pub struct SchemaApi {
    ctx: Arc<Context>,
}

impl SchemaApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub fn lookup(
        &self,
        token: CommandHandle,
        source_id: &str,
        schema_id: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let (source_id, schema_id) = (source_id.to_string(), schema_id.to_string());
        self.ctx
            .dispatch(token, "schema_lookup", callback, move |ctx| async move {
                let schema = Schema::lookup(ctx.caps(), &source_id, &schema_id).await?;
                ctx.schemas.add(schema)
            })
    }

    pub fn get_attributes(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.schemas, handle, |schema| {
            Ok(schema.get_attributes().to_string())
        })
    }

    pub fn get_schema_id(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.schemas, handle, |schema| Ok(schema.get_schema_id()))
    }

    pub fn serialize(&self, handle: Handle) -> Result<String, AgentError> {
        context::serialize(&self.ctx.schemas, handle)
    }

    pub fn deserialize(&self, json: &str) -> Result<Handle, AgentError> {
        context::deserialize(&self.ctx.schemas, json)
    }

    pub fn release(&self, handle: Handle) -> Result<(), AgentError> {
        context::release(&self.ctx.schemas, handle)
    }
}
