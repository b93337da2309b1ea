use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use prople_agent_core::capability::wallet::RecordOptions;
use prople_agent_core::handle::Handle;
use prople_agent_core::types::AgentError;

use crate::common::helpers;
use crate::context::{self, Context};
use crate::dispatcher::{CommandHandle, Continuation};
use crate::errors;

/// `WalletSearch` binds a registry handle to the search handle owned by the wallet
#[derive(Debug, Clone)]
pub struct WalletSearch {
    record_type: String,
    search_handle: u32,
}

impl WalletSearch {
    pub fn get_record_type(&self) -> String {
        self.record_type.clone()
    }
}

/// `WalletSearchApi` iterates over the wallet records of a given type
pub struct WalletSearchApi {
    ctx: Arc<Context>,
}

impl WalletSearchApi {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// `open` starts a search, `query` is a JSON tag query and `options` a JSON [`RecordOptions`],
    /// both may be empty
    pub fn open(
        &self,
        token: CommandHandle,
        record_type: &str,
        query: &str,
        options: &str,
        callback: impl Continuation<Handle>,
    ) -> Result<(), AgentError> {
        let query: Value = errors::track(helpers::parse_optional_json("search query", Some(query)))?
            .unwrap_or_else(|| Value::Object(Default::default()));
        let options: RecordOptions =
            errors::track(helpers::parse_optional_json("search options", Some(options)))?
                .unwrap_or_default();
        let record_type = record_type.to_string();

        self.ctx
            .dispatch(token, "wallet_search_open", callback, move |ctx| async move {
                let search_handle = ctx
                    .caps()
                    .wallet
                    .open_search(&record_type, &query, &options)
                    .await?;

                debug!("wallet search opened over {} records", record_type);
                ctx.wallet_searches.add(WalletSearch {
                    record_type,
                    search_handle,
                })
            })
    }

    /// `next` fetches at most `count` records, the continuation receives them as a JSON array
    pub fn next(
        &self,
        token: CommandHandle,
        handle: Handle,
        count: usize,
        callback: impl Continuation<String>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "wallet_search_next", callback, move |ctx| async move {
                let search = ctx.wallet_searches.get(handle).await?;
                let records = ctx
                    .caps()
                    .wallet
                    .search_next(search.search_handle, count)
                    .await?;

                serde_json::to_string(&records)
                    .map_err(|err| AgentError::SerializationError(err.to_string()))
            })
    }

    /// `close` releases the handle and closes the search on the wallet side
    pub fn close(
        &self,
        token: CommandHandle,
        handle: Handle,
        callback: impl Continuation<()>,
    ) -> Result<(), AgentError> {
        self.ctx
            .dispatch(token, "wallet_search_close", callback, move |ctx| async move {
                let search = ctx.wallet_searches.get(handle).await?;
                ctx.wallet_searches.release(handle)?;
                ctx.caps()
                    .wallet
                    .close_search(search.search_handle)
                    .await
                    .map_err(AgentError::from)
            })
    }

    pub fn get_record_type(&self, handle: Handle) -> Result<String, AgentError> {
        context::read(&self.ctx.wallet_searches, handle, |search| {
            Ok(search.get_record_type())
        })
    }
}
