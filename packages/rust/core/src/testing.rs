//! In-process test doubles.

use std::collections::VecDeque;
use std::sync::Mutex;

use compenrich_completion::{CompletionClient, CompletionRequest};
use compenrich_shared::Result;

/// Replays canned replies in order and records every request.
///
/// Once the script runs out it answers `{}`.
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok("{}".to_string()))
    }
}
