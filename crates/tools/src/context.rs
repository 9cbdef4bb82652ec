use std::sync::Arc;

use tl_domain::frame::FrameSink;
use tl_domain::query::SessionQuery;
use tokio_util::sync::CancellationToken;

/// Per-call context handed to every tool.
#[derive(Clone)]
pub struct ToolContext {
    /// Cancelled when the client connection goes away.
    pub cancel: CancellationToken,
    pub query: Arc<SessionQuery>,
    outbound: Option<Arc<dyn FrameSink>>,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, query: Arc<SessionQuery>) -> Self {
        Self {
            cancel,
            query,
            outbound: None,
        }
    }

    pub(crate) fn with_outbound(&self, outbound: Arc<dyn FrameSink>) -> Self {
        Self {
            outbound: Some(outbound),
            ..self.clone()
        }
    }

    /// The client channel. Only set for actions.
    pub fn outbound(&self) -> Option<&Arc<dyn FrameSink>> {
        self.outbound.as_ref()
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("query", &self.query)
            .field("outbound", &self.outbound.is_some())
            .finish()
    }
}
