use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use super::base::{
    Backend, BackendError, CallOptions, CallWarning, RawResponse, StreamEvent, StreamResponse,
};

/// A mock backend that replays pre-configured events for testing and
/// records the call descriptor it received.
pub struct MockBackend {
    events: Vec<StreamEvent>,
    warnings: Vec<CallWarning>,
    last_options: Arc<Mutex<Option<CallOptions>>>,
}

impl MockBackend {
    /// Create a new mock backend with a sequence of events to stream
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            warnings: Vec::new(),
            last_options: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_warning(mut self, warning: CallWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// The descriptor of the most recent call, if any.
    pub fn last_options(&self) -> Option<CallOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn invoke(&self, options: CallOptions) -> Result<StreamResponse, BackendError> {
        *self.last_options.lock().unwrap() = Some(options);
        let events = self.events.clone().into_iter().map(Ok);
        Ok(StreamResponse {
            stream: Box::pin(stream::iter(events)),
            warnings: self.warnings.clone(),
            raw_response: RawResponse::default(),
        })
    }
}
