use std::sync::Arc;

use heron::backend::base::Backend;

/// Shared application state
///
/// One backend instance is shared by every request so the underlying HTTP
/// client keeps its connection pool.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
}
