use adview_core::api::{ApiAction, ApiTransport, CallOptions};
use adview_core::error::ApiError;
use serde_json::Value;

/// Transport with no network behind it. Every call fails, so the simulator
/// always runs the best-effort fallbacks.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineTransport;

impl ApiTransport for OfflineTransport {
    async fn call(&self, action: ApiAction, _options: &CallOptions) -> Result<Value, ApiError> {
        tracing::debug!("{} skipped, simulator is offline", action);
        Err(ApiError::Network("simulator is offline".into()))
    }
}
