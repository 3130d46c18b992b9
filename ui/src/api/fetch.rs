use adview_core::api::{ApiAction, ApiTransport, CallOptions, RequestPlan};
use adview_core::config::AppConfig;
use adview_core::error::ApiError;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

/// [`ApiTransport`] over `window.fetch`.
pub struct FetchTransport {
    config: AppConfig,
}

impl FetchTransport {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl ApiTransport for FetchTransport {
    async fn call(&self, action: ApiAction, options: &CallOptions) -> Result<Value, ApiError> {
        let plan = RequestPlan::build(action, options, &self.config);
        tracing::debug!("{} {} ({})", plan.method.as_str(), plan.url, action);

        let resp = send(&plan)
            .await
            .map_err(|e| ApiError::Network(format!("{:?}", e)))?;
        let status = resp.status();
        let text = read_text(&resp)
            .await
            .map_err(|e| ApiError::Decode(format!("{:?}", e)))?;

        if !resp.ok() {
            return Err(ApiError::Status {
                code: status,
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

async fn send(plan: &RequestPlan) -> Result<Response, JsValue> {
    let opts = RequestInit::new();
    opts.set_method(plan.method.as_str());
    opts.set_mode(RequestMode::Cors);
    if let Some(body) = &plan.body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(&plan.url, &opts)?;
    request.headers().set("Accept", "application/json")?;
    for (name, value) in &plan.headers {
        request.headers().set(name, value)?;
    }

    let window = web_sys::window().ok_or(JsValue::from_str("no window"))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
    resp_value.dyn_into()
}

async fn read_text(resp: &Response) -> Result<String, JsValue> {
    let text = JsFuture::from(resp.text()?).await?;
    text.as_string()
        .ok_or(JsValue::from_str("response not string"))
}

/// Pull `message` or `error` out of an error body, if it is JSON.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}
