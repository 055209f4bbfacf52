use tracing::debug;

use crate::http::types::{join_url, normalize_base_url};
use crate::http::{Client, Request, Response};
use crate::runner::cancel::CancelSignal;
use crate::scenario::ResolvedStep;
use crate::{Result, RucheckError};

/// 步骤执行器：每个步骤发出一次 HTTP 请求
#[derive(Clone)]
pub struct StepExecutor {
    client: Client,
    base_url: Option<String>,
}

impl StepExecutor {
    pub fn new(client: Client, base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url.map(normalize_base_url).transpose()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// 构建请求：相对 URL 拼接到 base URL，body 按 Content-Type 编码
    pub fn build_request(&self, step: &ResolvedStep) -> Result<Request> {
        let url = join_url(self.base_url.as_deref(), &step.url)?;
        let mut request = Request::new(step.method, url);

        for (name, value) in &step.headers {
            request = request.with_header(name, value)?;
        }
        for (name, value) in &step.query {
            request = request.with_query(name, value);
        }
        if let Some(body) = &step.body {
            request = request.with_body(body.clone())?;
        }

        Ok(request)
    }

    /// 执行步骤
    ///
    /// 4xx/5xx 是普通响应；开启 failOnStatusCode 时，2xx/3xx 以外的状态码
    /// 返回 `UnexpectedStatus`。
    pub async fn execute(&self, step: &ResolvedStep, cancel: &mut CancelSignal) -> Result<Response> {
        let request = self.build_request(step)?;
        debug!(method = %request.method, url = %request.url, "executing step");

        let response = self.client.execute(request, cancel).await?;

        if step.fail_on_status_code && !response.status.is_accepted() {
            return Err(RucheckError::UnexpectedStatus {
                status: response.status.code(),
            });
        }
        Ok(response)
    }
}
