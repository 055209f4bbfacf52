use std::time::Duration;

use tracing::debug;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::runner::CancelSignal;
use crate::{Result, RucheckError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RucheckError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { inner })
    }

    /// 发送请求并读取完整响应
    ///
    /// 网络层错误统一转换为 `Transport`；4xx/5xx 作为普通响应返回。
    /// 取消信号触发时丢弃进行中的请求，连接随之关闭。
    pub async fn execute(&self, request: Request, cancel: &mut CancelSignal) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(RucheckError::Cancelled);
        }

        let mut url = request.url;
        if !request.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query_params);
        }

        debug!(method = %request.method, url = %url, "sending request");

        let mut req = self
            .inner
            .request(request.method.into(), url)
            .headers(request.headers);

        if let Some(body) = request.body
            && request.method.allows_body()
        {
            req = req.body(body.encode()?);
        }

        let start = std::time::Instant::now();
        let send = async {
            let response = req.send().await.map_err(transport_error)?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.text().await.map_err(transport_error)?;
            Ok::<_, RucheckError>((status, headers, body))
        };

        let (status, headers, body) = tokio::select! {
            result = send => result?,
            _ = cancel.cancelled() => return Err(RucheckError::Cancelled),
        };
        let duration = start.elapsed();

        debug!(status, elapsed_ms = duration.as_millis() as u64, "response received");
        Response::new(status, headers, body, duration)
    }
}

fn transport_error(err: reqwest::Error) -> RucheckError {
    let reason = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else {
        "request failed"
    };
    RucheckError::Transport(format!("{}: {}", reason, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::Method;
    use crate::runner::CancelHandle;

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // 端口 9 (discard) 在测试环境中通常没有监听
        let client = Client::with_timeout(Duration::from_secs(2)).unwrap();
        let request = Request::new(
            Method::Get,
            url::Url::parse("http://127.0.0.1:9/unreachable").unwrap(),
        );
        let result = client.execute(request, &mut CancelSignal::never()).await;
        assert!(matches!(result, Err(RucheckError::Transport(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let client = Client::new().unwrap();
        let (handle, mut signal) = CancelHandle::new();
        handle.cancel();
        let request = Request::new(
            Method::Get,
            url::Url::parse("http://127.0.0.1:9/").unwrap(),
        );
        let result = client.execute(request, &mut signal).await;
        assert!(matches!(result, Err(RucheckError::Cancelled)));
    }
}
