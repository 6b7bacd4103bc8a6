//! reqwest implementation of the `HttpProbe` port.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method};

use crate::application::ports::HttpProbe;
use crate::domain::probe::{HttpMethod, HttpReply, HttpRequest, RequestBody, TransportError};

/// Sends probe requests to one base URL.
pub struct ReqwestProbe {
    client: Client,
    base_url: String,
}

impl ReqwestProbe {
    /// Build a probe for `http://host:port` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(16)
            .tcp_nodelay(true)
            .user_agent(concat!("outpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url(host, port),
        })
    }
}

/// `http://host:port`, bracketing IPv6 literals.
#[must_use]
pub fn base_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

fn method(m: HttpMethod) -> Method {
    match m {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
    }
}

/// Map a reqwest failure onto the verifier's transport categories.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Refused(root_cause(err))
    } else {
        TransportError::Other(root_cause(err))
    }
}

fn root_cause(err: &reqwest::Error) -> String {
    let mut source: &dyn std::error::Error = err;
    while let Some(next) = source.source() {
        source = next;
    }
    source.to_string()
}

impl HttpProbe for ReqwestProbe {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(method(request.method), &url);
        builder = match &request.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Raw { content_type, text }) => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(text.clone()),
            None => builder,
        };
        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(&e))?;
        Ok(HttpReply {
            status,
            body: body.to_vec(),
        })
    }
}
