use crate::domain::model::{ProxyRequest, RemoteData, RequestMethod, RequestOptions};
use crate::domain::ports::Transport;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Sends OGC-style requests to a QGIS Server endpoint.
pub struct HttpTransport {
    base_url: Url,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: Url::parse(base_url)?,
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn build_request(
        &self,
        params: &[(String, String)],
        options: RequestOptions,
    ) -> Result<ProxyRequest> {
        let mut url = self.base_url.clone();
        let form = match options.method {
            RequestMethod::Get => {
                url.query_pairs_mut().extend_pairs(params);
                Vec::new()
            }
            RequestMethod::Post => params.to_vec(),
        };

        Ok(ProxyRequest {
            url,
            method: options.method,
            form,
        })
    }

    async fn fetch(&self, request: &ProxyRequest) -> Result<RemoteData> {
        let builder = match request.method {
            RequestMethod::Get => self.client.get(request.url.clone()),
            RequestMethod::Post => self.client.post(request.url.clone()).form(&request.form),
        };

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            "Remote server answered {} ({} bytes, '{}')",
            status_code,
            body.len(),
            mime_type
        );

        Ok(RemoteData {
            body,
            mime_type,
            status_code,
        })
    }
}
