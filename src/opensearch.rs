use std::time::{Duration, SystemTime};

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

// SigV4 service name for Amazon OpenSearch / Elasticsearch domains.
const SIGNING_SERVICE: &str = "es";
// Fixed document type path segment expected by the deployed index templates.
const DOC_TYPE: &str = "document";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("unable to resolve AWS credentials - {0}")]
    CredentialUnavailable(String),
    #[error("failed to encode index document - {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to sign index request - {0}")]
    SigningFailure(String),
    #[error("document store rejected the write: status {status} - {body}")]
    IndexWriteFailure { status: u16, body: String },
    #[error("index request could not be delivered - {0}")]
    Transport(#[from] reqwest::Error),
}

/// A connection to the document store that signs every outgoing request with
/// the credentials resolved at construction. One client serves exactly one
/// write; nothing is pooled across invocations.
pub struct OpenSearchClient {
    http: reqwest::Client,
    credentials: aws_credential_types::Credentials,
    base_url: String,
    region: String,
}

impl OpenSearchClient {
    /// Resolves credentials from the supplied provider and prepares the
    /// transport. Certificate verification stays enabled; an endpoint without
    /// an explicit scheme is reached over https.
    pub async fn connect(
        config: &Config,
        credentials: SharedCredentialsProvider,
    ) -> Result<Self, IndexError> {
        let credentials = credentials
            .provide_credentials()
            .await
            .map_err(|e| IndexError::CredentialUnavailable(e.to_string()))?;

        debug!("Creating OpenSearch connection to {}", config.endpoint);
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(OpenSearchClient {
            http,
            credentials,
            base_url: base_url(&config.endpoint),
            region: config.region.clone(),
        })
    }

    /// Submits one single-document index request, routed through the named
    /// server-side ingest pipeline that assigns the daily index suffix. A
    /// non-success acknowledgment is a failed write; there are no retries.
    pub async fn index<B: Serialize>(
        &self,
        index: &str,
        pipeline: &str,
        record: &B,
    ) -> Result<(), IndexError> {
        let url = format!(
            "{}/{}/{}?pipeline={}",
            self.base_url, index, DOC_TYPE, pipeline
        );
        let body = serde_json::to_vec(record)?;

        let host = host_of(&url)?;
        let headers = [
            ("host", host.as_str()),
            ("content-type", "application/json"),
        ];

        let identity = self.credentials.clone().into();
        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_SERVICE)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| IndexError::SigningFailure(e.to_string()))?
            .into();

        let signable_request = SignableRequest::new(
            "POST",
            url.as_str(),
            headers.iter().copied(),
            SignableBody::Bytes(&body),
        )
        .map_err(|e| IndexError::SigningFailure(e.to_string()))?;

        let (signing_instructions, _signature) = sign(signable_request, &signing_params)
            .map_err(|e| IndexError::SigningFailure(e.to_string()))?
            .into_parts();

        let mut request = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in signing_instructions.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::IndexWriteFailure {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!("document store acknowledged write with status {}", status);
        Ok(())
    }
}

fn base_url(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn host_of(url: &str) -> Result<String, IndexError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| IndexError::SigningFailure(format!("invalid endpoint url - {}", e)))?;
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => Ok(format!("{}:{}", host, port)),
        (Some(host), None) => Ok(host.to_string()),
        _ => Err(IndexError::SigningFailure(
            "endpoint url carries no host".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_defaults_to_https() {
        assert_eq!(
            base_url("search-callreports.us-east-1.es.amazonaws.com"),
            "https://search-callreports.us-east-1.es.amazonaws.com"
        );
    }

    #[test]
    fn test_base_url_keeps_explicit_scheme() {
        assert_eq!(base_url("http://127.0.0.1:9200"), "http://127.0.0.1:9200");
        assert_eq!(
            base_url("https://search-x.es.amazonaws.com/"),
            "https://search-x.es.amazonaws.com"
        );
    }

    #[test]
    fn test_host_of_includes_nonstandard_port() {
        assert_eq!(host_of("http://127.0.0.1:9200/a/b").unwrap(), "127.0.0.1:9200");
        assert_eq!(
            host_of("https://search-x.es.amazonaws.com/a").unwrap(),
            "search-x.es.amazonaws.com"
        );
    }
}
