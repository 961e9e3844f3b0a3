use aws_credential_types::provider::SharedCredentialsProvider;
use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use lambda_runtime::{Error, LambdaEvent};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::opensearch::OpenSearchClient;
use crate::report::IndexRecord;

pub mod config;
pub mod opensearch;
pub mod report;

// Request headers the browser is allowed to send on the CORS-gated endpoint.
const ALLOWED_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

pub fn set_up_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
}

// lambda handler
pub async fn function_handler(
    credentials: &SharedCredentialsProvider,
    config: &Config,
    evt: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, Error> {
    info!("Handling lambda invocation");
    debug!("Handling event payload: {:?}", evt.payload);

    let body = evt.payload.body.as_deref().unwrap_or_default();
    let inbound = report::parse_inbound(body)?;
    let source_ip = evt.payload.request_context.identity.source_ip;
    let document = report::enrich(inbound, source_ip)?;

    let client = OpenSearchClient::connect(config, credentials.clone()).await?;
    client
        .index(&config.index, &config.pipeline, &IndexRecord { doc: document })
        .await?;
    info!("Successfully uploaded call report to index {}", config.index);

    success_response(config)
}

fn success_response(config: &Config) -> Result<ApiGatewayProxyResponse, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(&config.cloudfront_url)?,
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static(ALLOWED_HEADERS),
    );

    Ok(ApiGatewayProxyResponse {
        status_code: 200,
        headers,
        multi_value_headers: HeaderMap::new(),
        body: Some(Body::Text("Success".to_string())),
        is_base64_encoded: false,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_config() -> Config {
        Config {
            cloudfront_url: "https://d111111abcdef8.cloudfront.net".to_string(),
            endpoint: "search-callreports.us-east-1.es.amazonaws.com".to_string(),
            region: "us-east-1".to_string(),
            index: "softphonecallreport-".to_string(),
            pipeline: "reports_dailyindex".to_string(),
        }
    }

    #[test]
    fn test_success_response_shape() {
        let response = success_response(&test_config()).unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers[CONTENT_TYPE.as_str()], "application/json");
        assert_eq!(
            response.headers["Access-Control-Allow-Origin"],
            "https://d111111abcdef8.cloudfront.net"
        );
        assert_eq!(
            response.headers["Access-Control-Allow-Headers"],
            "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token"
        );
        assert!(matches!(response.body, Some(Body::Text(ref s)) if s == "Success"));
        assert!(!response.is_base64_encoded);
    }
}
