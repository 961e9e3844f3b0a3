use aws_config::BehaviorVersion;
use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use softphone_report_indexer::config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    softphone_report_indexer::set_up_logging();

    info!(
        "Initializing {} version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let aws_config = aws_config::load_defaults(BehaviorVersion::v2023_11_09()).await;
    let credentials = aws_config
        .credentials_provider()
        .ok_or("no ambient AWS credentials provider configured")?;
    let config = config::Config::load_from_env()?;

    run(service_fn(|request: LambdaEvent<ApiGatewayProxyRequest>| {
        softphone_report_indexer::function_handler(&credentials, &config, request)
    }))
    .await
}
