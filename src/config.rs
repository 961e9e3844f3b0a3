use std::env;
use std::string::String;

/// Runtime configuration for the indexer, sourced from the function's
/// environment. `CLOUDFRONT_URL`, `ENDPOINT` and `REGION` must be present;
/// the index prefix and ingest pipeline carry the deployment defaults.
pub struct Config {
    pub cloudfront_url: String,
    pub endpoint: String,
    pub region: String,
    pub index: String,
    pub pipeline: String,
}

impl Config {
    pub fn load_from_env() -> Result<Config, String> {
        let conf = Config {
            cloudfront_url: env::var("CLOUDFRONT_URL")
                .map_err(|e| format!("CLOUDFRONT_URL not set - {}", e))?,

            endpoint: env::var("ENDPOINT").map_err(|e| format!("ENDPOINT not set - {}", e))?,

            region: env::var("REGION").map_err(|e| format!("REGION not set - {}", e))?,

            index: env::var("INDEX").unwrap_or("softphonecallreport-".to_string()),

            pipeline: env::var("INGEST_PIPELINE").unwrap_or("reports_dailyindex".to_string()),
        };

        Ok(conf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_env() {
        temp_env::with_vars(
            [
                ("CLOUDFRONT_URL", Some("https://d111111abcdef8.cloudfront.net")),
                (
                    "ENDPOINT",
                    Some("search-callreports-abc123.us-east-1.es.amazonaws.com"),
                ),
                ("REGION", Some("us-east-1")),
                ("INDEX", None),
                ("INGEST_PIPELINE", None),
            ],
            || {
                let config = Config::load_from_env().expect("failed to load config from env");
                assert_eq!(
                    config.cloudfront_url,
                    "https://d111111abcdef8.cloudfront.net"
                );
                assert_eq!(
                    config.endpoint,
                    "search-callreports-abc123.us-east-1.es.amazonaws.com"
                );
                assert_eq!(config.region, "us-east-1");
                assert_eq!(config.index, "softphonecallreport-");
                assert_eq!(config.pipeline, "reports_dailyindex");
            },
        );
    }

    #[test]
    fn test_index_and_pipeline_overrides() {
        temp_env::with_vars(
            [
                ("CLOUDFRONT_URL", Some("https://d111111abcdef8.cloudfront.net")),
                ("ENDPOINT", Some("search-test.us-east-1.es.amazonaws.com")),
                ("REGION", Some("us-east-1")),
                ("INDEX", Some("callreport-staging-")),
                ("INGEST_PIPELINE", Some("staging_dailyindex")),
            ],
            || {
                let config = Config::load_from_env().expect("failed to load config from env");
                assert_eq!(config.index, "callreport-staging-");
                assert_eq!(config.pipeline, "staging_dailyindex");
            },
        );
    }

    #[test]
    fn test_missing_required_var_fails() {
        temp_env::with_vars(
            [
                ("CLOUDFRONT_URL", Some("https://d111111abcdef8.cloudfront.net")),
                ("ENDPOINT", None::<&str>),
                ("REGION", Some("us-east-1")),
            ],
            || {
                let err = Config::load_from_env().unwrap_err();
                assert!(err.contains("ENDPOINT not set"), "unexpected error: {}", err);
            },
        );
    }
}
