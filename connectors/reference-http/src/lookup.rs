//! [`NameLookup`] over a keyed HTTP endpoint returning the name as plain text.

use starsync_sdk::prelude::*;

use crate::config::LookupConfig;
use crate::http::{build_client, request_error, retry_after_ms, status_error};

pub struct HttpNameLookup {
    config: LookupConfig,
    http: reqwest::Client,
}

impl HttpNameLookup {
    pub fn new(config: LookupConfig) -> Result<Self, ConnectorError> {
        config.validate()?;
        let http = build_client(config.timeout_secs)?;
        Ok(Self { config, http })
    }
}

impl NameLookup for HttpNameLookup {
    async fn lookup(&self, id_funcionario: i64) -> Result<String, ConnectorError> {
        let resp = self
            .http
            .get(&self.config.url)
            .query(&[(self.config.query_param.as_str(), id_funcionario.to_string())])
            .send()
            .await
            .map_err(|e| request_error("Name lookup failed", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = retry_after_ms(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error("Name lookup failed", status, retry_after, &body)
                .with_details(serde_json::json!({
                    "id_funcionario": id_funcionario,
                    "status": status.as_u16(),
                })));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| request_error("Name lookup body read failed", &e))?;
        let name = body.trim();
        if name.is_empty() {
            tracing::warn!(id_funcionario, "reference-http: lookup returned an empty name");
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn lookup_for(server: &MockServer) -> HttpNameLookup {
        HttpNameLookup::new(LookupConfig {
            url: format!("{}/api_challenge_junior", server.uri()),
            query_param: "id".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_and_trims_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api_challenge_junior"))
            .and(query_param("id", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  Ana Souza\n"))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server).await;
        assert_eq!(lookup.lookup(5).await.unwrap(), "Ana Souza");
    }

    #[tokio::test]
    async fn empty_success_body_is_a_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server).await;
        assert_eq!(lookup.lookup(9).await.unwrap(), "");
    }

    #[tokio::test]
    async fn not_found_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such employee"))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server).await;
        let err = lookup.lookup(42).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Upstream);
        assert!(!err.retryable);
        assert_eq!(err.details.unwrap()["id_funcionario"], 42);
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server).await;
        let err = lookup.lookup(1).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::TransientNetwork);
        assert!(err.can_retry());
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
            .mount(&server)
            .await;

        let lookup = lookup_for(&server).await;
        let err = lookup.lookup(1).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert_eq!(err.retry_after_ms, Some(2000));
    }
}
