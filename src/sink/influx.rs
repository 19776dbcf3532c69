use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::debug;

use super::{Point, SampleSink, SinkError};
use crate::config::InfluxConfig;

/// InfluxDB v2 write API client
#[derive(Clone)]
pub struct InfluxSink {
    write_url: String,
    org: String,
    bucket: String,
    client: reqwest::Client,
}

impl InfluxSink {
    pub fn new(cfg: &InfluxConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("power-meter-sim/", env!("CARGO_PKG_VERSION"))),
        );
        let mut auth = HeaderValue::from_str(&format!("Token {}", cfg.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            write_url: format!("{}/api/v2/write", cfg.url.trim_end_matches('/')),
            org: cfg.org.clone(),
            bucket: cfg.bucket.clone(),
            client,
        })
    }
}

#[async_trait]
impl SampleSink for InfluxSink {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let body = point.to_line_protocol();
        debug!(%body, bucket = %self.bucket, "influx write");

        let resp = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::DEFAULT_MEASUREMENT;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String) -> InfluxConfig {
        InfluxConfig {
            url,
            token: "secret-token".into(),
            org: "lab".into(),
            bucket: "energy_lab".into(),
            ..Default::default()
        }
    }

    fn point() -> Point {
        Point {
            measurement: DEFAULT_MEASUREMENT.into(),
            tags: vec![("site".into(), "shu".into()), ("sensor".into(), "sim_pi01".into())],
            fields: vec![("vrms", 230.0), ("pf", 0.9)],
            timestamp_secs: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn posts_line_protocol_with_token_and_precision() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/write"))
            .and(query_param("org", "lab"))
            .and(query_param("bucket", "energy_lab"))
            .and(query_param("precision", "s"))
            .and(header("authorization", "Token secret-token"))
            .and(body_string(
                "power_samples,site=shu,sensor=sim_pi01 vrms=230.0,pf=0.9 1700000000",
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = InfluxSink::new(&config(format!("{}/", server.uri()))).unwrap();
        sink.write(&point()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized access"))
            .mount(&server)
            .await;

        let sink = InfluxSink::new(&config(server.uri())).unwrap();
        match sink.write(&point()).await {
            Err(SinkError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized access");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let sink = InfluxSink::new(&config("http://127.0.0.1:9".into())).unwrap();
        assert!(matches!(sink.write(&point()).await, Err(SinkError::Transport(_))));
    }
}
