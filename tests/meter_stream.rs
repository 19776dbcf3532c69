//! End-to-end: model -> loop -> InfluxDB write API (mocked).

use chrono::{Duration as ChronoDuration, FixedOffset, TimeZone};
use power_meter_sim::config::InfluxConfig;
use power_meter_sim::scheduler::{LoopConfig, MeterLoop, SteppedClock, WriteErrorPolicy};
use power_meter_sim::simulation::{MeterModelConfig, TelemetryModel};
use power_meter_sim::sink::{InfluxSink, MeterTags};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIELDS: [&str; 8] = [
    "vrms", "irms", "p_real", "s_apparent", "pf", "energy_kwh", "v_peak", "i_peak",
];

fn influx(server: &MockServer) -> InfluxConfig {
    InfluxConfig {
        url: server.uri(),
        token: "t0ken".into(),
        org: "lab".into(),
        bucket: "energy_lab".into(),
        ..Default::default()
    }
}

fn meter_loop(server: &MockServer, policy: WriteErrorPolicy) -> MeterLoop<SteppedClock> {
    let model = TelemetryModel::from_config(MeterModelConfig {
        random_seed: Some(7),
        ..Default::default()
    })
    .unwrap();
    let start = FixedOffset::east_opt(7200)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 15, 19, 0, 0)
        .unwrap();

    MeterLoop::new(
        model,
        Arc::new(InfluxSink::new(&influx(server)).unwrap()),
        SteppedClock::new(start, ChronoDuration::seconds(1)),
        MeterTags { site: "shu".into(), sensor: "sim_pi01".into() },
        LoopConfig {
            tick_seconds: 0.01,
            max_ticks: Some(3),
            on_write_error: policy,
        },
    )
}

#[tokio::test]
async fn streams_samples_as_line_protocol() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;

    let summary = meter_loop(&server, WriteErrorPolicy::Abort)
        .run(std::future::pending())
        .await
        .unwrap();
    assert_eq!(summary.written, 3);

    let requests = server.received_requests().await.unwrap();
    let lines: Vec<String> = requests
        .iter()
        .map(|r| String::from_utf8(r.body.clone()).unwrap())
        .collect();

    // 19:00 at UTC+2 is 17:00 UTC
    assert!(lines[0].ends_with(" 1718470800"));
    for line in &lines {
        assert!(line.starts_with("power_samples,site=shu,sensor=sim_pi01 "));
        for field in FIELDS {
            assert!(line.contains(&format!("{field}=")), "{field} missing in {line}");
        }
    }
}

#[tokio::test]
async fn rejected_writes_are_skipped_and_counted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut meter = meter_loop(&server, WriteErrorPolicy::Skip);
    let summary = meter.run(std::future::pending()).await.unwrap();

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.failed, 3);
    assert!(summary.energy_kwh > 0.0);
    assert_eq!(summary.energy_kwh, meter.model().energy_kwh());
}
