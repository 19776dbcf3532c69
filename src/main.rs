use anyhow::{Context, Result};
use power_meter_sim::{config, scheduler, simulation, sink, telemetry};
use config::Config;
use scheduler::{MeterLoop, SystemClock};
use simulation::TelemetryModel;
use sink::{InfluxSink, LogSink, SampleSink};
use std::sync::Arc;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }

    let cfg = Config::load()?;
    init_tracing(cfg.output.log_format);

    let model = TelemetryModel::from_config(cfg.model.clone())?;

    let sink: Arc<dyn SampleSink> = if cfg.output.dry_run {
        warn!("dry run: samples are logged, not written");
        Arc::new(LogSink)
    } else {
        Arc::new(InfluxSink::new(&cfg.influx)?)
    };

    info!(
        site = %cfg.meter.site,
        sensor = %cfg.meter.sensor,
        bucket = %cfg.influx.bucket,
        tick_seconds = cfg.meter.tick_seconds,
        on_write_error = %cfg.meter.on_write_error,
        "starting power meter simulation"
    );

    let mut meter = MeterLoop::new(
        model,
        sink,
        SystemClock,
        cfg.meter.tags(),
        cfg.meter.loop_config(),
    )
    .with_measurement(cfg.influx.measurement.clone());

    let summary = meter.run(telemetry::shutdown_signal()).await?;

    info!(
        ticks = summary.ticks,
        written = summary.written,
        failed = summary.failed,
        energy_kwh = summary.energy_kwh,
        "stopped"
    );
    Ok(())
}
