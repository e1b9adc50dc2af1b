//! Smoke command implementation
//!
//! Drives one adapter through a full cycle against a live node. Only the
//! REST transport is built in, so the configuration is switched to it.

use super::DeviceArgs;
use crate::output;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use tracing::{debug, warn};
use tsbench_iotdb::{Adapter, AdapterConfig, Backends, Database, DataModel, TransportKind};
use tsbench_shared::utils::time::system_time_millis;
use tsbench_shared::{
    Batch, DeviceQuery, DeviceSchema, LatestPointQuery, PreciseQuery, RangeQuery, Record,
    SensorType, Value, VerificationQuery,
};

#[derive(Args, Debug)]
pub struct SmokeArgs {
    #[command(flatten)]
    pub devices: DeviceArgs,

    /// Records written per device
    #[arg(short = 'n', long, default_value = "10")]
    pub records: usize,

    /// Spacing between record timestamps (ms)
    #[arg(long, default_value = "1000")]
    pub interval_ms: i64,

    /// Drop all benchmark data before and after the run
    #[arg(long)]
    pub cleanup: bool,

    /// Print adapter metrics in Prometheus text format at the end
    #[arg(long)]
    pub metrics: bool,
}

pub async fn run(mut config: AdapterConfig, args: SmokeArgs) -> Result<()> {
    if config.model == DataModel::Table {
        bail!("The smoke run uses the REST transport, which only serves the tree model");
    }
    config.transport = TransportKind::Rest;

    let devices = args.devices.schemas()?;
    debug!(
        devices = devices.len(),
        records = args.records,
        interval_ms = args.interval_ms,
        "Starting smoke run"
    );
    let mut db = Adapter::new(config, Backends::default()).context("Failed to create adapter")?;
    db.init().await.context("Failed to initialise adapter")?;

    if args.cleanup {
        db.cleanup().await.context("Cleanup failed")?;
    }

    let elapsed = db
        .register_schema(&devices)
        .await
        .context("Schema registration failed")?;
    output::info(&format!("Registered {} device(s) in {:.3}s", devices.len(), elapsed));

    let start = system_time_millis();
    let end = start + args.interval_ms * args.records.saturating_sub(1) as i64;
    let mut failures = 0usize;

    output::heading("Ingestion");
    let mut batches = Vec::with_capacity(devices.len());
    for device in &devices {
        let batch = synthetic_batch(device, start, args.interval_ms, args.records);
        let status = db.insert_batch(&batch).await;
        failures += usize::from(!status.success);
        output::status(&status);
        batches.push(batch);
    }

    output::heading("Queries");
    let statuses = vec![
        db.precise_query(&PreciseQuery {
            devices: devices.clone(),
            timestamp: start,
        })
        .await,
        db.range_query(&RangeQuery {
            devices: devices.clone(),
            start,
            end,
        })
        .await,
        db.latest_point_query(&LatestPointQuery {
            devices: devices.clone(),
        })
        .await,
    ];
    for status in &statuses {
        failures += usize::from(!status.success);
        output::status(status);
    }

    output::heading("Verification");
    for batch in batches {
        let status = db
            .verification_query(&VerificationQuery {
                device: batch.device.clone(),
                records: batch.records,
            })
            .await;
        failures += usize::from(!status.success);
        output::status(&status);

        match db
            .device_summary(&DeviceQuery {
                device: batch.device,
                start,
                end: end + 1,
            })
            .await
        {
            Ok(summary) => output::info(&format!(
                "{}: {} line(s) in [{}, {}]",
                summary.device, summary.total_line_number, summary.min_timestamp, summary.max_timestamp
            )),
            Err(e) => {
                failures += 1;
                output::error(&format!("device summary failed: {}", e));
            }
        }
    }

    if args.cleanup {
        db.cleanup().await.context("Cleanup failed")?;
    }
    db.close().await.context("Failed to close adapter")?;

    if args.metrics {
        output::heading("Metrics");
        match tsbench_iotdb::metrics::encode_metrics() {
            Ok(text) => print!("{}", text),
            Err(e) => output::error(&e),
        }
    }

    if failures > 0 {
        warn!(failures, "Smoke run finished with failed operations");
        bail!("{} operation(s) failed", failures);
    }
    output::success("Smoke run passed");
    Ok(())
}

fn synthetic_batch(device: &DeviceSchema, start: i64, interval_ms: i64, records: usize) -> Batch {
    let records = (0..records)
        .map(|i| {
            let values = device
                .sensors
                .iter()
                .map(|sensor| synthetic_value(sensor.sensor_type, i))
                .collect();
            Record::new(start + interval_ms * i as i64, values)
        })
        .collect();
    Batch::new(device.clone(), records)
}

/// Deterministic value of the `i`-th record for a sensor type
fn synthetic_value(sensor_type: SensorType, i: usize) -> Option<Value> {
    let n = i as i64;
    match sensor_type {
        SensorType::Boolean => Some(Value::Boolean(i % 2 == 0)),
        SensorType::Int32 => i32::try_from(i).ok().map(Value::Int32),
        SensorType::Int64 => Some(Value::Int64(n)),
        SensorType::Float => Some(Value::Float(i as f32 + 0.5)),
        SensorType::Double => Some(Value::Double(n as f64 + 0.25)),
        SensorType::Text | SensorType::String => Some(Value::Text(format!("v{}", i))),
        SensorType::Blob => Some(Value::Blob(vec![(i % 256) as u8])),
        SensorType::Timestamp => Some(Value::Timestamp(n)),
        SensorType::Date => NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.checked_add_days(chrono::Days::new(i as u64)))
            .map(Value::Date),
    }
}
