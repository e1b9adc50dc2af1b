//! Render command implementation

use super::DeviceArgs;
use anyhow::{bail, Result};
use clap::Args;
use tsbench_iotdb::query::check_threshold;
use tsbench_iotdb::{AdapterConfig, DataModel, ModelStrategy, Operation, QueryBuilder};
use tsbench_shared::{
    AggRangeQuery, AggRangeValueQuery, AggValueQuery, DeviceQuery, GroupByQuery,
    LatestPointQuery, PreciseQuery, RangeQuery, ValueRangeQuery,
};

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub devices: DeviceArgs,

    /// Override the configured data model (tree or table)
    #[arg(long)]
    pub model: Option<DataModel>,

    /// Override the configured database
    #[arg(long)]
    pub database: Option<String>,

    /// Only print this shape, e.g. `range_query_desc`
    #[arg(long)]
    pub shape: Option<String>,

    /// Timestamp of the precise query, defaults to `--start`
    #[arg(long)]
    pub timestamp: Option<i64>,

    /// Range start (ms)
    #[arg(long, default_value = "0")]
    pub start: i64,

    /// Range end (ms)
    #[arg(long, default_value = "3600000")]
    pub end: i64,

    /// Value filter threshold
    #[arg(long, default_value = "0")]
    pub threshold: f64,

    /// Aggregation function
    #[arg(long, default_value = "COUNT")]
    pub agg: String,

    /// Group-by bucket width (ms)
    #[arg(long, default_value = "60000")]
    pub granularity_ms: u64,

    /// Also print registration and cleanup statements
    #[arg(long)]
    pub ddl: bool,
}

pub fn run(mut config: AdapterConfig, args: RenderArgs) -> Result<()> {
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.database.is_some() {
        config.database = args.database.clone();
    }
    config.validate()?;
    check_threshold(args.threshold)?;

    let devices = args.devices.schemas()?;
    let queries = QueryBuilder::new(ModelStrategy::from_config(&config));

    if args.ddl {
        for sql in queries.model().registration_statements(&devices) {
            println!("{}", sql);
        }
        for sql in queries.model().cleanup_statements() {
            println!("{}", sql);
        }
        println!();
    }

    let rendered: Vec<_> = render_all(&queries, &devices, &args)
        .into_iter()
        .filter(|(operation, _)| args.shape.as_deref().map_or(true, |s| s == operation.name()))
        .collect();
    if rendered.is_empty() {
        bail!("Unknown query shape `{}`", args.shape.as_deref().unwrap_or_default());
    }
    for (operation, sql) in rendered {
        println!("{:<22} {}", operation.name(), sql);
    }
    Ok(())
}

fn render_all(
    queries: &QueryBuilder,
    devices: &[tsbench_shared::DeviceSchema],
    args: &RenderArgs,
) -> Vec<(Operation, String)> {
    let devices = devices.to_vec();
    let range = RangeQuery {
        devices: devices.clone(),
        start: args.start,
        end: args.end,
    };
    let value_range = ValueRangeQuery {
        devices: devices.clone(),
        start: args.start,
        end: args.end,
        value_threshold: args.threshold,
    };
    let group_by = GroupByQuery {
        devices: devices.clone(),
        agg_fun: args.agg.clone(),
        start: args.start,
        end: args.end,
        granularity_ms: args.granularity_ms,
    };

    let mut rendered = vec![
        (
            Operation::PreciseQuery,
            queries.precise(&PreciseQuery {
                devices: devices.clone(),
                timestamp: args.timestamp.unwrap_or(args.start),
            }),
        ),
        (Operation::RangeQuery, queries.range(&range)),
        (Operation::ValueRangeQuery, queries.value_range(&value_range)),
        (
            Operation::AggRangeQuery,
            queries.agg_range(&AggRangeQuery {
                devices: devices.clone(),
                agg_fun: args.agg.clone(),
                start: args.start,
                end: args.end,
            }),
        ),
        (
            Operation::AggValueQuery,
            queries.agg_value(&AggValueQuery {
                devices: devices.clone(),
                agg_fun: args.agg.clone(),
                value_threshold: args.threshold,
            }),
        ),
        (
            Operation::AggRangeValueQuery,
            queries.agg_range_value(&AggRangeValueQuery {
                devices: devices.clone(),
                agg_fun: args.agg.clone(),
                start: args.start,
                end: args.end,
                value_threshold: args.threshold,
            }),
        ),
        (Operation::GroupByQuery, queries.group_by(&group_by)),
        (
            Operation::LatestPointQuery,
            queries.latest_point(&LatestPointQuery {
                devices: devices.clone(),
            }),
        ),
        (Operation::RangeQueryDesc, queries.range_desc(&range)),
        (Operation::ValueRangeQueryDesc, queries.value_range_desc(&value_range)),
        (Operation::GroupByQueryDesc, queries.group_by_desc(&group_by)),
    ];

    if let Some(device) = devices.first() {
        rendered.push((
            Operation::DeviceQuery,
            queries.device_query(&DeviceQuery {
                device: device.clone(),
                start: args.start,
                end: args.end,
            }),
        ));
    }
    rendered
}
