//! Tree model: path-addressed series
//!
//! Devices are addressed by their full path in `FROM`, sensors by their raw
//! name in the select list. Value filters over several devices qualify each
//! sensor with its device path.

use super::{agg_list, first_device, record_literals, threshold_chain};
use crate::config::{AdapterConfig, DataModel, EncodingConfig};
use crate::naming::PathNaming;
use crate::tablet::{Tablet, TabletColumn};
use tsbench_shared::{Batch, DeviceSchema};

#[derive(Debug, Clone)]
pub struct TreeStrategy {
    naming: PathNaming,
    aligned: bool,
    encodings: EncodingConfig,
    compressor: String,
}

impl TreeStrategy {
    pub fn new(config: &AdapterConfig) -> Self {
        Self {
            naming: PathNaming::new(DataModel::Tree, config.database.as_deref()),
            aligned: config.sensor_alignment,
            encodings: config.encodings.clone(),
            compressor: config.compressor.clone(),
        }
    }

    pub fn naming(&self) -> &PathNaming {
        &self.naming
    }

    pub(crate) fn select_list(&self, devices: &[DeviceSchema]) -> String {
        first_device(devices)
            .sensor_names()
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn latest_select_list(&self, devices: &[DeviceSchema]) -> String {
        format!("last {}", self.select_list(devices))
    }

    pub(crate) fn from_clause(&self, devices: &[DeviceSchema]) -> String {
        let paths: Vec<String> = devices.iter().map(|d| self.naming.path(d)).collect();
        format!(" FROM {}", paths.join(", "))
    }

    pub(crate) fn value_filter(&self, devices: &[DeviceSchema], threshold: f64) -> String {
        if let [device] = devices {
            return threshold_chain(device.sensor_names().map(str::to_string), threshold);
        }
        let groups: Vec<String> = devices
            .iter()
            .map(|device| {
                let columns = device
                    .sensor_names()
                    .map(|sensor| self.naming.sensor_path(device, sensor));
                format!("({})", threshold_chain(columns, threshold))
            })
            .collect();
        format!("({})", groups.join(" OR "))
    }

    /// Buckets are half-open: `[start, end)`
    pub(crate) fn group_by(
        &self,
        devices: &[DeviceSchema],
        agg_fun: &str,
        start: i64,
        end: i64,
        granularity_ms: u64,
    ) -> String {
        format!(
            "SELECT {}{} GROUP BY ([{},{}),{}ms)",
            agg_list(devices, agg_fun),
            self.from_clause(devices),
            start,
            end,
            granularity_ms
        )
    }

    pub(crate) fn tablet(&self, batch: &Batch) -> Tablet {
        let columns = batch
            .device
            .sensors
            .iter()
            .map(|s| TabletColumn::field(s.name.clone(), s.sensor_type))
            .collect();
        let mut tablet = Tablet::with_capacity(
            self.naming.path(&batch.device),
            columns,
            batch.records.len(),
            self.aligned,
        );
        for record in &batch.records {
            tablet.add_row(record.timestamp, record.values.iter().cloned());
        }
        tablet
    }

    pub(crate) fn insert_statements(&self, batch: &Batch) -> Vec<String> {
        let path = self.naming.path(&batch.device);
        let columns = batch.device.sensor_names().collect::<Vec<_>>().join(", ");
        let values_keyword = if self.aligned { "ALIGNED VALUES" } else { "VALUES" };
        batch
            .records
            .iter()
            .map(|record| {
                format!(
                    "INSERT INTO {}(timestamp, {}) {}({}, {})",
                    path,
                    columns,
                    values_keyword,
                    record.timestamp,
                    record_literals(record).join(", ")
                )
            })
            .collect()
    }

    pub(crate) fn registration_statements(&self, schemas: &[DeviceSchema]) -> Vec<String> {
        let mut databases: Vec<String> = Vec::new();
        for schema in schemas {
            let database = self.naming.group_path(schema);
            if !databases.contains(&database) {
                databases.push(database);
            }
        }

        let mut statements: Vec<String> = databases
            .into_iter()
            .map(|db| format!("CREATE DATABASE {}", db))
            .collect();

        for schema in schemas {
            let path = self.naming.path(schema);
            if self.aligned {
                let sensors: Vec<String> = schema
                    .sensors
                    .iter()
                    .map(|s| {
                        format!(
                            "{} {} encoding={} compressor={}",
                            s.name,
                            s.sensor_type,
                            self.encodings.for_type(s.sensor_type),
                            self.compressor
                        )
                    })
                    .collect();
                statements.push(format!(
                    "CREATE ALIGNED TIMESERIES {}({})",
                    path,
                    sensors.join(", ")
                ));
            } else {
                for s in &schema.sensors {
                    statements.push(format!(
                        "CREATE TIMESERIES {}.{} WITH DATATYPE={}, ENCODING={}, COMPRESSOR={}",
                        path,
                        s.name,
                        s.sensor_type,
                        self.encodings.for_type(s.sensor_type),
                        self.compressor
                    ));
                }
            }
        }
        statements
    }

    pub(crate) fn cleanup_statements(&self) -> Vec<String> {
        vec![format!("DELETE DATABASE {}.**", self.naming.root())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsbench_shared::{Record, Sensor, SensorType, Value};

    fn strategy(aligned: bool) -> TreeStrategy {
        TreeStrategy::new(&AdapterConfig {
            sensor_alignment: aligned,
            ..AdapterConfig::default()
        })
    }

    fn device(id: &str) -> DeviceSchema {
        DeviceSchema::new(
            "g1",
            id,
            vec![Sensor::new("s0", SensorType::Int32), Sensor::new("s1", SensorType::Double)],
        )
        .with_tag("region", "cn")
    }

    #[test]
    fn test_from_clause_lists_every_device() {
        let s = strategy(true);
        assert_eq!(
            s.from_clause(&[device("d1"), device("d2")]),
            " FROM root.g1.cn.d1, root.g1.cn.d2"
        );
    }

    #[test]
    fn test_value_filter_single_device() {
        let s = strategy(true);
        assert_eq!(s.value_filter(&[device("d1")], 10.0), "s0 > 10 AND s1 > 10");
    }

    #[test]
    fn test_value_filter_groups_per_device() {
        let s = strategy(true);
        let devices = [device("d1"), device("d2"), device("d3")];
        let filter = s.value_filter(&devices, 7.5);
        assert_eq!(filter.matches(" OR ").count(), 2);
        assert_eq!(filter.matches(" > 7.5").count(), 6);
        assert!(filter.starts_with("((root.g1.cn.d1.s0 > 7.5 AND root.g1.cn.d1.s1 > 7.5) OR"));
        for group in filter.trim_start_matches('(').trim_end_matches(')').split(") OR (") {
            assert_eq!(group.split(" AND ").count(), 2);
        }
    }

    #[test]
    fn test_group_by_is_half_open() {
        let s = strategy(true);
        assert_eq!(
            s.group_by(&[device("d1")], "MAX", 0, 1000, 100),
            "SELECT MAX(s0), MAX(s1) FROM root.g1.cn.d1 GROUP BY ([0,1000),100ms)"
        );
    }

    #[test]
    fn test_insert_statements() {
        let batch = Batch::new(
            device("d1"),
            vec![Record::new(5, vec![Some(Value::Int32(1)), None])],
        );
        assert_eq!(
            strategy(true).insert_statements(&batch),
            vec!["INSERT INTO root.g1.cn.d1(timestamp, s0, s1) ALIGNED VALUES(5, 1, null)"]
        );
        assert_eq!(
            strategy(false).insert_statements(&batch),
            vec!["INSERT INTO root.g1.cn.d1(timestamp, s0, s1) VALUES(5, 1, null)"]
        );
    }

    #[test]
    fn test_tablet_targets_device_path() {
        let batch = Batch::new(
            device("d1"),
            vec![
                Record::new(1, vec![Some(Value::Int32(1)), Some(Value::Double(0.5))]),
                Record::new(2, vec![Some(Value::Int32(2)), None]),
            ],
        );
        let tablet = strategy(true).tablet(&batch);
        assert_eq!(tablet.target, "root.g1.cn.d1");
        assert!(tablet.aligned);
        assert_eq!(tablet.timestamps, vec![1, 2]);
        assert_eq!(tablet.point_count(), 3);
    }

    #[test]
    fn test_registration_aligned() {
        let statements = strategy(true).registration_statements(&[device("d1"), device("d2")]);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "CREATE DATABASE root.g1");
        assert_eq!(
            statements[1],
            "CREATE ALIGNED TIMESERIES root.g1.cn.d1(s0 INT32 encoding=TS_2DIFF compressor=LZ4, \
             s1 DOUBLE encoding=GORILLA compressor=LZ4)"
        );
    }

    #[test]
    fn test_registration_unaligned_one_statement_per_sensor() {
        let statements = strategy(false).registration_statements(&[device("d1")]);
        assert_eq!(
            statements,
            vec![
                "CREATE DATABASE root.g1".to_string(),
                "CREATE TIMESERIES root.g1.cn.d1.s0 WITH DATATYPE=INT32, ENCODING=TS_2DIFF, COMPRESSOR=LZ4"
                    .to_string(),
                "CREATE TIMESERIES root.g1.cn.d1.s1 WITH DATATYPE=DOUBLE, ENCODING=GORILLA, COMPRESSOR=LZ4"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_cleanup_uses_database_prefix() {
        let s = TreeStrategy::new(&AdapterConfig {
            database: Some("bench".into()),
            ..AdapterConfig::default()
        });
        assert_eq!(s.cleanup_statements(), vec!["DELETE DATABASE root.bench.**"]);
    }
}
