//! Table model: one relational table per group
//!
//! A group becomes the table `<database>.<group>`. Tag keys become `TAG`
//! columns, the device id is the `device_id` tag column and sensors are
//! `FIELD` columns. Device identity is therefore a row predicate, never part
//! of the `FROM` clause.

use super::{agg_list, first_device, record_literals, threshold_chain};
use crate::config::{AdapterConfig, DataModel};
use crate::naming::PathNaming;
use crate::tablet::{Tablet, TabletColumn};
use tsbench_shared::utils::quote_sql_string;
use tsbench_shared::{Batch, DeviceSchema, Value};

pub const DEVICE_ID_COLUMN: &str = "device_id";

#[derive(Debug, Clone)]
pub struct TableStrategy {
    naming: PathNaming,
    database: String,
}

impl TableStrategy {
    pub fn new(config: &AdapterConfig) -> Self {
        let database = config.database.clone().unwrap_or_default();
        Self {
            naming: PathNaming::new(DataModel::Table, Some(&database)),
            database,
        }
    }

    pub fn naming(&self) -> &PathNaming {
        &self.naming
    }

    /// `<database>.<group>`
    pub fn qualified_table(&self, schema: &DeviceSchema) -> String {
        format!("{}.{}", self.database, self.naming.group_path(schema))
    }

    pub(crate) fn select_list(&self, devices: &[DeviceSchema]) -> String {
        let mut columns = vec!["time"];
        columns.extend(first_device(devices).sensor_names());
        columns.join(", ")
    }

    pub(crate) fn latest_select_list(&self, devices: &[DeviceSchema]) -> String {
        let mut columns = vec!["last(time)".to_string()];
        columns.extend(
            first_device(devices)
                .sensor_names()
                .map(|name| format!("last_by({}, time)", name)),
        );
        columns.join(", ")
    }

    /// Every device of one query shares the first device's table
    pub(crate) fn from_clause(&self, devices: &[DeviceSchema]) -> String {
        format!(" FROM {}", self.qualified_table(first_device(devices)))
    }

    pub(crate) fn device_filter(&self, devices: &[DeviceSchema]) -> String {
        if let [device] = devices {
            return device_predicate(device);
        }
        let predicates: Vec<String> = devices.iter().map(device_predicate).collect();
        format!("({})", predicates.join(" OR "))
    }

    pub(crate) fn value_filter(&self, devices: &[DeviceSchema], threshold: f64) -> String {
        if let [device] = devices {
            return threshold_chain(device.sensor_names().map(str::to_string), threshold);
        }
        let groups: Vec<String> = devices
            .iter()
            .map(|device| {
                let chain = threshold_chain(device.sensor_names().map(str::to_string), threshold);
                format!("({} AND {})", device_predicate(device), chain)
            })
            .collect();
        format!("({})", groups.join(" OR "))
    }

    /// Buckets are half-open: `[start, end)`. The bucket column is named
    /// `time` so descending variants can order by it.
    pub(crate) fn group_by(
        &self,
        devices: &[DeviceSchema],
        agg_fun: &str,
        start: i64,
        end: i64,
        granularity_ms: u64,
    ) -> String {
        let bin = format!("date_bin({}ms, time)", granularity_ms);
        format!(
            "SELECT {} AS time, {}{} WHERE {} AND time >= {} AND time < {} GROUP BY {}",
            bin,
            agg_list(devices, agg_fun),
            self.from_clause(devices),
            self.device_filter(devices),
            start,
            end,
            bin
        )
    }

    pub(crate) fn tablet(&self, batch: &Batch) -> Tablet {
        let schema = &batch.device;
        let mut columns: Vec<TabletColumn> = schema.tag_keys().map(TabletColumn::tag).collect();
        columns.push(TabletColumn::tag(DEVICE_ID_COLUMN));
        columns.extend(
            schema
                .sensors
                .iter()
                .map(|s| TabletColumn::field(s.name.clone(), s.sensor_type)),
        );

        let identity: Vec<Option<Value>> = schema
            .tag_values()
            .chain(std::iter::once(schema.device.as_str()))
            .map(|v| Some(Value::Text(v.to_string())))
            .collect();

        let mut tablet = Tablet::with_capacity(
            self.qualified_table(schema),
            columns,
            batch.records.len(),
            false,
        );
        for record in &batch.records {
            tablet.add_row(
                record.timestamp,
                identity.iter().cloned().chain(record.values.iter().cloned()),
            );
        }
        tablet
    }

    pub(crate) fn insert_statements(&self, batch: &Batch) -> Vec<String> {
        let schema = &batch.device;
        let mut columns = vec!["time"];
        columns.extend(schema.tag_keys());
        columns.push(DEVICE_ID_COLUMN);
        columns.extend(schema.sensor_names());
        let columns = columns.join(", ");

        let identity: Vec<String> = schema
            .tag_values()
            .chain(std::iter::once(schema.device.as_str()))
            .map(quote_sql_string)
            .collect();
        let identity = identity.join(", ");
        let table = self.qualified_table(schema);

        batch
            .records
            .iter()
            .map(|record| {
                format!(
                    "INSERT INTO {}({}) VALUES({}, {}, {})",
                    table,
                    columns,
                    record.timestamp,
                    identity,
                    record_literals(record).join(", ")
                )
            })
            .collect()
    }

    pub(crate) fn registration_statements(&self, schemas: &[DeviceSchema]) -> Vec<String> {
        let mut statements = vec![format!("CREATE DATABASE IF NOT EXISTS {}", self.database)];
        let mut tables: Vec<String> = Vec::new();
        for schema in schemas {
            let table = self.qualified_table(schema);
            if tables.contains(&table) {
                continue;
            }
            let mut columns: Vec<String> = schema
                .tag_keys()
                .map(|key| format!("{} STRING TAG", key))
                .collect();
            columns.push(format!("{} STRING TAG", DEVICE_ID_COLUMN));
            columns.extend(
                schema
                    .sensors
                    .iter()
                    .map(|s| format!("{} {} FIELD", s.name, s.sensor_type)),
            );
            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {}({})",
                table,
                columns.join(", ")
            ));
            tables.push(table);
        }
        statements
    }

    pub(crate) fn cleanup_statements(&self) -> Vec<String> {
        vec![format!("DROP DATABASE IF EXISTS {}", self.database)]
    }
}

fn device_predicate(device: &DeviceSchema) -> String {
    format!("{} = {}", DEVICE_ID_COLUMN, quote_sql_string(&device.device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tablet::ColumnCategory;
    use tsbench_shared::{Record, Sensor, SensorType};

    fn strategy() -> TableStrategy {
        TableStrategy::new(&AdapterConfig {
            model: DataModel::Table,
            database: Some("bench".into()),
            ..AdapterConfig::default()
        })
    }

    fn device(id: &str) -> DeviceSchema {
        DeviceSchema::new(
            "g1",
            id,
            vec![Sensor::new("s0", SensorType::Int32), Sensor::new("s1", SensorType::Text)],
        )
        .with_tag("region", "cn")
    }

    #[test]
    fn test_device_identity_is_a_predicate() {
        let s = strategy();
        assert_eq!(s.from_clause(&[device("d1")]), " FROM bench.g1");
        assert_eq!(s.device_filter(&[device("d1")]), "device_id = 'd1'");
        assert_eq!(
            s.device_filter(&[device("d1"), device("d2")]),
            "(device_id = 'd1' OR device_id = 'd2')"
        );
    }

    #[test]
    fn test_select_lists() {
        let s = strategy();
        assert_eq!(s.select_list(&[device("d1")]), "time, s0, s1");
        assert_eq!(
            s.latest_select_list(&[device("d1")]),
            "last(time), last_by(s0, time), last_by(s1, time)"
        );
    }

    #[test]
    fn test_value_filter_keeps_threshold_semantics() {
        let s = strategy();
        assert_eq!(s.value_filter(&[device("d1")], 10.0), "s0 > 10 AND s1 > 10");
        assert_eq!(
            s.value_filter(&[device("d1"), device("d2")], 3.0),
            "((device_id = 'd1' AND s0 > 3 AND s1 > 3) OR (device_id = 'd2' AND s0 > 3 AND s1 > 3))"
        );
    }

    #[test]
    fn test_group_by_uses_date_bin() {
        let s = strategy();
        assert_eq!(
            s.group_by(&[device("d1")], "AVG", 0, 500, 50),
            "SELECT date_bin(50ms, time) AS time, AVG(s0), AVG(s1) FROM bench.g1 \
             WHERE device_id = 'd1' AND time >= 0 AND time < 500 GROUP BY date_bin(50ms, time)"
        );
    }

    #[test]
    fn test_tablet_carries_identity_columns() {
        let batch = Batch::new(
            device("d1"),
            vec![Record::new(7, vec![Some(Value::Int32(4)), None])],
        );
        let tablet = strategy().tablet(&batch);
        assert_eq!(tablet.target, "bench.g1");
        assert!(!tablet.aligned);
        assert_eq!(
            tablet.measurements().collect::<Vec<_>>(),
            vec!["region", "device_id", "s0", "s1"]
        );
        assert_eq!(tablet.columns[1].category, ColumnCategory::Tag);
        assert_eq!(tablet.values[1], vec![Some(Value::Text("d1".into()))]);
        assert_eq!(tablet.point_count(), 1);
    }

    #[test]
    fn test_insert_statements() {
        let batch = Batch::new(
            device("d1"),
            vec![Record::new(7, vec![Some(Value::Int32(4)), Some(Value::Text("x".into()))])],
        );
        assert_eq!(
            strategy().insert_statements(&batch),
            vec!["INSERT INTO bench.g1(time, region, device_id, s0, s1) VALUES(7, 'cn', 'd1', 4, 'x')"]
        );
    }

    #[test]
    fn test_registration_one_table_per_group() {
        let other = DeviceSchema::new("g2", "d9", vec![Sensor::new("s0", SensorType::Int64)]);
        let statements = strategy().registration_statements(&[device("d1"), device("d2"), other]);
        assert_eq!(
            statements,
            vec![
                "CREATE DATABASE IF NOT EXISTS bench".to_string(),
                "CREATE TABLE IF NOT EXISTS bench.g1(region STRING TAG, device_id STRING TAG, \
                 s0 INT32 FIELD, s1 TEXT FIELD)"
                    .to_string(),
                "CREATE TABLE IF NOT EXISTS bench.g2(device_id STRING TAG, s0 INT64 FIELD)"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_cleanup_drops_database() {
        assert_eq!(strategy().cleanup_statements(), vec!["DROP DATABASE IF EXISTS bench"]);
    }
}
