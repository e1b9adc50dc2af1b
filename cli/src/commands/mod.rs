//! Command implementations

pub mod config;
pub mod render;
pub mod smoke;

use anyhow::{bail, Context, Result};
use clap::Args;
use tsbench_shared::{DeviceSchema, Sensor, SensorType};

/// Devices a command works on. Every device shares one group, tag set and
/// sensor layout.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device group
    #[arg(long, default_value = "g_0")]
    pub group: String,

    /// Device id, repeatable
    #[arg(long = "device", default_value = "d_0")]
    pub devices: Vec<String>,

    /// Sensor as `name:TYPE`, repeatable or comma separated
    #[arg(long = "sensor", value_delimiter = ',', default_value = "s_0:INT32,s_1:DOUBLE")]
    pub sensors: Vec<String>,

    /// Tag as `key=value`, repeatable; order is kept
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
}

impl DeviceArgs {
    pub fn schemas(&self) -> Result<Vec<DeviceSchema>> {
        let sensors = self
            .sensors
            .iter()
            .map(|sensor| parse_sensor(sensor))
            .collect::<Result<Vec<_>>>()?;
        if sensors.is_empty() {
            bail!("At least one sensor is required");
        }

        Ok(self
            .devices
            .iter()
            .map(|device| {
                self.tags.iter().fold(
                    DeviceSchema::new(&self.group, device, sensors.clone()),
                    |schema, (key, value)| schema.with_tag(key, value),
                )
            })
            .collect())
    }
}

fn parse_sensor(flag: &str) -> Result<Sensor> {
    let (name, sensor_type) = flag
        .split_once(':')
        .with_context(|| format!("Sensor `{}` is not `name:TYPE`", flag))?;
    let sensor_type: SensorType = sensor_type.parse()?;
    Ok(Sensor::new(name.trim(), sensor_type))
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("tag `{}` is not `key=value`", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeviceArgs {
        DeviceArgs {
            group: "g1".into(),
            devices: vec!["d1".into(), "d2".into()],
            sensors: vec!["s0:INT32".into(), "s1:text".into()],
            tags: vec![("region".into(), "cn".into()), ("site".into(), "a".into())],
        }
    }

    #[test]
    fn test_schemas_keep_tag_order() {
        let schemas = args().schemas().unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[1].device, "d2");
        assert_eq!(schemas[0].tag_values().collect::<Vec<_>>(), vec!["cn", "a"]);
        assert_eq!(schemas[0].sensors[1].sensor_type, SensorType::Text);
    }

    #[test]
    fn test_sensor_without_type() {
        let mut args = args();
        args.sensors = vec!["s0".into()];
        assert!(args.schemas().is_err());
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("region = cn").unwrap(), ("region".into(), "cn".into()));
        assert!(parse_tag("region").is_err());
    }
}
