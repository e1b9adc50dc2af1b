//! Canonical entity paths
//!
//! The tree convention addresses a device as
//! `root[.<database>].<group>.<tag values...>.<device>`. Tag keys never appear
//! in a path, and tag values keep the schema's declaration order because the
//! order is part of the path identity. The table convention drops the
//! synthetic `root[.<database>]` prefix; table and column layout are decided
//! by the table model strategy.

use crate::config::DataModel;
use tsbench_shared::DeviceSchema;

const ROOT: &str = "root";

/// Derives fully-qualified device paths under one naming convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNaming {
    convention: DataModel,
    root: String,
}

impl PathNaming {
    pub fn new(convention: DataModel, database: Option<&str>) -> Self {
        let root = match database.filter(|db| !db.is_empty()) {
            Some(db) => format!("{}.{}", ROOT, db),
            None => ROOT.to_string(),
        };
        Self { convention, root }
    }

    /// Path prefix of every tree series, `root` or `root.<database>`
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Fully-qualified path of a device under this convention
    pub fn path(&self, schema: &DeviceSchema) -> String {
        match self.convention {
            DataModel::Tree => format!("{}.{}", self.root, relative_path(schema)),
            DataModel::Table => relative_path(schema),
        }
    }

    /// Path of the group a device belongs to, e.g. `root.g1`
    pub fn group_path(&self, schema: &DeviceSchema) -> String {
        match self.convention {
            DataModel::Tree => format!("{}.{}", self.root, schema.group),
            DataModel::Table => schema.group.clone(),
        }
    }

    /// Path of one sensor of a device, e.g. `root.g1.d1.s0`
    pub fn sensor_path(&self, schema: &DeviceSchema, sensor: &str) -> String {
        format!("{}.{}", self.path(schema), sensor)
    }
}

/// `<group>.<tag values...>.<device>`
fn relative_path(schema: &DeviceSchema) -> String {
    let mut path = String::with_capacity(64);
    path.push_str(&schema.group);
    for value in schema.tag_values() {
        path.push('.');
        path.push_str(value);
    }
    path.push('.');
    path.push_str(&schema.device);
    path
}
