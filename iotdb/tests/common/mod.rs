//! In-memory transports for adapter integration tests.
//!
//! Sessions and connections share one [`FakeState`], so a test can inspect
//! every statement, query and insert that reached the "server", script the
//! rows a query returns, and make statements fail on demand.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tsbench_iotdb::tablet::{ColumnCategory, DeviceRecords, Tablet};
use tsbench_iotdb::transport::{
    RowCursor, SessionClient, SessionFactory, SessionSettings, SqlConnection, SqlDriver, VecCursor,
};
use tsbench_iotdb::TransportError;
use tsbench_shared::{DeviceSchema, Row, Sensor, SensorType, Value};

/// Statement rejection rule: any text containing `pattern` fails with
/// `code`/`message`.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub pattern: String,
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub settings: Vec<SessionSettings>,
    pub urls: Vec<String>,
    pub opened: usize,
    pub closed: usize,
    pub fail_open: bool,
    /// DDL and other non-query statements, in execution order
    pub statements: Vec<String>,
    /// Query text exactly as received
    pub queries: Vec<String>,
    pub tablets: Vec<Tablet>,
    pub relational_tablets: Vec<Tablet>,
    pub record_calls: usize,
    pub insert_batches: Vec<Vec<String>>,
    /// Stored rows by timestamp
    pub rows: BTreeMap<i64, Row>,
    /// Rows returned by the next queries, ahead of stored rows
    pub scripted: VecDeque<Vec<Row>>,
    pub rejections: Vec<Rejection>,
}

impl FakeState {
    fn check(&self, text: &str) -> Result<(), TransportError> {
        match self.rejections.iter().find(|r| text.contains(&r.pattern)) {
            Some(r) => Err(TransportError::Statement {
                code: r.code,
                message: r.message.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Scripted rows first; otherwise stored rows, filtered by any
    /// `time = N` predicates in the query.
    fn answer(&mut self, sql: &str) -> Vec<Row> {
        if let Some(rows) = self.scripted.pop_front() {
            return rows;
        }
        let stamps: Vec<i64> = sql
            .split("time = ")
            .skip(1)
            .filter_map(|rest| {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .collect();
        self.rows
            .values()
            .filter(|row| stamps.is_empty() || stamps.contains(&row.timestamp))
            .cloned()
            .collect()
    }

    fn store_tablet(&mut self, tablet: &Tablet) {
        for (i, timestamp) in tablet.timestamps.iter().enumerate() {
            let fields = tablet
                .columns
                .iter()
                .zip(&tablet.values)
                .filter(|(c, _)| c.category == ColumnCategory::Field)
                .map(|(_, column)| column[i].clone())
                .collect();
            self.rows.insert(*timestamp, Row::new(*timestamp, fields));
        }
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub fn shared() -> Shared {
    Arc::new(Mutex::new(FakeState::default()))
}

pub fn reject(state: &Shared, pattern: &str, code: i32, message: &str) {
    state.lock().unwrap().rejections.push(Rejection {
        pattern: pattern.to_string(),
        code,
        message: message.to_string(),
    });
}

pub struct FakeSessionFactory {
    pub state: Shared,
}

impl SessionFactory for FakeSessionFactory {
    fn create(&self, settings: &SessionSettings) -> Box<dyn SessionClient> {
        self.state.lock().unwrap().settings.push(settings.clone());
        Box::new(FakeSession {
            state: self.state.clone(),
            open: false,
        })
    }
}

pub struct FakeSession {
    state: Shared,
    open: bool,
}

impl FakeSession {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.open {
            Ok(())
        } else {
            Err(TransportError::NotOpen)
        }
    }
}

#[async_trait]
impl SessionClient for FakeSession {
    async fn open(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(TransportError::Connection("connection refused".into()));
        }
        state.opened += 1;
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.state.lock().unwrap().closed += 1;
        self.open = false;
        Ok(())
    }

    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn RowCursor>, TransportError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        state.queries.push(sql.to_string());
        state.check(sql)?;
        let rows = state.answer(sql);
        Ok(Box::new(VecCursor::new(rows)))
    }

    async fn execute_statement(&mut self, sql: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        state.check(sql)
    }

    async fn insert_tablet(&mut self, tablet: &Tablet) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        state.check(&tablet.target)?;
        state.store_tablet(tablet);
        state.tablets.push(tablet.clone());
        Ok(())
    }

    async fn insert_relational_tablet(&mut self, tablet: &Tablet) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        state.check(&tablet.target)?;
        state.store_tablet(tablet);
        state.relational_tablets.push(tablet.clone());
        Ok(())
    }

    async fn insert_records(&mut self, records: DeviceRecords<'_>) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        state.check(records.device)?;
        state.record_calls += 1;
        for record in records.records {
            state
                .rows
                .insert(record.timestamp, Row::new(record.timestamp, record.values.clone()));
        }
        Ok(())
    }
}

pub struct FakeDriver {
    pub state: Shared,
}

#[async_trait]
impl SqlDriver for FakeDriver {
    async fn connect(
        &self,
        url: &str,
        _username: &str,
        _password: &str,
    ) -> Result<Box<dyn SqlConnection>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(TransportError::Connection("connection refused".into()));
        }
        state.urls.push(url.to_string());
        state.opened += 1;
        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
        }))
    }
}

pub struct FakeConnection {
    state: Shared,
}

#[async_trait]
impl SqlConnection for FakeConnection {
    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn RowCursor>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(sql.to_string());
        state.check(sql)?;
        let rows = state.answer(sql);
        Ok(Box::new(VecCursor::new(rows)))
    }

    async fn execute_update(&mut self, sql: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        state.check(sql)
    }

    async fn execute_batch(&mut self, statements: &[String]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        for sql in statements {
            state.check(sql)?;
        }
        state.insert_batches.push(statements.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// `g1` / `region=cn` / `s0: INT32, s1: DOUBLE`
pub fn device(id: &str) -> DeviceSchema {
    DeviceSchema::new(
        "g1",
        id,
        vec![
            Sensor::new("s0", SensorType::Int32),
            Sensor::new("s1", SensorType::Double),
        ],
    )
    .with_tag("region", "cn")
}

pub fn int_double(a: i32, b: Option<f64>) -> Vec<Option<Value>> {
    vec![Some(Value::Int32(a)), b.map(Value::Double)]
}
