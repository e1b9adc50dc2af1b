//! Adapter over the REST transport, against a local HTTP server standing in
//! for the database's `/rest/v2` endpoints.

mod common;

use common::{device, int_double};
use hyper::header::AUTHORIZATION;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use serde_json::json;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tsbench_iotdb::config::{DebugSampling, RestConfig};
use tsbench_iotdb::{Adapter, AdapterConfig, AdapterError, Backends, Database, TransportKind};
use tsbench_shared::{
    AggValueQuery, Batch, DeviceQuery, PreciseQuery, RangeQuery, Record, VerificationQuery,
};

const SUCCESS: &str = r#"{"code":200,"message":"SUCCESS_STATUS"}"#;

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: Option<String>,
    body: serde_json::Value,
}

/// Records every request and answers from a queue of canned replies,
/// falling back to a success envelope
#[derive(Clone, Default)]
struct MockRest {
    requests: Arc<Mutex<Vec<Recorded>>>,
    replies: Arc<Mutex<VecDeque<(u16, String)>>>,
}

impl MockRest {
    fn reply(&self, status: u16, body: serde_json::Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back((status, body.to_string()));
    }

    fn reply_raw(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back((status, body.to_string()));
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn sql_bodies(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.body["sql"].as_str().map(str::to_string))
            .collect()
    }
}

async fn handle(req: Request<Body>, mock: MockRest) -> Result<Response<Body>, hyper::Error> {
    let path = req.uri().path().to_string();
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = hyper::body::to_bytes(req.into_body()).await?;
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    mock.requests.lock().unwrap().push(Recorded {
        path,
        authorization,
        body,
    });

    let (status, reply) = mock
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, SUCCESS.to_string()));
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(reply))
        .unwrap())
}

/// Serve the mock on an ephemeral port
fn serve(mock: MockRest) -> SocketAddr {
    let make_svc = make_service_fn(move |_| {
        let mock = mock.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                handle(req, mock.clone())
            }))
        }
    });
    let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

fn rest_adapter(mock: &MockRest, tweak: impl FnOnce(&mut AdapterConfig)) -> Adapter {
    let addr = serve(mock.clone());
    let mut config = AdapterConfig {
        transport: TransportKind::Rest,
        hosts: vec!["127.0.0.1".into()],
        rest: RestConfig {
            port: addr.port(),
            ..RestConfig::default()
        },
        ..AdapterConfig::default()
    };
    tweak(&mut config);
    Adapter::new(config, Backends::default()).unwrap()
}

fn batch() -> Batch {
    Batch::new(
        device("d1"),
        vec![
            Record::new(1, int_double(7, Some(0.5))),
            Record::new(2, int_double(8, None)),
        ],
    )
}

#[tokio::test]
async fn insert_posts_column_major_tablet() {
    let mock = MockRest::default();
    let mut db = rest_adapter(&mock, |_| {});
    db.init().await.unwrap();

    let status = db.insert_batch(&batch()).await;
    assert!(status.success, "{}", status);
    assert_eq!(status.points, 3);

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/rest/v2/insertTablet");
    assert_eq!(requests[0].authorization.as_deref(), Some("Basic cm9vdDpyb290"));
    assert_eq!(
        requests[0].body,
        json!({
            "device": "root.g1.cn.d1",
            "is_aligned": true,
            "measurements": ["s0", "s1"],
            "data_types": ["INT32", "DOUBLE"],
            "timestamps": [1, 2],
            "values": [[7, 8], [0.5, null]],
        })
    );
}

#[tokio::test]
async fn insert_checks_response_envelope() {
    let mock = MockRest::default();
    mock.reply(200, json!({"code": 606, "message": "measurement not found"}));
    let mut db = rest_adapter(&mock, |_| {});

    let status = db.insert_batch(&batch()).await;
    assert!(!status.success);
    assert_eq!(status.query.as_deref(), Some("root.g1.cn.d1"));
    assert!(status
        .error
        .unwrap()
        .to_string()
        .contains("measurement not found"));
}

#[tokio::test]
async fn query_counts_timestamps() {
    let mock = MockRest::default();
    mock.reply(
        200,
        json!({
            "expressions": ["root.g1.cn.d1.s0", "root.g1.cn.d1.s1"],
            "column_names": null,
            "timestamps": [1, 2, 3],
            "values": [[1, 2, 3], [0.5, null, 1.5]],
        }),
    );
    let mut db = rest_adapter(&mock, |c| c.comparison = true);

    let status = db
        .range_query(&RangeQuery {
            devices: vec![device("d1")],
            start: 1,
            end: 3,
        })
        .await;
    assert!(status.success);
    assert_eq!(status.points, 3);
    assert!(status.rows.is_none(), "rows are never captured over REST");

    let requests = mock.requests();
    assert_eq!(requests[0].path, "/rest/v2/query");
    assert_eq!(
        requests[0].body,
        json!({"sql": "SELECT s0, s1 FROM root.g1.cn.d1 WHERE time >= 1 AND time <= 3"})
    );
}

#[tokio::test]
async fn aggregate_without_timestamps_counts_one() {
    let mock = MockRest::default();
    mock.reply(
        200,
        json!({
            "expressions": ["max_value(root.g1.cn.d1.s0)", "max_value(root.g1.cn.d1.s1)"],
            "timestamps": null,
            "values": [[8], [0.5]],
        }),
    );
    let mut db = rest_adapter(&mock, |_| {});

    let status = db
        .agg_value_query(&AggValueQuery {
            devices: vec![device("d1")],
            agg_fun: "MAX_VALUE".into(),
            value_threshold: 0.0,
        })
        .await;
    assert!(status.success);
    assert_eq!(status.points, 1);

    mock.reply(200, json!({"timestamps": null}));
    let status = db
        .latest_point_query(&tsbench_shared::LatestPointQuery {
            devices: vec![device("d1")],
        })
        .await;
    assert!(status.success);
    assert_eq!(status.points, 1);
    assert!(status.rows.is_none());
}

#[tokio::test]
async fn queries_are_never_debug_sampled() {
    let mock = MockRest::default();
    let mut db = rest_adapter(&mock, |c| {
        c.debug_sampling = DebugSampling {
            enabled: true,
            ratio: 1.0,
        }
    });
    assert!(!db.capabilities().debug_sampling);

    for ts in 0..5 {
        mock.reply(200, json!({"timestamps": [ts], "values": [[1], [2]]}));
        db.precise_query(&PreciseQuery {
            devices: vec![device("d1")],
            timestamp: ts,
        })
        .await;
    }
    let sql = mock.sql_bodies();
    assert_eq!(sql.len(), 5);
    assert!(sql.iter().all(|q| q.starts_with("SELECT ")));
}

#[tokio::test]
async fn failed_query_statuses() {
    let mock = MockRest::default();
    mock.reply(500, json!({"code": 701, "message": "syntax error"}));
    mock.reply_raw(200, "<html>proxy error</html>");
    mock.reply(200, json!({"code": 305, "message": "database not exist"}));
    let mut db = rest_adapter(&mock, |_| {});
    let query = PreciseQuery {
        devices: vec![device("d1")],
        timestamp: 1,
    };

    let status = db.precise_query(&query).await;
    assert!(!status.success);
    assert!(status.error.unwrap().to_string().contains("syntax error"));

    let status = db.precise_query(&query).await;
    assert!(matches!(status.error, Some(AdapterError::MalformedResponse { .. })));
    assert_eq!(
        status.query.as_deref(),
        Some("SELECT s0, s1 FROM root.g1.cn.d1 WHERE time = 1")
    );

    let status = db.precise_query(&query).await;
    assert!(matches!(status.error, Some(AdapterError::Execution { .. })));
}

#[tokio::test]
async fn registration_runs_non_queries() {
    let mock = MockRest::default();
    mock.reply(200, json!({"code": 300, "message": "root.g1 already exists"}));
    let mut db = rest_adapter(&mock, |_| {});

    db.register_schema(&[device("d1")]).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.path == "/rest/v2/nonQuery"));
    assert_eq!(requests[0].body["sql"], "CREATE DATABASE root.g1");
}

#[tokio::test]
async fn registration_stops_on_other_failures() {
    let mock = MockRest::default();
    mock.reply(400, json!({"code": 701, "message": "bad encoding"}));
    let mut db = rest_adapter(&mock, |_| {});

    let err = db.register_schema(&[device("d1")]).await.unwrap_err();
    assert!(matches!(err, AdapterError::Registration(_)));
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn non_envelope_replies_fail_registration_and_cleanup() {
    let mock = MockRest::default();
    mock.reply_raw(200, "<html>proxy error</html>");
    mock.reply_raw(200, "<html>proxy error</html>");
    let mut db = rest_adapter(&mock, |_| {});

    match db.register_schema(&[device("d1")]).await.unwrap_err() {
        AdapterError::Registration(inner) => {
            assert!(matches!(*inner, AdapterError::MalformedResponse { .. }))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(mock.requests().len(), 1);

    let err = db.cleanup().await.unwrap_err();
    match err {
        AdapterError::MalformedResponse { text, .. } => assert_eq!(text, "DELETE DATABASE root.**"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn cleanup_deletes_every_database() {
    let mock = MockRest::default();
    mock.reply(200, json!({"code": 508, "message": "path does not exist"}));
    let mut db = rest_adapter(&mock, |_| {});

    db.cleanup().await.unwrap();
    assert_eq!(mock.sql_bodies(), vec!["DELETE DATABASE root.**".to_string()]);
}

#[tokio::test]
async fn verification_and_summary_decode_rows() {
    let mock = MockRest::default();
    mock.reply(
        200,
        json!({"timestamps": [1, 2], "values": [[7, 8], [0.5, null]]}),
    );
    mock.reply(200, json!({"timestamps": null, "values": [[2]]}));
    mock.reply(200, json!({"timestamps": [1], "values": [[7], [0.5]]}));
    mock.reply(200, json!({"timestamps": [2], "values": [[8], [null]]}));
    let mut db = rest_adapter(&mock, |_| {});

    let status = db
        .verification_query(&VerificationQuery {
            device: device("d1"),
            records: batch().records,
        })
        .await;
    assert!(status.success);
    assert_eq!(status.points, 3);

    let summary = db
        .device_summary(&DeviceQuery {
            device: device("d1"),
            start: 0,
            end: 10,
        })
        .await
        .unwrap();
    assert_eq!(summary.total_line_number, 2);
    assert_eq!(summary.min_timestamp, 1);
    assert_eq!(summary.max_timestamp, 2);
}

#[tokio::test]
async fn unreachable_server_is_a_connection_failure() {
    let config = AdapterConfig {
        transport: TransportKind::Rest,
        rest: RestConfig {
            port: 1,
            timeout_secs: 2,
            ..RestConfig::default()
        },
        ..AdapterConfig::default()
    };
    let mut db = Adapter::new(config, Backends::default()).unwrap();

    let status = db
        .precise_query(&PreciseQuery {
            devices: vec![device("d1")],
            timestamp: 1,
        })
        .await;
    assert!(!status.success);
    assert!(matches!(status.error, Some(AdapterError::Connection(_))));
}
