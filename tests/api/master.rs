//! tests/api/master.rs
use crate::helpers::test_settings;
use claims::{assert_err, assert_matches, assert_none, assert_some_eq};
use mapred::master::{CoordinationError, MapTask, Work};
use mapred::startup::MasterNode;
use mapred::worker::connect_master;
use tarpc::context;

fn map_tasks(count: usize, source_host: &str) -> Vec<MapTask> {
    (0..count)
        .map(|n| MapTask {
            m: count,
            r: 1,
            n,
            source_host: source_host.to_string(),
        })
        .collect()
}

#[tokio::test]
async fn ping_round_trips_through_the_rpc_server() {
    let master = MasterNode::build(&test_settings(), 0)
        .await
        .expect("Failed to build master");
    let client = connect_master(&master.rpc_address)
        .await
        .expect("Failed to connect");

    let message = client
        .ping(context::current(), "127.0.0.1:5000".into())
        .await
        .expect("rpc transport failed")
        .expect("ping failed");

    assert_eq!(message, "ping successful");
    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn get_work_assigns_map_tasks_in_order_and_completion_reports_addresses() {
    let master = MasterNode::build(&test_settings(), 0)
        .await
        .expect("Failed to build master");
    let client = connect_master(&master.rpc_address)
        .await
        .expect("Failed to connect");

    master
        .handle()
        .execute_map_tasks(map_tasks(2, &master.data_address))
        .await
        .expect("Failed to install map tasks");

    let first = client
        .get_work(context::current(), "w1".into())
        .await
        .expect("rpc transport failed")
        .expect("get_work failed");
    let second = client
        .get_work(context::current(), "w2".into())
        .await
        .expect("rpc transport failed")
        .expect("get_work failed");
    let third = client
        .get_work(context::current(), "w3".into())
        .await
        .expect("rpc transport failed")
        .expect("get_work failed");

    match (first.work, second.work) {
        (Work::Map(a), Work::Map(b)) => {
            assert_eq!(a.n, 0);
            assert_eq!(b.n, 1);
        }
        other => panic!("expected two map assignments, got {other:?}"),
    }
    assert_eq!(third.work, Work::None);
    assert!(!third.shutdown);

    assert_none!(master
        .handle()
        .map_tasks_finished()
        .await
        .expect("poll failed"));

    for worker in ["w1", "w2"] {
        client
            .finished_work(context::current(), worker.into())
            .await
            .expect("rpc transport failed")
            .expect("finished_work failed");
    }
    assert_some_eq!(
        master
            .handle()
            .map_tasks_finished()
            .await
            .expect("poll failed"),
        vec!["w1".to_string(), "w2".to_string()]
    );

    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn an_empty_worker_address_is_refused_as_malformed() {
    let master = MasterNode::build(&test_settings(), 0)
        .await
        .expect("Failed to build master");
    let client = connect_master(&master.rpc_address)
        .await
        .expect("Failed to connect");

    let result = client
        .get_work(context::current(), "".into())
        .await
        .expect("rpc transport failed");

    let error = assert_err!(result);
    assert_matches!(error, CoordinationError::BadRequest(_));

    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn shutdown_reaches_workers_through_get_work() {
    let master = MasterNode::build(&test_settings(), 0)
        .await
        .expect("Failed to build master");
    let client = connect_master(&master.rpc_address)
        .await
        .expect("Failed to connect");

    master.handle().shutdown().await.expect("shutdown failed");

    let response = client
        .get_work(context::current(), "w1".into())
        .await
        .expect("rpc transport failed")
        .expect("get_work failed");
    assert_eq!(response.work, Work::None);
    assert!(response.shutdown);

    master.stop().await.expect("Failed to stop master");
}
