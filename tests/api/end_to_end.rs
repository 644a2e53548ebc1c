//! tests/api/end_to_end.rs
use crate::helpers::{make_input_store, read_output, spawn_cluster, test_data_dir};
use claims::assert_matches;
use mapred::job::JobError;
use mapred::master::Work;
use mapred::splitter::SplitError;
use mapred::store::Pair;

#[tokio::test]
async fn one_worker_counts_words_across_a_single_map_and_reduce_task() {
    let cluster = spawn_cluster(1).await;
    let input = make_input_store(&test_data_dir(), "book.db", &[("_", "hello hello world")]);

    let report = cluster
        .master
        .driver(1, 1)
        .run(&input)
        .await
        .expect("job failed");

    assert_eq!(
        read_output(&report.output_path),
        vec![Pair::new("hello", "2"), Pair::new("world", "1")]
    );
    let master = cluster.join_workers().await;
    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn keys_split_across_two_reducers_still_cover_every_word_exactly_once() {
    let cluster = spawn_cluster(1).await;
    let input = make_input_store(
        &test_data_dir(),
        "letters.db",
        &[("_", "a"), ("_", "b"), ("_", "a")],
    );

    let report = cluster
        .master
        .driver(3, 2)
        .run(&input)
        .await
        .expect("job failed");

    // Whichever reducer each key hashes to, the merged set is the same.
    assert_eq!(
        read_output(&report.output_path),
        vec![Pair::new("a", "2"), Pair::new("b", "1")]
    );
    let master = cluster.join_workers().await;
    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn ten_rows_over_four_mappers_sum_into_one_total() {
    let cluster = spawn_cluster(1).await;
    let rows: Vec<(&str, &str)> = (0..10).map(|_| ("_", "x")).collect();
    let input = make_input_store(&test_data_dir(), "xs.db", &rows);

    let report = cluster
        .master
        .driver(4, 1)
        .run(&input)
        .await
        .expect("job failed");

    assert_eq!(read_output(&report.output_path), vec![Pair::new("x", "10")]);
    let master = cluster.join_workers().await;
    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn two_workers_split_the_tasks_and_match_the_single_worker_output() {
    // Reference run on a lone worker.
    let rows: &[(&str, &str)] = &[
        ("_", "the quick brown fox"),
        ("_", "jumps over the lazy dog"),
        ("_", "the fox again"),
        ("_", "dog days"),
    ];
    let reference_cluster = spawn_cluster(1).await;
    let reference_input = make_input_store(&test_data_dir(), "corpus.db", rows);
    let reference = reference_cluster
        .master
        .driver(4, 2)
        .run(&reference_input)
        .await
        .expect("reference job failed");
    let expected = read_output(&reference.output_path);
    reference_cluster
        .join_workers()
        .await
        .stop()
        .await
        .expect("Failed to stop reference master");

    // Same job across two workers started before any task is installed.
    let cluster = spawn_cluster(2).await;
    let input = make_input_store(&test_data_dir(), "corpus.db", rows);
    let report = cluster
        .master
        .driver(4, 2)
        .run(&input)
        .await
        .expect("job failed");

    assert_eq!(report.mappers.len(), 4);
    for address in report.mappers.iter().chain(report.reducers.iter()) {
        assert!(!address.is_empty());
        assert!(
            cluster.worker_addresses.contains(address),
            "task ran on unknown worker {address}"
        );
    }
    assert_eq!(read_output(&report.output_path), expected);

    let master = cluster.join_workers().await;
    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn shutdown_is_idempotent_and_turns_away_late_workers() {
    let cluster = spawn_cluster(1).await;
    let input = make_input_store(&test_data_dir(), "tiny.db", &[("_", "word")]);
    cluster
        .master
        .driver(1, 1)
        .run(&input)
        .await
        .expect("job failed");
    let master = cluster.join_workers().await;

    // The driver already shut the master down once; twice more must hold.
    master.handle().shutdown().await.expect("shutdown failed");
    master.handle().shutdown().await.expect("shutdown failed");

    let response = master
        .handle()
        .get_work("10.0.0.9:4321".into())
        .await
        .expect("get_work failed");
    assert_eq!(response.work, Work::None);
    assert!(response.shutdown);

    master.stop().await.expect("Failed to stop master");
}

#[tokio::test]
async fn a_job_with_fewer_rows_than_map_tasks_fails_at_submission() {
    let cluster = spawn_cluster(1).await;
    let input = make_input_store(&test_data_dir(), "short.db", &[("_", "a"), ("_", "b")]);

    let result = cluster.master.driver(5, 1).run(&input).await;

    assert_matches!(
        result,
        Err(JobError::Split(SplitError::InsufficientRows { rows: 2, shards: 5 }))
    );

    // No tasks were installed; release the idle worker and wind down.
    cluster
        .master
        .handle()
        .shutdown()
        .await
        .expect("shutdown failed");
    let master = cluster.join_workers().await;
    master.stop().await.expect("Failed to stop master");
}
