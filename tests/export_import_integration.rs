//! End-to-end export/import tests against in-memory SQLite stores.

use chrono::NaiveDate;
use std::collections::HashSet;

use visitport::export::export;
use visitport::import::import;
use visitport::models::{Action, ActionLinkRow, ConversionRow, VisitRow};
use visitport::snapshot::Snapshot;
use visitport::store::{SqliteStore, VisitStore};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn memory_store() -> SqliteStore {
    let store = SqliteStore::new("sqlite::memory:", "").await.unwrap();
    store.init().await.unwrap();
    store
}

fn visit_row(idvisit: i64, idvisitor: Vec<u8>, first_action_time: &str) -> VisitRow {
    VisitRow {
        idvisit,
        idsite: 1,
        idvisitor,
        visit_first_action_time: first_action_time.to_string(),
        visit_last_action_time: first_action_time.to_string(),
        config_id: vec![0x01, 0x02, 0x03, 0x04],
        location_ip: vec![127, 0, 0, 1],
        visit_total_actions: 1,
        visit_total_time: 60,
    }
}

fn action(idaction: i64) -> Action {
    Action {
        idaction,
        name: Some(format!("page/{idaction}")),
        hash: idaction * 31,
        action_type: 1,
        url_prefix: None,
    }
}

fn link_row(idlink_va: i64, idvisit: i64, idaction_name: Option<i64>) -> ActionLinkRow {
    ActionLinkRow {
        idlink_va,
        idsite: 1,
        idvisitor: vec![0xab, 0xcd],
        idvisit,
        server_time: "2015-12-20 10:01:00".to_string(),
        idaction_url_ref: None,
        idaction_name_ref: None,
        idaction_name,
        idaction_url: None,
        time_spent_ref_action: 0,
    }
}

fn conversion_row(idvisit: i64, server_time: &str) -> ConversionRow {
    ConversionRow {
        idvisit,
        idsite: 1,
        idvisitor: vec![0xab, 0xcd],
        server_time: server_time.to_string(),
        idgoal: 1,
        url: Some("https://example.com/thanks".to_string()),
        revenue: Some(9.99),
    }
}

#[tokio::test]
async fn empty_window_exports_empty_snapshot() {
    let store = memory_store().await;
    store
        .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
        .await
        .unwrap();

    let snapshot = export(&store, date("2016-01-01"), date("2016-01-02"), 500)
        .await
        .unwrap();

    assert!(snapshot.is_empty());
    let counts = snapshot.counts();
    assert_eq!(counts.visits, 0);
    assert_eq!(counts.actions, 0);
    assert_eq!(counts.action_links, 0);
    assert_eq!(counts.conversions, 0);
}

#[tokio::test]
async fn single_visit_round_trips_through_snapshot() {
    let source = memory_store().await;
    source
        .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
        .await
        .unwrap();
    source.replace_action(&action(10)).await.unwrap();
    source
        .replace_action_link(&link_row(100, 1, Some(10)))
        .await
        .unwrap();

    let snapshot = export(&source, date("2015-12-20"), date("2015-12-20"), 500)
        .await
        .unwrap();

    assert_eq!(snapshot.log_visit.len(), 1);
    assert_eq!(snapshot.log_visit[0].idvisitor, "abcd");
    assert_eq!(snapshot.log_visit[0].location_ip, "7f000001");
    assert_eq!(snapshot.log_action.len(), 1);
    assert_eq!(snapshot.log_action[0].idaction, 10);
    assert_eq!(snapshot.log_link_visit_action.len(), 1);
    assert_eq!(snapshot.log_link_visit_action[0].idaction_name, Some(10));
    assert!(snapshot.log_conversion.is_empty());

    let target = memory_store().await;
    let result = import(&target, &snapshot).await.unwrap();
    assert_eq!(result.visits, 1);
    assert_eq!(result.actions, 1);
    assert_eq!(result.action_links, 1);
    assert_eq!(result.conversions, 0);

    let visits = target
        .visits_between("2015-12-20 00:00:00", "2015-12-20 23:59:59")
        .await
        .unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].idvisitor, vec![0xab, 0xcd]);
    assert_eq!(visits[0].location_ip, vec![127, 0, 0, 1]);

    let links = target.links_for_visits(&[1]).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].idaction_name, Some(10));

    let actions = target.actions_by_ids(&[10]).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0], action(10));
}

#[tokio::test]
async fn export_day_bounds_are_inclusive() {
    let store = memory_store().await;
    store
        .replace_visit(&visit_row(1, vec![0x01], "2015-12-20 00:00:00"))
        .await
        .unwrap();
    store
        .replace_visit(&visit_row(2, vec![0x02], "2015-12-20 23:59:59"))
        .await
        .unwrap();
    store
        .replace_visit(&visit_row(3, vec![0x03], "2015-12-21 00:00:00"))
        .await
        .unwrap();

    let snapshot = export(&store, date("2015-12-20"), date("2015-12-20"), 500)
        .await
        .unwrap();

    let ids: Vec<i64> = snapshot.log_visit.iter().map(|v| v.idvisit).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn chunked_action_fetch_retrieves_every_referenced_action() {
    let store = memory_store().await;
    store
        .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
        .await
        .unwrap();
    for idaction in 1..=7 {
        store.replace_action(&action(idaction)).await.unwrap();
        store
            .replace_action_link(&link_row(100 + idaction, 1, Some(idaction)))
            .await
            .unwrap();
    }

    // Chunk size 3 forces three queries (3 + 3 + 1).
    let snapshot = export(&store, date("2015-12-20"), date("2015-12-20"), 3)
        .await
        .unwrap();

    let fetched: HashSet<i64> = snapshot.log_action.iter().map(|a| a.idaction).collect();
    assert_eq!(fetched, (1..=7).collect::<HashSet<i64>>());
}

#[tokio::test]
async fn snapshot_is_referentially_complete() {
    let store = memory_store().await;
    for idvisit in 1..=3 {
        store
            .replace_visit(&visit_row(
                idvisit,
                vec![idvisit as u8],
                "2015-12-20 12:00:00",
            ))
            .await
            .unwrap();
        store
            .replace_conversion(&conversion_row(idvisit, "2015-12-20 12:30:00"))
            .await
            .unwrap();
    }
    store.replace_action(&action(10)).await.unwrap();
    store.replace_action(&action(20)).await.unwrap();
    store
        .replace_action_link(&link_row(100, 1, Some(10)))
        .await
        .unwrap();
    store
        .replace_action_link(&link_row(101, 3, Some(20)))
        .await
        .unwrap();

    let snapshot = export(&store, date("2015-12-20"), date("2015-12-20"), 500)
        .await
        .unwrap();

    let visit_ids: HashSet<i64> = snapshot.log_visit.iter().map(|v| v.idvisit).collect();
    let action_ids: HashSet<i64> = snapshot.log_action.iter().map(|a| a.idaction).collect();

    for link in &snapshot.log_link_visit_action {
        assert!(visit_ids.contains(&link.idvisit));
        for reference in link.action_refs().into_iter().flatten() {
            assert!(action_ids.contains(&reference));
        }
    }
    for conversion in &snapshot.log_conversion {
        assert!(visit_ids.contains(&conversion.idvisit));
    }
}

#[tokio::test]
async fn reimport_leaves_row_counts_unchanged() {
    let source = memory_store().await;
    source
        .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
        .await
        .unwrap();
    source.replace_action(&action(10)).await.unwrap();
    source
        .replace_action_link(&link_row(100, 1, Some(10)))
        .await
        .unwrap();
    source
        .replace_conversion(&conversion_row(1, "2015-12-20 10:02:00"))
        .await
        .unwrap();

    let snapshot = export(&source, date("2015-12-20"), date("2015-12-20"), 500)
        .await
        .unwrap();

    let target = memory_store().await;
    let first = import(&target, &snapshot).await.unwrap();
    let second = import(&target, &snapshot).await.unwrap();
    assert_eq!(first, second);

    let visits = target
        .visits_between("2015-12-20 00:00:00", "2015-12-20 23:59:59")
        .await
        .unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(target.links_for_visits(&[1]).await.unwrap().len(), 1);
    assert_eq!(target.actions_by_ids(&[10]).await.unwrap().len(), 1);
    assert_eq!(target.conversions_for_visits(&[1]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn import_overwrites_rows_with_the_same_identity() {
    let snapshot = {
        let source = memory_store().await;
        source
            .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
            .await
            .unwrap();
        export(&source, date("2015-12-20"), date("2015-12-20"), 500)
            .await
            .unwrap()
    };

    let target = memory_store().await;
    target
        .replace_visit(&visit_row(1, vec![0xff, 0xff], "2015-12-20 09:00:00"))
        .await
        .unwrap();

    import(&target, &snapshot).await.unwrap();

    let visits = target
        .visits_between("2015-12-20 00:00:00", "2015-12-20 23:59:59")
        .await
        .unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].idvisitor, vec![0xab, 0xcd]);
    assert_eq!(visits[0].visit_first_action_time, "2015-12-20 10:00:00");
}

#[tokio::test]
async fn snapshot_survives_a_file_round_trip() {
    let source = memory_store().await;
    source
        .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
        .await
        .unwrap();
    source.replace_action(&action(10)).await.unwrap();
    source
        .replace_action_link(&link_row(100, 1, Some(10)))
        .await
        .unwrap();

    let snapshot = export(&source, date("2015-12-20"), date("2015-12-20"), 500)
        .await
        .unwrap();

    let path = std::env::temp_dir().join(format!("visitport-test-{}.json", std::process::id()));
    snapshot.save(&path).unwrap();
    let loaded = Snapshot::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, snapshot);
}

#[tokio::test]
async fn table_prefix_is_applied_to_all_tables() {
    let store = SqliteStore::new("sqlite::memory:", "matomo_").await.unwrap();
    store.init().await.unwrap();

    store
        .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
        .await
        .unwrap();
    store.replace_action(&action(10)).await.unwrap();
    store
        .replace_action_link(&link_row(100, 1, Some(10)))
        .await
        .unwrap();
    store
        .replace_conversion(&conversion_row(1, "2015-12-20 10:02:00"))
        .await
        .unwrap();

    let snapshot = export(&store, date("2015-12-20"), date("2015-12-20"), 500)
        .await
        .unwrap();
    let counts = snapshot.counts();
    assert_eq!(counts.visits, 1);
    assert_eq!(counts.actions, 1);
    assert_eq!(counts.action_links, 1);
    assert_eq!(counts.conversions, 1);
}

#[tokio::test]
async fn write_failure_names_table_and_identity() {
    let snapshot = {
        let source = memory_store().await;
        source
            .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
            .await
            .unwrap();
        export(&source, date("2015-12-20"), date("2015-12-20"), 500)
            .await
            .unwrap()
    };

    // No init(): the target has no tables, so the first delete fails.
    let target = SqliteStore::new("sqlite::memory:", "").await.unwrap();
    let err = import(&target, &snapshot).await.unwrap_err();

    match err {
        visitport::error::PorterError::WriteFailure { table, identity, .. } => {
            assert_eq!(table, "log_visit");
            assert_eq!(identity, "1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn earlier_entity_streams_stay_committed_after_a_later_failure() {
    let snapshot = {
        let source = memory_store().await;
        source
            .replace_visit(&visit_row(1, vec![0xab, 0xcd], "2015-12-20 10:00:00"))
            .await
            .unwrap();
        source.replace_action(&action(10)).await.unwrap();
        source
            .replace_action_link(&link_row(100, 1, Some(10)))
            .await
            .unwrap();
        source
            .replace_conversion(&conversion_row(1, "2015-12-20 10:02:00"))
            .await
            .unwrap();
        export(&source, date("2015-12-20"), date("2015-12-20"), 500)
            .await
            .unwrap()
    };

    // File-backed database so a second connection can break one table out
    // from under the importer.
    let path = std::env::temp_dir().join(format!(
        "visitport-write-failure-{}.sqlite",
        std::process::id()
    ));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let target = SqliteStore::new(&url, "").await.unwrap();
    target.init().await.unwrap();

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("DROP TABLE log_conversion")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let err = import(&target, &snapshot).await.unwrap_err();
    match err {
        visitport::error::PorterError::WriteFailure { table, identity, .. } => {
            assert_eq!(table, "log_conversion");
            assert_eq!(identity, "(1, 2015-12-20 10:02:00)");
        }
        other => panic!("unexpected error: {other}"),
    }

    // No rollback: the three earlier streams are still committed.
    let visits = target
        .visits_between("2015-12-20 00:00:00", "2015-12-20 23:59:59")
        .await
        .unwrap();
    assert_eq!(visits.len(), 1);
    assert_eq!(target.actions_by_ids(&[10]).await.unwrap().len(), 1);
    assert_eq!(target.links_for_visits(&[1]).await.unwrap().len(), 1);

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn import_rejects_malformed_hex_before_writing() {
    let mut snapshot = Snapshot::new(vec![], vec![], vec![], vec![]);
    snapshot.log_visit.push(visitport::models::Visit {
        idvisit: 1,
        idsite: 1,
        idvisitor: "xyz".to_string(),
        visit_first_action_time: "2015-12-20 10:00:00".to_string(),
        visit_last_action_time: "2015-12-20 10:00:00".to_string(),
        config_id: "0102".to_string(),
        location_ip: "7f000001".to_string(),
        visit_total_actions: 1,
        visit_total_time: 60,
    });

    let target = memory_store().await;
    let err = import(&target, &snapshot).await.unwrap_err();
    assert!(matches!(
        err,
        visitport::error::PorterError::MalformedEncoding(_)
    ));

    let visits = target
        .visits_between("2015-12-20 00:00:00", "2015-12-20 23:59:59")
        .await
        .unwrap();
    assert!(visits.is_empty());
}
