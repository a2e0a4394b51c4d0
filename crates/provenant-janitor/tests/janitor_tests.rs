//! Integration tests for janitor sweeps against a real SQLite store

use provenant_domain::traits::DocumentStore;
use provenant_domain::{
    Confidence, Document, RelationshipEdge, RelationshipType, SourceEntry, SourceInstance, Tlo,
    TloId, TloKind, Tlp,
};
use provenant_gatekeeper::{ConfigError, Repository};
use provenant_janitor::{Janitor, JanitorConfig, JanitorError, JanitorWorker};
use provenant_store::SqliteStore;
use serde_json::{json, Value};

fn repo() -> Repository<SqliteStore> {
    Repository::new(SqliteStore::in_memory().unwrap())
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

fn legacy(id: TloId, version: u32) -> Document {
    doc(json!({
        "_id": id.to_string(),
        "schema_version": version,
        "source": [{"name": "TSRC", "instances": [{"analyst": "alice", "date": 100}]}],
        "relationships": [],
    }))
}

fn stored_version(repo: &Repository<SqliteStore>, kind: TloKind, id: TloId) -> Value {
    repo.store().find_by_id(kind, &id).unwrap().unwrap()["schema_version"].clone()
}

fn sourced(kind: TloKind) -> Tlo {
    let mut tlo = Tlo::new(kind);
    tlo.add_source(SourceEntry::new(
        "TSRC",
        SourceInstance::new("alice", 100, Tlp::Green),
    ))
    .unwrap();
    tlo
}

#[test]
fn test_sweep_migrates_outdated_documents() {
    let mut repo = repo();
    let ip = TloId::new();
    let indicator = TloId::new();
    repo.store_mut().replace(TloKind::Ip, &legacy(ip, 1)).unwrap();
    repo.store_mut()
        .replace(TloKind::Indicator, &legacy(indicator, 2))
        .unwrap();

    let mut janitor = Janitor::default_config();
    let metrics = janitor.sweep(&mut repo).unwrap();

    assert_eq!(metrics.migrated[&TloKind::Ip], 1);
    assert_eq!(metrics.migrated[&TloKind::Indicator], 1);
    assert!(metrics.failures.is_empty());
    assert_eq!(metrics.sweep_count, 1);

    assert_eq!(stored_version(&repo, TloKind::Ip, ip), json!(3));
    assert_eq!(stored_version(&repo, TloKind::Indicator, indicator), json!(4));

    // Nothing left to do
    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.total_migrated(), 2);
    assert_eq!(metrics.sweep_count, 2);
}

#[test]
fn test_sweep_continues_past_failures() {
    let mut repo = repo();
    let good = TloId::new();
    let unversioned = TloId::new();
    let broken = TloId::new();

    repo.store_mut().replace(TloKind::Domain, &legacy(good, 1)).unwrap();
    repo.store_mut()
        .replace(
            TloKind::Domain,
            &doc(json!({"_id": unversioned.to_string(), "domain": "example.com"})),
        )
        .unwrap();
    repo.store_mut()
        .replace(
            TloKind::Domain,
            &doc(json!({
                "_id": broken.to_string(),
                "schema_version": 1,
                "source": [{"instances": []}],
                "relationships": [],
            })),
        )
        .unwrap();

    let mut janitor = Janitor::new(JanitorConfig {
        kinds: vec![TloKind::Domain],
        ..JanitorConfig::default()
    });
    let metrics = janitor.sweep(&mut repo).unwrap();

    assert_eq!(metrics.migrated[&TloKind::Domain], 1);
    assert_eq!(stored_version(&repo, TloKind::Domain, good), json!(3));

    let mut failed: Vec<TloId> = metrics.failures.iter().map(|f| f.id).collect();
    failed.sort();
    let mut expected = vec![unversioned, broken];
    expected.sort();
    assert_eq!(failed, expected);

    // The broken document stays at its last committed version
    assert_eq!(stored_version(&repo, TloKind::Domain, broken), json!(2));
}

#[test]
fn test_dry_run_writes_nothing() {
    let mut repo = repo();
    let id = TloId::new();
    repo.store_mut().replace(TloKind::Actor, &legacy(id, 1)).unwrap();

    let mut janitor = Janitor::new(JanitorConfig::report_only());
    let metrics = janitor.sweep(&mut repo).unwrap();

    assert_eq!(metrics.outdated[&TloKind::Actor], 1);
    assert_eq!(metrics.total_migrated(), 0);
    assert_eq!(stored_version(&repo, TloKind::Actor, id), json!(1));
}

#[test]
fn test_kind_filter_and_batch_limit() {
    let mut repo = repo();
    for _ in 0..3 {
        repo.store_mut()
            .replace(TloKind::Sample, &legacy(TloId::new(), 1))
            .unwrap();
    }
    let email = TloId::new();
    repo.store_mut().replace(TloKind::Email, &legacy(email, 1)).unwrap();

    let mut janitor = Janitor::new(JanitorConfig {
        kinds: vec![TloKind::Sample],
        batch_limit: Some(2),
        ..JanitorConfig::migration_only()
    });

    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.migrated[&TloKind::Sample], 2);

    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.migrated[&TloKind::Sample], 3);

    assert!(!metrics.migrated.contains_key(&TloKind::Email));
    assert_eq!(stored_version(&repo, TloKind::Email, email), json!(1));
}

#[test]
fn test_sweep_repairs_missing_mirrors() {
    let mut repo = repo();

    let mut domain = sourced(TloKind::Domain);
    repo.save(&mut domain, "alice").unwrap();

    let mut ip = sourced(TloKind::Ip);
    ip.insert_relationship(RelationshipEdge {
        target_id: domain.id(),
        target_kind: domain.kind(),
        relationship: RelationshipType::ResolvedTo,
        relationship_date: None,
        analyst: "alice".to_string(),
        confidence: Confidence::Medium,
        reason: String::new(),
        created: 1,
    });
    repo.save(&mut ip, "alice").unwrap();

    let mut janitor = Janitor::default_config();
    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.repaired[&TloKind::Ip], 1);
    assert_eq!(metrics.total_repaired(), 1);

    let domain = repo.load(TloKind::Domain, domain.id()).unwrap().unwrap();
    assert_eq!(domain.relationships().len(), 1);
    assert_eq!(domain.relationships()[0].target_id, ip.id());
    assert_eq!(
        domain.relationships()[0].relationship,
        RelationshipType::ResolvedTo.inverse()
    );

    // A second sweep finds the graph consistent
    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.total_repaired(), 1);
}

#[test]
fn test_batched_repair_reaches_later_documents() {
    let mut repo = repo();

    let mut domain = sourced(TloKind::Domain);
    repo.save(&mut domain, "alice").unwrap();

    let mut ips = [sourced(TloKind::Ip), sourced(TloKind::Ip)];
    ips.sort_by_key(|ip| ip.id());
    let [mut first, mut second] = ips;
    second.insert_relationship(RelationshipEdge {
        target_id: domain.id(),
        target_kind: domain.kind(),
        relationship: RelationshipType::ResolvedTo,
        relationship_date: None,
        analyst: "alice".to_string(),
        confidence: Confidence::Medium,
        reason: String::new(),
        created: 1,
    });
    repo.save(&mut first, "alice").unwrap();
    repo.save(&mut second, "alice").unwrap();

    let mut janitor = Janitor::new(JanitorConfig {
        kinds: vec![TloKind::Ip],
        batch_limit: Some(1),
        ..JanitorConfig::default()
    });

    // The first batch only covers the earlier document
    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.total_repaired(), 0);

    let metrics = janitor.sweep(&mut repo).unwrap();
    assert_eq!(metrics.total_repaired(), 1);

    let domain = repo.load(TloKind::Domain, domain.id()).unwrap().unwrap();
    assert_eq!(domain.relationships().len(), 1);
    assert_eq!(domain.relationships()[0].target_id, second.id());

    // Past the end the cursor wraps and the graph stays consistent
    for _ in 0..3 {
        janitor.sweep(&mut repo).unwrap();
    }
    assert_eq!(janitor.metrics().total_repaired(), 1);
}

#[tokio::test]
async fn test_worker_runs_cycles() {
    let mut repo = repo();
    let id = TloId::new();
    repo.store_mut().replace(TloKind::Event, &legacy(id, 1)).unwrap();

    let mut worker = JanitorWorker::new(JanitorConfig {
        sweep_interval_minutes: 1,
        ..JanitorConfig::default()
    });

    // The first tick fires immediately
    let repo = worker.run_cycles(repo, 1).await.unwrap();

    assert_eq!(worker.metrics().sweep_count, 1);
    assert_eq!(worker.metrics().migrated[&TloKind::Event], 1);
    assert_eq!(stored_version(&repo, TloKind::Event, id), json!(3));

    worker.reset_metrics();
    assert_eq!(worker.metrics().sweep_count, 0);
}

#[tokio::test]
async fn test_worker_refuses_zero_interval() {
    let mut worker = JanitorWorker::new(JanitorConfig {
        sweep_interval_minutes: 0,
        ..JanitorConfig::default()
    });

    let result = worker.run_cycles(repo(), 1).await;
    assert!(matches!(
        result,
        Err(JanitorError::Config(ConfigError::InvalidValue(_)))
    ));
    assert_eq!(worker.metrics().sweep_count, 0);
}
