//! Integration tests for mirrored relationship maintenance

use provenant_domain::{
    Confidence, RelationshipEdge, RelationshipType, SourceEntry, SourceInstance, Tlo, TloId,
    TloKind, Tlp,
};
use provenant_gatekeeper::{AccessPolicy, RecordingCascade, Repository, Sanitizer};
use provenant_graph::{
    Counterpart, GraphConfig, RelationshipChange, RelationshipError, RelationshipManager,
    RelationshipOutcome, RelationshipRequest,
};
use provenant_store::SqliteStore;
use serde_json::json;

fn repo() -> Repository<SqliteStore> {
    Repository::new(SqliteStore::in_memory().unwrap())
}

fn sourced(kind: TloKind, source: &str) -> Tlo {
    let mut tlo = Tlo::new(kind);
    tlo.add_source(SourceEntry::new(
        source,
        SourceInstance::new("alice", 100, Tlp::Amber),
    ))
    .unwrap();
    tlo
}

fn saved(repo: &mut Repository<SqliteStore>, kind: TloKind, source: &str) -> Tlo {
    let mut tlo = sourced(kind, source);
    repo.save(&mut tlo, "alice").unwrap();
    tlo
}

fn reference(tlo: &Tlo) -> Counterpart<'static> {
    Counterpart::Reference {
        kind: tlo.kind(),
        id: tlo.id(),
    }
}

fn reload(repo: &mut Repository<SqliteStore>, tlo: &Tlo) -> Tlo {
    repo.load(tlo.kind(), tlo.id()).unwrap().unwrap()
}

fn edges_to(tlo: &Tlo, target: &Tlo) -> Vec<RelationshipEdge> {
    tlo.relationships()
        .iter()
        .filter(|e| e.target_kind == target.kind() && e.target_id == target.id())
        .cloned()
        .collect()
}

#[test]
fn test_add_creates_inverse_mirror() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut actor = saved(&mut repo, TloKind::Actor, "TSRC");
    let child = saved(&mut repo, TloKind::Actor, "TSRC");

    let request = RelationshipRequest::new("Parent Of", "alice")
        .with_confidence(Confidence::High)
        .with_reason("same infrastructure");
    let outcome = manager
        .add_relationship(&mut repo, &mut actor, reference(&child), &request)
        .unwrap();
    assert_eq!(outcome, RelationshipOutcome::Created);
    repo.save(&mut actor, "alice").unwrap();

    let mine = edges_to(&reload(&mut repo, &actor), &child);
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].relationship, RelationshipType::ParentOf);

    let theirs = edges_to(&reload(&mut repo, &child), &actor);
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].relationship, RelationshipType::ChildOf);
    assert_eq!(theirs[0].confidence, Confidence::High);
    assert_eq!(theirs[0].reason, "same infrastructure");
    assert_eq!(theirs[0].analyst, "alice");
}

#[test]
fn test_add_is_idempotent() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    let domain = saved(&mut repo, TloKind::Domain, "TSRC");
    let request = RelationshipRequest::new("Resolved_To", "alice");

    manager
        .add_relationship(&mut repo, &mut ip, reference(&domain), &request)
        .unwrap();
    repo.save(&mut ip, "alice").unwrap();

    let again = manager
        .add_relationship(&mut repo, &mut ip, reference(&domain), &request)
        .unwrap();
    assert_eq!(again, RelationshipOutcome::AlreadyExists);
    assert!(!again.changed());

    assert_eq!(ip.relationships().len(), 1);
    assert_eq!(reload(&mut repo, &domain).relationships().len(), 1);
}

#[test]
fn test_symmetric_relationship_between_same_kind() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut c1 = saved(&mut repo, TloKind::Campaign, "TSRC");
    let c2 = saved(&mut repo, TloKind::Campaign, "TSRC");

    manager
        .add_relationship(
            &mut repo,
            &mut c1,
            reference(&c2),
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap();

    let theirs = reload(&mut repo, &c2);
    assert_eq!(theirs.relationships().len(), 1);
    assert_eq!(theirs.relationships()[0].target_id, c1.id());
    assert_eq!(theirs.relationships()[0].relationship, RelationshipType::RelatedTo);
}

#[test]
fn test_variant_relationship_cascades_to_family() {
    let mut repo = repo();
    let manager = RelationshipManager::default();

    let mut family = sourced(TloKind::Backdoor, "TSRC");
    family.set_attribute("name", json!("Zeus")).unwrap();
    repo.save(&mut family, "alice").unwrap();

    let mut variant = sourced(TloKind::Backdoor, "TSRC");
    variant.set_attribute("name", json!("Zeus")).unwrap();
    variant.set_attribute("version", json!("2")).unwrap();
    repo.save(&mut variant, "alice").unwrap();

    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    manager
        .add_relationship(
            &mut repo,
            &mut ip,
            reference(&variant),
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap();
    repo.save(&mut ip, "alice").unwrap();

    let ip = reload(&mut repo, &ip);
    assert_eq!(edges_to(&ip, &variant).len(), 1);
    assert_eq!(edges_to(&ip, &family).len(), 1);

    let family = reload(&mut repo, &family);
    let mirror = edges_to(&family, &ip);
    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror[0].relationship, RelationshipType::RelatedTo);

    // The variant is not related to its own family by the cascade
    assert!(edges_to(&family, &variant).is_empty());
}

#[test]
fn test_cascade_can_be_disabled() {
    let mut repo = repo();
    let manager = RelationshipManager::new(GraphConfig::without_cascade());

    let mut family = sourced(TloKind::Backdoor, "TSRC");
    family.set_attribute("name", json!("PlugX")).unwrap();
    repo.save(&mut family, "alice").unwrap();

    let mut variant = sourced(TloKind::Backdoor, "TSRC");
    variant.set_attribute("name", json!("PlugX")).unwrap();
    variant.set_attribute("version", json!("1.1")).unwrap();
    repo.save(&mut variant, "alice").unwrap();

    let mut sample = saved(&mut repo, TloKind::Sample, "TSRC");
    manager
        .add_relationship(
            &mut repo,
            &mut sample,
            reference(&variant),
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap();

    assert_eq!(sample.relationships().len(), 1);
    assert!(reload(&mut repo, &family).relationships().is_empty());
}

#[test]
fn test_add_repairs_one_sided_edges() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let request = RelationshipRequest::new("Related_To", "alice");

    // Only the counterpart carries the edge
    let mut owner = saved(&mut repo, TloKind::Email, "TSRC");
    let mut target = sourced(TloKind::Domain, "TSRC");
    target.insert_relationship(RelationshipEdge {
        target_id: owner.id(),
        target_kind: owner.kind(),
        relationship: RelationshipType::RelatedTo,
        relationship_date: None,
        analyst: "bob".to_string(),
        confidence: Confidence::Low,
        reason: String::new(),
        created: 7,
    });
    repo.save(&mut target, "bob").unwrap();

    let outcome = manager
        .add_relationship(&mut repo, &mut owner, reference(&target), &request)
        .unwrap();
    assert_eq!(outcome, RelationshipOutcome::RepairedOwner);
    let restored = edges_to(&owner, &target);
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].analyst, "bob");
    assert_eq!(reload(&mut repo, &target).relationships().len(), 1);

    // Only the owner carries the edge
    let mut lonely = sourced(TloKind::Event, "TSRC");
    let other = saved(&mut repo, TloKind::Event, "TSRC");
    lonely.insert_relationship(RelationshipEdge {
        target_id: other.id(),
        target_kind: other.kind(),
        relationship: RelationshipType::RelatedTo,
        relationship_date: None,
        analyst: "bob".to_string(),
        confidence: Confidence::Low,
        reason: String::new(),
        created: 7,
    });

    let outcome = manager
        .add_relationship(&mut repo, &mut lonely, reference(&other), &request)
        .unwrap();
    assert_eq!(outcome, RelationshipOutcome::RepairedCounterpart);
    assert_eq!(lonely.relationships().len(), 1);
    assert_eq!(edges_to(&reload(&mut repo, &other), &lonely).len(), 1);
}

#[test]
fn test_add_with_loaded_counterpart() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut a = saved(&mut repo, TloKind::Actor, "TSRC");
    let mut b = saved(&mut repo, TloKind::Campaign, "TSRC");

    manager
        .add_relationship(
            &mut repo,
            &mut a,
            Counterpart::Loaded(&mut b),
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap();

    assert_eq!(a.relationships().len(), 1);
    assert_eq!(b.relationships().len(), 1);
    // The counterpart is appended in the store; the caller saves its own side
    assert_eq!(reload(&mut repo, &b).relationships().len(), 1);
    assert!(reload(&mut repo, &a).relationships().is_empty());
}

#[test]
fn test_add_rejects_bad_requests() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    let domain = saved(&mut repo, TloKind::Domain, "TSRC");

    let err = manager
        .add_relationship(
            &mut repo,
            &mut ip,
            reference(&domain),
            &RelationshipRequest::new("Nemesis_Of", "alice"),
        )
        .unwrap_err();
    assert!(matches!(err, RelationshipError::UnknownType(_)));

    let itself = reference(&ip);
    let err = manager
        .add_relationship(
            &mut repo,
            &mut ip,
            itself,
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap_err();
    assert!(matches!(err, RelationshipError::SelfRelationship { .. }));

    let err = manager
        .add_relationship(
            &mut repo,
            &mut ip,
            Counterpart::Reference {
                kind: TloKind::Domain,
                id: TloId::new(),
            },
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap_err();
    assert!(matches!(err, RelationshipError::CounterpartNotFound { .. }));

    assert!(ip.relationships().is_empty());
}

#[test]
fn test_modify_updates_both_sides() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut actor = saved(&mut repo, TloKind::Actor, "TSRC");
    let other = saved(&mut repo, TloKind::Actor, "TSRC");

    manager
        .add_relationship(
            &mut repo,
            &mut actor,
            reference(&other),
            &RelationshipRequest::new("Related_To", "alice"),
        )
        .unwrap();

    manager
        .modify_relationship(
            &mut repo,
            &mut actor,
            reference(&other),
            "Related_To",
            None,
            &RelationshipChange::retype("Parent_Of").unwrap(),
            "alice",
        )
        .unwrap();
    manager
        .modify_relationship(
            &mut repo,
            &mut actor,
            reference(&other),
            "Parent_Of",
            None,
            &RelationshipChange::Confidence(Confidence::High),
            "alice",
        )
        .unwrap();

    let mine = edges_to(&actor, &other);
    assert_eq!(mine[0].relationship, RelationshipType::ParentOf);
    assert_eq!(mine[0].confidence, Confidence::High);

    let theirs = edges_to(&reload(&mut repo, &other), &actor);
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].relationship, RelationshipType::ChildOf);
    assert_eq!(theirs[0].confidence, Confidence::High);
}

#[test]
fn test_modify_unknown_edge_fails() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    let domain = saved(&mut repo, TloKind::Domain, "TSRC");

    let err = manager
        .modify_relationship(
            &mut repo,
            &mut ip,
            reference(&domain),
            "Related_To",
            None,
            &RelationshipChange::Reason("x".to_string()),
            "alice",
        )
        .unwrap_err();
    assert!(matches!(err, RelationshipError::EdgeNotFound(_)));
}

#[test]
fn test_delete_relationship_removes_both_sides() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    let domain = saved(&mut repo, TloKind::Domain, "TSRC");

    manager
        .add_relationship(
            &mut repo,
            &mut ip,
            reference(&domain),
            &RelationshipRequest::new("Resolved_To", "alice").with_date(42),
        )
        .unwrap();
    repo.save(&mut ip, "alice").unwrap();

    manager
        .delete_relationship(&mut repo, &mut ip, reference(&domain), "Resolved To", Some(42), "alice")
        .unwrap();
    repo.save(&mut ip, "alice").unwrap();

    assert!(reload(&mut repo, &ip).relationships().is_empty());
    assert!(reload(&mut repo, &domain).relationships().is_empty());
}

#[test]
fn test_undated_request_targets_the_same_edge_on_both_sides() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut ip = sourced(TloKind::Ip, "TSRC");
    let mut domain = sourced(TloKind::Domain, "TSRC");

    let dated = |date: u64| RelationshipEdge {
        target_id: domain.id(),
        target_kind: domain.kind(),
        relationship: RelationshipType::ResolvedTo,
        relationship_date: Some(date),
        analyst: "alice".to_string(),
        confidence: Confidence::Medium,
        reason: String::new(),
        created: date,
    };
    let (early, late) = (dated(10), dated(20));

    // The two sides list the edges in opposite order
    ip.insert_relationship(early.clone());
    ip.insert_relationship(late.clone());
    domain.insert_relationship(late.mirror(ip.kind(), ip.id()));
    domain.insert_relationship(early.mirror(ip.kind(), ip.id()));
    repo.save(&mut domain, "alice").unwrap();
    repo.save(&mut ip, "alice").unwrap();

    manager
        .delete_relationship(&mut repo, &mut ip, reference(&domain), "Resolved_To", None, "alice")
        .unwrap();
    repo.save(&mut ip, "alice").unwrap();

    let mine = edges_to(&reload(&mut repo, &ip), &domain);
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].relationship_date, Some(20));

    let theirs = edges_to(&reload(&mut repo, &domain), &ip);
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].relationship_date, Some(20));
}

#[test]
fn test_delete_object_cleans_counterparts() {
    let cascade = RecordingCascade::new();
    let mut repo = repo().with_cascade(cascade.clone());
    let manager = RelationshipManager::default();

    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    let domain = saved(&mut repo, TloKind::Domain, "TSRC");
    let sample = saved(&mut repo, TloKind::Sample, "TSRC");
    for target in [&domain, &sample] {
        manager
            .add_relationship(
                &mut repo,
                &mut ip,
                reference(target),
                &RelationshipRequest::new("Related_To", "alice"),
            )
            .unwrap();
    }
    repo.save(&mut ip, "alice").unwrap();

    assert!(manager.delete_object(&mut repo, &mut ip, "alice").unwrap());

    assert!(repo.load(TloKind::Ip, ip.id()).unwrap().is_none());
    assert!(reload(&mut repo, &domain).relationships().is_empty());
    assert!(reload(&mut repo, &sample).relationships().is_empty());
    assert_eq!(cascade.deleted(), vec![(TloKind::Ip, ip.id())]);
}

#[test]
fn test_delete_all_skips_missing_counterparts() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let mut ip = sourced(TloKind::Ip, "TSRC");
    ip.insert_relationship(RelationshipEdge {
        target_id: TloId::new(),
        target_kind: TloKind::Domain,
        relationship: RelationshipType::RelatedTo,
        relationship_date: None,
        analyst: "alice".to_string(),
        confidence: Confidence::Unknown,
        reason: String::new(),
        created: 1,
    });

    assert_eq!(manager.delete_all_relationships(&mut repo, &mut ip, "alice").unwrap(), 1);
    assert!(ip.relationships().is_empty());
}

#[test]
fn test_repair_restores_missing_mirrors() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let domain = saved(&mut repo, TloKind::Domain, "TSRC");

    let mut ip = sourced(TloKind::Ip, "TSRC");
    ip.insert_relationship(RelationshipEdge {
        target_id: domain.id(),
        target_kind: domain.kind(),
        relationship: RelationshipType::ResolvedTo,
        relationship_date: Some(9),
        analyst: "alice".to_string(),
        confidence: Confidence::Medium,
        reason: String::new(),
        created: 1,
    });
    ip.insert_relationship(RelationshipEdge {
        target_id: TloId::new(),
        target_kind: TloKind::Sample,
        relationship: RelationshipType::RelatedTo,
        relationship_date: None,
        analyst: "alice".to_string(),
        confidence: Confidence::Medium,
        reason: String::new(),
        created: 1,
    });
    repo.save(&mut ip, "alice").unwrap();

    assert_eq!(manager.repair_relationships(&mut repo, &ip).unwrap(), 1);
    assert_eq!(manager.repair_relationships(&mut repo, &ip).unwrap(), 0);

    let mirror = edges_to(&reload(&mut repo, &domain), &ip);
    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror[0].relationship, RelationshipType::ResolvedTo);
    assert_eq!(mirror[0].relationship_date, Some(9));
}

#[test]
fn test_related_objects_are_filtered_and_grouped() {
    let mut repo = repo();
    let manager = RelationshipManager::default();
    let sanitizer = Sanitizer::new(AccessPolicy::new().with_user("analyst", ["TSRC"], false));

    let mut ip = saved(&mut repo, TloKind::Ip, "TSRC");
    let visible = saved(&mut repo, TloKind::Domain, "TSRC");
    let hidden = saved(&mut repo, TloKind::Domain, "TUNKSRC");
    let campaign = saved(&mut repo, TloKind::Campaign, "TUNKSRC");
    for target in [&visible, &hidden, &campaign] {
        manager
            .add_relationship(
                &mut repo,
                &mut ip,
                reference(target),
                &RelationshipRequest::new("Related_To", "alice"),
            )
            .unwrap();
    }
    repo.save(&mut ip, "alice").unwrap();

    let related = manager
        .related_objects(&mut repo, &sanitizer, &ip, "analyst")
        .unwrap();

    assert_eq!(related.len(), 2);
    let domains = &related[&TloKind::Domain];
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].object.id(), visible.id());
    assert!(domains[0].object.is_sanitized());

    let campaigns = &related[&TloKind::Campaign];
    assert_eq!(campaigns.len(), 1);
    assert!(campaigns[0].object.sources()[0].is_hidden_marker());
}
