mod common;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use common::World;
use condominio_backend::{
    db::{Filter, Sort, Table},
    models::{
        package::{NewPackage, PackageDisplayStatus, PackagePatch},
        visitor::{NewVisitor, VisitorPatch, VisitorStatus},
    },
    services::dispatch::Job,
};

#[tokio::test]
async fn package_status_survives_write_and_read() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let ctx = world.gatekeeper_of(t1);
    let packages = world.state.packages();

    let input: NewPackage = serde_json::from_value(json!({
        "unit_id": u1,
        "sender": "Mercado Livre",
        "kind": "caixa",
    }))
    .unwrap();
    let created = packages.create(&ctx, input).await.unwrap();

    for shown in PackageDisplayStatus::ALL {
        let patch = PackagePatch {
            status: Some(shown),
            ..PackagePatch::default()
        };
        let updated = packages.update(&ctx, created.id, patch).await.unwrap();
        assert_eq!(updated.status, shown);

        let read = packages.get(&ctx, created.id).await.unwrap().unwrap();
        assert_eq!(read.status, shown);
    }

    // Gravado no vocabulário do banco.
    let stored = world.store.rows(Table::Packages);
    assert_eq!(stored[0]["status"], "picked_up");
}

#[tokio::test]
async fn awaiting_is_stored_as_received() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let ctx = world.gatekeeper_of(t1);
    let packages = world.state.packages();

    let input: NewPackage = serde_json::from_value(json!({
        "unit_id": u1,
        "sender": "Correios",
        "kind": "envelope",
        "status": "awaiting",
        "code": "BR123",
    }))
    .unwrap();
    let created = packages.create(&ctx, input).await.unwrap();
    assert_eq!(created.status, PackageDisplayStatus::Awaiting);
    assert_eq!(created.tracking_code.as_deref(), Some("BR123"));
    assert_eq!(created.code.as_deref(), Some("BR123"));

    let stored = world.store.rows(Table::Packages);
    assert_eq!(stored[0]["status"], "received");
    assert_eq!(stored[0]["tracking_code"], "BR123");

    let criteria = [Filter::Eq("status".into(), json!("awaiting"))];
    let waiting = packages
        .filter(&ctx, &criteria, &Sort::default(), None)
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
}

#[tokio::test]
async fn legacy_stored_values_are_still_read() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    world.store.seed(
        Table::Packages,
        [json!({
            "id": Uuid::new_v4(),
            "tenant_id": t1,
            "unit_id": u1,
            "sender": "Amazon",
            "kind": "caixa",
            "status": "recebida",
            "created_at": Utc::now(),
        })],
    );

    let listed = world
        .state
        .packages()
        .list(&world.gatekeeper_of(t1), &Sort::default())
        .await
        .unwrap();
    assert_eq!(listed[0].status, PackageDisplayStatus::Awaiting);
    assert_eq!(listed[0].address_label, "Bloco A - 101");
}

#[tokio::test]
async fn package_arrival_dispatches_a_job() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let input: NewPackage = serde_json::from_value(json!({
        "unit_id": u1,
        "sender": "Correios",
        "kind": "envelope",
    }))
    .unwrap();

    let created = world
        .state
        .packages()
        .create(&world.gatekeeper_of(t1), input)
        .await
        .unwrap();
    assert_eq!(world.dispatcher.jobs(), vec![Job::PackageArrived(created.id)]);
}

#[tokio::test]
async fn visitor_status_is_derived_from_the_dates() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let ctx = world.gatekeeper_of(t1);
    let visitors = world.state.visitors();

    let created = visitors
        .create(
            &ctx,
            NewVisitor {
                unit_id: Some(u1),
                name: Some("João Pedro".into()),
                ..NewVisitor::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.status, VisitorStatus::Scheduled);
    assert_eq!(created.registered_by, Some(ctx.user_id));

    for status in VisitorStatus::ALL {
        let patch = VisitorPatch {
            status: Some(status),
            ..VisitorPatch::default()
        };
        let updated = visitors.update(&ctx, created.id, patch).await.unwrap();
        assert_eq!(updated.status, status);
        let read = visitors.get(&ctx, created.id).await.unwrap().unwrap();
        assert_eq!(read.status, status);
    }
}

#[tokio::test]
async fn visitor_status_filter_runs_after_assembly() {
    let world = World::new();
    let (t1, _, _) = world.building("Residencial Aurora");
    let ctx = world.gatekeeper_of(t1);
    let visitors = world.state.visitors();

    let inside = visitors
        .create(
            &ctx,
            NewVisitor {
                visitor_name: Some("Entregador".into()),
                entered_at: Some(Utc::now()),
                ..NewVisitor::default()
            },
        )
        .await
        .unwrap();
    visitors
        .create(
            &ctx,
            NewVisitor {
                name: Some("Agendado".into()),
                ..NewVisitor::default()
            },
        )
        .await
        .unwrap();

    let criteria = [Filter::Eq("status".into(), json!("entered"))];
    let found = visitors
        .filter(&ctx, &criteria, &Sort::default(), Some(1))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, inside.id);
    assert_eq!(found[0].status, VisitorStatus::Entered);
}

#[tokio::test]
async fn package_note_can_be_cleared() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let ctx = world.gatekeeper_of(t1);
    let packages = world.state.packages();

    let input: NewPackage = serde_json::from_value(json!({
        "unit_id": u1,
        "sender": "Mercado Livre",
        "kind": "caixa",
        "note": "Deixar na portaria",
        "code": "BR1",
    }))
    .unwrap();
    let created = packages.create(&ctx, input).await.unwrap();
    assert_eq!(created.note.as_deref(), Some("Deixar na portaria"));

    let patch: PackagePatch = serde_json::from_value(json!({ "note": null })).unwrap();
    let updated = packages.update(&ctx, created.id, patch).await.unwrap();
    assert_eq!(updated.note, None);
    assert_eq!(updated.code.as_deref(), Some("BR1"));
}
