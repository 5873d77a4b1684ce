mod common;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use common::World;
use condominio_backend::{
    common::error::AppError,
    db::{Filter, Sort, Table},
    models::{
        context::{TenantContext, TenantScoped, TenantStamped},
        package::{NewPackage, PackageDisplayStatus, PackagePatch},
        role::{Capability, Role},
        visitor::NewVisitor,
    },
};

fn seed_packages(world: &World, tenant_id: Uuid, unit_id: Uuid, count: usize) {
    world.store.seed(
        Table::Packages,
        (0..count).map(|i| {
            json!({
                "id": Uuid::new_v4(),
                "tenant_id": tenant_id,
                "unit_id": unit_id,
                "sender": format!("Loja {}", i),
                "kind": "caixa",
                "status": "received",
                "created_at": Utc::now(),
            })
        }),
    );
}

fn new_package(unit_id: Uuid, tenant_id: Option<Uuid>) -> NewPackage {
    serde_json::from_value(json!({
        "tenant_id": tenant_id,
        "unit_id": unit_id,
        "sender": "Correios",
        "kind": "envelope",
    }))
    .unwrap()
}

#[tokio::test]
async fn global_admin_sees_every_tenant_and_tenant_admin_only_its_own() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (t2, _, u2) = world.building("Edifício Bela Vista");
    let (t3, _, u3) = world.building("Condomínio Jardins");
    seed_packages(&world, t1, u1, 5);
    seed_packages(&world, t2, u2, 3);
    seed_packages(&world, t3, u3, 2);

    let packages = world.state.packages();

    let all = packages
        .filter(&world.global_admin(), &[], &Sort::default(), None)
        .await
        .unwrap();
    assert_eq!(all.len(), 10);

    let own = packages
        .filter(&world.admin_of(t1), &[], &Sort::default(), None)
        .await
        .unwrap();
    assert_eq!(own.len(), 5);
    assert!(own.iter().all(|p| p.tenant_id == t1));
}

#[tokio::test]
async fn global_admin_with_target_reads_only_that_tenant() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (t2, _, u2) = world.building("Edifício Bela Vista");
    seed_packages(&world, t1, u1, 2);
    seed_packages(&world, t2, u2, 4);

    let ctx = world.global_admin().with_target(Some(t2)).unwrap();
    let listed = world.state.packages().list(&ctx, &Sort::default()).await.unwrap();
    assert_eq!(listed.len(), 4);
}

#[tokio::test]
async fn scope_filter_keeps_only_the_context_tenant() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (t2, _, u2) = world.building("Edifício Bela Vista");
    seed_packages(&world, t1, u1, 3);
    seed_packages(&world, t2, u2, 2);

    // Registros mistos, como viriam de uma fonte sem filtro no banco.
    let mixed = world
        .state
        .packages()
        .list(&world.global_admin(), &Sort::default())
        .await
        .unwrap();
    assert_eq!(mixed.len(), 5);

    let scoped = world.gatekeeper_of(t2).scope_filter(mixed.clone());
    assert_eq!(scoped.len(), 2);
    assert!(scoped.iter().all(|p| p.tenant_id() == Some(t2)));

    assert_eq!(world.global_admin().scope_filter(mixed).len(), 5);
}

#[tokio::test]
async fn insert_always_uses_the_context_tenant() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (t2, _, _) = world.building("Edifício Bela Vista");
    let ctx = world.gatekeeper_of(t1);

    let stamped = ctx.scope_for_insert(new_package(u1, Some(t2))).unwrap();
    assert_eq!(TenantStamped::tenant_id(&stamped), Some(t1));

    let saved = world
        .state
        .packages()
        .create(&ctx, new_package(u1, Some(t2)))
        .await
        .unwrap();
    assert_eq!(saved.tenant_id, t1);
    assert_eq!(saved.status, PackageDisplayStatus::Awaiting);
    assert_eq!(saved.received_by, Some(ctx.user_id));
}

#[tokio::test]
async fn global_admin_must_name_the_tenant_on_insert() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let admin = world.global_admin();

    let err = world
        .state
        .packages()
        .create(&admin, new_package(u1, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MissingTenant));
    assert!(err.is_tenant_violation());
    assert!(world.store.rows(Table::Packages).is_empty());

    let saved = world
        .state
        .packages()
        .create(&admin, new_package(u1, Some(t1)))
        .await
        .unwrap();
    assert_eq!(saved.tenant_id, t1);
}

#[tokio::test]
async fn unit_from_another_tenant_is_reported_as_missing() {
    let world = World::new();
    let (t1, _, _) = world.building("Residencial Aurora");
    let (_, _, foreign_unit) = world.building("Edifício Bela Vista");

    let err = world
        .state
        .packages()
        .create(&world.gatekeeper_of(t1), new_package(foreign_unit, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Unidade")));
    assert!(world.dispatcher.jobs().is_empty());
}

#[tokio::test]
async fn foreign_records_look_exactly_like_missing_ones() {
    let world = World::new();
    let (t1, _, _) = world.building("Residencial Aurora");
    let (t2, _, u2) = world.building("Edifício Bela Vista");
    let foreign = world
        .state
        .packages()
        .create(&world.gatekeeper_of(t2), new_package(u2, None))
        .await
        .unwrap();

    let ctx = world.gatekeeper_of(t1);
    let packages = world.state.packages();

    assert!(packages.get(&ctx, foreign.id).await.unwrap().is_none());
    assert!(packages.get(&ctx, Uuid::new_v4()).await.unwrap().is_none());

    let patch = PackagePatch {
        status: Some(PackageDisplayStatus::PickedUp),
        ..PackagePatch::default()
    };
    let foreign_err = packages.update(&ctx, foreign.id, patch.clone()).await.unwrap_err();
    let missing_err = packages.update(&ctx, Uuid::new_v4(), patch).await.unwrap_err();
    assert_eq!(foreign_err.to_string(), missing_err.to_string());

    assert!(matches!(
        packages.delete(&ctx, foreign.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(world.store.rows(Table::Packages).len(), 1);
}

#[tokio::test]
async fn caller_filters_cannot_widen_the_tenant_scope() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (t2, _, u2) = world.building("Edifício Bela Vista");
    seed_packages(&world, t1, u1, 1);
    seed_packages(&world, t2, u2, 2);

    let criteria = [Filter::Eq("tenant_id".into(), json!(t2))];
    let listed = world
        .state
        .packages()
        .filter(&world.gatekeeper_of(t1), &criteria, &Sort::default(), None)
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn visitors_are_scoped_like_every_other_entity() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (t2, _, _) = world.building("Edifício Bela Vista");
    let visitors = world.state.visitors();

    let input = NewVisitor {
        tenant_id: Some(t2),
        unit_id: Some(u1),
        visitor_name: Some("Maria".into()),
        ..NewVisitor::default()
    };
    let saved = visitors.create(&world.gatekeeper_of(t1), input).await.unwrap();
    assert_eq!(saved.tenant_id, t1);
    assert_eq!(saved.name, "Maria");

    let other = visitors.list(&world.gatekeeper_of(t2), &Sort::default()).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn resident_context_cannot_log_packages() {
    let world = World::new();
    let (t1, _, _) = world.building("Residencial Aurora");
    let ctx = TenantContext::scoped(Uuid::new_v4(), t1, Role::Resident);
    assert!(matches!(
        ctx.require(Capability::LogPackages),
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn package_recipient_must_live_in_the_package_unit() {
    let world = World::new();
    let (t1, b1, u1) = world.building("Residencial Aurora");
    let (_, _, u2) = world.building("Edifício Bela Vista");
    let neighbour_unit = world.unit(b1, "102");

    let outsider = world.user("vera@exemplo.com");
    world.profile(&outsider, "Vera Sigilo");
    let foreign_resident = world.resident(&outsider, u2, "approved");

    let neighbour = world.user("nilo@exemplo.com");
    let neighbour_resident = world.resident(&neighbour, neighbour_unit, "approved");

    let local = world.user("lia@exemplo.com");
    world.profile(&local, "Lia Prado");
    let local_resident = world.resident(&local, u1, "approved");

    let packages = world.state.packages();
    let gatekeeper = world.gatekeeper_of(t1);

    for resident_id in [foreign_resident, neighbour_resident] {
        let mut input = new_package(u1, None);
        input.resident_id = Some(resident_id);
        let err = packages.create(&gatekeeper, input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Morador")));
    }
    assert!(world.store.rows(Table::Packages).is_empty());

    let mut input = new_package(u1, None);
    input.resident_id = Some(local_resident);
    let created = packages.create(&gatekeeper, input).await.unwrap();
    assert_eq!(created.resident_name, "Lia Prado");
}

#[tokio::test]
async fn stored_package_never_shows_a_foreign_resident() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let (_, _, u2) = world.building("Edifício Bela Vista");

    let outsider = world.user("vera@exemplo.com");
    world.profile(&outsider, "Vera Sigilo");
    let foreign_resident = world.resident(&outsider, u2, "approved");

    world.store.seed(
        Table::Packages,
        [json!({
            "id": Uuid::new_v4(),
            "tenant_id": t1,
            "unit_id": u1,
            "resident_id": foreign_resident,
            "sender": "Correios",
            "kind": "envelope",
            "status": "received",
            "created_at": Utc::now(),
        })],
    );

    let listed = world
        .state
        .packages()
        .list(&world.gatekeeper_of(t1), &Sort::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_ne!(listed[0].resident_name, "Vera Sigilo");
    assert!(listed[0].resident_phone.is_empty());
}
