mod common;

use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use common::{test_settings, Gate, StaticAuth, World};
use condominio_backend::{
    common::error::AppError,
    config::Settings,
    db::Table,
    models::{
        access::AccessStatus,
        auth::{AuthEvent, SignUpOutcome, SignUpPayload},
        role::Role,
    },
    services::{auth::AuthSession, auth_provider::AuthProvider},
};

fn sign_up_payload(email: &str, unit_id: Option<uuid::Uuid>) -> SignUpPayload {
    SignUpPayload {
        email: email.to_string(),
        password: "segredo123".to_string(),
        name: "Carla Dias".to_string(),
        phone: Some("11 98888-7777".to_string()),
        unit_id,
    }
}

#[tokio::test]
async fn sign_up_with_unit_creates_pending_resident() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");
    let session = world.state.auth_session(world.state.auth.unbound());

    let outcome = session
        .sign_up(sign_up_payload("Carla@Exemplo.com ", Some(u1)))
        .await
        .unwrap();

    let SignUpOutcome::SignedIn { token, access } = outcome else {
        panic!("cadastro sem confirmação deveria entrar direto");
    };
    assert!(!token.is_empty());
    assert_eq!(access.email.as_deref(), Some("carla@exemplo.com"));
    assert_eq!(access.effective_role, Some(Role::Resident));
    assert_eq!(access.tenant_id, Some(t1));
    assert_eq!(access.status, AccessStatus::Pending);
    assert!(access.is_pending_approval);
    assert_eq!(access.name.as_deref(), Some("Carla Dias"));

    assert_eq!(world.store.rows(Table::RoleBindings).len(), 1);
    let residents = world.store.rows(Table::Residents);
    assert_eq!(residents.len(), 1);
    assert_eq!(residents[0]["status"], "pending");
}

#[tokio::test]
async fn interrupted_sign_up_is_completed_by_repeating_it() {
    let world = World::new();
    let (t1, _, u1) = world.building("Residencial Aurora");

    world.store.fail_table(Table::Residents);
    let first = world.state.auth_session(world.state.auth.unbound());
    let err = first
        .sign_up(sign_up_payload("carla@exemplo.com", Some(u1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UpstreamError(_)));
    assert_eq!(world.store.rows(Table::Users).len(), 1);
    // Sem cadastro de morador, nenhum vínculo é criado.
    assert!(world.store.rows(Table::RoleBindings).is_empty());
    world.store.heal_table(Table::Residents);

    // Senha errada não retoma o cadastro de outra pessoa.
    let mut wrong = sign_up_payload("carla@exemplo.com", Some(u1));
    wrong.password = "outra-senha".to_string();
    let intruder = world.state.auth_session(world.state.auth.unbound());
    assert!(matches!(
        intruder.sign_up(wrong).await,
        Err(AppError::EmailAlreadyExists)
    ));

    let retry = world.state.auth_session(world.state.auth.unbound());
    let outcome = retry
        .sign_up(sign_up_payload("carla@exemplo.com", Some(u1)))
        .await
        .unwrap();
    let SignUpOutcome::SignedIn { access, .. } = outcome else {
        panic!("a repetição deveria concluir o cadastro");
    };
    assert_eq!(access.effective_role, Some(Role::Resident));
    assert_eq!(access.tenant_id, Some(t1));
    assert!(access.is_pending_approval);
    assert_eq!(world.store.rows(Table::Residents).len(), 1);
    assert_eq!(world.store.rows(Table::RoleBindings).len(), 1);

    // Cadastro já concluído: e-mail repetido, sem novas linhas.
    let again = world.state.auth_session(world.state.auth.unbound());
    assert!(matches!(
        again.sign_up(sign_up_payload("carla@exemplo.com", Some(u1))).await,
        Err(AppError::EmailAlreadyExists)
    ));
    assert_eq!(world.store.rows(Table::Residents).len(), 1);
    assert_eq!(world.store.rows(Table::RoleBindings).len(), 1);
}

#[tokio::test]
async fn sign_up_with_unknown_unit_creates_nothing() {
    let world = World::new();
    let session = world.state.auth_session(world.state.auth.unbound());

    let err = session
        .sign_up(sign_up_payload("carla@exemplo.com", Some(uuid::Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Unidade")));
    assert!(world.store.rows(Table::Users).is_empty());
}

#[tokio::test]
async fn confirmation_required_is_a_distinct_outcome() {
    let world = World::with_settings(Settings {
        require_email_confirmation: true,
        ..test_settings()
    });
    let session = world.state.auth_session(world.state.auth.unbound());

    let outcome = session
        .sign_up(sign_up_payload("carla@exemplo.com", None))
        .await
        .unwrap();
    let SignUpOutcome::ConfirmationPending { user_id, email } = outcome else {
        panic!("deveria aguardar confirmação");
    };
    assert_eq!(email, "carla@exemplo.com");

    let login = world.state.auth_session(world.state.auth.unbound());
    let err = login.sign_in("carla@exemplo.com", "segredo123").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    world.state.auth.confirm_user(user_id).await.unwrap();
    let response = login.sign_in("carla@exemplo.com", "segredo123").await.unwrap();
    assert_eq!(response.access.user_id, Some(user_id));
    assert_eq!(response.access.status, AccessStatus::NoRole);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let world = World::new();
    let first = world.state.auth_session(world.state.auth.unbound());
    first.sign_up(sign_up_payload("carla@exemplo.com", None)).await.unwrap();

    let second = world.state.auth_session(world.state.auth.unbound());
    let err = second
        .sign_up(sign_up_payload("CARLA@exemplo.com", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailAlreadyExists));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let world = World::new();
    let session = world.state.auth_session(world.state.auth.unbound());
    session.sign_up(sign_up_payload("carla@exemplo.com", None)).await.unwrap();

    let login = world.state.auth_session(world.state.auth.unbound());
    assert!(matches!(
        login.sign_in("carla@exemplo.com", "errada").await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(matches!(
        login.sign_in("ninguem@exemplo.com", "segredo123").await,
        Err(AppError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn issued_token_authenticates_later_requests() {
    let world = World::new();
    let session = world.state.auth_session(world.state.auth.unbound());
    session.sign_up(sign_up_payload("carla@exemplo.com", None)).await.unwrap();

    let login = world.state.auth_session(world.state.auth.unbound());
    let response = login.sign_in("carla@exemplo.com", "segredo123").await.unwrap();

    let request = world.state.auth.bind_token(&response.token);
    let current = request.get_session().await.unwrap().expect("sessão do token");
    assert_eq!(Some(current.user.id), response.access.user_id);

    let forged = world.state.auth_session(world.state.auth.bind_token("nao-e-um-jwt"));
    assert!(forged.check_session().await.is_none());
    assert!(!forged.current_access().await.is_authenticated);
}

#[tokio::test]
async fn sign_out_clears_the_cached_role() {
    let world = World::new();
    let (t1, _, _) = world.building("Residencial Aurora");
    let signup = world.state.auth_session(world.state.auth.unbound());
    let SignUpOutcome::SignedIn { access, .. } = signup
        .sign_up(sign_up_payload("porteiro@exemplo.com", None))
        .await
        .unwrap()
    else {
        panic!("cadastro deveria entrar direto");
    };
    let user_id = access.user_id.unwrap();
    world.store.seed(
        Table::RoleBindings,
        [serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "user_id": user_id,
            "tenant_id": t1,
            "role": "gatekeeper",
            "created_at": chrono::Utc::now(),
        })],
    );

    let session = world.state.auth_session(world.state.auth.unbound());
    let response = session.sign_in("porteiro@exemplo.com", "segredo123").await.unwrap();
    assert_eq!(response.access.effective_role, Some(Role::Gatekeeper));
    assert!(world.state.role_cache.get(user_id).is_some());

    session.sign_out().await.unwrap();
    assert!(world.state.role_cache.get(user_id).is_none());
    assert!(matches!(
        session.resolver().resolve_role(false).await,
        Err(AppError::Unauthenticated)
    ));
}

#[tokio::test]
async fn sign_out_during_resolution_does_not_resurrect_the_role() {
    let world = World::gated();
    let (_, _, u1) = world.building("Residencial Aurora");
    let user = world.user("morador@exemplo.com");
    world.resident(&user, u1, "approved");

    let auth = Arc::new(StaticAuth::signed_in(&user));
    let resolver = world.resolver(auth.clone());
    let session = AuthSession::new(
        resolver.clone(),
        world.state.store.clone(),
        world.state.profiles.clone(),
        Duration::from_millis(200),
    );

    world.gate.arm();
    let (resolved, signed_out) = tokio::join!(resolver.resolve_role(false), async {
        world.gate.entered.notified().await;
        let result = session.sign_out().await;
        world.gate.release();
        result
    });

    // Quem já esperava recebe o resultado, mas ele não volta para o cache.
    assert_eq!(resolved.unwrap().effective_role, Some(Role::Resident));
    signed_out.unwrap();
    assert!(world.state.role_cache.get(user.id).is_none());
    assert!(matches!(
        resolver.resolve_role(false).await,
        Err(AppError::Unauthenticated)
    ));
}

#[tokio::test]
async fn sign_out_while_session_check_is_pending_does_not_resurrect_the_role() {
    let world = World::new();
    let (_, _, u1) = world.building("Residencial Aurora");
    let user = world.user("morador@exemplo.com");
    world.resident(&user, u1, "approved");

    let gate = Arc::new(Gate::default());
    let auth = Arc::new(StaticAuth::gated(&user, gate.clone()));
    let resolver = world.resolver(auth.clone());
    let session = AuthSession::new(
        resolver.clone(),
        world.state.store.clone(),
        world.state.profiles.clone(),
        Duration::from_millis(200),
    );

    // A resolução já leu a sessão quando o logout acontece.
    gate.arm();
    let (resolved, signed_out) = tokio::join!(resolver.resolve_role(false), async {
        gate.entered.notified().await;
        let result = session.sign_out().await;
        gate.release();
        result
    });

    assert_eq!(resolved.unwrap().effective_role, Some(Role::Resident));
    signed_out.unwrap();
    assert!(world.state.role_cache.get(user.id).is_none());
    assert!(matches!(
        resolver.resolve_role(false).await,
        Err(AppError::Unauthenticated)
    ));
}

#[tokio::test]
async fn sign_out_with_unresponsive_provider_still_clears_the_cache() {
    let world = World::new();
    let (_, _, u1) = world.building("Residencial Aurora");
    let user = world.user("morador@exemplo.com");
    world.resident(&user, u1, "approved");

    let (warm, _) = world.resolver_for(&user);
    warm.resolve_role(false).await.unwrap();
    assert!(world.state.role_cache.get(user.id).is_some());

    let auth = Arc::new(StaticAuth::hanging(&user));
    let session = AuthSession::new(
        world.resolver(auth),
        world.state.store.clone(),
        world.state.profiles.clone(),
        Duration::from_millis(50),
    );
    session.sign_out().await.unwrap();
    assert!(world.state.role_cache.get(user.id).is_none());
}

#[tokio::test]
async fn hanging_session_check_times_out() {
    let world = World::new();
    let user = world.user("lento@exemplo.com");
    let auth = Arc::new(StaticAuth::hanging(&user));
    let session = AuthSession::new(
        world.resolver(auth),
        world.state.store.clone(),
        world.state.profiles.clone(),
        Duration::from_millis(100),
    );

    assert!(session.check_session().await.is_none());
    let access = session.current_access().await;
    assert!(access.needs_login);
}

#[tokio::test]
async fn session_changes_trigger_a_fresh_resolution() {
    let world = World::new();
    let (t1, _, _) = world.building("Residencial Aurora");
    let user = world.user("porteiro@exemplo.com");
    world.bind(&user, Some(t1), Role::Gatekeeper);

    let auth = Arc::new(StaticAuth::signed_in(&user));
    let session = AuthSession::new(
        world.resolver(auth.clone()),
        world.state.store.clone(),
        world.state.profiles.clone(),
        Duration::from_millis(200),
    );

    // Valor antigo em cache: o evento precisa ignorá-lo.
    session.resolver().resolve_role(false).await.unwrap();
    world.bind(&user, Some(t1), Role::TenantAdmin);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watch = session.on_session_change(move |event, access| {
        let _ = tx.send((event, access));
    });

    auth.publish(AuthEvent::SignedIn(user.clone()));
    let (event, access) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, AuthEvent::SignedIn(user.clone()));
    assert_eq!(access.unwrap().effective_role, Some(Role::TenantAdmin));

    auth.publish(AuthEvent::SignedOut(user.id));
    let (event, access) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, AuthEvent::SignedOut(user.id));
    assert!(access.is_none());
    assert!(world.state.role_cache.get(user.id).is_none());

    drop(watch);
}

#[tokio::test]
async fn password_update_keeps_the_session_usable() {
    let world = World::new();
    let signup = world.state.auth_session(world.state.auth.unbound());
    signup.sign_up(sign_up_payload("carla@exemplo.com", None)).await.unwrap();

    signup.update_password("nova-senha-456").await.unwrap();

    let login = world.state.auth_session(world.state.auth.unbound());
    assert!(login.sign_in("carla@exemplo.com", "segredo123").await.is_err());
    assert!(login.sign_in("carla@exemplo.com", "nova-senha-456").await.is_ok());
    login.reset_password("carla@exemplo.com").await.unwrap();
}
