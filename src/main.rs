//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use condominio_backend::{
    config::{AppState, Settings},
    handlers,
    middleware::auth::auth_guard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; o padrão é `info`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let bind_addr = settings.bind_addr.clone();
    let app_state = AppState::new(settings).await?;

    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!().run(pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::sign_up))
        .route("/login", post(handlers::auth::sign_in))
        .route("/reset-password", post(handlers::auth::reset_password));

    // Rotas do usuário logado
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/refresh", get(handlers::auth::refresh_me))
        .route("/me/logout", post(handlers::auth::sign_out))
        .route("/me/password", put(handlers::auth::update_password));

    let tenancy_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_tenants),
        )
        .route(
            "/blocks",
            post(handlers::tenancy::create_block).get(handlers::tenancy::list_blocks),
        )
        .route(
            "/units",
            post(handlers::tenancy::create_unit).get(handlers::tenancy::list_units),
        );

    let role_routes = Router::new()
        .route(
            "/",
            post(handlers::rbac::assign_role).get(handlers::rbac::list_bindings),
        )
        .route("/{id}", delete(handlers::rbac::revoke_role));

    let resident_routes = Router::new()
        .route(
            "/",
            post(handlers::residents::create_resident).get(handlers::residents::list_residents),
        )
        .route("/pending", get(handlers::residents::list_pending))
        .route(
            "/{id}",
            get(handlers::residents::get_resident)
                .patch(handlers::residents::update_resident)
                .delete(handlers::residents::delete_resident),
        )
        .route("/{id}/approve", post(handlers::residents::approve_resident))
        .route("/{id}/reject", post(handlers::residents::reject_resident))
        .route("/{id}/deactivate", post(handlers::residents::deactivate_resident))
        .route("/users/{user_id}/confirm", post(handlers::auth::confirm_user));

    let package_routes = Router::new()
        .route(
            "/",
            post(handlers::packages::create_package).get(handlers::packages::list_packages),
        )
        .route(
            "/{id}",
            get(handlers::packages::get_package)
                .patch(handlers::packages::update_package)
                .delete(handlers::packages::delete_package),
        );

    let visitor_routes = Router::new()
        .route(
            "/",
            post(handlers::visitors::create_visitor).get(handlers::visitors::list_visitors),
        )
        .route(
            "/{id}",
            get(handlers::visitors::get_visitor)
                .patch(handlers::visitors::update_visitor)
                .delete(handlers::visitors::delete_visitor),
        );

    let announcement_routes = Router::new()
        .route(
            "/",
            post(handlers::announcements::create_announcement)
                .get(handlers::announcements::list_visible),
        )
        .route("/all", get(handlers::announcements::list_announcements))
        .route(
            "/{id}",
            get(handlers::announcements::get_announcement)
                .patch(handlers::announcements::update_announcement)
                .delete(handlers::announcements::delete_announcement),
        );

    let poll_routes = Router::new()
        .route(
            "/",
            post(handlers::polls::create_poll).get(handlers::polls::list_polls),
        )
        .route(
            "/{id}",
            get(handlers::polls::get_poll)
                .patch(handlers::polls::update_poll)
                .delete(handlers::polls::delete_poll),
        )
        .route("/{id}/vote", post(handlers::polls::vote));

    let sos_routes = Router::new()
        .route(
            "/",
            post(handlers::sos::raise_alert).get(handlers::sos::list_alerts),
        )
        .route(
            "/{id}",
            get(handlers::sos::get_alert).patch(handlers::sos::attend_alert),
        );

    // Tudo fora de /api/auth passa pelo guardião de autenticação; o
    // contexto do condomínio é montado pelos extratores de cada handler.
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/tenants", tenancy_routes)
        .nest("/roles", role_routes)
        .nest("/residents", resident_routes)
        .nest("/packages", package_routes)
        .nest("/visitors", visitor_routes)
        .nest("/announcements", announcement_routes)
        .nest("/polls", poll_routes)
        .nest("/sos", sos_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
