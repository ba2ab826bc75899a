use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use test_room_server::{
    app_state::AppState,
    auth::AuthMiddleware,
    config::Config,
    graphql,
    handlers,
    middleware::RequestIdMiddleware,
    services::attempt_sweeper::AttemptSweeper,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    if !cfg!(debug_assertions) {
        config.validate_for_production();
    }

    let state = AppState::new(config.clone())
        .await
        .expect("failed to initialize application state");

    let schema = graphql::create_schema(state.clone());

    // Times out attempts orphaned by closed clients or a previous restart.
    let sweeper = Arc::new(AttemptSweeper::new(
        Arc::clone(&state.attempt_service),
        config.attempt_sweep_interval_secs,
    ));
    sweeper.start_worker().await;

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    log::info!("Starting HTTP server on {}:{}", host, port);
    log::info!("GraphiQL playground: http://{}:{}/graphiql", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(schema.clone()))
            .app_data(web::Data::new(state.jwt_service.clone()))
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .wrap(Cors::permissive())
            .service(handlers::register_organization)
            .service(handlers::login)
            .service(handlers::refresh_token)
            .service(handlers::logout)
            .service(handlers::health_check)
            .service(handlers::health_check_live)
            .service(handlers::health_check_ready)
            .service(handlers::graphiql)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .service(handlers::graphql)
                    .service(handlers::attempt_report)
                    .service(handlers::test_summary),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
