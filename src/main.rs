/*!
Here we go!
*/
use std::sync::Arc;

use axum::{
    extract::Extension,
    Router,
    routing::{get, post},
};
use simplelog::{ColorChoice, TerminalMode, TermLogger};

use rollbook::config;
use rollbook::inter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("rollbook")
        .build();
    TermLogger::init(
        rollbook::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ).unwrap();
    log::info!("Logging started.");

    let cfg_path = std::env::var("ROLLBOOK_CONFIG")
        .unwrap_or_else(|_| "config.toml".to_owned());
    let glob = config::load_configuration(&cfg_path).await.unwrap();
    let addr = glob.addr;
    let glob = Arc::new(glob);

    let app = Router::new()
        .route("/auth/login", post(inter::auth::login))
        .route("/auth/register", post(inter::auth::register))
        .route("/auth/register-admin", post(inter::auth::register_admin))
        .route(
            "/students",
            get(inter::students::get_all_students)
                .post(inter::students::add_student)
        )
        .route(
            "/students/:id",
            get(inter::students::get_student)
                .put(inter::students::update_student)
                .delete(inter::students::delete_student)
        )
        .route(
            "/schools",
            get(inter::schools::list_schools)
                .post(inter::schools::create_school)
        )
        .layer(Extension(glob));

    log::info!("Listening on {}", &addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
