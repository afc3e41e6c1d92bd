#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod models;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_cancel_training, api_change_password, api_create_training, api_create_user,
    api_delete_training, api_delete_user, api_get_all_users, api_get_profile, api_get_training,
    api_get_training_registrations, api_list_trainings, api_login, api_logout, api_me,
    api_me_unauthorized, api_my_registrations, api_register_for_training, api_set_attendance,
    api_update_profile, api_update_training, api_update_user, api_withdraw_from_training, health,
};
use auth::unauthorized_api;
use db::clean_expired_sessions;
use rocket::{Build, Rocket, tokio};
use telemetry::TelemetryFairing;
use telemetry::init_tracing;

use sqlx::SqlitePool;
use tracing::{error, info};

#[launch]
async fn rocket() -> _ {
    if let Err(e) = env::load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    init_tracing();

    let database_url = env::database_url();

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    init_rocket(pool).await
}

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting training scheduler");

    rocket::build()
        .manage(pool)
        .mount(
            "/api",
            routes![
                api_login,
                api_logout,
                api_me,
                api_me_unauthorized,
                api_get_profile,
                api_update_profile,
                api_change_password,
                api_list_trainings,
                api_create_training,
                api_get_training,
                api_update_training,
                api_delete_training,
                api_cancel_training,
                api_get_training_registrations,
                api_register_for_training,
                api_withdraw_from_training,
                api_my_registrations,
                api_set_attendance,
                api_get_all_users,
                api_create_user,
                api_update_user,
                api_delete_user,
            ],
        )
        .register("/api", catchers![unauthorized_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
