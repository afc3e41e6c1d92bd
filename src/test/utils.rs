use crate::auth::Role;
use crate::db::{create_registration, create_training, create_user};
use crate::error::AppError;
use rocket::http::{ContentType, Cookie};
use rocket::local::asynchronous::Client;
use serde_json::json;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use std::collections::HashMap;
use std::sync::Once;

static INIT: Once = Once::new();
pub static STANDARD_PASSWORD: &str = "password123";

#[derive(Default)]
pub struct TestDbBuilder {
    users: Vec<TestUser>,
    trainings: Vec<TestTraining>,
    registrations: Vec<TestRegistration>,
}

pub struct TestUser {
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub password: String,
}

pub struct TestTraining {
    pub title: String,
    pub location: String,
    pub training_date: String,
    pub training_time: String,
    pub coach_email: Option<String>,
}

pub struct TestRegistration {
    pub training_title: Option<String>,
    pub player_email: Option<String>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(mut self, email: &str, full_name: Option<&str>) -> Self {
        self.users.push(TestUser {
            email: email.to_string(),
            full_name: full_name.map(String::from),
            role: Role::Player,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn coach(mut self, email: &str, full_name: Option<&str>) -> Self {
        self.users.push(TestUser {
            email: email.to_string(),
            full_name: full_name.map(String::from),
            role: Role::Coach,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn admin(mut self, email: &str, full_name: Option<&str>) -> Self {
        self.users.push(TestUser {
            email: email.to_string(),
            full_name: full_name.map(String::from),
            role: Role::Admin,
            password: STANDARD_PASSWORD.to_string(),
        });
        self
    }

    pub fn training(
        mut self,
        title: &str,
        location: &str,
        training_date: &str,
        training_time: &str,
        coach_email: Option<&str>,
    ) -> Self {
        self.trainings.push(TestTraining {
            title: title.to_string(),
            location: location.to_string(),
            training_date: training_date.to_string(),
            training_time: training_time.to_string(),
            coach_email: coach_email.map(String::from),
        });
        self
    }

    pub fn registration(
        mut self,
        training_title: Option<&str>,
        player_email: Option<&str>,
    ) -> Self {
        self.registrations.push(TestRegistration {
            training_title: training_title.map(String::from),
            player_email: player_email.map(String::from),
        });
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let mut user_id_map: HashMap<String, i64> = HashMap::new();
        let mut training_id_map: HashMap<String, i64> = HashMap::new();

        for user in &self.users {
            let user_id = create_user(
                &pool,
                &user.email,
                &user.password,
                user.full_name.as_deref().unwrap_or(""),
                user.role.as_str(),
            )
            .await?;

            user_id_map.insert(user.email.clone(), user_id);
        }

        for training in &self.trainings {
            let coach_id = match &training.coach_email {
                Some(coach_email) => user_id_map.get(coach_email).copied(),
                None => self
                    .users
                    .iter()
                    .find(|u| matches!(u.role, Role::Coach))
                    .map(|u| user_id_map[&u.email]),
            };

            if let Some(coach_id) = coach_id {
                let training_id = create_training(
                    &pool,
                    coach_id,
                    &training.title,
                    None,
                    &training.location,
                    &training.training_date,
                    &training.training_time,
                )
                .await?;

                training_id_map.insert(training.title.clone(), training_id);
            }
        }

        for registration in &self.registrations {
            let player_id = match &registration.player_email {
                Some(email) => user_id_map.get(email).copied(),
                None => self
                    .users
                    .iter()
                    .find(|u| matches!(u.role, Role::Player))
                    .map(|u| user_id_map[&u.email]),
            };

            let training_id = match &registration.training_title {
                Some(title) => training_id_map.get(title).copied(),
                None => training_id_map.values().next().copied(),
            };

            if let (Some(player_id), Some(training_id)) = (player_id, training_id) {
                create_registration(&pool, training_id, player_id).await?;
            }
        }

        Ok(TestDb {
            pool,
            user_id_map,
            training_id_map,
        })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    pub user_id_map: HashMap<String, i64>,
    pub training_id_map: HashMap<String, i64>,
}

impl TestDb {
    pub fn user_id(&self, email: &str) -> Option<i64> {
        self.user_id_map.get(email).copied()
    }

    pub fn training_id(&self, title: &str) -> Option<i64> {
        self.training_id_map.get(title).copied()
    }

    pub async fn registration_id(
        &self,
        training_title: &str,
        player_email: &str,
    ) -> Result<i64, sqlx::Error> {
        let training_id = self
            .training_id(training_title)
            .ok_or(sqlx::Error::RowNotFound)?;

        let player_id = self.user_id(player_email).ok_or(sqlx::Error::RowNotFound)?;

        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM training_registrations
             WHERE training_id = ? AND player_id = ?",
        )
        .bind(training_id)
        .bind(player_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}

/// An admin, two coaches, a player, one upcoming and one past training, and
/// the player registered on the upcoming one.
pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .admin("admin@example.com", Some("Admin User"))
        .coach("coach@example.com", Some("Coach User"))
        .coach("other.coach@example.com", Some("Other Coach"))
        .player("player@example.com", Some("Player User"))
        .training(
            "Evening drills",
            "Gym Hall A",
            "2099-01-15",
            "18:00",
            Some("coach@example.com"),
        )
        .training(
            "Morning conditioning",
            "Track",
            "2020-01-15",
            "07:30",
            Some("coach@example.com"),
        )
        .registration(Some("Evening drills"), Some("player@example.com"))
        .build()
        .await
        .expect("Failed to build test database")
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let rocket = crate::init_rocket(test_db.pool.clone()).await;
    let client = Client::tracked(rocket)
        .await
        .expect("valid rocket instance");

    (client, test_db)
}

pub async fn login_test_user(client: &Client, email: &str, password: &str) -> Vec<Cookie<'static>> {
    let response = client
        .post("/api/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "email": email,
                "password": password
            })
            .to_string(),
        )
        .dispatch()
        .await;

    response
        .cookies()
        .iter()
        .map(|cookie| cookie.clone().into_owned())
        .collect()
}
