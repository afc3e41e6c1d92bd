use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Clone)]
pub struct TrainingCoach {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct Training {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub training_date: String,
    pub training_time: String,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub coach: TrainingCoach,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTraining {
    pub id: Option<i64>,
    pub coach_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub training_date: Option<String>,
    pub training_time: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub coach_full_name: Option<String>, // Denormalized for convenience
    pub coach_email: Option<String>,
}

impl From<DbTraining> for Training {
    fn from(training: DbTraining) -> Self {
        Self {
            id: training.id.unwrap_or_default(),
            title: training.title.unwrap_or_default(),
            description: training.description,
            location: training.location.unwrap_or_default(),
            training_date: training.training_date.unwrap_or_default(),
            training_time: training.training_time.unwrap_or_default(),
            cancelled_at: training
                .cancelled_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
            created_at: training
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            updated_at: training
                .updated_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            coach: TrainingCoach {
                id: training.coach_id.unwrap_or_default(),
                full_name: training.coach_full_name.unwrap_or_default(),
                email: training.coach_email.unwrap_or_default(),
            },
        }
    }
}

#[derive(Serialize, Clone)]
pub struct RegistrationPlayer {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct Registration {
    pub id: i64,
    pub training_id: i64,
    pub present: Option<bool>,
    pub registered_at: DateTime<Utc>,
    pub player: RegistrationPlayer,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbRegistration {
    pub id: Option<i64>,
    pub training_id: Option<i64>,
    pub player_id: Option<i64>,
    pub present: Option<bool>,
    pub registered_at: Option<NaiveDateTime>,
    pub player_full_name: Option<String>,
    pub player_email: Option<String>,
}

impl From<DbRegistration> for Registration {
    fn from(registration: DbRegistration) -> Self {
        Self {
            id: registration.id.unwrap_or_default(),
            training_id: registration.training_id.unwrap_or_default(),
            present: registration.present,
            registered_at: registration
                .registered_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            player: RegistrationPlayer {
                id: registration.player_id.unwrap_or_default(),
                full_name: registration.player_full_name.unwrap_or_default(),
                email: registration.player_email.unwrap_or_default(),
            },
        }
    }
}

/// A player's own registration with the training it belongs to folded in.
#[derive(Serialize)]
pub struct PlayerRegistration {
    pub id: i64,
    pub training_id: i64,
    pub present: Option<bool>,
    pub registered_at: DateTime<Utc>,
    pub title: String,
    pub location: String,
    pub training_date: String,
    pub training_time: String,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbPlayerRegistration {
    pub id: Option<i64>,
    pub training_id: Option<i64>,
    pub present: Option<bool>,
    pub registered_at: Option<NaiveDateTime>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub training_date: Option<String>,
    pub training_time: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
}

impl From<DbPlayerRegistration> for PlayerRegistration {
    fn from(registration: DbPlayerRegistration) -> Self {
        Self {
            id: registration.id.unwrap_or_default(),
            training_id: registration.training_id.unwrap_or_default(),
            present: registration.present,
            registered_at: registration
                .registered_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            title: registration.title.unwrap_or_default(),
            location: registration.location.unwrap_or_default(),
            training_date: registration.training_date.unwrap_or_default(),
            training_time: registration.training_time.unwrap_or_default(),
            cancelled_at: registration
                .cancelled_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
        }
    }
}
