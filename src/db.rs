use crate::{
    auth::{DbUser, DbUserSession, User, UserSession},
    error::AppError,
};
use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::models::{
    DbPlayerRegistration, DbRegistration, DbTraining, PlayerRegistration, Registration, Training,
};

const USER_COLUMNS: &str = "id, email, full_name, role, created_at";

const TRAINING_COLUMNS: &str = "t.id, t.coach_id, t.title, t.description, t.location, \
     t.training_date, t.training_time, t.cancelled_at, t.created_at, t.updated_at, \
     u.full_name AS coach_full_name, u.email AS coach_email";

const REGISTRATION_COLUMNS: &str = "r.id, r.training_id, r.player_id, r.present, \
     r.registered_at, u.full_name AS player_full_name, u.email AS player_email";

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn find_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<User>, AppError> {
    info!("Fetching user by email");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument(skip_all, fields(email))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    #[derive(sqlx::FromRow)]
    struct CredentialRow {
        id: i64,
        password: String,
    }

    let row = sqlx::query_as::<_, CredentialRow>("SELECT id, password FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(credentials) => {
            let valid = bcrypt::verify(password, &credentials.password).unwrap_or(false);
            if valid {
                Ok(Some(get_user(pool, credentials.id).await?))
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

#[instrument(skip_all, fields(email, role))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
    full_name: &str,
    role: &str,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing = sqlx::query_as::<_, (i64,)>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Email '{}' is already registered",
            email
        )));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query("INSERT INTO users (email, password, full_name, role) VALUES (?, ?, ?, ?)")
        .bind(email)
        .bind(hashed_password)
        .bind(full_name)
        .bind(role)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn update_user_full_name(
    pool: &Pool<Sqlite>,
    user_id: i64,
    full_name: &str,
) -> Result<(), AppError> {
    info!("Updating user full name");
    sqlx::query("UPDATE users SET full_name = ?, updated_at = ? WHERE id = ?")
        .bind(full_name)
        .bind(Utc::now().naive_utc())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip_all, fields(user_id))]
pub async fn update_user_password(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating user password");
    let hashed_password = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;

    sqlx::query("UPDATE users SET password = ?, updated_at = ? WHERE id = ?")
        .bind(hashed_password)
        .bind(Utc::now().naive_utc())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn update_user_role(
    pool: &Pool<Sqlite>,
    user_id: i64,
    role: &str,
) -> Result<(), AppError> {
    info!("Updating user role");
    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(Utc::now().naive_utc())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn delete_user(pool: &Pool<Sqlite>, user_id: i64) -> Result<(), AppError> {
    info!("Deleting user");
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    info!("Getting all users");
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users ORDER BY created_at DESC, id DESC",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

#[instrument(skip(description))]
pub async fn create_training(
    pool: &Pool<Sqlite>,
    coach_id: i64,
    title: &str,
    description: Option<&str>,
    location: &str,
    training_date: &str,
    training_time: &str,
) -> Result<i64, AppError> {
    info!("Creating training");
    let res = sqlx::query(
        "INSERT INTO trainings (coach_id, title, description, location, training_date, training_time)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(coach_id)
    .bind(title)
    .bind(description)
    .bind(location)
    .bind(training_date)
    .bind(training_time)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_training(pool: &Pool<Sqlite>, id: i64) -> Result<Training, AppError> {
    info!("Fetching training by ID");
    let row = sqlx::query_as::<_, DbTraining>(&format!(
        "SELECT {} FROM trainings t
         JOIN users u ON u.id = t.coach_id
         WHERE t.id = ?",
        TRAINING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(training) => Ok(Training::from(training)),
        _ => Err(AppError::NotFound(format!(
            "Training with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn list_trainings(
    pool: &Pool<Sqlite>,
    upcoming_only: bool,
) -> Result<Vec<Training>, AppError> {
    info!(upcoming_only = %upcoming_only, "Listing trainings");

    let rows = if upcoming_only {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        sqlx::query_as::<_, DbTraining>(&format!(
            "SELECT {} FROM trainings t
             JOIN users u ON u.id = t.coach_id
             WHERE t.training_date >= ?
             ORDER BY t.training_date ASC, t.training_time ASC",
            TRAINING_COLUMNS
        ))
        .bind(today)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, DbTraining>(&format!(
            "SELECT {} FROM trainings t
             JOIN users u ON u.id = t.coach_id
             ORDER BY t.training_date ASC, t.training_time ASC",
            TRAINING_COLUMNS
        ))
        .fetch_all(pool)
        .await?
    };

    Ok(rows.into_iter().map(Training::from).collect())
}

#[instrument(skip(description))]
pub async fn update_training(
    pool: &Pool<Sqlite>,
    id: i64,
    title: &str,
    description: Option<&str>,
    location: &str,
    training_date: &str,
    training_time: &str,
) -> Result<(), AppError> {
    info!("Updating training");
    sqlx::query(
        "UPDATE trainings
         SET title = ?, description = ?, location = ?, training_date = ?, training_time = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(title)
    .bind(description)
    .bind(location)
    .bind(training_date)
    .bind(training_time)
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument]
pub async fn cancel_training(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Cancelling training");
    let now = Utc::now().naive_utc();
    sqlx::query("UPDATE trainings SET cancelled_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn delete_training(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting training");
    sqlx::query("DELETE FROM trainings WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument]
pub async fn find_registration(
    pool: &Pool<Sqlite>,
    training_id: i64,
    player_id: i64,
) -> Result<Option<i64>, AppError> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT id FROM training_registrations WHERE training_id = ? AND player_id = ?",
    )
    .bind(training_id)
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id,)| id))
}

#[instrument]
pub async fn create_registration(
    pool: &Pool<Sqlite>,
    training_id: i64,
    player_id: i64,
) -> Result<i64, AppError> {
    info!("Registering player for training");
    let res = sqlx::query(
        "INSERT INTO training_registrations (training_id, player_id) VALUES (?, ?)",
    )
    .bind(training_id)
    .bind(player_id)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_registration(pool: &Pool<Sqlite>, id: i64) -> Result<Registration, AppError> {
    info!("Fetching registration by ID");
    let row = sqlx::query_as::<_, DbRegistration>(&format!(
        "SELECT {} FROM training_registrations r
         JOIN users u ON u.id = r.player_id
         WHERE r.id = ?",
        REGISTRATION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(registration) => Ok(Registration::from(registration)),
        _ => Err(AppError::NotFound(format!(
            "Registration with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn list_training_registrations(
    pool: &Pool<Sqlite>,
    training_id: i64,
) -> Result<Vec<Registration>, AppError> {
    info!("Listing registrations for training");
    let rows = sqlx::query_as::<_, DbRegistration>(&format!(
        "SELECT {} FROM training_registrations r
         JOIN users u ON u.id = r.player_id
         WHERE r.training_id = ?
         ORDER BY r.registered_at ASC, r.id ASC",
        REGISTRATION_COLUMNS
    ))
    .bind(training_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Registration::from).collect())
}

#[instrument]
pub async fn list_player_registrations(
    pool: &Pool<Sqlite>,
    player_id: i64,
) -> Result<Vec<PlayerRegistration>, AppError> {
    info!("Listing registrations for player");
    let rows = sqlx::query_as::<_, DbPlayerRegistration>(
        "SELECT r.id, r.training_id, r.present, r.registered_at,
                t.title, t.location, t.training_date, t.training_time, t.cancelled_at
         FROM training_registrations r
         JOIN trainings t ON t.id = r.training_id
         WHERE r.player_id = ?
         ORDER BY r.registered_at DESC, r.id DESC",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PlayerRegistration::from).collect())
}

#[instrument]
pub async fn delete_registration(
    pool: &Pool<Sqlite>,
    training_id: i64,
    player_id: i64,
) -> Result<u64, AppError> {
    info!("Withdrawing player from training");
    let result =
        sqlx::query("DELETE FROM training_registrations WHERE training_id = ? AND player_id = ?")
            .bind(training_id)
            .bind(player_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected())
}

#[instrument]
pub async fn set_attendance(
    pool: &Pool<Sqlite>,
    registration_id: i64,
    present: Option<bool>,
) -> Result<(), AppError> {
    info!("Marking attendance");
    sqlx::query("UPDATE training_registrations SET present = ? WHERE id = ?")
        .bind(present)
        .bind(registration_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
