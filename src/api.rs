use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::UserSession;
use crate::auth::{Permission, User};
use crate::db::{
    authenticate_user, cancel_training, create_registration, create_training, create_user,
    create_user_session, delete_registration, delete_training, delete_user, find_registration,
    find_user_by_email, get_all_users, get_registration, get_training, get_user,
    invalidate_session, list_player_registrations, list_training_registrations, list_trainings,
    set_attendance, update_training, update_user_full_name, update_user_password,
    update_user_role,
};
use crate::models::{PlayerRegistration, Registration, Training};
use crate::validation::AppErrorExt;
use crate::validation::JsonValidateExt;
use crate::validation::PermissionCheckExt;
use crate::validation::ToValidationResponse;
use crate::validation::ValidationResponse;
use crate::validation::{validate_role, validate_training_date, validate_training_time};

#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    use chrono::Utc;
    use rocket::http::{Cookie, SameSite};

    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.email, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            // Create session token
            let token = UserSession::generate_token();
            let expires_at = Utc::now() + chrono::Duration::hours(1);

            create_user_session(db, user.id, &token, expires_at.naive_utc())
                .await
                .validate_custom()?;

            let cookie = Cookie::build(("session_token", token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .max_age(rocket::time::Duration::hours(1));
            cookies.add_private(cookie);

            cookies.add_private(
                Cookie::build(("user_id", user.id.to_string()))
                    .same_site(SameSite::Lax)
                    .http_only(true)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("user_role", user.role.to_string()))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            let redirect_url = match user.role.as_str() {
                "admin" => "/admin".to_string(),
                "coach" => "/trainings/coach".to_string(),
                _ => "/trainings".to_string(),
            };

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(user)),
                error: None,
                redirect_url: Some(redirect_url),
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid email or password".to_string()),
            redirect_url: None,
        })),
    }
}

#[post("/logout")]
pub async fn api_logout(
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Json<MessageResponse> {
    let token = cookies
        .get_private("session_token")
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        let _ = invalidate_session(db, &token).await;
    }

    cookies.remove_private(rocket::http::Cookie::build("session_token"));
    cookies.remove_private(rocket::http::Cookie::build("user_id"));
    cookies.remove_private(rocket::http::Cookie::build("user_role"));

    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

#[get("/profile")]
pub async fn api_get_profile(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<UserData>>, Status> {
    user.require_permission(Permission::ViewOwnProfile)?;

    let profile = get_user(db, user.id).await?;

    Ok(Json(DataResponse {
        data: UserData::from(profile),
    }))
}

#[derive(Deserialize, Validate, Clone)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    full_name: String,
}

#[put("/profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;

    let validated = profile.validate_custom()?;

    update_user_full_name(db, user.id, &validated.full_name)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[derive(Deserialize, Validate)]
pub struct PasswordChangeRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    new_password: String,
}

#[post("/change-password", data = "<password>")]
pub async fn api_change_password(
    password: Json<PasswordChangeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = password.validate_custom()?;

    let is_valid = authenticate_user(db, &user.email, &validated.current_password)
        .await
        .validate_custom()?;

    match is_valid {
        Some(_) => {
            update_user_password(db, user.id, &validated.new_password)
                .await
                .validate_custom()?;

            Ok(Status::Ok)
        }
        _ => Err(Custom(
            Status::Unauthorized,
            Json(ValidationResponse::with_error(
                "current_password",
                "Current password is incorrect",
            )),
        )),
    }
}

#[derive(FromForm)]
pub struct TrainingsQueryParams {
    upcoming: Option<bool>,
}

#[get("/trainings?<params..>")]
pub async fn api_list_trainings(
    params: TrainingsQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Vec<Training>>>, Status> {
    user.require_permission(Permission::ViewTrainings)?;

    let trainings = list_trainings(db, params.upcoming.unwrap_or(false)).await?;

    Ok(Json(DataResponse { data: trainings }))
}

#[derive(Deserialize, Validate)]
pub struct CreateTrainingRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    title: String,
    description: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    location: String,
    #[validate(custom(function = "validate_training_date"))]
    training_date: String,
    #[validate(custom(function = "validate_training_time"))]
    training_time: String,
}

#[post("/trainings", data = "<training>")]
pub async fn api_create_training(
    training: Json<CreateTrainingRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<DataResponse<Training>>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::CreateTrainings)
        .validate_custom()?;

    let validated = training.validate_custom()?;

    let training_id = create_training(
        db,
        user.id,
        &validated.title,
        validated.description.as_deref(),
        &validated.location,
        &validated.training_date,
        &validated.training_time,
    )
    .await
    .validate_custom()?;

    let created = get_training(db, training_id).await.validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(DataResponse { data: created }),
    ))
}

#[get("/trainings/<id>")]
pub async fn api_get_training(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Training>>, Status> {
    user.require_permission(Permission::ViewTrainings)?;

    let training = get_training(db, id).await?;

    Ok(Json(DataResponse { data: training }))
}

#[derive(Deserialize, Validate)]
pub struct TrainingUpdateRequest {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty"))]
    title: Option<String>,
    description: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location must not be empty"))]
    location: Option<String>,
    #[validate(custom(function = "validate_training_date"))]
    training_date: Option<String>,
    #[validate(custom(function = "validate_training_time"))]
    training_time: Option<String>,
}

fn can_edit_training(user: &User, training: &Training) -> bool {
    let is_own_training =
        training.coach.id == user.id && user.has_permission(Permission::EditOwnTrainings);

    is_own_training || user.has_permission(Permission::EditAllTrainings)
}

#[put("/trainings/<id>", data = "<update>")]
pub async fn api_update_training(
    id: i64,
    update: Json<TrainingUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Training>>, Custom<Json<ValidationResponse>>> {
    let validated = update.validate_custom()?;

    let existing = get_training(db, id).await.validate_custom()?;

    if !can_edit_training(&user, &existing) {
        return Err(Status::Forbidden.to_validation_response());
    }

    let title = validated.title.unwrap_or(existing.title);
    let description = validated.description.or(existing.description);
    let location = validated.location.unwrap_or(existing.location);
    let training_date = validated.training_date.unwrap_or(existing.training_date);
    let training_time = validated.training_time.unwrap_or(existing.training_time);

    update_training(
        db,
        id,
        &title,
        description.as_deref(),
        &location,
        &training_date,
        &training_time,
    )
    .await
    .validate_custom()?;

    let updated = get_training(db, id).await.validate_custom()?;

    Ok(Json(DataResponse { data: updated }))
}

#[delete("/trainings/<id>")]
pub async fn api_delete_training(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, Status> {
    let existing = get_training(db, id).await?;

    if !can_edit_training(&user, &existing) {
        return Err(Status::Forbidden);
    }

    delete_training(db, id).await?;

    Ok(Json(MessageResponse {
        message: "Training deleted successfully".to_string(),
    }))
}

#[post("/trainings/<id>/cancel")]
pub async fn api_cancel_training(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Training>>, Status> {
    let existing = get_training(db, id).await?;

    if !can_edit_training(&user, &existing) {
        return Err(Status::Forbidden);
    }

    cancel_training(db, id).await?;

    let cancelled = get_training(db, id).await?;

    Ok(Json(DataResponse { data: cancelled }))
}

#[get("/trainings/<id>/registrations")]
pub async fn api_get_training_registrations(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Vec<Registration>>>, Status> {
    user.require_permission(Permission::ViewTrainings)?;

    // 404 before an empty roster for a training that doesn't exist
    get_training(db, id).await?;

    let registrations = list_training_registrations(db, id).await?;

    Ok(Json(DataResponse {
        data: registrations,
    }))
}

#[post("/trainings/<id>/registrations")]
pub async fn api_register_for_training(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<DataResponse<Registration>>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::RegisterSelf)
        .validate_custom()?;

    let training = get_training(db, id).await.validate_custom()?;

    if training.cancelled_at.is_some() {
        return Err(Custom(
            Status::BadRequest,
            Json(ValidationResponse::with_error(
                "training",
                "Training has been cancelled",
            )),
        ));
    }

    if find_registration(db, id, user.id)
        .await
        .validate_custom()?
        .is_some()
    {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "registration",
                "Already registered for this training",
            )),
        ));
    }

    let registration_id = create_registration(db, id, user.id).await.validate_custom()?;

    let registration = get_registration(db, registration_id)
        .await
        .validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(DataResponse { data: registration }),
    ))
}

#[delete("/trainings/<id>/registrations")]
pub async fn api_withdraw_from_training(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, Status> {
    user.require_permission(Permission::WithdrawSelf)?;

    // Deleting an absent registration is fine; withdraw stays idempotent
    delete_registration(db, id, user.id).await?;

    Ok(Json(MessageResponse {
        message: "Unregistered successfully".to_string(),
    }))
}

#[get("/my-registrations")]
pub async fn api_my_registrations(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Vec<PlayerRegistration>>>, Status> {
    user.require_permission(Permission::ViewOwnRegistrations)?;

    let registrations = list_player_registrations(db, user.id).await?;

    Ok(Json(DataResponse {
        data: registrations,
    }))
}

#[derive(Deserialize)]
pub struct AttendanceUpdateRequest {
    present: Option<bool>,
}

#[put("/registrations/<id>/attendance", data = "<attendance>")]
pub async fn api_set_attendance(
    id: i64,
    attendance: Json<AttendanceUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Registration>>, Status> {
    let registration = get_registration(db, id).await?;

    let training = get_training(db, registration.training_id).await?;

    let marks_own_roster =
        training.coach.id == user.id && user.has_permission(Permission::MarkAttendance);

    if !marks_own_roster && !user.has_permission(Permission::EditAllTrainings) {
        return Err(Status::Forbidden);
    }

    set_attendance(db, id, attendance.present).await?;

    let updated = get_registration(db, id).await?;

    Ok(Json(DataResponse { data: updated }))
}

#[get("/admin/users")]
pub async fn api_get_all_users(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<Vec<UserData>>>, Status> {
    user.require_permission(Permission::ManageUsers)?;

    let users = get_all_users(db).await?;

    Ok(Json(DataResponse {
        data: users.into_iter().map(UserData::from).collect(),
    }))
}

#[derive(Deserialize, Validate, Clone)]
pub struct CreateUserRequest {
    #[validate(email(message = "Must be a valid email address"))]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    full_name: String,
    #[validate(custom(function = "validate_role"))]
    role: String,
}

#[post("/admin/users", data = "<registration>")]
pub async fn api_create_user(
    registration: Json<CreateUserRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<DataResponse<UserData>>>, Custom<Json<ValidationResponse>>> {
    let validated = registration.validate_custom()?;

    match validated.role.as_str() {
        "admin" => user
            .require_all_permissions(&[Permission::ManageUsers, Permission::EditUserRoles])
            .validate_custom()?,
        _ => user
            .require_permission(Permission::ManageUsers)
            .validate_custom()?,
    };

    let existing_user = find_user_by_email(db, &validated.email)
        .await
        .validate_custom()?;

    if existing_user.is_some() {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "email",
                "Email is already registered",
            )),
        ));
    }

    let user_id = create_user(
        db,
        &validated.email,
        &validated.password,
        &validated.full_name,
        &validated.role,
    )
    .await
    .validate_custom()?;

    let created = get_user(db, user_id).await.validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(DataResponse {
            data: UserData::from(created),
        }),
    ))
}

#[derive(Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 120, message = "Full name must not be empty"))]
    full_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: Option<String>,
    #[validate(custom(function = "validate_role"))]
    role: Option<String>,
}

#[put("/admin/users/<id>", data = "<update>")]
pub async fn api_update_user(
    id: i64,
    update: Json<UserUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DataResponse<UserData>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;

    let validated = update.validate_custom()?;

    // For role changes, require EditUserRoles permission
    if validated.role.is_some() {
        user.require_permission(Permission::EditUserRoles)
            .validate_custom()?;
    }

    // 404 before applying anything
    get_user(db, id).await.validate_custom()?;

    if let Some(full_name) = &validated.full_name {
        update_user_full_name(db, id, full_name)
            .await
            .validate_custom()?;
    }

    if let Some(password) = &validated.password {
        update_user_password(db, id, password)
            .await
            .validate_custom()?;
    }

    if let Some(role) = &validated.role {
        update_user_role(db, id, role).await.validate_custom()?;
    }

    let updated = get_user(db, id).await.validate_custom()?;

    Ok(Json(DataResponse {
        data: UserData::from(updated),
    }))
}

#[delete("/admin/users/<id>")]
pub async fn api_delete_user(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::DeleteUsers)
        .validate_custom()?;

    if id == user.id {
        return Err(Custom(
            Status::BadRequest,
            Json(ValidationResponse::with_error(
                "user",
                "Cannot delete your own account",
            )),
        ));
    }

    delete_user(db, id).await.validate_custom()?;

    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
