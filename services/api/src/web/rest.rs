//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::{AppState, HISTORY_KEY, PROFILE_KEY};
use autocoach_core::domain::{ChatMessage, LearningLevel, UserProfile};
use autocoach_core::persona;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_profile_handler,
        get_profile_handler,
    ),
    components(
        schemas(CreateProfileRequest, ProfileResponse)
    ),
    tags(
        (name = "AutoCoach API", description = "API endpoints for the AI tutoring chat service.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The payload for creating (or resetting) the student profile.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    name: String,
    #[schema(value_type = String, example = "University")]
    learning_level: LearningLevel,
    #[serde(default)]
    subject_preferences: Option<String>,
}

/// The profile as returned by the REST surface.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    name: String,
    learning_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_preferences: Option<String>,
    level: u32,
    xp: u64,
    streak: u32,
    last_login_date: String,
}

impl From<&UserProfile> for ProfileResponse {
    fn from(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone(),
            learning_level: profile.learning_level.label().to_string(),
            subject_preferences: profile.subject_preferences.clone(),
            level: profile.level,
            xp: profile.xp,
            streak: profile.streak,
            last_login_date: profile.last_login_date.to_string(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create the student profile.
///
/// This is the backend half of the sign-up flow: it stores a fresh profile
/// (level 1, 0 XP, streak 1) and resets the transcript to the greeting.
#[utoipa::path(
    post,
    path = "/profile",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created successfully", body = ProfileResponse),
        (status = 400, description = "Bad request (e.g., blank name)"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name must not be blank".to_string()));
    }

    let mut profile = UserProfile::new(
        name.to_string(),
        payload.learning_level,
        Utc::now().date_naive(),
    );
    profile.subject_preferences = payload
        .subject_preferences
        .filter(|p| !p.trim().is_empty());

    let greeting = vec![ChatMessage::bot(persona::signup_greeting(&profile))];

    let result = async {
        app_state
            .store
            .set(PROFILE_KEY, serde_json::to_value(&profile).unwrap())
            .await?;
        app_state
            .store
            .set(HISTORY_KEY, serde_json::to_value(&greeting).unwrap())
            .await
    }
    .await;

    match result {
        Ok(()) => Ok((StatusCode::CREATED, Json(ProfileResponse::from(&profile)))),
        Err(e) => {
            error!("Failed to create profile: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create profile".to_string(),
            ))
        }
    }
}

/// Fetch the stored student profile, if any.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The stored profile", body = ProfileResponse),
        (status = 404, description = "No profile has been created yet"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_profile_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stored = app_state.store.get(PROFILE_KEY).await.map_err(|e| {
        error!("Failed to read profile: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to read profile".to_string(),
        )
    })?;

    let Some(value) = stored else {
        return Err((StatusCode::NOT_FOUND, "No profile found".to_string()));
    };

    // A malformed stored value is treated as absent, like everywhere else.
    match serde_json::from_value::<UserProfile>(value) {
        Ok(profile) => Ok(Json(ProfileResponse::from(&profile))),
        Err(_) => Err((StatusCode::NOT_FOUND, "No profile found".to_string())),
    }
}
