use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::session_manager::SessionManager;
use findit_core::{MatchHistory, ProfileStore, StatsEngine, validate_contact};
use findit_types::{
    BestMatchEntry, ContactUpdate, GameMode, LoginRequest, Preferences, ProfileSummary,
    RegisterRequest, StartSessionRequest, SubmitImageRequest, UserId, UserProfile,
};

pub mod auth;
pub mod blob_store;
pub mod challenge_seed;
pub mod config;
pub mod error;
pub mod label_detection;
pub mod session_manager;

/// The home screen lists this many best matches per mode
pub const BEST_MATCHES_LIMIT: u64 = 5;

/// Photos arrive base64-encoded inside JSON bodies
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Deserialize)]
struct BestMatchesQuery {
    mode: GameMode,
}

type JsonReply = WithStatus<Json>;

pub fn create_routes(
    session_manager: Arc<SessionManager>,
    auth_service: Arc<AuthService>,
    profiles: Arc<dyn ProfileStore>,
    history: Arc<dyn MatchHistory>,
    blob_directory: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let session_manager_filter = warp::any().map({
        let session_manager = session_manager.clone();
        move || session_manager.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let profiles_filter = warp::any().map({
        let profiles = profiles.clone();
        move || profiles.clone()
    });

    let history_filter = warp::any().map({
        let history = history.clone();
        move || history.clone()
    });

    let auth_header = warp::header::optional::<String>("authorization");

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // Accounts
    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(json_body::<RegisterRequest>())
        .and(auth_filter.clone())
        .and_then(handle_register);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(json_body::<LoginRequest>())
        .and(auth_filter.clone())
        .and_then(handle_login);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and_then(handle_logout);

    // Profile and settings
    let get_profile = warp::path!("profile")
        .and(warp::get())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(profiles_filter.clone())
        .and_then(handle_get_profile);

    let update_contact = warp::path!("profile")
        .and(warp::put())
        .and(json_body::<ContactUpdate>())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(profiles_filter.clone())
        .and_then(handle_update_contact);

    let update_preferences = warp::path!("profile" / "preferences")
        .and(warp::put())
        .and(json_body::<Preferences>())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(profiles_filter.clone())
        .and_then(handle_update_preferences);

    let profile_summary = warp::path!("profile" / "summary")
        .and(warp::get())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(profiles_filter.clone())
        .and_then(handle_profile_summary);

    let best_matches = warp::path!("matches" / "best")
        .and(warp::get())
        .and(warp::query::<BestMatchesQuery>())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(history_filter.clone())
        .and_then(handle_best_matches);

    // Game sessions
    let start_session = warp::path!("sessions")
        .and(warp::post())
        .and(json_body::<StartSessionRequest>())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(session_manager_filter.clone())
        .and_then(handle_start_session);

    let get_session = warp::path!("sessions" / Uuid)
        .and(warp::get())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(session_manager_filter.clone())
        .and_then(handle_get_session);

    let submit_image = warp::path!("sessions" / Uuid / "submit")
        .and(warp::post())
        .and(json_body::<SubmitImageRequest>())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(session_manager_filter.clone())
        .and_then(handle_submit_image);

    let next_challenge = warp::path!("sessions" / Uuid / "next")
        .and(warp::post())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(session_manager_filter.clone())
        .and_then(handle_next_challenge);

    let abandon_session = warp::path!("sessions" / Uuid)
        .and(warp::delete())
        .and(auth_header.clone())
        .and(auth_filter.clone())
        .and(session_manager_filter.clone())
        .and_then(handle_abandon_session);

    // Stored photos, fetched by the label detector
    let blobs = warp::path("blobs").and(warp::fs::dir(blob_directory));

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    health
        .or(register)
        .or(login)
        .or(logout)
        .or(get_profile)
        .or(update_contact)
        .or(update_preferences)
        .or(profile_summary)
        .or(best_matches)
        .or(start_session)
        .or(get_session)
        .or(submit_image)
        .or(next_challenge)
        .or(abandon_session)
        .or(blobs)
        .with(cors)
        .with(warp::log("findit"))
}

fn json_body<T: DeserializeOwned + Send>()
-> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn respond<T: Serialize>(result: Result<T, ApiError>, status: StatusCode) -> JsonReply {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), status),
        Err(error) => {
            if error.status().is_server_error() {
                tracing::error!("Request failed: {}", error);
            }
            error.into_reply()
        }
    }
}

async fn authenticate(
    auth_service: &AuthService,
    auth_header: Option<String>,
) -> Result<UserId, ApiError> {
    let user = auth_service
        .authenticate_header(auth_header.as_deref())
        .await?;
    Ok(user.user_id)
}

async fn load_profile(profiles: &dyn ProfileStore, user_id: UserId) -> Result<UserProfile, ApiError> {
    match profiles.load_profile(user_id).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err(ApiError::NotFound("User not found".to_string())),
        Err(err) => {
            tracing::error!("Failed to fetch profile {}: {}", user_id, err);
            Err(ApiError::Internal("Failed to fetch profile".to_string()))
        }
    }
}

async fn handle_register(
    request: RegisterRequest,
    auth_service: Arc<AuthService>,
) -> Result<JsonReply, warp::Rejection> {
    let result = auth_service.register(&request).await.map_err(ApiError::from);
    Ok(respond(result, StatusCode::CREATED))
}

async fn handle_login(
    request: LoginRequest,
    auth_service: Arc<AuthService>,
) -> Result<JsonReply, warp::Rejection> {
    let result = auth_service.sign_in(&request).await.map_err(ApiError::from);
    Ok(respond(result, StatusCode::OK))
}

async fn handle_logout(
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match auth_header.as_deref() {
        Some(header) => {
            let token = header.strip_prefix("Bearer ").unwrap_or(header);
            auth_service
                .sign_out(token)
                .await
                .map(|()| serde_json::json!({ "signed_out": true }))
                .map_err(ApiError::from)
        }
        None => Err(ApiError::from(auth::AuthError::MissingToken)),
    };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_get_profile(
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    profiles: Arc<dyn ProfileStore>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match authenticate(&auth_service, auth_header).await {
        Ok(user_id) => load_profile(profiles.as_ref(), user_id).await,
        Err(error) => Err(error),
    };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_update_contact(
    update: ContactUpdate,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    profiles: Arc<dyn ProfileStore>,
) -> Result<JsonReply, warp::Rejection> {
    Ok(respond(
        update_contact(update, auth_header, &auth_service, profiles.as_ref()).await,
        StatusCode::OK,
    ))
}

async fn update_contact(
    update: ContactUpdate,
    auth_header: Option<String>,
    auth_service: &AuthService,
    profiles: &dyn ProfileStore,
) -> Result<UserProfile, ApiError> {
    let user_id = authenticate(auth_service, auth_header).await?;
    validate_contact(&update)?;

    let update = ContactUpdate {
        name: update.name.trim().to_string(),
        phone: update.phone.trim().to_string(),
    };
    if let Err(err) = profiles.update_contact(user_id, &update).await {
        tracing::error!("Failed to update profile {}: {}", user_id, err);
        return Err(ApiError::Internal(
            "No se pudo actualizar el perfil. Inténtalo de nuevo.".to_string(),
        ));
    }
    load_profile(profiles, user_id).await
}

async fn handle_update_preferences(
    preferences: Preferences,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    profiles: Arc<dyn ProfileStore>,
) -> Result<JsonReply, warp::Rejection> {
    Ok(respond(
        update_preferences(preferences, auth_header, &auth_service, profiles.as_ref()).await,
        StatusCode::OK,
    ))
}

async fn update_preferences(
    preferences: Preferences,
    auth_header: Option<String>,
    auth_service: &AuthService,
    profiles: &dyn ProfileStore,
) -> Result<Preferences, ApiError> {
    let user_id = authenticate(auth_service, auth_header).await?;
    if let Err(err) = profiles.update_preferences(user_id, preferences).await {
        tracing::error!("Failed to save preferences for {}: {}", user_id, err);
        return Err(ApiError::Internal(
            "No se pudieron guardar las preferencias. Inténtalo de nuevo.".to_string(),
        ));
    }
    Ok(preferences)
}

async fn handle_profile_summary(
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    profiles: Arc<dyn ProfileStore>,
) -> Result<JsonReply, warp::Rejection> {
    let result: Result<ProfileSummary, ApiError> =
        match authenticate(&auth_service, auth_header).await {
            Ok(user_id) => load_profile(profiles.as_ref(), user_id)
                .await
                .map(|profile| StatsEngine::summarize(&profile)),
            Err(error) => Err(error),
        };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_best_matches(
    query: BestMatchesQuery,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    history: Arc<dyn MatchHistory>,
) -> Result<JsonReply, warp::Rejection> {
    let result: Result<Vec<BestMatchEntry>, ApiError> =
        match authenticate(&auth_service, auth_header).await {
            Ok(user_id) => match history
                .best_matches(user_id, query.mode, BEST_MATCHES_LIMIT)
                .await
            {
                Ok(entries) => Ok(entries),
                Err(err) => {
                    // The home screen shows placeholders instead of an error
                    tracing::error!("Failed to fetch best matches for {}: {}", user_id, err);
                    Ok(Vec::new())
                }
            },
            Err(error) => Err(error),
        };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_start_session(
    request: StartSessionRequest,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    session_manager: Arc<SessionManager>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match authenticate(&auth_service, auth_header).await {
        Ok(user_id) => session_manager
            .start_session(user_id, request.mode)
            .await
            .map_err(ApiError::from),
        Err(error) => Err(error),
    };
    Ok(respond(result, StatusCode::CREATED))
}

async fn handle_get_session(
    session_id: Uuid,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    session_manager: Arc<SessionManager>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match authenticate(&auth_service, auth_header).await {
        Ok(user_id) => session_manager
            .get_view(session_id, user_id)
            .map_err(ApiError::from),
        Err(error) => Err(error),
    };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_submit_image(
    session_id: Uuid,
    request: SubmitImageRequest,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    session_manager: Arc<SessionManager>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match authenticate(&auth_service, auth_header).await {
        Ok(user_id) => match base64::engine::general_purpose::STANDARD
            .decode(request.image_base64.trim())
        {
            Ok(image) => session_manager
                .submit_image(session_id, user_id, image)
                .await
                .map_err(ApiError::from),
            Err(_) => Err(ApiError::BadRequest("Invalid image encoding".to_string())),
        },
        Err(error) => Err(error),
    };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_next_challenge(
    session_id: Uuid,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    session_manager: Arc<SessionManager>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match authenticate(&auth_service, auth_header).await {
        Ok(user_id) => session_manager
            .advance(session_id, user_id)
            .await
            .map_err(ApiError::from),
        Err(error) => Err(error),
    };
    Ok(respond(result, StatusCode::OK))
}

async fn handle_abandon_session(
    session_id: Uuid,
    auth_header: Option<String>,
    auth_service: Arc<AuthService>,
    session_manager: Arc<SessionManager>,
) -> Result<JsonReply, warp::Rejection> {
    let result = match authenticate(&auth_service, auth_header).await {
        Ok(user_id) => session_manager
            .abandon(session_id, user_id)
            .await
            .map_err(ApiError::from),
        Err(error) => Err(error),
    };
    Ok(respond(result, StatusCode::OK))
}
