use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::LunaConfig;
use crate::engine::onboarding;
use crate::engine::reflection::{self, ReflectionOption};
use crate::orchestrator::Orchestrator;
use crate::persona;
use crate::profile::{GrowthEntry, PrivacySettings, Relationship, UserProfile};
use crate::sessions::{SessionStore, DEFAULT_SESSION_ID};
use crate::store::UserStore;

#[derive(Clone)]
pub struct ServerState {
    pub orchestrator: Arc<Orchestrator>,
    pub users: Arc<UserStore>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<LunaConfig>,
}

#[derive(Debug, Serialize)]
struct BannerResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WelcomeResponse {
    bot_name: &'static str,
    greeting: &'static str,
    welcome: &'static str,
    ask_name: &'static str,
    ask_expectations: &'static str,
    ask_help: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    user_id: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    user_age: Option<u32>,
    #[serde(default)]
    user_gender: Option<String>,
    #[serde(default)]
    user_location: Option<String>,
    #[serde(default)]
    skip_onboarding: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    reply: String,
    mood: String,
    conversation_count: u32,
    relationship: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum UserLookupResponse {
    Found(Box<UserProfile>),
    NotFound {
        #[serde(rename = "notFound")]
        not_found: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrowthEntryRequest {
    entry_type: String,
    content: String,
    #[serde(default)]
    mood: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GrowthSummaryResponse {
    total_entries: usize,
    wellness_goals: Vec<String>,
    recent_mood: Option<String>,
    relationship: String,
    conversation_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReflectionRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct ReflectionResponse {
    prompt: String,
    options: [ReflectionOption; 4],
}

pub async fn serve(state: ServerState) -> Result<()> {
    let bind_addr = state
        .config
        .bind_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid bind address '{}'", state.config.bind_addr))?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", bind_addr))?;
    tracing::info!("Luna listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .await
        .context("Server failed")?;
    Ok(())
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/welcome", get(welcome))
        .route("/chat", post(chat))
        .route("/user/:user_id", get(get_user))
        .route("/user/:user_id/privacy", post(update_privacy))
        .route("/user/:user_id/growth", post(add_growth_entry))
        .route("/user/:user_id/growth-summary", get(growth_summary))
        .route("/reflection/next", post(next_reflection))
        .with_state(state)
}

async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Luna Wellness Chatbot API is running!",
    })
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        bot_name: persona::BOT_NAME,
        greeting: persona::GREETING,
        welcome: persona::WELCOME,
        ask_name: persona::ASK_NAME,
        ask_expectations: persona::ASK_EXPECTATIONS,
        ask_help: persona::ASK_HELP,
    })
}

/// The main conversational endpoint. Always 200 with a best-effort reply;
/// the empty message gets a typed empty-state reply without touching state.
async fn chat(
    State(state): State<ServerState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let now = Utc::now();

    if body.message.trim().is_empty() {
        let existing = state.users.get(&body.user_id).await;
        let (count, relationship) = match existing {
            Some(entry) => {
                let user = entry.lock().await;
                (user.profile.conversation_count, user.profile.relationship)
            }
            None => (0, Relationship::New),
        };
        return Ok(Json(ChatResponse {
            reply: persona::EMPTY_MESSAGE_REPLY.to_string(),
            mood: "neutral".to_string(),
            conversation_count: count,
            relationship: relationship.as_str().to_string(),
        }));
    }

    let entry = state.users.get_or_create(&body.user_id, now).await;
    let mut user = entry.lock().await;

    if let Some(name) = body.user_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        user.profile.name = Some(name.to_string());
    }
    user.profile.apply_demographics(
        body.user_age,
        body.user_gender.as_deref(),
        body.user_location.as_deref(),
    );

    if let Some(reason) = onboarding::bypass_reason(
        &body.user_id,
        &user.profile,
        body.skip_onboarding,
        &state.config.bypass_prefixes,
    ) {
        onboarding::apply_bypass(&mut user.profile, reason, "friend");
    }

    let reply = state.orchestrator.reply(&mut user, &body.message, now).await;

    state
        .sessions
        .append_message(&body.user_id, DEFAULT_SESSION_ID, "user", &body.message, now)
        .await;
    state
        .sessions
        .append_message(&body.user_id, DEFAULT_SESSION_ID, "luna", &reply.text, now)
        .await;
    if let Some(entry) = user.profile.last_mood() {
        state
            .sessions
            .set_summary(
                &body.user_id,
                format!("Recently felt {}.", entry.mood.as_str()),
            )
            .await;
    }
    state.sessions.spawn_flush();

    Ok(Json(ChatResponse {
        reply: reply.text,
        mood: reply.mood.as_str().to_string(),
        conversation_count: user.profile.conversation_count,
        relationship: user.profile.relationship.as_str().to_string(),
    }))
}

async fn get_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Json<UserLookupResponse> {
    match state.users.get(&user_id).await {
        Some(entry) => {
            let user = entry.lock().await;
            Json(UserLookupResponse::Found(Box::new(user.profile.clone())))
        }
        None => Json(UserLookupResponse::NotFound { not_found: true }),
    }
}

async fn update_privacy(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(settings): Json<PrivacySettings>,
) -> Result<Json<PrivacySettings>, (StatusCode, String)> {
    let entry = state
        .users
        .get(&user_id)
        .await
        .ok_or_else(|| not_found(format!("user '{}' not found", user_id)))?;
    let mut user = entry.lock().await;
    user.profile.privacy_settings = settings.clone();
    state.sessions.spawn_flush();
    Ok(Json(settings))
}

async fn add_growth_entry(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Json(body): Json<GrowthEntryRequest>,
) -> Result<Json<GrowthEntry>, (StatusCode, String)> {
    let entry = state
        .users
        .get(&user_id)
        .await
        .ok_or_else(|| not_found(format!("user '{}' not found", user_id)))?;
    let mut user = entry.lock().await;

    let record = GrowthEntry {
        id: uuid::Uuid::new_v4().to_string(),
        entry_type: body.entry_type,
        content: body.content,
        mood: body.mood,
        timestamp: Utc::now(),
    };
    user.profile
        .growth_tracking
        .progress_markers
        .push(record.clone());
    Ok(Json(record))
}

async fn growth_summary(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> Result<Json<GrowthSummaryResponse>, (StatusCode, String)> {
    let entry = state
        .users
        .get(&user_id)
        .await
        .ok_or_else(|| not_found(format!("user '{}' not found", user_id)))?;
    let user = entry.lock().await;

    Ok(Json(GrowthSummaryResponse {
        total_entries: user.profile.growth_tracking.progress_markers.len(),
        wellness_goals: user.profile.growth_tracking.wellness_goals.clone(),
        recent_mood: user
            .profile
            .last_mood()
            .map(|m| m.mood.as_str().to_string()),
        relationship: user.profile.relationship.as_str().to_string(),
        conversation_count: user.profile.conversation_count,
    }))
}

/// Hand out the next reflection prompt from the user's age-appropriate pool,
/// with four polarity-spread answer options.
async fn next_reflection(
    State(state): State<ServerState>,
    Json(body): Json<ReflectionRequest>,
) -> Result<Json<ReflectionResponse>, (StatusCode, String)> {
    let entry = state.users.get_or_create(&body.user_id, Utc::now()).await;
    let mut user = entry.lock().await;

    let pool = persona::pool_for_age(user.profile.age);
    let selector = state.orchestrator.engine().selector();
    let prompt = reflection::next_prompt(selector, &mut user.rotation, pool);
    let options = reflection::options_for(&prompt);

    Ok(Json(ReflectionResponse { prompt, options }))
}

fn not_found(message: String) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::select::Selector;
    use crate::engine::RuleEngine;
    use crate::llm_client::{GenerationParams, ReplyGenerator, Turn};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct OfflineGenerator;

    #[async_trait]
    impl ReplyGenerator for OfflineGenerator {
        async fn generate(
            &self,
            _turns: &[Turn],
            _params: GenerationParams,
        ) -> anyhow::Result<String> {
            anyhow::bail!("offline")
        }
    }

    fn test_state(dir: &std::path::Path) -> ServerState {
        let config = Arc::new(LunaConfig {
            data_dir: Some(dir.to_string_lossy().into_owned()),
            selector_seed: Some(5),
            ..LunaConfig::default()
        });
        let sessions =
            Arc::new(SessionStore::load(config.sessions_path()).expect("session store"));
        ServerState {
            orchestrator: Arc::new(Orchestrator::new(
                RuleEngine::new(Selector::seeded(5)),
                Arc::new(OfflineGenerator),
                config.clone(),
            )),
            users: Arc::new(UserStore::new()),
            sessions,
            config,
        }
    }

    #[tokio::test]
    async fn empty_message_gets_typed_reply_without_creating_state() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let response = chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "   ".to_string(),
                user_id: "u1".to_string(),
                user_name: None,
                user_age: None,
                user_gender: None,
                user_location: None,
                skip_onboarding: false,
            }),
        )
        .await
        .expect("chat ok");
        assert_eq!(response.0.reply, persona::EMPTY_MESSAGE_REPLY);
        assert_eq!(response.0.conversation_count, 0);
        assert!(state.users.get("u1").await.is_none());
    }

    #[tokio::test]
    async fn chat_advances_count_and_records_session() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let response = chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "hello there".to_string(),
                user_id: "u1".to_string(),
                user_name: None,
                user_age: None,
                user_gender: None,
                user_location: None,
                skip_onboarding: false,
            }),
        )
        .await
        .expect("chat ok");
        assert_eq!(response.0.conversation_count, 1);
        assert_eq!(response.0.relationship, "new");

        let session = state
            .sessions
            .session("u1", DEFAULT_SESSION_ID)
            .await
            .expect("session exists");
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, "user");
        assert_eq!(session.history[1].role, "luna");
    }

    #[tokio::test]
    async fn synthetic_prefix_skips_onboarding() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let response = chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "hey, how's it going?".to_string(),
                user_id: "test_varied_007".to_string(),
                user_name: None,
                user_age: None,
                user_gender: None,
                user_location: None,
                skip_onboarding: false,
            }),
        )
        .await
        .expect("chat ok");
        assert_eq!(response.0.relationship, "acquainted");
    }

    #[tokio::test]
    async fn full_demographics_skip_onboarding_too() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let response = chat(
            State(state.clone()),
            Json(ChatRequest {
                message: "hi Luna".to_string(),
                user_id: "u2".to_string(),
                user_name: Some("Priya".to_string()),
                user_age: Some(27),
                user_gender: Some("female".to_string()),
                user_location: Some("Mumbai".to_string()),
                skip_onboarding: false,
            }),
        )
        .await
        .expect("chat ok");
        assert_eq!(response.0.relationship, "acquainted");

        let entry = state.users.get("u2").await.expect("state exists");
        let user = entry.lock().await;
        assert_eq!(user.profile.name.as_deref(), Some("Priya"));
        assert_eq!(user.profile.age, Some(27));
    }

    #[tokio::test]
    async fn privacy_update_requires_an_existing_user() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let result = update_privacy(
            State(state.clone()),
            Path("ghost".to_string()),
            Json(PrivacySettings::default()),
        )
        .await;
        assert_eq!(result.err().map(|(code, _)| code), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn growth_entries_land_in_the_summary() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());
        state.users.get_or_create("u3", Utc::now()).await;

        let entry = add_growth_entry(
            State(state.clone()),
            Path("u3".to_string()),
            Json(GrowthEntryRequest {
                entry_type: "reflection".to_string(),
                content: "slept 8 hours".to_string(),
                mood: Some("happy".to_string()),
            }),
        )
        .await
        .expect("entry added");
        assert!(!entry.0.id.is_empty());

        let summary = growth_summary(State(state), Path("u3".to_string()))
            .await
            .expect("summary ok");
        assert_eq!(summary.0.total_entries, 1);
    }

    #[tokio::test]
    async fn reflection_prompts_do_not_immediately_repeat() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let mut seen = Vec::new();
        for _ in 0..4 {
            let response = next_reflection(
                State(state.clone()),
                Json(ReflectionRequest {
                    user_id: "u4".to_string(),
                }),
            )
            .await
            .expect("reflection ok");
            assert!(!seen.contains(&response.0.prompt));
            seen.push(response.0.prompt);
        }
    }

    #[tokio::test]
    async fn welcome_carries_the_full_onboarding_copy() {
        let response = welcome().await;
        let value = serde_json::to_value(&response.0).expect("serialize");
        assert_eq!(value["botName"], persona::BOT_NAME);
        for field in ["greeting", "welcome", "askName", "askExpectations", "askHelp"] {
            assert!(
                value[field].as_str().is_some_and(|s| !s.is_empty()),
                "missing field {}",
                field
            );
        }
    }

    #[tokio::test]
    async fn unknown_user_lookup_reports_not_found() {
        let dir = tempdir().expect("tempdir");
        let state = test_state(dir.path());

        let response = get_user(State(state), Path("nobody".to_string())).await;
        match response.0 {
            UserLookupResponse::NotFound { not_found } => assert!(not_found),
            UserLookupResponse::Found(_) => panic!("expected not-found"),
        }
    }
}
