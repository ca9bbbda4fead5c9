//! Composition root.
//!
//! [`Platform`] constructs and owns every long-lived piece of the client:
//! settings, session, buses, request client, connection manager and board.
//! Nothing here is global; a process may build as many platforms as it
//! likes (tests build one per case).

use std::path::Path;
use std::sync::Arc;

use finboard_auth::{SessionError, SessionStore};
use finboard_core::{AnalysisRecord, PushEvent, UiSignal, UploadedFile, UserProfile};
use finboard_settings::FinboardSettings;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::{AnalysisSubmission, Credentials, Registration};
use crate::board::{AnalysisBoard, spawn_board_sync};
use crate::bus::{EventBus, recv_lossy};
use crate::errors::ApiError;
use crate::http::RequestClient;
use crate::realtime::{ConnectionManager, ReconnectPolicy};

/// The assembled client.
pub struct Platform {
    settings: FinboardSettings,
    session: Arc<SessionStore>,
    signals: EventBus<UiSignal>,
    client: RequestClient,
    realtime: Arc<ConnectionManager>,
    board: Arc<Mutex<AnalysisBoard>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Platform {
    /// Build from settings, restoring the session from its configured file.
    pub fn new(settings: FinboardSettings) -> Result<Self, ApiError> {
        let session = Arc::new(SessionStore::open(settings.session.resolved_path()));
        Self::with_session(settings, session)
    }

    /// Build around an existing session store.
    pub fn with_session(
        settings: FinboardSettings,
        session: Arc<SessionStore>,
    ) -> Result<Self, ApiError> {
        let buffer = settings.realtime.event_buffer;
        let signals = EventBus::new(buffer);
        let events: EventBus<PushEvent> = EventBus::new(buffer);
        let client = RequestClient::new(&settings.api, Arc::clone(&session), signals.clone())?;
        let realtime = Arc::new(ConnectionManager::new(
            settings.api.ws_url.clone(),
            ReconnectPolicy::from_settings(&settings.realtime),
            events,
        ));
        Ok(Self {
            settings,
            session,
            signals,
            client,
            realtime,
            board: Arc::new(Mutex::new(AnalysisBoard::new())),
            tasks: Vec::new(),
        })
    }

    /// Spawn the board sync and session guard tasks. Calling twice is a no-op.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }
        self.tasks.push(spawn_board_sync(
            Arc::clone(&self.board),
            self.realtime.events().subscribe(),
            self.signals.clone(),
        ));
        self.tasks.push(spawn_session_guard(
            self.signals.subscribe(),
            Arc::clone(&self.realtime),
            Arc::clone(&self.board),
        ));
    }

    /// Settings the platform was built from.
    pub fn settings(&self) -> &FinboardSettings {
        &self.settings
    }

    /// Session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Toasts and session expiry.
    pub fn signals(&self) -> &EventBus<UiSignal> {
        &self.signals
    }

    /// Request client.
    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    /// Push channel.
    pub fn realtime(&self) -> &ConnectionManager {
        &self.realtime
    }

    /// Analysis board.
    pub fn board(&self) -> &Arc<Mutex<AnalysisBoard>> {
        &self.board
    }

    /// Log in and open the push channel.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let credentials = Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let user = self.client.auth().login(&credentials).await?;
        self.realtime.connect(&user.id);
        Ok(user)
    }

    /// Register, log in and open the push channel.
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ApiError> {
        let user = self.client.auth().register(registration).await?;
        self.realtime.connect(&user.id);
        Ok(user)
    }

    /// Reopen the push channel for a persisted session.
    ///
    /// Returns the restored user, or `None` when logged out.
    pub fn resume(&self) -> Option<UserProfile> {
        let user = self.session.user()?;
        info!(user_id = %user.id, "resuming session");
        self.realtime.connect(&user.id);
        Some(user)
    }

    /// Close the push channel, drop the board and clear the session.
    pub fn logout(&self) -> Result<bool, SessionError> {
        self.realtime.disconnect();
        self.board.lock().clear();
        let had_session = self.session.clear()?;
        if had_session {
            info!("logged out");
        }
        Ok(had_session)
    }

    /// Upload a local file and track it on the board.
    pub async fn upload(&self, path: &Path) -> Result<UploadedFile, ApiError> {
        let file = self.client.files().upload_path(path).await?;
        self.board.lock().track_file(file.clone());
        Ok(file)
    }

    /// Submit an analysis and track it on the board.
    pub async fn submit_analysis(
        &self,
        submission: &AnalysisSubmission,
    ) -> Result<AnalysisRecord, ApiError> {
        let record = self.client.analysis().create(submission).await?;
        self.board.lock().track_analysis(record.clone());
        Ok(record)
    }

    /// Refresh the board from `GET /files` and `GET /analysis`.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let files = self.client.files().list().await?;
        let analyses = self.client.analysis().list().await?;
        let mut board = self.board.lock();
        for file in files {
            board.track_file(file);
        }
        for record in analyses {
            board.track_analysis(record);
        }
        Ok(())
    }

    /// Stop background tasks and close the push channel.
    pub fn shutdown(&mut self) {
        self.realtime.disconnect();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Close the push channel and drop the board once the session expires.
fn spawn_session_guard(
    mut signals: broadcast::Receiver<UiSignal>,
    realtime: Arc<ConnectionManager>,
    board: Arc<Mutex<AnalysisBoard>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = recv_lossy(&mut signals, "session_guard").await {
            if signal == UiSignal::SessionExpired {
                info!("session expired, closing push channel");
                realtime.disconnect();
                board.lock().clear();
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use finboard_auth::Session;
    use finboard_core::{AnalysisId, UserId};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::realtime::ConnectionState;

    fn settings_for(server: &MockServer) -> FinboardSettings {
        let mut settings = FinboardSettings::default();
        settings.api.base_url = server.uri();
        // Nothing listens here; the push channel just keeps retrying.
        settings.api.ws_url = "ws://127.0.0.1:9".into();
        settings
    }

    fn user(id: &str) -> UserProfile {
        UserProfile {
            id: UserId::from_raw(id),
            email: format!("{id}@fin.example"),
            full_name: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn login_connects_push_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "user": {"id": "u1", "email": "u1@fin.example"}
            })))
            .mount(&server)
            .await;

        let platform =
            Platform::with_session(settings_for(&server), Arc::new(SessionStore::in_memory()))
                .unwrap();
        let user = platform.login("u1@fin.example", "pw").await.unwrap();
        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(platform.realtime().user_id(), Some(UserId::from_raw("u1")));
        assert_ne!(platform.realtime().state(), ConnectionState::Disconnected);

        assert!(platform.logout().unwrap());
        assert_eq!(platform.realtime().state(), ConnectionState::Disconnected);
        assert!(!platform.session().is_authenticated());
    }

    #[tokio::test]
    async fn resume_needs_persisted_user() {
        let server = MockServer::start().await;
        let session = Arc::new(SessionStore::in_memory());
        let platform = Platform::with_session(settings_for(&server), Arc::clone(&session)).unwrap();
        assert!(platform.resume().is_none());

        session.save(Session::new("tok", Some(user("u5")))).unwrap();
        assert_eq!(platform.resume().unwrap().id.as_str(), "u5");
        assert_eq!(platform.realtime().user_id(), Some(UserId::from_raw("u5")));
    }

    #[tokio::test]
    async fn session_expiry_disconnects_and_clears_board() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/analysis"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
            .mount(&server)
            .await;

        let session = Arc::new(SessionStore::in_memory());
        session.save(Session::new("stale", Some(user("u1")))).unwrap();
        let mut platform = Platform::with_session(settings_for(&server), session).unwrap();
        platform.start();
        let _ = platform.resume();
        platform
            .board()
            .lock()
            .track_analysis(AnalysisRecord::placeholder(AnalysisId::from_raw("r1")));

        let mut status = platform.realtime().subscribe_status();
        let err = platform.client().analysis().list().await.unwrap_err();
        assert!(err.is_auth_failure());

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while platform.realtime().state() != ConnectionState::Disconnected
            || platform.realtime().user_id().is_some()
        {
            assert!(tokio::time::Instant::now() < deadline, "guard never disconnected");
            let _ = tokio::time::timeout(std::time::Duration::from_millis(50), status.recv()).await;
        }
        assert!(!platform.session().is_authenticated());
        assert!(platform.board().lock().analyses().is_empty());
    }

    #[tokio::test]
    async fn submit_tracks_on_board() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analysis"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "r9",
                "file_id": "f1",
                "analysis_type": "ratios",
                "status": "pending"
            })))
            .mount(&server)
            .await;

        let platform =
            Platform::with_session(settings_for(&server), Arc::new(SessionStore::in_memory()))
                .unwrap();
        let submission = AnalysisSubmission::new(finboard_core::FileId::from_raw("f1"), "ratios");
        let record = platform.submit_analysis(&submission).await.unwrap();
        assert!(platform.board().lock().analysis(&record.id).is_some());
    }
}
