#![allow(dead_code)]

use axum::http::StatusCode;
use axum_extra::extract::cookie::Cookie;
use axum_test::{TestResponse, TestServer};
use tempfile::TempDir;

use wetube::api::{self, AppState};
use wetube::database::{Database, DatabaseConfig, Record};
use wetube::model::{NewVideo, User, Video};
use wetube::session::{FlashMessage, SessionId, SessionStore, SessionUser, SESSION_COOKIE};
use wetube::storage::Storage;

pub const UPLOAD_LIMIT: usize = 1024 * 1024;

/// A running site backed by a fresh in-memory database and a temporary upload directory.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let storage = Storage::new(uploads.path().to_path_buf(), "/uploads".into());
        storage.prepare().await.unwrap();

        let database = Database::connect(&DatabaseConfig::default()).await.unwrap();
        let engine = api::render::engine().unwrap();
        let state = AppState::new(database, engine, SessionStore::default(), storage);

        let server = TestServer::new(api::create_router(state.clone(), UPLOAD_LIMIT)).unwrap();

        Self {
            server,
            state,
            uploads,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.database
    }

    pub async fn user(&self, username: &str) -> User {
        User::signup(username, "correct horse battery", self.db())
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn fetch_user(&self, id: &Record<User>) -> User {
        User::find(id, self.db()).await.unwrap().unwrap()
    }

    /// Inserts a video under a fixed numeric id.
    pub async fn video(&self, id: i64, title: &str, creator: &User) -> Video {
        let video = NewVideo::new(
            title.to_string(),
            format!("All about {title}"),
            format!("/uploads/{id}.mp4"),
            creator.id.clone(),
        );
        Video::insert(&Record::new(id), &video, self.db())
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn fetch_video(&self, id: i64) -> Option<Video> {
        Video::find(&Record::new(id), self.db()).await.unwrap()
    }

    pub async fn video_count(&self) -> usize {
        Video::all(self.db()).await.unwrap().len()
    }

    pub fn anonymous(&self) -> SessionId {
        self.state.sessions.open()
    }

    pub fn login(&self, user: &User) -> SessionId {
        self.state.sessions.open_as(SessionUser::from(user))
    }

    pub fn flash(&self, session: SessionId) -> Vec<FlashMessage> {
        self.state.sessions.peek_flash(session)
    }
}

pub fn cookie(session: SessionId) -> Cookie<'static> {
    Cookie::new(SESSION_COOKIE, session.to_string())
}

/// The session id the response put in the cookie jar.
pub fn session_cookie(response: &TestResponse) -> SessionId {
    response.cookie(SESSION_COOKIE).value().parse().unwrap()
}

pub fn assert_redirect(response: &TestResponse, location: &str) {
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), location);
}

pub fn location(response: &TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .unwrap()
        .to_string()
}
