//! Cookie sessions: who is making the request and which flash messages are waiting for them.
//!
//! [session_layer] resolves the `sid` cookie to a [Session] handle and stores it in the request
//! extensions, handlers then pick it up with the [Session] or [CurrentUser] extractors.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use uuid::Uuid;

use crate::database::Record;
use crate::model::User;

pub use flash::*;

mod flash;

pub const SESSION_COOKIE: &str = "sid";

const LOGIN_PAGE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input.parse().map(SessionId)
    }
}

/// The logged in user as remembered by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Record<User>,
    pub username: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    user: Option<SessionUser>,
    flash: Vec<FlashMessage>,
    last_seen: Instant,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            user: None,
            flash: Vec::new(),
            last_seen: Instant::now(),
        }
    }
}

/// In-process storage for every open session.
///
/// A session is only stored once something is written to it (a flash message or a login), so
/// requests that never need one leave no trace here.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<SessionId, SessionData>>,
    secure: bool,
}

impl SessionStore {
    /// `secure` marks the session cookie as HTTPS only.
    pub fn new(secure: bool) -> Self {
        Self {
            sessions: Arc::default(),
            secure,
        }
    }

    /// Opens an anonymous session right away.
    pub fn open(&self) -> SessionId {
        let id = SessionId::random();
        self.sessions.insert(id, SessionData::default());
        id
    }

    /// Opens a session that is already logged in as `user`.
    pub fn open_as(&self, user: SessionUser) -> SessionId {
        let id = self.open();
        self.with(id, |data| data.user = Some(user));
        id
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// A handle to the session `id`. Nothing is stored until the handle writes.
    pub fn handle(&self, id: SessionId) -> Session {
        Session {
            id: Arc::new(RwLock::new(id)),
            store: self.clone(),
        }
    }

    pub fn user(&self, id: SessionId) -> Option<SessionUser> {
        self.sessions.get(&id).and_then(|data| data.user.clone())
    }

    /// The waiting flash messages, without consuming them.
    pub fn peek_flash(&self, id: SessionId) -> Vec<FlashMessage> {
        self.sessions
            .get(&id)
            .map(|data| data.flash.clone())
            .unwrap_or_default()
    }

    /// Drops every session that has not been used for `max_idle`, returning how many went.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        let mut expired = 0;
        self.sessions.retain(|_, data| {
            let keep = data.last_seen.elapsed() < max_idle;
            if !keep {
                expired += 1;
            }
            keep
        });
        expired
    }

    /// Runs [SessionStore::expire_idle] every `period`, forever.
    pub async fn expire_every(self, period: Duration, max_idle: Duration) {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;

            let expired = self.expire_idle(max_idle);
            if expired > 0 {
                tracing::debug!(expired, remaining = self.len(), "dropped idle sessions");
            }
        }
    }

    fn touch(&self, id: SessionId) {
        if let Some(mut data) = self.sessions.get_mut(&id) {
            data.last_seen = Instant::now();
        }
    }

    fn take_flash(&self, id: SessionId) -> Vec<FlashMessage> {
        self.sessions
            .get_mut(&id)
            .map(|mut data| std::mem::take(&mut data.flash))
            .unwrap_or_default()
    }

    /// Moves the data of `old` under a fresh id, logged in as `user`.
    fn rotate(&self, old: SessionId, user: SessionUser) -> SessionId {
        let mut data = self
            .sessions
            .remove(&old)
            .map(|(_, data)| data)
            .unwrap_or_default();
        data.user = Some(user);
        data.last_seen = Instant::now();

        let id = SessionId::random();
        self.sessions.insert(id, data);
        id
    }

    fn remove(&self, id: SessionId) {
        self.sessions.remove(&id);
    }

    fn with<R>(&self, id: SessionId, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut data = self.sessions.entry(id).or_default();
        data.last_seen = Instant::now();
        f(data.value_mut())
    }
}

/// Request-scoped handle to the requester's session. Clones share the same id, so a login in a
/// handler is visible to [session_layer] when it writes the cookie.
#[derive(Debug, Clone)]
pub struct Session {
    id: Arc<RwLock<SessionId>>,
    store: SessionStore,
}

impl Session {
    pub fn id(&self) -> SessionId {
        *self.id.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.store.user(self.id())
    }

    /// Logs `user` in under a fresh session id, the id used before the login stops working.
    pub fn login(&self, user: SessionUser) {
        let mut id = self.id.write().unwrap_or_else(PoisonError::into_inner);
        let previous = *id;
        let user_id = user.id.clone();

        let current = self.store.rotate(previous, user);
        *id = current;
        tracing::info!(session = %current, %previous, %user_id, "user logged in");
    }

    /// Forgets the whole session, flash messages included.
    pub fn logout(&self) {
        let id = self.id();
        self.store.remove(id);
        tracing::info!(session = %id, "user logged out");
    }

    pub fn flash(&self, message: FlashMessage) {
        self.store.with(self.id(), |data| data.flash.push(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.flash(FlashMessage::error(message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.flash(FlashMessage::success(message));
    }

    /// Removes and returns every waiting flash message.
    pub fn take_flash(&self) -> Vec<FlashMessage> {
        self.store.take_flash(self.id())
    }
}

#[derive(Debug, Snafu)]
pub enum SessionRejection {
    #[snafu(display("the session middleware is not installed for this route"))]
    MissingSession,

    #[snafu(display("this page requires a logged in user"))]
    LoginRequired,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            SessionRejection::MissingSession => {
                tracing::error!("{self}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            SessionRejection::LoginRequired => Redirect::to(LOGIN_PAGE).into_response(),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(SessionRejection::MissingSession)
    }
}

/// The session of a logged in user. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session: Session,
    pub user: SessionUser,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let user = session.user().ok_or(SessionRejection::LoginRequired)?;
        Ok(Self { session, user })
    }
}

fn session_cookie(id: SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn removed_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Attaches a [Session] to every request. The cookie is only set once the session has been
/// written to, it is rewritten when a login changes the id and removed after a logout.
pub async fn session_layer(
    State(store): State<SessionStore>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let known = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<SessionId>().ok())
        .filter(|id| store.contains(*id));

    if let Some(id) = known {
        store.touch(id);
    }

    let session = store.handle(known.unwrap_or_else(SessionId::random));
    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    let id = session.id();
    let stored = store.contains(id);

    match known {
        Some(previous) if previous == id && stored => response,
        _ if stored => (jar.add(session_cookie(id, store.secure)), response).into_response(),
        Some(_) => (jar.remove(removed_cookie()), response).into_response(),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SessionUser {
        SessionUser {
            id: Record::from_key("alice"),
            username: "alice".into(),
        }
    }

    #[test]
    fn flash_messages_are_read_once() {
        let store = SessionStore::default();
        let session = store.handle(store.open());

        session.error("Title is required");
        session.success("New video has been uploaded.");

        assert_eq!(
            session.take_flash(),
            vec![
                FlashMessage::error("Title is required"),
                FlashMessage::success("New video has been uploaded."),
            ]
        );
        assert!(session.take_flash().is_empty());
    }

    #[test]
    fn peeking_leaves_messages_in_place() {
        let store = SessionStore::default();
        let id = store.open();
        store.handle(id).error("nope");

        assert_eq!(store.peek_flash(id).len(), 1);
        assert_eq!(store.peek_flash(id).len(), 1);
    }

    #[test]
    fn reading_does_not_store_a_session() {
        let store = SessionStore::default();
        let session = store.handle(SessionId::random());

        assert_eq!(session.user(), None);
        assert!(session.take_flash().is_empty());
        assert!(store.is_empty());

        session.error("Only video files are allowed");
        assert_eq!(store.len(), 1);
        assert!(store.contains(session.id()));
    }

    #[test]
    fn login_moves_the_session_to_a_new_id() {
        let store = SessionStore::default();
        let before = store.open();
        let session = store.handle(before);
        session.error("kept across the login");

        session.login(alice());

        let after = session.id();
        assert_ne!(before, after);
        assert!(!store.contains(before));
        assert_eq!(store.user(after), Some(alice()));
        assert_eq!(store.peek_flash(after).len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn logout_removes_the_session() {
        let store = SessionStore::default();
        let id = store.open_as(alice());
        let session = store.handle(id);

        session.logout();

        assert_eq!(session.user(), None);
        assert!(!store.contains(id));
        assert!(store.is_empty());
    }

    #[test]
    fn sessions_do_not_share_state() {
        let store = SessionStore::default();
        let logged_in = store.open_as(alice());
        let anonymous = store.open();

        store.handle(anonymous).error("only for the anonymous session");

        assert_eq!(store.user(logged_in), Some(alice()));
        assert_eq!(store.user(anonymous), None);
        assert!(store.peek_flash(logged_in).is_empty());
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::default();
        store.open();
        store.open_as(alice());

        assert_eq!(store.expire_idle(Duration::from_secs(3600)), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(store.expire_idle(Duration::ZERO), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn cookie_is_secure_when_asked() {
        let id = SessionId::random();

        assert_eq!(session_cookie(id, true).secure(), Some(true));
        assert_eq!(session_cookie(id, false).secure(), Some(false));
        assert_eq!(session_cookie(id, false).http_only(), Some(true));
    }

    #[test]
    fn session_ids_parse_from_their_cookie_value() {
        let store = SessionStore::default();
        let id = store.open();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-session".parse::<SessionId>().is_err());
    }
}
