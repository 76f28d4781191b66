mod common;

use axum::http::header::SET_COOKIE;

use common::*;
use wetube::model::User;
use wetube::session::FlashMessage;

fn join_form<'a>(username: &'a str, password: &'a str, password2: &'a str) -> [(&'static str, &'a str); 3] {
    [
        ("username", username),
        ("password", password),
        ("password2", password2),
    ]
}

#[tokio::test]
async fn join_creates_an_account_and_logs_in() {
    let app = TestApp::new().await;
    let session = app.anonymous();

    let response = app
        .server
        .post("/join")
        .add_cookie(cookie(session))
        .form(&join_form(" alice ", "correct horse", "correct horse"))
        .await;

    assert_redirect(&response, "/");
    let user = User::by_username("alice", app.db()).await.unwrap().unwrap();
    assert!(user.videos.is_empty());

    let logged_in = app.state.sessions.user(session_cookie(&response)).unwrap();
    assert_eq!(logged_in.id, user.id);
    assert_eq!(logged_in.username, "alice");
}

#[tokio::test]
async fn join_refuses_a_taken_username() {
    let app = TestApp::new().await;
    app.user("alice").await;
    let session = app.anonymous();

    let response = app
        .server
        .post("/join")
        .add_cookie(cookie(session))
        .form(&join_form("alice", "correct horse", "correct horse"))
        .await;

    assert_redirect(&response, "/join");
    assert_eq!(
        app.flash(session),
        vec![FlashMessage::error("The username `alice` is already taken")]
    );
    assert_eq!(app.state.sessions.user(session), None);
}

#[tokio::test]
async fn join_refuses_mismatched_passwords() {
    let app = TestApp::new().await;
    let session = app.anonymous();

    let response = app
        .server
        .post("/join")
        .add_cookie(cookie(session))
        .form(&join_form("alice", "correct horse", "battery staple"))
        .await;

    assert_redirect(&response, "/join");
    assert_eq!(app.flash(session), vec![FlashMessage::error("Passwords do not match")]);
    assert_eq!(User::by_username("alice", app.db()).await.unwrap(), None);
}

#[tokio::test]
async fn passwords_are_not_stored_in_plain_text() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;

    let stored: Option<String> = app
        .db()
        .sql("SELECT VALUE password FROM $id")
        .bind(("id", &alice.id))
        .fetch_first()
        .await
        .unwrap();

    let stored = stored.unwrap();
    assert_ne!(stored, "correct horse battery");
    assert!(stored.starts_with("$argon2"));
}

#[tokio::test]
async fn login_with_the_right_password() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let session = app.anonymous();

    let response = app
        .server
        .post("/login")
        .add_cookie(cookie(session))
        .form(&[("username", "alice"), ("password", "correct horse battery")])
        .await;

    assert_redirect(&response, "/");
    let current = session_cookie(&response);
    assert_ne!(current, session);
    assert!(!app.state.sessions.contains(session));
    assert_eq!(app.state.sessions.user(current).map(|user| user.id), Some(alice.id));
}

#[tokio::test]
async fn login_with_a_wrong_password_is_refused() {
    let app = TestApp::new().await;
    app.user("alice").await;
    let session = app.anonymous();

    let response = app
        .server
        .post("/login")
        .add_cookie(cookie(session))
        .form(&[("username", "alice"), ("password", "wrong password")])
        .await;

    assert_redirect(&response, "/login");
    assert_eq!(
        app.flash(session),
        vec![FlashMessage::error("Invalid username or password")]
    );
    assert_eq!(app.state.sessions.user(session), None);
}

#[tokio::test]
async fn logout_forgets_the_user() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let session = app.login(&alice);

    let response = app.server.get("/logout").add_cookie(cookie(session)).await;

    assert_redirect(&response, "/");
    assert_eq!(app.state.sessions.user(session), None);
    assert!(!app.state.sessions.contains(session));
}

#[tokio::test]
async fn requests_that_never_write_store_no_session() {
    let app = TestApp::new().await;

    for _ in 0..50 {
        let view = app.server.post("/api/videos/nope/view").await;
        assert!(view.headers().get(SET_COOKIE).is_none());

        let home = app.server.get("/").await;
        home.assert_status_ok();
        assert!(home.headers().get(SET_COOKIE).is_none());
    }

    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn a_flash_message_opens_a_session() {
    let app = TestApp::new().await;

    let response = app.server.get("/search").await;

    assert_redirect(&response, "/");
    let session = session_cookie(&response);
    assert_eq!(app.state.sessions.len(), 1);
    assert_eq!(
        app.flash(session),
        vec![FlashMessage::error("Please enter a keyword to search for")]
    );
}

#[tokio::test]
async fn an_unknown_session_cookie_is_not_adopted() {
    let app = TestApp::new().await;
    let forged = app.anonymous();
    app.state.sessions.expire_idle(std::time::Duration::ZERO);
    app.user("alice").await;

    let response = app
        .server
        .post("/login")
        .add_cookie(cookie(forged))
        .form(&[("username", "alice"), ("password", "correct horse battery")])
        .await;

    assert_redirect(&response, "/");
    let current = session_cookie(&response);
    assert_ne!(current, forged);
    assert!(!app.state.sessions.contains(forged));
}
