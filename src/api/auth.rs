use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use snafu::{OptionExt, ResultExt};
use tracing::instrument;

use crate::model::User;
use crate::session::{Session, SessionUser};

use super::error::*;
use super::form::{self, JoinForm, LoginForm};
use super::render::{Empty, Page};
use super::routes;
use super::state::AppState;

#[instrument(skip_all)]
pub async fn join_form(State(state): State<AppState>, session: Session) -> Response {
    Page::new("Join", &session, Empty {}).render(state.engine, "join.html")
}

#[instrument(skip_all)]
pub async fn join(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<JoinForm>, FormRejection>,
) -> Response {
    let mut form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(%rejection, "malformed join form");
            JoinForm::default()
        }
    };
    form.username = form.username.trim().to_string();

    if let Err(messages) = form::check(&form) {
        return form::reject(&session, messages, routes::JOIN);
    }

    create_account(&state, &session, form)
        .await
        .or_redirect(routes::JOIN)
}

async fn create_account(
    state: &AppState,
    session: &Session,
    form: JoinForm,
) -> Result<Response, ApiError> {
    let existing = User::by_username(&form.username, &state.database)
        .await
        .context(QuerySnafu)?;

    if existing.is_some() {
        let message = format!("The username `{}` is already taken", form.username);
        return Ok(form::reject(session, vec![message], routes::JOIN));
    }

    let user = User::signup(&form.username, &form.password, &state.database)
        .await
        .context(QuerySnafu)?
        .context(NotCreatedSnafu)?;

    session.login(SessionUser::from(&user));
    Ok(Redirect::to(routes::HOME).into_response())
}

#[instrument(skip_all)]
pub async fn login_form(State(state): State<AppState>, session: Session) -> Response {
    Page::new("Log In", &session, Empty {}).render(state.engine, "login.html")
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(%rejection, "malformed login form");
            LoginForm::default()
        }
    };

    if let Err(messages) = form::check(&form) {
        return form::reject(&session, messages, routes::LOGIN);
    }

    let username = form.username.trim();
    match User::verify(username, &form.password, &state.database).await {
        Ok(Some(user)) => {
            session.login(SessionUser::from(&user));
            Redirect::to(routes::HOME).into_response()
        }
        Ok(None) => {
            tracing::info!(username, "rejected a login attempt");
            form::reject(&session, vec!["Invalid username or password".to_string()], routes::LOGIN)
        }
        Err(source) => Err::<Response, _>(source)
            .context(QuerySnafu)
            .or_redirect(routes::LOGIN),
    }
}

#[instrument(skip_all)]
pub async fn logout(session: Session) -> Redirect {
    session.logout();
    Redirect::to(routes::HOME)
}
