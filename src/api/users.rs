use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use tracing::instrument;

use crate::database::Record;
use crate::model::{User, Video};
use crate::session::Session;

use super::error::*;
use super::render::{video_list, Page, UserView, VideoView};
use super::routes;
use super::state::AppState;

#[derive(Debug, Serialize)]
struct Profile {
    profile: UserView,
    videos: Vec<VideoView>,
}

/// A user's page with everything they uploaded, newest first.
#[instrument(skip_all, fields(user = %key))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Response {
    let id = Record::<User>::from_key(&key);

    show_profile(&state, &session, &id)
        .await
        .or_redirect(routes::HOME)
}

async fn show_profile(
    state: &AppState,
    session: &Session,
    id: &Record<User>,
) -> Result<Response, ApiError> {
    let (user, videos) = futures::try_join!(
        User::find(id, &state.database),
        Video::by_creator(id, &state.database),
    )
    .context(QuerySnafu)?;
    let user = user.context(UserNotFoundSnafu { id: id.clone() })?;

    let content = Profile {
        profile: UserView::from(&user),
        videos: video_list(&videos),
    };
    Ok(Page::new(user.username.clone(), session, content).render(state.engine.clone(), "users/detail.html"))
}
