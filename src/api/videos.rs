use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt};
use tracing::instrument;

use crate::database::{Database, Record};
use crate::model::{NewVideo, User, Video};
use crate::session::{CurrentUser, Session, SessionUser};

use super::error::*;
use super::form::{self, SearchQuery, VideoForm};
use super::render::{video_list, Empty, Page, VideoDetailView, VideoView};
use super::routes;
use super::state::AppState;

const ONLY_VIDEOS: &str = "Only video files are allowed";
const UNREADABLE: &str = "The upload could not be read, please try again";

#[derive(Debug, Serialize)]
struct VideoList {
    videos: Vec<VideoView>,
}

#[derive(Debug, Serialize)]
struct SearchResults {
    keywords: String,
    videos: Vec<VideoView>,
}

#[derive(Debug, Serialize)]
struct VideoPage<V> {
    video: V,
    is_creator: bool,
}

/// Every video, newest first. A failing store renders an empty list.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, session: Session) -> Response {
    let videos = match Video::all(&state.database).await {
        Ok(videos) => videos,
        Err(err) => {
            tracing::error!(error = %err, "failed to list videos, rendering an empty page");
            Vec::new()
        }
    };

    let content = VideoList {
        videos: video_list(&videos),
    };
    Page::new("Home", &session, content).render(state.engine, "home.html")
}

#[instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query.trimmed(),
        Err(rejection) => {
            tracing::warn!(%rejection, "malformed search query");
            SearchQuery::default()
        }
    };

    if let Err(messages) = form::check(&query) {
        return form::reject(&session, messages, routes::HOME);
    }

    search_videos(&state, &session, query)
        .await
        .or_redirect(routes::HOME)
}

async fn search_videos(
    state: &AppState,
    session: &Session,
    query: SearchQuery,
) -> Result<Response, ApiError> {
    let videos = Video::search(&query.keywords, &state.database)
        .await
        .context(QuerySnafu)?;

    tracing::debug!(keywords = %query.keywords, found = videos.len(), "searched videos");

    let content = SearchResults {
        keywords: query.keywords,
        videos: video_list(&videos),
    };
    Ok(Page::new("Search", session, content).render(state.engine.clone(), "search.html"))
}

#[instrument(skip_all)]
pub async fn upload_form(State(state): State<AppState>, current: CurrentUser) -> Response {
    Page::new("Upload", &current.session, Empty {}).render(state.engine, "videos/upload.html")
}

#[derive(Debug, Default)]
struct Upload {
    form: VideoForm,
    file: Option<UploadedFile>,
}

#[derive(Debug)]
struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

impl UploadedFile {
    /// Browsers send an empty part when no file was picked, that counts as no file at all.
    fn is_video(&self) -> bool {
        !self.bytes.is_empty()
            && self
                .content_type
                .as_deref()
                .is_some_and(|content_type| content_type.starts_with("video/"))
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, MultipartError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => upload.form.title = field.text().await?,
            "description" => upload.form.description = field.text().await?,
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;

                upload.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => tracing::debug!(field = %name, "ignoring unknown upload field"),
        }
    }

    Ok(upload)
}

#[instrument(skip_all, fields(user = %current.user.id))]
pub async fn upload(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let session = &current.session;

    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await.context(MultipartSnafu),
        Err(rejection) => {
            tracing::warn!(%rejection, "upload is not a multipart form");
            Ok(Upload::default())
        }
    };

    let upload = match upload {
        Ok(upload) => upload,
        Err(err) => {
            tracing::warn!(error = %err, "could not read the upload");
            return form::reject(session, vec![UNREADABLE.to_string()], routes::UPLOAD);
        }
    };

    let form = upload.form.trimmed();
    if let Err(messages) = form::check(&form) {
        return form::reject(session, messages, routes::UPLOAD);
    }

    let Some(file) = upload.file.filter(UploadedFile::is_video) else {
        return form::reject(session, vec![ONLY_VIDEOS.to_string()], routes::UPLOAD);
    };

    create_video(&state, &current.user, form, file)
        .await
        .map(|video| {
            session.success("New video has been uploaded.");
            Redirect::to(&routes::video_detail(&video.id.key()))
        })
        .or_redirect(routes::UPLOAD)
}

async fn create_video(
    state: &AppState,
    user: &SessionUser,
    form: VideoForm,
    file: UploadedFile,
) -> Result<Video, ApiError> {
    let stored = state
        .storage
        .store(file.file_name.as_deref(), &file.bytes)
        .await
        .context(StoreSnafu)?;

    let video = NewVideo::new(form.title, form.description, stored.url.clone(), user.id.clone());

    match Video::upload(&video, &state.database).await {
        Ok(Some(video)) => {
            tracing::info!(video_id = %video.id, src = %video.src, "uploaded a new video");
            Ok(video)
        }
        Ok(None) => {
            state.storage.discard(&stored).await;
            NotCreatedSnafu.fail()
        }
        Err(source) => {
            state.storage.discard(&stored).await;
            Err(source).context(QuerySnafu)
        }
    }
}

#[instrument(skip_all, fields(video = %key))]
pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Response {
    let id = Record::<Video>::from_key(&key);

    show_detail(&state, &session, &id)
        .await
        .or_redirect(routes::HOME)
}

async fn show_detail(
    state: &AppState,
    session: &Session,
    id: &Record<Video>,
) -> Result<Response, ApiError> {
    let video = Video::detail(id, &state.database)
        .await
        .context(QuerySnafu)?
        .context(VideoNotFoundSnafu { id: id.clone() })?;

    let is_creator = session
        .user()
        .is_some_and(|user| user.id == video.creator.id);

    let content = VideoPage {
        video: VideoDetailView::from(&video),
        is_creator,
    };
    Ok(Page::new(video.title.clone(), session, content).render(state.engine.clone(), "videos/detail.html"))
}

/// Fetches a video that `user` is allowed to change.
async fn find_owned(
    db: &Database,
    id: &Record<Video>,
    user: &Record<User>,
) -> Result<Video, ApiError> {
    let video = Video::find(id, db)
        .await
        .context(QuerySnafu)?
        .context(VideoNotFoundSnafu { id: id.clone() })?;

    ensure!(
        video.is_created_by(user),
        NotCreatorSnafu {
            video: id.clone(),
            user: user.clone(),
        }
    );

    Ok(video)
}

#[instrument(skip_all, fields(video = %key, user = %current.user.id))]
pub async fn edit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(key): Path<String>,
) -> Response {
    let id = Record::<Video>::from_key(&key);

    show_edit_form(&state, &current, &id)
        .await
        .or_redirect(&routes::video_detail(&key))
}

async fn show_edit_form(
    state: &AppState,
    current: &CurrentUser,
    id: &Record<Video>,
) -> Result<Response, ApiError> {
    let video = find_owned(&state.database, id, &current.user.id).await?;

    let content = VideoPage {
        video: VideoView::from(&video),
        is_creator: true,
    };
    let title = format!("Edit {}", video.title);
    Ok(Page::new(title, &current.session, content).render(state.engine.clone(), "videos/edit.html"))
}

#[instrument(skip_all, fields(video = %key, user = %current.user.id))]
pub async fn edit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(key): Path<String>,
    form: Result<Form<VideoForm>, FormRejection>,
) -> Response {
    let id = Record::<Video>::from_key(&key);
    let edit_page = routes::edit_video(&key);

    let form = match form {
        Ok(Form(form)) => form.trimmed(),
        Err(rejection) => {
            tracing::warn!(%rejection, "malformed edit form");
            VideoForm::default()
        }
    };

    if let Err(messages) = form::check(&form) {
        return form::reject(&current.session, messages, &edit_page);
    }

    update_video(&state, &current, &id, form)
        .await
        .or_redirect(&edit_page)
}

async fn update_video(
    state: &AppState,
    current: &CurrentUser,
    id: &Record<Video>,
    form: VideoForm,
) -> Result<Redirect, ApiError> {
    find_owned(&state.database, id, &current.user.id).await?;

    let video = Video::update_info(id, &form.title, &form.description, &state.database)
        .await
        .context(QuerySnafu)?
        .context(VideoNotFoundSnafu { id: id.clone() })?;

    tracing::info!(video_id = %video.id, "updated video information");
    current.session.success("Video information has been updated.");

    Ok(Redirect::to(&routes::video_detail(&video.id.key())))
}

#[instrument(skip_all, fields(video = %key, user = %current.user.id))]
pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(key): Path<String>,
) -> Response {
    let id = Record::<Video>::from_key(&key);

    delete_video(&state, &current, &id)
        .await
        .or_redirect(&routes::video_detail(&key))
}

async fn delete_video(
    state: &AppState,
    current: &CurrentUser,
    id: &Record<Video>,
) -> Result<Redirect, ApiError> {
    find_owned(&state.database, id, &current.user.id).await?;

    let video = Video::remove(id, &state.database)
        .await
        .context(QuerySnafu)?
        .context(VideoNotFoundSnafu { id: id.clone() })?;

    tracing::info!(video_id = %video.id, "deleted video");
    current.session.success("Video has been deleted.");

    Ok(Redirect::to(routes::HOME))
}

/// Adds one view. Answers with a bare status code: `200` when counted, `400` otherwise.
#[instrument(skip_all, fields(video = %key))]
pub async fn register_view(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    let id = Record::<Video>::from_key(&key);

    match Video::add_view(&id, &state.database).await {
        Ok(Some(video)) => {
            tracing::debug!(views = video.views, "registered a view");
            StatusCode::OK
        }
        Ok(None) => {
            tracing::warn!("cannot register a view on a missing video");
            StatusCode::BAD_REQUEST
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to register a view");
            StatusCode::BAD_REQUEST
        }
    }
}
