use axum::response::{IntoResponse, Response};
use axum_template::engine::Engine;
use axum_template::RenderHtml;
use serde::Serialize;
use tera::Tera;

use crate::model::{User, Video, VideoDetail};
use crate::session::{FlashMessage, Session, SessionUser};

pub type AppEngine = Engine<Tera>;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("partials/video_block.html", include_str!("../../templates/partials/video_block.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("search.html", include_str!("../../templates/search.html")),
    ("join.html", include_str!("../../templates/join.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("users/detail.html", include_str!("../../templates/users/detail.html")),
    ("videos/upload.html", include_str!("../../templates/videos/upload.html")),
    ("videos/detail.html", include_str!("../../templates/videos/detail.html")),
    ("videos/edit.html", include_str!("../../templates/videos/edit.html")),
];

/// Builds the template engine from the templates compiled into the binary.
pub fn engine() -> Result<AppEngine, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    Ok(Engine::new(tera))
}

/// The context every template receives: the page title, the logged in user and the flash
/// messages, with the page specific data flattened next to them.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub title: String,
    pub user: Option<UserView>,
    pub flash: Vec<FlashMessage>,
    #[serde(flatten)]
    pub content: T,
}

impl<T: Serialize> Page<T> {
    /// Consumes the session's flash messages, they are shown on this page only.
    pub fn new(title: impl Into<String>, session: &Session, content: T) -> Self {
        Self {
            title: title.into(),
            user: session.user().as_ref().map(UserView::from),
            flash: session.take_flash(),
            content,
        }
    }

    pub fn render(self, engine: AppEngine, template: &'static str) -> Response {
        RenderHtml(template, engine, self).into_response()
    }
}

/// Context for pages that only need the shared fields.
#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
}

impl From<&SessionUser> for UserView {
    fn from(user: &SessionUser) -> Self {
        Self {
            id: user.id.key(),
            username: user.username.clone(),
        }
    }
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.key(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub src: String,
    pub views: u64,
    pub created_at: String,
    pub creator: String,
}

impl From<&Video> for VideoView {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.key(),
            title: video.title.clone(),
            description: video.description.clone(),
            src: video.src.clone(),
            views: video.views,
            created_at: video.created_at.to_string(),
            creator: video.creator.key(),
        }
    }
}

pub fn video_list(videos: &[Video]) -> Vec<VideoView> {
    videos.iter().map(VideoView::from).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoDetailView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub src: String,
    pub views: u64,
    pub created_at: String,
    pub creator: UserView,
}

impl From<&VideoDetail> for VideoDetailView {
    fn from(video: &VideoDetail) -> Self {
        Self {
            id: video.id.key(),
            title: video.title.clone(),
            description: video.description.clone(),
            src: video.src.clone(),
            views: video.views,
            created_at: video.created_at.to_string(),
            creator: UserView::from(&video.creator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn every_template_parses() {
        assert!(engine().is_ok());
    }

    #[test]
    fn flash_messages_are_rendered_and_escaped() {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied()).unwrap();

        let context = json!({
            "title": "Home",
            "user": null,
            "flash": [FlashMessage::error("<b>Title is required</b>")],
            "videos": [],
        });
        let html = tera
            .render("home.html", &tera::Context::from_value(context).unwrap())
            .unwrap();

        assert!(html.contains("&lt;b&gt;Title is required&lt;&#x2F;b&gt;"));
        assert!(html.contains("flash--error"));
    }
}
