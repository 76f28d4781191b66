use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::database::{Database, DatabaseQueryError, Record};
use crate::{define_relation, define_table};

use super::{Timestamp, User};

/// A stored video document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Video {
    pub id: Record<Video>,
    pub created_at: Timestamp,
    pub title: String,
    pub description: String,
    /// Public URL of the media file.
    pub src: String,
    pub creator: Record<User>,
    #[serde(default)]
    pub views: u64,
}

define_table!("videos" : Video);

/// The content of a video that is about to be created. Views always start at zero.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct NewVideo {
    #[new(default)]
    pub created_at: Timestamp,
    pub title: String,
    pub description: String,
    pub src: String,
    pub creator: Record<User>,
    #[new(value = "0")]
    pub views: u64,
}

/// A video with its creator resolved.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoDetail {
    pub id: Record<Video>,
    pub created_at: Timestamp,
    pub title: String,
    pub description: String,
    pub src: String,
    pub creator: User,
    #[serde(default)]
    pub views: u64,
}

define_relation! {
    Video > all() > Vec<Video>
        where "SELECT * FROM videos ORDER BY id DESC"
}

define_relation! {
    Video > search(keywords: &str) > Vec<Video>
        where "SELECT * FROM videos WHERE string::lowercase(title) CONTAINS string::lowercase($keywords) ORDER BY id DESC"
}

define_relation! {
    Video > find(id: &Record<Video>) > Option<Video>
        where "SELECT * FROM $id"
}

define_relation! {
    Video > detail(id: &Record<Video>) > Option<VideoDetail>
        where "SELECT * FROM $id FETCH creator"
}

define_relation! {
    Video > by_creator(creator: &Record<User>) > Vec<Video>
        where "SELECT * FROM videos WHERE creator = $creator ORDER BY id DESC"
}

define_relation! {
    Video > insert(id: &Record<Video>, video: &NewVideo) > Option<Video>
        where "CREATE $id CONTENT $video RETURN AFTER"
}

define_relation! {
    Video > update_info(id: &Record<Video>, title: &str, description: &str) > Option<Video>
        where "UPDATE videos SET title = $title, description = $description WHERE id = $id RETURN AFTER"
}

define_relation! {
    Video > remove(id: &Record<Video>) > Option<Video>
        where "DELETE videos WHERE id = $id RETURN BEFORE"
}

define_relation! {
    Video > add_view(id: &Record<Video>) > Option<Video>
        where "UPDATE videos SET views += 1 WHERE id = $id RETURN AFTER"
}

impl Video {
    /// Creates the video under a fresh time-ordered id. The uploader's video list is updated by
    /// the `video_uploaded` event in the same transaction.
    pub async fn upload(video: &NewVideo, db: &Database) -> Result<Option<Video>, DatabaseQueryError> {
        let id = Record::ulid();
        Self::insert(&id, video, db).await
    }

    pub fn is_created_by(&self, user: &Record<User>) -> bool {
        &self.creator == user
    }
}
