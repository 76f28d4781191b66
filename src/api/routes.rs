//! Paths the handlers redirect to.

pub const HOME: &str = "/";
pub const UPLOAD: &str = "/videos/upload";
pub const JOIN: &str = "/join";
pub const LOGIN: &str = "/login";

pub fn video_detail(key: &str) -> String {
    format!("/videos/{key}")
}

pub fn edit_video(key: &str) -> String {
    format!("/videos/{key}/edit")
}
