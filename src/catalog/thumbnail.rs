use once_cell::sync::Lazy;
use regex::Regex;

/// Shown when a record has neither an explicit nor a derivable image.
pub const NO_IMAGE_PLACEHOLDER: &str = "https://via.placeholder.com/320x180.png?text=No+Image";

/// Video id after `v=`, a `youtu.be/` short link, `/embed/`, or the
/// `/shorts/`, `/live/`, `/v/` path forms. Ids are exactly 11 characters.
static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/embed/|/shorts/|/live/|/v/)([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)")
        .expect("valid video id regex")
});

pub fn video_id(video_url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(video_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Thumbnail for a recognised video URL. `None` means "use the placeholder",
/// not an error.
pub fn resolve(video_url: &str) -> Option<String> {
    video_id(video_url.trim()).map(|id| format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"))
}
