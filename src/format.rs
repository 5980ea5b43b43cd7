//! Rendering of a single message as display text
//!
//! The content-type tag of a [`Message`] is interpreted once into the closed
//! [`Content`] enum; [`Content::render`] then matches it exhaustively. Missing
//! or malformed payload fields never fail: they degrade to fixed fallback text,
//! and unknown tags render as the tag itself.

use crate::types::Message;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Base of post permalinks in shared-post messages
pub const POST_PERMALINK_BASE: &str = "https://instagram.com/p/";

/// Kind of a photo/video attachment (`media_type` in the payload)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// `media_type == 1`
    Photo,
    /// `media_type == 2`
    Video,
}

impl MediaKind {
    fn from_code(code: Option<i64>) -> Option<Self> {
        match code {
            Some(1) => Some(MediaKind::Photo),
            Some(2) => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A photo or video attachment whose URL may be missing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Photo or video
    pub kind: MediaKind,
    /// First image candidate or first video version
    pub url: Option<String>,
}

/// A shared post
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostShare {
    /// Author handle
    pub username: String,
    /// Author display name
    pub full_name: String,
    /// Post shortcode
    pub code: String,
}

impl PostShare {
    /// Public link to the post
    pub fn permalink(&self) -> String {
        format!("{}{}/", POST_PERMALINK_BASE, self.code)
    }
}

/// Interpreted message content
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// `text`
    Text(Option<String>),
    /// `media`; `None` when the subtype is unrecognized
    Media(Option<Attachment>),
    /// `media_share`; `None` when any required field is missing
    PostShare(Option<PostShare>),
    /// `voice_media` with its audio URL
    Voice(Option<String>),
    /// `raven_media` (view-once photo/video); `None` when the subtype is unrecognized
    Ephemeral(Option<Attachment>),
    /// Any other tag, kept verbatim
    Other(String),
}

#[derive(Debug, Default, Deserialize)]
struct MediaPayload {
    #[serde(default)]
    media_type: Option<i64>,
    #[serde(default)]
    image_versions2: Option<ImageVersions>,
    #[serde(default)]
    video_versions: Vec<UrlEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageVersions {
    #[serde(default)]
    candidates: Vec<UrlEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct UrlEntry {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaSharePayload {
    #[serde(default)]
    user: Option<ShareAuthor>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ShareAuthor {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VoicePayload {
    #[serde(default)]
    media: Option<VoiceMedia>,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceMedia {
    #[serde(default)]
    audio: Option<Audio>,
}

#[derive(Debug, Default, Deserialize)]
struct Audio {
    #[serde(default)]
    audio_src: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VisualMediaPayload {
    #[serde(default)]
    media: Option<MediaPayload>,
}

impl MediaPayload {
    fn into_attachment(self) -> Option<Attachment> {
        let kind = MediaKind::from_code(self.media_type)?;
        let url = match kind {
            MediaKind::Photo => self
                .image_versions2
                .and_then(|versions| versions.candidates.into_iter().next()),
            MediaKind::Video => self.video_versions.into_iter().next(),
        }
        .and_then(|entry| entry.url);
        Some(Attachment { kind, url })
    }
}

/// Decode one payload field, treating absence or a shape mismatch as the default
fn payload_field<T: DeserializeOwned + Default>(message: &Message, key: &str) -> T {
    message
        .payload
        .get(key)
        .and_then(|value| T::deserialize(value).ok())
        .unwrap_or_default()
}

impl Content {
    /// Interpret a message's tag and payload
    pub fn from_message(message: &Message) -> Self {
        match message.item_type.as_str() {
            "text" => Content::Text(
                message
                    .payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            ),
            "media" => Content::Media(payload_field::<MediaPayload>(message, "media").into_attachment()),
            "media_share" => {
                let share: MediaSharePayload = payload_field(message, "media_share");
                let post = share.user.and_then(|user| {
                    Some(PostShare {
                        username: user.username?,
                        full_name: user.full_name?,
                        code: share.code?,
                    })
                });
                Content::PostShare(post)
            }
            "voice_media" => {
                let voice: VoicePayload = payload_field(message, "voice_media");
                Content::Voice(
                    voice
                        .media
                        .and_then(|m| m.audio)
                        .and_then(|a| a.audio_src),
                )
            }
            "raven_media" => {
                let visual: VisualMediaPayload = payload_field(message, "visual_media");
                Content::Ephemeral(visual.media.and_then(MediaPayload::into_attachment))
            }
            other => Content::Other(other.to_string()),
        }
    }

    /// Display text; never empty
    pub fn render(&self) -> String {
        match self {
            Content::Text(Some(text)) if !text.is_empty() => text.clone(),
            Content::Text(_) => "text".to_string(),
            Content::Media(Some(Attachment { kind, url })) => {
                let label = match kind {
                    MediaKind::Photo => "Photo",
                    MediaKind::Video => "Video",
                };
                match url {
                    Some(url) => format!("{}: {}", label, url),
                    None => format!("{}: Unable to get media", label),
                }
            }
            Content::Media(None) => "media".to_string(),
            Content::PostShare(Some(post)) => format!(
                "Post share from {} (A.K.A {}): {}",
                post.username,
                post.full_name,
                post.permalink()
            ),
            Content::PostShare(None) => "Post share: Unable to get post".to_string(),
            Content::Voice(Some(url)) => format!("Voice message: {}", url),
            Content::Voice(None) => "Voice message: Unable to get audio".to_string(),
            Content::Ephemeral(Some(Attachment { kind, url })) => {
                let label = match kind {
                    MediaKind::Photo => "Temporary photo",
                    MediaKind::Video => "Temporary video",
                };
                match url {
                    Some(url) => format!("{}: {} (May be expired)", label, url),
                    None => format!("{}: Unable to fetch (Expired)", label),
                }
            }
            Content::Ephemeral(None) => "raven_media".to_string(),
            Content::Other(tag) if tag.is_empty() => "unknown".to_string(),
            Content::Other(tag) => tag.clone(),
        }
    }
}

/// Render a message as display text
pub fn format_message(message: &Message) -> String {
    Content::from_message(message).render()
}
