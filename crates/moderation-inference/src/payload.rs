//! Request envelope and content-type dependent payload encoding.

use base64::Engine;
use moderation_core::{ContentTypeMatching, UnknownContentPolicy};
use serde::Serialize;

/// JSON body sent to the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceRequest {
    pub input: String,
}

/// Inference path selected from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Text,
    /// Missing, generic or unsupported type (audio, documents, ...).
    Other,
}

impl ContentKind {
    pub fn detect(content_type: Option<&str>, matching: ContentTypeMatching) -> Self {
        let Some(content_type) = content_type else {
            return ContentKind::Other;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        let family = match matching {
            ContentTypeMatching::Exact => essence.as_str(),
            ContentTypeMatching::MimePrefix => essence.split('/').next().unwrap_or_default(),
        };

        match family {
            "image" => ContentKind::Image,
            "text" => ContentKind::Text,
            _ => ContentKind::Other,
        }
    }
}

/// Encode content for the `input` field.
///
/// Images are base64-encoded, text is passed through as UTF-8 (invalid
/// sequences replaced), and everything else follows `unknown_policy`.
pub fn encode_payload(
    bytes: &[u8],
    kind: ContentKind,
    unknown_policy: UnknownContentPolicy,
) -> String {
    match (kind, unknown_policy) {
        (ContentKind::Image, _) | (ContentKind::Other, UnknownContentPolicy::Base64) => {
            base64::engine::general_purpose::STANDARD.encode(bytes)
        }
        (ContentKind::Text, _) => String::from_utf8_lossy(bytes).into_owned(),
        (ContentKind::Other, UnknownContentPolicy::EmptyPayload) => String::new(),
    }
}
