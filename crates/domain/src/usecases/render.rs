//! Rendering use case - turns a content descriptor into a status

use crate::model::{ContentDescriptor, MediaId, StatusPost};

/// Render the status body for a descriptor.
///
/// The description is always followed by a blank line. Source note and source
/// URL lines are appended only when present and non-empty. No escaping is done.
pub fn render_status_text(descriptor: &ContentDescriptor) -> String {
    let mut text = format!("{}\n\n", descriptor.media_description);

    if let Some(note) = non_empty(&descriptor.source_note) {
        text.push_str(&format!("Source note: {}\n", note));
    }

    if let Some(url) = non_empty(&descriptor.source_url) {
        text.push_str(&format!("Source URL: {}", url));
    }

    text
}

/// Build the full status for a descriptor with its uploaded media
pub fn build_status_post(descriptor: &ContentDescriptor, media_id: MediaId) -> StatusPost {
    StatusPost {
        text: render_status_text(descriptor),
        media_ids: vec![media_id],
        sensitive: descriptor.content_warning.enabled,
        spoiler_text: descriptor.content_warning.note.clone(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentWarning;
    use std::path::PathBuf;

    fn sample_descriptor() -> ContentDescriptor {
        ContentDescriptor {
            key: "sunset".to_string(),
            media_file: PathBuf::from("/content/sunset.jpg"),
            media_description: "A sunset over the bay".to_string(),
            source_note: None,
            source_url: None,
            content_warning: ContentWarning::default(),
            media_id: None,
            metadata_path: PathBuf::from("/content/sunset.yaml"),
        }
    }

    #[test]
    fn test_description_only() {
        let text = render_status_text(&sample_descriptor());
        assert_eq!(text, "A sunset over the bay\n\n");
    }

    #[test]
    fn test_note_and_url() {
        let mut descriptor = sample_descriptor();
        descriptor.source_note = Some("Photo by Ana".to_string());
        descriptor.source_url = Some("https://example.com/sunset".to_string());

        let text = render_status_text(&descriptor);

        assert_eq!(
            text,
            "A sunset over the bay\n\nSource note: Photo by Ana\nSource URL: https://example.com/sunset"
        );
    }

    #[test]
    fn test_note_only_keeps_trailing_newline() {
        let mut descriptor = sample_descriptor();
        descriptor.source_note = Some("Photo by Ana".to_string());

        let text = render_status_text(&descriptor);

        assert_eq!(text, "A sunset over the bay\n\nSource note: Photo by Ana\n");
    }

    #[test]
    fn test_url_only() {
        let mut descriptor = sample_descriptor();
        descriptor.source_url = Some("https://example.com/sunset".to_string());

        let text = render_status_text(&descriptor);

        assert_eq!(
            text,
            "A sunset over the bay\n\nSource URL: https://example.com/sunset"
        );
    }

    #[test]
    fn test_empty_optionals_are_omitted() {
        let mut descriptor = sample_descriptor();
        descriptor.source_note = Some(String::new());
        descriptor.source_url = Some(String::new());

        assert_eq!(render_status_text(&descriptor), "A sunset over the bay\n\n");
    }

    #[test]
    fn test_no_escaping() {
        let mut descriptor = sample_descriptor();
        descriptor.media_description = "<b>#art</b> & @someone".to_string();

        assert_eq!(
            render_status_text(&descriptor),
            "<b>#art</b> & @someone\n\n"
        );
    }

    #[test]
    fn test_status_post_carries_content_warning() {
        let mut descriptor = sample_descriptor();
        descriptor.content_warning = ContentWarning {
            enabled: true,
            note: "flashing lights".to_string(),
        };

        let post = build_status_post(&descriptor, MediaId::new("77"));

        assert!(post.sensitive);
        assert_eq!(post.spoiler_text, "flashing lights");
        assert_eq!(post.media_ids, vec![MediaId::new("77")]);
        assert_eq!(post.text, "A sunset over the bay\n\n");
    }
}
