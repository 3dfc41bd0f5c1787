//! Turning an audiobook's chapters into a playback queue.

use crate::models::{AudiobookDetail, AudiobookSummary, Chapter};
use core_playback::{PlaybackContext, PlaybackItem, PlaylistEntry};

impl From<&AudiobookDetail> for PlaybackContext {
    fn from(audiobook: &AudiobookDetail) -> Self {
        PlaybackContext {
            parent_title: Some(audiobook.title.clone()),
            cover_art_ref: audiobook.cover_image.clone(),
            parent_id: Some(audiobook.id.to_string()),
        }
    }
}

impl From<&AudiobookSummary> for PlaybackContext {
    fn from(audiobook: &AudiobookSummary) -> Self {
        PlaybackContext {
            parent_title: Some(audiobook.title.clone()),
            cover_art_ref: audiobook.cover_image.clone(),
            parent_id: Some(audiobook.id.to_string()),
        }
    }
}

impl From<&Chapter> for PlaybackItem {
    fn from(chapter: &Chapter) -> Self {
        let item = PlaybackItem::new(chapter.id, chapter.title.clone());
        match &chapter.audio_file {
            Some(audio_file) => item.with_media_ref(audio_file.clone()),
            None => item,
        }
    }
}

/// One entry per chapter, in the order given, each tagged with the
/// audiobook's title, cover and id.
pub fn playlist_for(
    audiobook: impl Into<PlaybackContext>,
    chapters: &[Chapter],
) -> Vec<PlaylistEntry> {
    let context = audiobook.into();
    chapters
        .iter()
        .map(|chapter| PlaylistEntry::new(chapter.into(), context.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: u64, number: u32, audio_file: Option<&str>) -> Chapter {
        Chapter {
            id,
            title: format!("Chapter {number}"),
            chapter_number: number,
            audio_file: audio_file.map(str::to_string),
            duration_seconds: 60,
            duration_formatted: None,
        }
    }

    fn summary() -> AudiobookSummary {
        serde_json::from_str(
            r#"{"id": 12, "title": "Dune", "cover_image": "/media/covers/dune.jpg"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_entries_carry_audiobook_context() {
        let chapters = vec![
            chapter(100, 1, Some("http://127.0.0.1:8000/media/audio/1.mp3")),
            chapter(101, 2, None),
        ];
        let playlist = playlist_for(&summary(), &chapters);

        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist[0].id().as_str(), "100");
        assert_eq!(
            playlist[0].item.media_ref.as_deref(),
            Some("http://127.0.0.1:8000/media/audio/1.mp3")
        );
        assert!(playlist[1].item.media_ref.is_none());

        for entry in &playlist {
            assert_eq!(entry.context.parent_title.as_deref(), Some("Dune"));
            assert_eq!(
                entry.context.cover_art_ref.as_deref(),
                Some("/media/covers/dune.jpg")
            );
            assert_eq!(entry.context.parent_id.as_deref(), Some("12"));
        }
    }

    #[test]
    fn test_no_chapters_gives_empty_playlist() {
        assert!(playlist_for(&summary(), &[]).is_empty());
    }
}
