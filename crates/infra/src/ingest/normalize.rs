//! Metadata normalizer: raw source metadata to a [`NewBook`].
//!
//! Pure and total. Every missing field resolves to a documented default.

use libris_core::{ExternalId, NewBook};

use crate::archive::RawMetadata;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Internet Archive field used as the cover reference.
pub const COVER_FIELD: &str = "boxid";

/// Map `raw` plus already-fetched `content` to a book ready for staging.
pub fn normalize(raw: &RawMetadata, content: String) -> NewBook {
    let external_id = raw
        .get("identifier")
        .and_then(|v| v.first())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ExternalId::new)
        .unwrap_or_else(ExternalId::unknown);

    let title = raw
        .get("title")
        .and_then(|v| v.first())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    NewBook {
        external_id,
        title,
        author: raw.get("creator").map(|v| v.joined(", ")),
        language: raw.get("language").map(|v| v.joined(", ")),
        description: raw.get("description").map(|v| v.joined("\n")),
        cover_ref: raw.get(COVER_FIELD).and_then(|v| v.first()).map(str::to_string),
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MetadataValue;
    use proptest::prelude::*;

    #[test]
    fn creator_list_is_joined_in_order() {
        let raw = RawMetadata::new().with("creator", vec!["A", "B"]);
        assert_eq!(normalize(&raw, String::new()).author.as_deref(), Some("A, B"));
    }

    #[test]
    fn creator_scalar_passes_through() {
        let raw = RawMetadata::new().with("creator", "A");
        assert_eq!(normalize(&raw, String::new()).author.as_deref(), Some("A"));
    }

    #[test]
    fn absent_creator_is_none() {
        assert_eq!(normalize(&RawMetadata::new(), String::new()).author, None);
    }

    #[test]
    fn empty_metadata_uses_sentinels() {
        let book = normalize(&RawMetadata::new(), "body".to_string());

        assert_eq!(book.external_id, ExternalId::unknown());
        assert_eq!(book.title, UNKNOWN_TITLE);
        assert_eq!(book.language, None);
        assert_eq!(book.description, None);
        assert_eq!(book.cover_ref, None);
        assert_eq!(book.content, "body");
    }

    #[test]
    fn blank_identifier_is_unknown() {
        let raw = RawMetadata::new().with("identifier", "  ");
        assert_eq!(normalize(&raw, String::new()).external_id, ExternalId::unknown());
    }

    #[test]
    fn maps_internet_archive_fields() {
        let raw = RawMetadata::new()
            .with("identifier", "aliceinwonderland")
            .with("title", "Alice's Adventures in Wonderland")
            .with("language", "eng")
            .with("description", vec!["First line", "Second line"])
            .with("boxid", "IA40012345");

        let book = normalize(&raw, "Alice was beginning".to_string());

        assert_eq!(book.external_id.as_str(), "aliceinwonderland");
        assert_eq!(book.title, "Alice's Adventures in Wonderland");
        assert_eq!(book.language.as_deref(), Some("eng"));
        assert_eq!(book.description.as_deref(), Some("First line\nSecond line"));
        assert_eq!(book.cover_ref.as_deref(), Some("IA40012345"));
    }

    #[test]
    fn title_list_uses_first_entry() {
        let raw = RawMetadata::new().with("title", vec!["Main", "Alternate"]);
        assert_eq!(normalize(&raw, String::new()).title, "Main");
    }

    fn metadata_value() -> impl Strategy<Value = MetadataValue> {
        prop_oneof![
            ".{0,12}".prop_map(MetadataValue::Scalar),
            prop::collection::vec(".{0,8}", 0..4).prop_map(MetadataValue::List),
        ]
    }

    fn raw_metadata() -> impl Strategy<Value = RawMetadata> {
        let key = prop_oneof![
            Just("identifier"),
            Just("title"),
            Just("creator"),
            Just("language"),
            Just("description"),
            Just("boxid"),
            Just("subject"),
        ];
        prop::collection::vec((key, metadata_value()), 0..8).prop_map(|entries| {
            let mut raw = RawMetadata::new();
            for (k, v) in entries {
                raw.insert(k, v);
            }
            raw
        })
    }

    proptest! {
        #[test]
        fn content_is_passed_through_verbatim(raw in raw_metadata(), content in ".*") {
            prop_assert_eq!(normalize(&raw, content.clone()).content, content);
        }

        #[test]
        fn identifier_and_title_are_never_empty_sentinels(raw in raw_metadata()) {
            let book = normalize(&raw, String::new());
            prop_assert!(!book.external_id.as_str().trim().is_empty());
            if raw.get("title").and_then(|v| v.first()).is_none() {
                prop_assert_eq!(book.title, UNKNOWN_TITLE);
            }
        }

        #[test]
        fn author_is_present_iff_creator_is(raw in raw_metadata()) {
            let book = normalize(&raw, String::new());
            prop_assert_eq!(book.author.is_some(), raw.get("creator").is_some());
        }

        #[test]
        fn normalize_is_deterministic(raw in raw_metadata()) {
            prop_assert_eq!(normalize(&raw, "x".into()), normalize(&raw, "x".into()));
        }
    }
}
