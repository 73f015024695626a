//! Content-fetch policy.

use libris_core::ExternalId;

use crate::archive::FileEntry;

/// Pick the text file to download for `identifier`.
///
/// `{identifier}.txt` wins; otherwise the first file ending in `.txt`.
pub fn select_text_file<'a>(identifier: &ExternalId, files: &'a [FileEntry]) -> Option<&'a FileEntry> {
    let preferred = format!("{identifier}.txt");
    files
        .iter()
        .find(|f| f.name == preferred)
        .or_else(|| files.iter().find(|f| f.name.ends_with(".txt")))
}
