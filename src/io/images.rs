use std::path::Path;

use crate::forecast::image_key;

/// Find a `.png` in `dir` whose name contains the region's image key
/// (`"San Luis Obispo County"` matches `adoption_san_luis_obispo.png`).
///
/// Returns the file name only. Entries are checked in sorted order so the
/// same directory always yields the same file.
pub fn find_image_for_region(dir: impl AsRef<Path>, region: &str) -> Option<String> {
    let target = image_key(region);
    if target.is_empty() {
        return None;
    }

    let entries = std::fs::read_dir(dir.as_ref()).ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();

    names.into_iter().find(|name| {
        let lower = name.to_lowercase();
        lower.ends_with(".png") && lower.contains(&target)
    })
}
