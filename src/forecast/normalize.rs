/// Canonical lookup key for a region name.
///
/// Lower-cases the name, drops every " county" qualifier and trims the
/// result. Two spellings with the same key are the same region.
///
/// # Examples
///
/// ```
/// use ev_forecast::forecast::normalize;
///
/// assert_eq!(normalize("Los Angeles County"), "los angeles");
/// assert_eq!(normalize(" los angeles "), "los angeles");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(name: &str) -> String {
    let mut key = name.to_lowercase();
    // Removing one qualifier can expose another (" county county").
    while let Some(pos) = key.find(" county") {
        key.replace_range(pos..pos + " county".len(), "");
    }
    key.trim().to_string()
}

/// File-name fragment used to match chart and map images for a region.
pub fn image_key(name: &str) -> String {
    normalize(name).replace(' ', "_")
}
