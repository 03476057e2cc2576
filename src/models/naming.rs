//! Naming conventions shared by the project model and the packaging pipeline.
//!
//! All on-disk names the pipeline produces (archive name, skin folder, config
//! file stems, skin identifiers) are derived here so every stage agrees on them.

use std::path::Path;

/// Clean a mod name for use as the archive file stem.
///
/// ```
/// use beamskin_lib::models::sanitize_mod_name;
/// assert_eq!(sanitize_mod_name("  My Cool Mod "), "My_Cool_Mod");
/// ```
pub fn sanitize_mod_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// Convert a skin display name into a folder/file stem.
///
/// Lowercases, turns whitespace into `_` and drops anything that is not
/// alphanumeric, `_` or `-`.
///
/// ```
/// use beamskin_lib::models::sanitize_skin_name;
/// assert_eq!(sanitize_skin_name("Red Stripe"), "red_stripe");
/// assert_eq!(sanitize_skin_name("Cop/Car #2"), "copcar_2");
/// ```
pub fn sanitize_skin_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || c == '_' || c == '-' {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect()
}

/// Derive the skin identifier from a texture file name: the last
/// `_`-separated token of the stem.
///
/// ```
/// use beamskin_lib::models::skin_identifier;
/// assert_eq!(skin_identifier("car_skin_red.dds"), "red");
/// assert_eq!(skin_identifier("red.dds"), "red");
/// ```
pub fn skin_identifier(texture_filename: &str) -> String {
    let stem = Path::new(texture_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.rsplit('_').next().unwrap_or_default().to_string()
}
