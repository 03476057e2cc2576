//! Canonical texture file names across a staged mod tree.
//!
//! Every texture inside `vehicles/<carid>/<skin>/` should be named
//! `<carid>_skin_<suffix>.<ext>`. Files that are not get renamed, and the
//! materials files next to them have the old mod-relative path replaced
//! with the new one. Problems are collected, never raised.

use std::fs;
use std::path::{Path, PathBuf};

use regex::RegexBuilder;

use super::{is_materials_file, is_texture, PackagingError};

/// Outcome of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// `(old, new)` paths of renamed textures.
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub already_correct: Vec<PathBuf>,
    pub errors: Vec<String>,
}

/// Extract the `<suffix>` for a texture stem that is not yet canonical.
///
/// Tried in order: text after `_skin_`, after a leading `skin_`, after any
/// `skin`, then the whole stem. An empty result moves on to the next rule.
pub fn extract_suffix(stem: &str) -> String {
    let lower = stem.to_ascii_lowercase();
    let candidates = [
        lower.find("_skin_").map(|i| &stem[i + "_skin_".len()..]),
        lower
            .starts_with("skin_")
            .then(|| &stem["skin_".len()..]),
        lower
            .find("skin")
            .map(|i| stem[i + "skin".len()..].trim_start_matches('_')),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(stem)
        .to_string()
}

/// Normalize every skin folder under `<scratch_root>/vehicles/`.
pub fn normalize_tree(scratch_root: &Path) -> Result<NormalizeReport, PackagingError> {
    let mut report = NormalizeReport::default();
    let vehicles = scratch_root.join("vehicles");
    if !vehicles.is_dir() {
        return Ok(report);
    }

    for car in sorted_dirs(&vehicles)? {
        let carid = file_name(&car);
        for skin_dir in sorted_dirs(&car)? {
            normalize_skin_dir(&carid, &skin_dir, &mut report)?;
        }
    }

    tracing::info!(
        renamed = report.renamed.len(),
        already_correct = report.already_correct.len(),
        errors = report.errors.len(),
        "texture names normalized"
    );
    Ok(report)
}

fn normalize_skin_dir(
    carid: &str,
    skin_dir: &Path,
    report: &mut NormalizeReport,
) -> Result<(), PackagingError> {
    let canonical = RegexBuilder::new(&format!(r"^{}_skin_.+\.dds$", regex::escape(carid)))
        .case_insensitive(true)
        .build()
        .map_err(|e| PackagingError::io(skin_dir, std::io::Error::other(e)))?;
    let folder = file_name(skin_dir);

    let mut textures: Vec<PathBuf> = read_dir_paths(skin_dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_texture(p))
        .collect();
    textures.sort();

    for old in textures {
        let old_name = file_name(&old);
        if canonical.is_match(&old_name) {
            report.already_correct.push(old);
            continue;
        }

        let stem = old
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = old
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let new_name = format!("{carid}_skin_{}.{ext}", extract_suffix(&stem));
        let new = skin_dir.join(&new_name);
        if new_name == old_name {
            report.already_correct.push(old);
            continue;
        }

        if new.exists() {
            tracing::error!(from = %old.display(), to = %new.display(), "rename target exists");
            report.errors.push(format!(
                "cannot rename {old_name} to {new_name}: target already exists"
            ));
            continue;
        }
        if let Err(e) = fs::rename(&old, &new) {
            report
                .errors
                .push(format!("cannot rename {old_name} to {new_name}: {e}"));
            continue;
        }
        tracing::debug!(from = %old_name, to = %new_name, "renamed texture");

        let old_ref = format!("vehicles/{carid}/{folder}/{old_name}");
        let new_ref = format!("vehicles/{carid}/{folder}/{new_name}");
        if let Err(e) = replace_in_materials(skin_dir, &old_ref, &new_ref) {
            report.errors.push(e.to_string());
        }
        report.renamed.push((old, new));
    }
    Ok(())
}

/// Literal find-and-replace of a texture path in the folder's materials files.
fn replace_in_materials(skin_dir: &Path, old_ref: &str, new_ref: &str) -> Result<(), PackagingError> {
    for path in read_dir_paths(skin_dir)? {
        if !path.is_file() || !is_materials_file(&file_name(&path)) {
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|e| PackagingError::io(&path, e))?;
        if text.contains(old_ref) {
            fs::write(&path, text.replace(old_ref, new_ref))
                .map_err(|e| PackagingError::io(&path, e))?;
        }
    }
    Ok(())
}

fn read_dir_paths(dir: &Path) -> Result<Vec<PathBuf>, PackagingError> {
    fs::read_dir(dir)
        .map_err(|e| PackagingError::io(dir, e))?
        .map(|entry| {
            entry
                .map(|e| e.path())
                .map_err(|e| PackagingError::io(dir, e))
        })
        .collect()
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>, PackagingError> {
    let mut dirs: Vec<PathBuf> = read_dir_paths(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
