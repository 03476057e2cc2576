//! Shader-stage property overrides for staged material files.
//!
//! Runs after [`super::rewrite`], so requested material names that still carry
//! a `.skin.` placeholder are resolved against whatever identifier the file
//! holds now. Nothing here aborts packaging: unknown materials, missing stages
//! and unparsable files are collected as warnings.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use walkdir::WalkDir;

use super::{is_materials_file, PackagingError};
use crate::models::{MaterialOverrides, StageOverrides};

/// Outcome of patching one skin folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialPatchReport {
    pub files_written: Vec<PathBuf>,
    pub properties_changed: usize,
    pub warnings: Vec<String>,
}

impl MaterialPatchReport {
    pub fn merge(&mut self, other: MaterialPatchReport) {
        self.files_written.extend(other.files_written);
        self.properties_changed += other.properties_changed;
        self.warnings.extend(other.warnings);
    }
}

/// Remove commas directly before a closing brace or bracket.
///
/// Commas inside string literals are kept.
pub fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => in_string = true,
            ',' => {
                let next = text[i + 1..].trim_start().chars().next();
                if matches!(next, Some('}' | ']')) {
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Parse a materials file, tolerating trailing commas.
pub(crate) fn parse_materials(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text).or_else(|_| serde_json::from_str(&strip_trailing_commas(text)))
}

/// Find the key of the material a request refers to.
///
/// A request of `base.skin.anything` (or bare `base`) matches the first key
/// starting with `base.skin.`; a bare request matching a key exactly wins.
pub fn resolve_material<'a>(materials: &'a Map<String, Value>, requested: &str) -> Option<&'a str> {
    let base = match requested.find(".skin.") {
        Some(idx) => &requested[..idx],
        None => {
            if let Some((key, _)) = materials.get_key_value(requested) {
                return Some(key.as_str());
            }
            requested
        }
    };
    let prefix = format!("{base}.skin.");
    materials
        .keys()
        .find(|k| k.starts_with(&prefix))
        .map(String::as_str)
}

/// Apply `overrides` to every materials file under `skin_folder`.
pub fn patch_skin_folder(
    skin_folder: &Path,
    overrides: &MaterialOverrides,
) -> Result<MaterialPatchReport, PackagingError> {
    let mut report = MaterialPatchReport::default();
    if overrides.is_empty() {
        return Ok(report);
    }

    for entry in WalkDir::new(skin_folder).sort_by_file_name() {
        let entry = entry.map_err(|e| PackagingError::walk(skin_folder, e))?;
        if entry.file_type().is_file() && is_materials_file(&entry.file_name().to_string_lossy())
        {
            report.merge(patch_file(entry.path(), overrides)?);
        }
    }
    Ok(report)
}

/// Apply `overrides` to one materials file, writing it back only on change.
pub fn patch_file(
    path: &Path,
    overrides: &MaterialOverrides,
) -> Result<MaterialPatchReport, PackagingError> {
    let mut report = MaterialPatchReport::default();
    let text = fs::read_to_string(path).map_err(|e| PackagingError::io(path, e))?;

    let mut root: Value = match parse_materials(&text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "skipping unparsable materials file");
            report
                .warnings
                .push(format!("{}: cannot parse: {e}", path.display()));
            return Ok(report);
        }
    };
    let Some(materials) = root.as_object_mut() else {
        report
            .warnings
            .push(format!("{}: top level is not an object", path.display()));
        return Ok(report);
    };

    for (requested, stages) in overrides {
        let Some(key) = resolve_material(materials, requested).map(str::to_string) else {
            tracing::warn!(material = %requested, file = %path.display(), "material not found");
            report
                .warnings
                .push(format!("{}: material '{requested}' not found", path.display()));
            continue;
        };
        let Some(stage_list) = materials
            .get_mut(&key)
            .and_then(|m| m.get_mut("Stages"))
            .and_then(Value::as_array_mut)
        else {
            report
                .warnings
                .push(format!("{}: material '{key}' has no Stages list", path.display()));
            continue;
        };

        for (&index, props) in stages {
            let stage_count = stage_list.len();
            let Some(stage) = stage_list.get_mut(index).and_then(Value::as_object_mut) else {
                tracing::warn!(material = %key, stage = index, stage_count, "stage out of range");
                report.warnings.push(format!(
                    "{}: material '{key}' has {stage_count} stages, stage {index} skipped",
                    path.display()
                ));
                continue;
            };
            report.properties_changed += merge_stage(stage, props);
        }
    }

    if report.properties_changed > 0 {
        let json = serde_json::to_string_pretty(&root)
            .map_err(|e| PackagingError::io(path, std::io::Error::other(e)))?;
        fs::write(path, json).map_err(|e| PackagingError::io(path, e))?;
        tracing::debug!(
            file = %path.display(),
            changed = report.properties_changed,
            "material properties written"
        );
        report.files_written.push(path.to_path_buf());
    }
    Ok(report)
}

/// Merge one stage's overrides, returning how many values actually changed.
fn merge_stage(stage: &mut Map<String, Value>, props: &StageOverrides) -> usize {
    let mut changed = 0;
    for (property, value) in props {
        let Some(value) = value else { continue };
        let Some(number) = Number::from_f64(*value) else {
            continue;
        };
        let new_value = Value::Number(number);
        let same = stage
            .get(property.key())
            .and_then(Value::as_f64)
            .is_some_and(|old| old == *value);
        if !same {
            stage.insert(property.key().to_string(), new_value);
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShaderProperty;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const MATERIALS: &str = r#"{
  "testcar.skin.red": {
    "name": "testcar.skin.red",
    "Stages": [
      {"metallicFactor": 0.1},
      {"baseColorMap": "vehicles/testcar/red/testcar_skin_red.dds", "roughnessFactor": 0.5,},
    ],
  },
  "glass": {"Stages": [{}]},
}"#;

    fn overrides(material: &str, stage: usize, prop: ShaderProperty, v: Option<f64>) -> MaterialOverrides {
        let mut props = StageOverrides::new();
        props.insert(prop, v);
        let mut stages = BTreeMap::new();
        stages.insert(stage, props);
        let mut m = MaterialOverrides::new();
        m.insert(material.to_string(), stages);
        m
    }

    fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("skin.materials.json");
        fs::write(&path, MATERIALS).unwrap();
        path
    }

    #[test]
    fn trailing_commas_are_stripped() {
        let cleaned = strip_trailing_commas("{\"a\": [1, 2, ], \"b\": {\"c\": 1,\n},\n}");
        let v: Value = serde_json::from_str(&cleaned).expect("parse cleaned text");
        assert_eq!(v["a"][1], 2);
    }

    #[test]
    fn commas_inside_strings_survive() {
        let text = r#"{"note": "a, }", "list": ["x, ]", "y",],}"#;
        let v: Value = serde_json::from_str(&strip_trailing_commas(text)).unwrap();
        assert_eq!(v["note"], "a, }");
        assert_eq!(v["list"][0], "x, ]");
        let escaped = r#"{"q": "say \"hi\", }",}"#;
        let v: Value = serde_json::from_str(&strip_trailing_commas(escaped)).unwrap();
        assert_eq!(v["q"], "say \"hi\", }");
    }

    #[test]
    fn patching_keeps_string_values_intact() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("skin.materials.json");
        fs::write(
            &path,
            r#"{"car.skin.x": {"Stages": [{"note": "a, }", "metallicFactor": 0.1},],},}"#,
        )
        .unwrap();
        let o = overrides("car.skin.x", 0, ShaderProperty::MetallicFactor, Some(0.9));

        let report = patch_skin_folder(tmp.path(), &o).unwrap();
        assert_eq!(report.properties_changed, 1);
        let v: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["car.skin.x"]["Stages"][0]["note"], "a, }");
        assert_eq!(v["car.skin.x"]["Stages"][0]["metallicFactor"], 0.9);
    }

    #[test]
    fn placeholder_request_resolves_to_current_identifier() {
        let v: Value = serde_json::from_str(&strip_trailing_commas(MATERIALS)).unwrap();
        let map = v.as_object().unwrap();
        assert_eq!(resolve_material(map, "testcar.skin.SKINNAME"), Some("testcar.skin.red"));
        assert_eq!(resolve_material(map, "testcar"), Some("testcar.skin.red"));
        assert_eq!(resolve_material(map, "glass"), Some("glass"));
        assert_eq!(resolve_material(map, "missing.skin.x"), None);
    }

    #[test]
    fn merges_requested_property_into_stage() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(tmp.path());
        let o = overrides("testcar.skin.SKINNAME", 1, ShaderProperty::ClearCoatFactor, Some(0.8));

        let report = patch_skin_folder(tmp.path(), &o).unwrap();
        assert_eq!(report.properties_changed, 1);
        assert_eq!(report.files_written, vec![path.clone()]);

        let v: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let stage = &v["testcar.skin.red"]["Stages"][1];
        assert_eq!(stage["clearCoatFactor"], 0.8);
        assert_eq!(stage["roughnessFactor"], 0.5);
        // Key order survives re-serialization.
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["testcar.skin.red".to_string(), "glass".to_string()]);
    }

    #[test]
    fn out_of_range_stage_leaves_file_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(tmp.path());
        let o = overrides("testcar.skin.red", 5, ShaderProperty::MetallicFactor, Some(0.3));

        let report = patch_skin_folder(tmp.path(), &o).unwrap();
        assert_eq!(report.properties_changed, 0);
        assert!(report.files_written.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), MATERIALS);
    }

    #[test]
    fn unchanged_or_null_values_do_not_rewrite() {
        let tmp = TempDir::new().unwrap();
        let path = write_fixture(tmp.path());

        let same = overrides("testcar", 0, ShaderProperty::MetallicFactor, Some(0.1));
        assert_eq!(patch_skin_folder(tmp.path(), &same).unwrap().properties_changed, 0);

        let null = overrides("testcar", 0, ShaderProperty::RoughnessFactor, None);
        assert_eq!(patch_skin_folder(tmp.path(), &null).unwrap().properties_changed, 0);

        assert_eq!(fs::read_to_string(&path).unwrap(), MATERIALS);
    }

    #[test]
    fn unknown_material_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        write_fixture(tmp.path());
        let o = overrides("bumper.skin.x", 0, ShaderProperty::MetallicFactor, Some(0.3));
        let report = patch_skin_folder(tmp.path(), &o).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("bumper.skin.x"));
    }

    #[test]
    fn unparsable_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("materials.json");
        fs::write(&path, "{ not json").unwrap();
        let o = overrides("a", 0, ShaderProperty::MetallicFactor, Some(0.3));
        let report = patch_skin_folder(tmp.path(), &o).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
