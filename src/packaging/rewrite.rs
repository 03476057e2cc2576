//! Regex rewriting of staged JBEAM and material JSON files.
//!
//! Template files are hand-authored game formats with comments and trailing
//! commas, so edits are made on the raw text with an ordered rule table
//! instead of a strict parser. Each [`Rule`] names its pattern, whether it
//! touches only the first match or all of them, and how the replacement is
//! built from the captures and the [`RewriteContext`].
//!
//! The `baseColorMap` edit is the one exception: when a material file parses
//! as plain JSON, the second stage of each skin material is updated through
//! `serde_json` and the file re-serialized; otherwise the raw text is patched.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;
use walkdir::WalkDir;

use super::{json_escape, PackagingError};

/// Everything the rules need to retarget one staged skin.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Template car id (`vehicles/<carid>/...`).
    pub carid: String,
    /// Sanitized skin folder name.
    pub skin_folder: String,
    /// File name of the user's texture inside the skin folder.
    pub texture_filename: String,
    /// Identifier derived from the texture file name.
    pub identifier: String,
    pub display_name: String,
    pub author: String,
}

impl RewriteContext {
    /// Mod-relative path of the skin texture, as materials reference it.
    pub fn texture_ref(&self) -> String {
        format!(
            "vehicles/{}/{}/{}",
            self.carid, self.skin_folder, self.texture_filename
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    First,
    All,
}

/// One ordered text substitution.
pub struct Rule {
    pub name: &'static str,
    pub pattern: fn() -> &'static Regex,
    pub scope: Scope,
    pub build: fn(&Captures<'_>, &RewriteContext) -> String,
}

impl Rule {
    pub fn apply(&self, text: &str, ctx: &RewriteContext) -> String {
        let re = (self.pattern)();
        let replacer = |caps: &Captures<'_>| (self.build)(caps, ctx);
        match self.scope {
            Scope::First => re.replacen(text, 1, replacer).into_owned(),
            Scope::All => re.replace_all(text, replacer).into_owned(),
        }
    }
}

macro_rules! pattern {
    ($fn_name:ident, $re:expr) => {
        fn $fn_name() -> &'static Regex {
            static PATTERN: OnceLock<Regex> = OnceLock::new();
            PATTERN.get_or_init(|| Regex::new($re).expect("static pattern"))
        }
    };
}

pattern!(authors_pattern, r#"("authors"\s*:\s*")[^"]*(")"#);
pattern!(name_pattern, r#"("name"\s*:\s*")([^"]*)(")"#);
pattern!(placeholder_key_pattern, r#""([^"]*_)[^"]+":"#);
pattern!(global_skin_pattern, r#"("globalSkin"\s*:\s*")[^"]*(")"#);
pattern!(extra_skin_pattern, r#""([^"]*_extra\.skin\.)[^"]+""#);
pattern!(skin_ref_pattern, r#""([^"]+\.skin\.)[^"]+""#);
pattern!(skin_name_pattern, r#"("name"\s*:\s*"[^"]+\.skin\.)[^"]+""#);
pattern!(skin_map_to_pattern, r#"("mapTo"\s*:\s*"[^"]+\.skin\.)[^"]+""#);
pattern!(
    base_color_map_pattern,
    r#""baseColorMap"\s*:\s*"[^"]+\.(?i:dds)""#
);

fn set_author(caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    format!("{}{}{}", &caps[1], json_escape(&ctx.author), &caps[2])
}

fn set_display_name(caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    // `.skin.` names are material bindings, handled by the identifier rules.
    if caps[2].contains(".skin.") {
        return caps[0].to_string();
    }
    format!("{}{}{}", &caps[1], json_escape(&ctx.display_name), &caps[3])
}

fn set_placeholder_key(caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    format!("\"{}{}\":", &caps[1], json_escape(&ctx.identifier))
}

fn set_global_skin(caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    format!("{}{}{}", &caps[1], json_escape(&ctx.identifier), &caps[2])
}

fn set_quoted_suffix(caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    format!("\"{}{}\"", &caps[1], json_escape(&ctx.identifier))
}

fn set_field_suffix(caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    format!("{}{}\"", &caps[1], json_escape(&ctx.identifier))
}

fn set_base_color_map(_caps: &Captures<'_>, ctx: &RewriteContext) -> String {
    format!("\"baseColorMap\": \"{}\"", json_escape(&ctx.texture_ref()))
}

/// Rules for `.jbeam` skin slot definitions, in application order.
pub const JBEAM_RULES: &[Rule] = &[
    Rule {
        name: "authors",
        pattern: authors_pattern,
        scope: Scope::All,
        build: set_author,
    },
    Rule {
        name: "display name",
        pattern: name_pattern,
        scope: Scope::All,
        build: set_display_name,
    },
    Rule {
        name: "placeholder key",
        pattern: placeholder_key_pattern,
        scope: Scope::First,
        build: set_placeholder_key,
    },
    Rule {
        name: "globalSkin",
        pattern: global_skin_pattern,
        scope: Scope::All,
        build: set_global_skin,
    },
    Rule {
        name: "extra skin",
        pattern: extra_skin_pattern,
        scope: Scope::All,
        build: set_quoted_suffix,
    },
];

/// Identifier rules for material JSON files, in application order.
/// The `baseColorMap` rewrite runs after these; see [`rewrite_json`].
pub const JSON_RULES: &[Rule] = &[
    Rule {
        name: "skin reference",
        pattern: skin_ref_pattern,
        scope: Scope::First,
        build: set_quoted_suffix,
    },
    Rule {
        name: "skin name",
        pattern: skin_name_pattern,
        scope: Scope::First,
        build: set_field_suffix,
    },
    Rule {
        name: "skin mapTo",
        pattern: skin_map_to_pattern,
        scope: Scope::First,
        build: set_field_suffix,
    },
    Rule {
        name: "extra skin",
        pattern: extra_skin_pattern,
        scope: Scope::All,
        build: set_quoted_suffix,
    },
];

const BASE_COLOR_RULE: Rule = Rule {
    name: "baseColorMap",
    pattern: base_color_map_pattern,
    scope: Scope::All,
    build: set_base_color_map,
};

/// Counts of files touched in one skin folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub jbeam_files: usize,
    pub json_files: usize,
    /// JSON files whose `baseColorMap` went through the structured path.
    pub structured_json: usize,
}

/// Apply [`JBEAM_RULES`] to `text`.
pub fn rewrite_jbeam(text: &str, ctx: &RewriteContext) -> String {
    JBEAM_RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc, ctx))
}

/// Apply [`JSON_RULES`] and the `baseColorMap` rewrite to `text`.
///
/// Returns the new text and whether the structured path was used.
pub fn rewrite_json(text: &str, ctx: &RewriteContext) -> (String, bool) {
    let text = JSON_RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc, ctx));

    match set_base_color_structured(&text, &ctx.texture_ref()) {
        Some(structured) => (structured, true),
        None => (BASE_COLOR_RULE.apply(&text, ctx), false),
    }
}

/// Set `Stages[1].baseColorMap` on every skin material in `text`.
///
/// `None` when the text is not strict JSON or holds no material with a
/// second stage, leaving the caller to fall back to text substitution.
fn set_base_color_structured(text: &str, texture_ref: &str) -> Option<String> {
    let mut root: Value = serde_json::from_str(text).ok()?;
    let materials = root.as_object_mut()?;

    let mut updated = false;
    for (key, material) in materials.iter_mut() {
        if !key.contains(".skin.") || key.contains("_extra.skin.") {
            continue;
        }
        let stage = material
            .get_mut("Stages")
            .and_then(Value::as_array_mut)
            .and_then(|stages| stages.get_mut(1))
            .and_then(Value::as_object_mut);
        if let Some(stage) = stage {
            stage.insert(
                "baseColorMap".to_string(),
                Value::String(texture_ref.to_string()),
            );
            updated = true;
        }
    }

    if !updated {
        return None;
    }
    serde_json::to_string_pretty(&root).ok()
}

/// Rewrite every JBEAM file and every non-`info*` JSON file under `folder`.
pub fn rewrite_skin_folder(
    folder: &Path,
    ctx: &RewriteContext,
) -> Result<RewriteSummary, PackagingError> {
    let mut summary = RewriteSummary::default();

    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(|e| PackagingError::walk(folder, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jbeam" => {
                let text = fs::read_to_string(path).map_err(|e| PackagingError::io(path, e))?;
                write_if_changed(path, &text, &rewrite_jbeam(&text, ctx))?;
                summary.jbeam_files += 1;
            }
            "json" if !name.starts_with("info") => {
                let text = fs::read_to_string(path).map_err(|e| PackagingError::io(path, e))?;
                let (new_text, structured) = rewrite_json(&text, ctx);
                write_if_changed(path, &text, &new_text)?;
                summary.json_files += 1;
                if structured {
                    summary.structured_json += 1;
                }
            }
            _ => {}
        }
    }

    tracing::debug!(
        folder = %folder.display(),
        jbeam = summary.jbeam_files,
        json = summary.json_files,
        structured = summary.structured_json,
        "rewrote skin folder"
    );
    Ok(summary)
}

fn write_if_changed(path: &Path, old: &str, new: &str) -> Result<(), PackagingError> {
    if old != new {
        fs::write(path, new).map_err(|e| PackagingError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx() -> RewriteContext {
        RewriteContext {
            carid: "testcar".to_string(),
            skin_folder: "red_stripe".to_string(),
            texture_filename: "testcar_skin_red.dds".to_string(),
            identifier: "red".to_string(),
            display_name: "Red Stripe".to_string(),
            author: "Jane".to_string(),
        }
    }

    const JBEAM: &str = r#"{
"testcar_skin_SKINNAME": {
    "information":{
        "authors":"Template Author",
        "name":"Template Skin",
        "value":100,
    },
    "slotType" : "paint_design",
    "globalSkin" : "SKINNAME",
    // comment, kept as is
},
"testcar_skin_OTHER": {
    "information":{"name":"testcar_extra.skin.SKINNAME"},
},
}"#;

    #[test]
    fn jbeam_rules_retarget_metadata_and_identifier() {
        let out = rewrite_jbeam(JBEAM, &ctx());
        assert!(out.contains(r#""authors":"Jane""#));
        assert!(out.contains(r#""name":"Red Stripe""#));
        assert!(out.contains(r#""globalSkin" : "red""#));
        assert!(out.contains("// comment, kept as is"));
    }

    #[test]
    fn only_first_placeholder_key_is_rewritten() {
        let out = rewrite_jbeam(JBEAM, &ctx());
        assert!(out.contains(r#""testcar_skin_red": {"#));
        assert!(out.contains(r#""testcar_skin_OTHER": {"#));
        assert!(!out.contains("testcar_skin_SKINNAME"));
    }

    #[test]
    fn extra_skin_names_are_retargeted_not_renamed() {
        let out = rewrite_jbeam(JBEAM, &ctx());
        assert!(out.contains(r#""name":"testcar_extra.skin.red""#));
    }

    #[test]
    fn display_name_is_json_escaped() {
        let mut c = ctx();
        c.display_name = r#"The "Best" Skin"#.to_string();
        let out = rewrite_jbeam(r#"{"name":"x"}"#, &c);
        assert_eq!(out, r#"{"name":"The \"Best\" Skin"}"#);
    }

    #[test]
    fn identifier_with_dollar_is_inserted_literally() {
        let mut c = ctx();
        c.identifier = "$1cash".to_string();
        let out = rewrite_jbeam(r#"{"globalSkin":"x"}"#, &c);
        assert_eq!(out, r#"{"globalSkin":"$1cash"}"#);
    }

    #[test]
    fn identifier_is_json_escaped_everywhere() {
        let mut c = ctx();
        c.identifier = r#"a"b\c"#.to_string();
        let text = r#"{"car_skin_SKINNAME": {"globalSkin": "x", "name": "y_extra.skin.SKINNAME"}}"#;
        let out = rewrite_jbeam(text, &c);
        let value: Value = serde_json::from_str(&out).expect("rewritten JBEAM stays valid");
        let slot = &value[r#"car_skin_a"b\c"#];
        assert_eq!(slot["globalSkin"], r#"a"b\c"#);
        assert_eq!(slot["name"], r#"y_extra.skin.a"b\c"#);

        let (out, _) = rewrite_json(r#"{"m.skin.X": {"name": "m.skin.X", "mapTo": "m.skin.X"}}"#, &c);
        let value: Value = serde_json::from_str(&out).expect("rewritten JSON stays valid");
        assert_eq!(value[r#"m.skin.a"b\c"#]["mapTo"], r#"m.skin.a"b\c"#);
    }

    #[test]
    fn only_first_skin_material_is_retargeted() {
        let text = r#"{
  "testcar.skin.SKINNAME": {"name": "testcar.skin.SKINNAME", "mapTo": "testcar.skin.SKINNAME"},
  "wheel.skin.SKINNAME": {"name": "wheel.skin.SKINNAME", "mapTo": "wheel.skin.SKINNAME"},
  "hood_extra.skin.SKINNAME": {"mapTo": "hood_extra.skin.SKINNAME"},
  "door_extra.skin.SKINNAME": {"mapTo": "door_extra.skin.SKINNAME"}
}"#;
        let (out, structured) = rewrite_json(text, &ctx());
        assert!(!structured);
        assert!(out.contains(r#""testcar.skin.red": {"name": "testcar.skin.red", "mapTo": "testcar.skin.red"}"#));
        assert!(out.contains(
            r#""wheel.skin.SKINNAME": {"name": "wheel.skin.SKINNAME", "mapTo": "wheel.skin.SKINNAME"}"#
        ));
        assert_eq!(out.matches("hood_extra.skin.red").count(), 2);
        assert_eq!(out.matches("door_extra.skin.red").count(), 2);
        assert!(!out.contains("_extra.skin.SKINNAME"));
    }

    #[test]
    fn json_with_trailing_commas_uses_text_fallback() {
        let text = r#"{
  "testcar.skin.SKINNAME": {
    "name": "testcar.skin.SKINNAME",
    "mapTo": "testcar.skin.SKINNAME",
    "Stages": [
      {},
      {"baseColorMap": "vehicles/testcar/SKINNAME/old.dds",},
    ],
  },
  "glass_extra.skin.SKINNAME": {"mapTo": "glass_extra.skin.SKINNAME"},
}"#;
        let (out, structured) = rewrite_json(text, &ctx());
        assert!(!structured);
        assert!(out.contains(r#""testcar.skin.red": {"#));
        assert!(out.contains(r#""name": "testcar.skin.red""#));
        assert!(out.contains(r#""mapTo": "testcar.skin.red""#));
        assert!(out.contains(r#""glass_extra.skin.red""#));
        assert!(out.contains(r#""mapTo": "glass_extra.skin.red""#));
        assert!(out.contains(
            r#""baseColorMap": "vehicles/testcar/red_stripe/testcar_skin_red.dds""#
        ));
    }

    #[test]
    fn strict_json_sets_second_stage_only() {
        let text = r#"{
  "testcar.skin.SKINNAME": {
    "name": "testcar.skin.SKINNAME",
    "Stages": [
      {"baseColorMap": "vehicles/common/base.dds"},
      {"baseColorMap": "vehicles/testcar/SKINNAME/old.dds", "metallicFactor": 0.2}
    ]
  }
}"#;
        let (out, structured) = rewrite_json(text, &ctx());
        assert!(structured);
        let value: Value = serde_json::from_str(&out).unwrap();
        let stages = &value["testcar.skin.red"]["Stages"];
        assert_eq!(stages[0]["baseColorMap"], "vehicles/common/base.dds");
        assert_eq!(
            stages[1]["baseColorMap"],
            "vehicles/testcar/red_stripe/testcar_skin_red.dds"
        );
        assert_eq!(stages[1]["metallicFactor"], 0.2);
    }

    #[test]
    fn strict_json_without_second_stage_falls_back_to_text() {
        let text = r#"{"testcar.skin.SKINNAME": {"Stages": [{"baseColorMap": "a/b.dds"}]}}"#;
        let (out, structured) = rewrite_json(text, &ctx());
        assert!(!structured);
        assert!(out.contains(r#""baseColorMap": "vehicles/testcar/red_stripe/testcar_skin_red.dds""#));
    }

    #[test]
    fn folder_rewrite_skips_info_files() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path();
        fs::write(folder.join("skin.jbeam"), JBEAM).unwrap();
        let info = r#"{"name": "a.skin.SKINNAME"}"#;
        fs::write(folder.join("info_extra.json"), info).unwrap();
        fs::write(
            folder.join("skin.materials.json"),
            r#"{"testcar.skin.SKINNAME": {"Stages": [{}, {"baseColorMap": "x.dds"}]}}"#,
        )
        .unwrap();

        let summary = rewrite_skin_folder(folder, &ctx()).unwrap();
        assert_eq!(
            summary,
            RewriteSummary {
                jbeam_files: 1,
                json_files: 1,
                structured_json: 1
            }
        );
        assert_eq!(fs::read_to_string(folder.join("info_extra.json")).unwrap(), info);
        let materials = fs::read_to_string(folder.join("skin.materials.json")).unwrap();
        assert!(materials.contains("testcar.skin.red"));
    }

    #[test]
    fn rerun_keeps_set_to_same_value_fields() {
        let once = rewrite_jbeam(JBEAM, &ctx());
        let twice = rewrite_jbeam(&once, &ctx());
        assert!(twice.contains(r#""authors":"Jane""#));
        assert!(twice.contains(r#""globalSkin" : "red""#));
        assert!(twice.contains(r#""name":"Red Stripe""#));
    }
}
