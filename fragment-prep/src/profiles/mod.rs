//! Language-profile registry for the fragment builder.
//!
//! Each file is dispatched to exactly one profile by extension (with a
//! shebang fallback for extensionless scripts). Profiles return raw line
//! spans; the builder turns them into full fragments. New profiles are added
//! by extending the enum and the detection table.

pub mod code;
pub mod config;
pub mod generic;
pub mod heading;

use crate::model::FragmentKind;
use std::path::Path;

/// A raw span emitted by a profile: 1-based inclusive lines plus the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSpan {
    pub start_line: u32,
    pub end_line: u32,
    pub kind: FragmentKind,
}

impl ProfileSpan {
    pub fn new(start_line: u32, end_line: u32, kind: FragmentKind) -> Self {
        Self {
            start_line,
            end_line,
            kind,
        }
    }
}

/// Which fragmentation algorithm applies to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageProfile {
    /// Tree-sitter structured parse (functions/classes + gap chunks).
    Structured(code::Grammar),
    /// Line-structured config formats (YAML/TOML/INI/.env).
    Config(config::ConfigFlavor),
    /// Heading-delimited documents (Markdown/reStructuredText).
    Heading(heading::HeadingFlavor),
    /// Blank-line-aligned chunks of bounded size.
    Generic,
}

/// Pick a profile from the file name, falling back to shebang sniffing for
/// extensionless scripts.
pub fn detect(path: &Path, content: &str) -> LanguageProfile {
    use code::Grammar;
    use config::ConfigFlavor;
    use heading::HeadingFlavor;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if file_name == ".env" || file_name.starts_with(".env.") {
        return LanguageProfile::Config(ConfigFlavor::Env);
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "py" | "pyi" => LanguageProfile::Structured(Grammar::Python),
        "rs" => LanguageProfile::Structured(Grammar::Rust),
        "js" | "mjs" | "cjs" | "jsx" => LanguageProfile::Structured(Grammar::JavaScript),
        "ts" | "mts" | "cts" => LanguageProfile::Structured(Grammar::TypeScript),
        "tsx" => LanguageProfile::Structured(Grammar::Tsx),
        "yaml" | "yml" => LanguageProfile::Config(ConfigFlavor::Yaml),
        "toml" => LanguageProfile::Config(ConfigFlavor::Toml),
        "ini" | "cfg" | "conf" | "properties" => LanguageProfile::Config(ConfigFlavor::Ini),
        "env" => LanguageProfile::Config(ConfigFlavor::Env),
        "md" | "markdown" | "mdx" => LanguageProfile::Heading(HeadingFlavor::Markdown),
        "rst" => LanguageProfile::Heading(HeadingFlavor::Rst),
        "" => detect_by_shebang(content),
        _ => LanguageProfile::Generic,
    }
}

fn detect_by_shebang(content: &str) -> LanguageProfile {
    let first = content.lines().next().unwrap_or_default();
    if !first.starts_with("#!") {
        return LanguageProfile::Generic;
    }
    if first.contains("python") {
        LanguageProfile::Structured(code::Grammar::Python)
    } else if first.contains("node") {
        LanguageProfile::Structured(code::Grammar::JavaScript)
    } else {
        LanguageProfile::Generic
    }
}
