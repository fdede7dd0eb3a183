// src/prompt.rs

//! Prompt assembly for the completion backend.
//!
//! A prompt is made of:
//! - A role-setting header naming the target language
//! - Optional lines describing the file the user is editing
//! - The cleaned user instruction
//!
//! Reading the active file is best-effort. Any failure (missing file,
//! permissions, non UTF-8 content) simply contributes no context.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ ]{2,}").unwrap());

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:import|using|require|library)\s+([^\s;]+)").unwrap()
});

const GENERIC_LANGUAGE: &str = "general programming";

/// Context derived from the file the user is editing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub filename: Option<String>,
    pub detected_imports: BTreeSet<String>,
}

/// Normalise user text: tabs to four spaces, runs of spaces collapsed, trimmed.
pub fn clean_prompt(raw: &str) -> String {
    let expanded = raw.replace('\t', "    ");
    MULTI_SPACE
        .replace_all(&expanded, " ")
        .trim()
        .to_string()
}

/// Inspect the active file for a name and import-like tokens.
///
/// The filename is reported even if the content cannot be read.
pub fn extract_file_context(file_path: Option<&str>) -> PromptContext {
    let mut ctx = PromptContext::default();

    let Some(raw_path) = file_path.filter(|p| !p.is_empty()) else {
        return ctx;
    };

    let path = Path::new(raw_path);
    ctx.filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string());

    match std::fs::read_to_string(path) {
        Ok(content) => {
            ctx.detected_imports = IMPORT_LINE
                .captures_iter(&content)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .collect();
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "file context unavailable");
        }
    }

    ctx
}

/// Build the final prompt sent to the completion backend.
///
/// Never fails. The cleaned instruction is always the tail of the prompt.
pub fn build_prompt(user_text: &str, file_path: Option<&str>, language: Option<&str>) -> String {
    let cleaned = clean_prompt(user_text);
    let ctx = extract_file_context(file_path);

    let lang = language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(GENERIC_LANGUAGE);

    let mut header = format!(
        "You are a senior software engineer specialized in {}. \
         Generate clean, well-documented code that fulfills the user's request.\n\n",
        lang
    );

    if let Some(name) = &ctx.filename {
        header.push_str(&format!("The user is editing the file **{}**.\n", name));
    }

    if !ctx.detected_imports.is_empty() {
        let imports = ctx
            .detected_imports
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        header.push_str(&format!("The current file imports: {}.\n", imports));
    }

    format!("{}\nUser request:\n{}", header, cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cleaning_expands_tabs_and_collapses_spaces() {
        assert_eq!(clean_prompt("  write\ta   function  \n"), "write a function");
        assert_eq!(clean_prompt("a\n\tb"), "a\n b");
    }

    #[test]
    fn header_names_language_or_generic_fallback() {
        let py = build_prompt("sum a list", None, Some("python"));
        assert!(py.starts_with("You are a senior software engineer specialized in python."));

        let any = build_prompt("sum a list", None, None);
        assert!(any.contains("specialized in general programming."));
        assert!(any.ends_with("User request:\nsum a list"));
    }

    #[test]
    fn missing_file_contributes_only_its_name() {
        let prompt = build_prompt("go", Some("/definitely/not/here/script.py"), Some("python"));
        assert!(prompt.contains("The user is editing the file **script.py**."));
        assert!(!prompt.contains("The current file imports"));
    }

    #[test]
    fn imports_are_detected_and_deduplicated() {
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        writeln!(
            file,
            "import numpy\nimport numpy\n  library(dplyr)\nusing LinearAlgebra;\nx = 1"
        )
        .unwrap();

        let ctx = extract_file_context(file.path().to_str());
        let expected: BTreeSet<String> = ["numpy", "LinearAlgebra"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        // `library(dplyr)` has no whitespace after the keyword
        assert_eq!(ctx.detected_imports, expected);

        let prompt = build_prompt("plot it", file.path().to_str(), None);
        assert!(prompt.contains("The current file imports: LinearAlgebra, numpy."));
    }

    #[test]
    fn non_utf8_file_is_ignored_silently() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x80]).unwrap();

        let ctx = extract_file_context(file.path().to_str());
        assert!(ctx.filename.is_some());
        assert!(ctx.detected_imports.is_empty());
    }

    #[test]
    fn cleaned_text_always_survives_verbatim() {
        for input in ["x", "  print(1)  ", "def f():\n\treturn   2", "🦀 ok"] {
            let prompt = build_prompt(input, None, Some("rust"));
            assert!(prompt.contains(&clean_prompt(input)));
        }
    }
}
