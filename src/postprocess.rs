// src/postprocess.rs

//! Cleanup of generated text.
//!
//! Generation models usually wrap code in markdown fences and sometimes
//! emit prose around it. This module:
//! - Picks the most relevant fenced block
//! - Flags constructs associated with destructive operations
//!
//! Block precedence:
//! 1. First fenced block tagged with the requested language (or an alias)
//! 2. First fenced block of any kind
//! 3. The raw text, unchanged
//!
//! A final fence left open (generation cut off) runs to the end of the text.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+#.-]*)[^\n]*\n(.*?)(?:```|\z)").unwrap());

/// Patterns flagged as potentially destructive, with a short label.
static DANGEROUS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("rm -rf", r"\brm\s+-[a-zA-Z]*r[a-zA-Z]*f|\brm\s+-[a-zA-Z]*f[a-zA-Z]*r"),
        ("shutil.rmtree", r"\bshutil\.rmtree\s*\("),
        ("os.system", r"\bos\.system\s*\("),
        ("os.remove", r"\bos\.(?:remove|unlink|rmdir)\s*\("),
        ("subprocess", r"\bsubprocess\.(?:run|call|Popen|check_output|check_call)\s*\("),
        ("eval", r"(?:^|[^.\w])eval\s*\("),
        ("exec", r"(?:^|[^.\w])exec\s*\("),
        ("child_process", r"child_process"),
        ("fs.rm", r"\bfs\.(?:rmSync|rm|unlinkSync|rmdirSync)\s*\("),
        ("unlink", r"\bunlink\s*\("),
        ("system", r"(?:^|[^.\w])system\s*\("),
        ("DROP", r"(?i)\bdrop\s+(?:table|database|schema)\b"),
        ("TRUNCATE", r"(?i)\btruncate\s+table\b"),
        ("mkfs", r"\bmkfs(?:\.\w+)?\b"),
        ("dd", r"\bdd\s+if="),
        ("fork bomb", r":\(\)\s*\{\s*:\|:&\s*\};:"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).unwrap()))
    .collect()
});

/// Fence tags accepted for each language.
fn fence_aliases(language: &str) -> &'static [&'static str] {
    match language.to_lowercase().as_str() {
        "python" => &["python", "py", "python3"],
        "r" => &["r"],
        "julia" => &["julia", "jl"],
        "javascript" => &["javascript", "js", "node", "jsx"],
        "typescript" => &["typescript", "ts", "tsx"],
        "bash" => &["bash", "sh", "shell", "zsh"],
        "sql" => &["sql", "postgresql", "psql"],
        "latex" => &["latex", "tex"],
        _ => &[],
    }
}

fn line_comment(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "javascript" | "typescript" => "//",
        "sql" => "--",
        "latex" => "%",
        _ => "#",
    }
}

/// Return the most relevant code span from `raw`.
pub fn extract_code(raw: &str, language: &str) -> String {
    let blocks: Vec<(String, &str)> = FENCE
        .captures_iter(raw)
        .filter_map(|c| {
            let tag = c.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
            c.get(2).map(|body| (tag, body.as_str()))
        })
        .collect();

    let lang = language.to_lowercase();
    let aliases = fence_aliases(&lang);

    let chosen = blocks
        .iter()
        .find(|(tag, _)| tag == &lang || aliases.contains(&tag.as_str()))
        .or_else(|| blocks.first());

    match chosen {
        Some((_, body)) => body.trim_end_matches(['\n', '\r']).to_string(),
        None => raw.to_string(),
    }
}

/// Labels of every dangerous pattern found in `code`.
pub fn find_dangerous(code: &str) -> Vec<&'static str> {
    DANGEROUS
        .iter()
        .filter(|(_, re)| re.is_match(code))
        .map(|(label, _)| *label)
        .collect()
}

/// Strip fences from generated text and flag dangerous constructs.
///
/// With `block_dangerous`, offending lines are commented out using the
/// language's line comment marker. Without it, code is returned untouched
/// and only the warning is produced.
pub fn postprocess_code(raw: &str, language: &str, block_dangerous: bool) -> (String, Option<String>) {
    let code = extract_code(raw, language);
    let found = find_dangerous(&code);

    if found.is_empty() {
        return (code, None);
    }

    let labels = found.join(", ");

    if !block_dangerous {
        let warning = format!("Potentially dangerous operations detected: {}", labels);
        return (code, Some(warning));
    }

    let marker = line_comment(language);
    let neutralised = code
        .lines()
        .map(|line| {
            if DANGEROUS.iter().any(|(_, re)| re.is_match(line)) {
                format!("{} [blocked] {}", marker, line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let warning = format!(
        "Potentially dangerous operations blocked (lines commented out): {}",
        labels
    );
    (neutralised, Some(warning))
}
