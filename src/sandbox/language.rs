// src/sandbox/language.rs

//! Per-language dispatch table.
//!
//! Adding a language means adding one entry to `LANGUAGES`.
//! `{path}` in a command template is replaced by the staged file path
//! as seen from inside the sandbox.

/// How one language is staged and invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSpec {
    pub name: &'static str,
    pub extension: &'static str,
    pub command: &'static str,
}

pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        name: "python",
        extension: "py",
        command: "python3 {path}",
    },
    LanguageSpec {
        name: "r",
        extension: "R",
        command: "Rscript {path}",
    },
    LanguageSpec {
        name: "julia",
        extension: "jl",
        command: "julia {path}",
    },
    LanguageSpec {
        name: "javascript",
        extension: "js",
        command: "node {path}",
    },
    LanguageSpec {
        name: "typescript",
        extension: "ts",
        command: "ts-node {path}",
    },
    LanguageSpec {
        name: "bash",
        extension: "sh",
        command: "bash {path}",
    },
    LanguageSpec {
        name: "sql",
        extension: "sql",
        command: "psql -f {path}",
    },
    LanguageSpec {
        name: "latex",
        extension: "tex",
        command: "pdflatex -interaction=nonstopmode -halt-on-error {path}",
    },
];

/// Used for anything not in the table: print the file back.
pub const INSPECT: LanguageSpec = LanguageSpec {
    name: "inspect",
    extension: "txt",
    command: "cat {path}",
};

/// Look up a language by name (case-insensitive), falling back to `INSPECT`.
pub fn lookup(language: &str) -> &'static LanguageSpec {
    let wanted = language.trim();
    LANGUAGES
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(wanted))
        .unwrap_or(&INSPECT)
}

impl LanguageSpec {
    /// Render the shell command for a staged file.
    pub fn render(&self, path: &str) -> String {
        self.command.replace("{path}", &shell_quote(path))
    }
}

/// Single-quote a value for `bash -c`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_language_dispatches_its_command() {
        let expected = [
            ("python", "py", "python3 '/w/a.py'"),
            ("r", "R", "Rscript '/w/a.py'"),
            ("julia", "jl", "julia '/w/a.py'"),
            ("javascript", "js", "node '/w/a.py'"),
            ("typescript", "ts", "ts-node '/w/a.py'"),
            ("bash", "sh", "bash '/w/a.py'"),
            ("sql", "sql", "psql -f '/w/a.py'"),
            (
                "latex",
                "tex",
                "pdflatex -interaction=nonstopmode -halt-on-error '/w/a.py'",
            ),
        ];

        for (name, ext, cmd) in expected {
            let spec = lookup(name);
            assert_eq!(spec.extension, ext, "{}", name);
            assert_eq!(spec.render("/w/a.py"), cmd, "{}", name);
        }
    }

    #[test]
    fn unknown_language_falls_back_to_inspection() {
        for name in ["cobol", "", "pythonn"] {
            let spec = lookup(name);
            assert_eq!(spec, &INSPECT);
            assert_eq!(spec.render("/w/x.txt"), "cat '/w/x.txt'");
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("Python").name, "python");
        assert_eq!(lookup(" BASH ").name, "bash");
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
