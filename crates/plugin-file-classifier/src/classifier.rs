//! Extension → classification table.

use std::path::Path;

use serde::Serialize;

/// Result of classifying one path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    /// Category name.
    pub classification: &'static str,
    /// Recommended destination folder.
    pub recommended_location: &'static str,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

const UNKNOWN: Classification = Classification {
    classification: "unknown",
    recommended_location: "quarantine/",
    confidence: 0.0,
};

const RULES: &[(&str, Classification)] = &[
    (
        "py",
        Classification {
            classification: "python_module",
            recommended_location: "modules/python/",
            confidence: 0.95,
        },
    ),
    (
        "ps1",
        Classification {
            classification: "powershell_script",
            recommended_location: "modules/powershell/",
            confidence: 0.95,
        },
    ),
    (
        "md",
        Classification {
            classification: "documentation",
            recommended_location: "docs/",
            confidence: 0.90,
        },
    ),
    (
        "rs",
        Classification {
            classification: "rust_module",
            recommended_location: "modules/rust/",
            confidence: 0.95,
        },
    ),
];

/// Classifies `file_path` by its (case-insensitive) extension.
pub fn classify(file_path: &str) -> Classification {
    let Some(extension) = Path::new(file_path)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
    else {
        return UNKNOWN;
    };

    RULES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, c)| *c)
        .unwrap_or(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(classify("src/tool.py").classification, "python_module");
        assert_eq!(classify("deploy.PS1").recommended_location, "modules/powershell/");
        assert_eq!(classify("README.md").confidence, 0.90);
        assert_eq!(classify("lib.rs").classification, "rust_module");
    }

    #[test]
    fn test_unknown_goes_to_quarantine() {
        assert_eq!(classify("archive.tar.gz"), UNKNOWN);
        assert_eq!(classify("Makefile"), UNKNOWN);
        assert_eq!(classify("Makefile").recommended_location, "quarantine/");
    }
}
