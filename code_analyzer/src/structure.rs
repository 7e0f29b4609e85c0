use common::models::StructureProfile;
use regex::Regex;
use std::sync::LazyLock;

static NAMED_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"def\s+\w+\s*\([^)]*\)\s*:", "Function definitions"),
        (r"for\s+\w+\s+in\s+", "Loops"),
        (r"if\s+.*:", "Conditionals"),
        (r"\.append\s*\(", "List operations"),
        (r"return\s+", "Return statements"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("structure pattern"), label))
    .collect()
});

/// Scans for the literal textual forms of common constructs.
pub fn profile(code: &str) -> StructureProfile {
    StructureProfile {
        has_functions: code.contains("def "),
        has_loops: code.contains("for ") || code.contains("while "),
        has_conditionals: code.contains("if "),
        has_classes: code.contains("class "),
        patterns_detected: NAMED_PATTERNS
            .iter()
            .filter(|(pattern, _)| pattern.is_match(code))
            .map(|(_, label)| label.to_string())
            .collect(),
    }
}
