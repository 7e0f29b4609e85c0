pub mod heuristics;
pub mod structure;
pub mod syntax;
pub mod text;

use crate::heuristics::HeuristicRule;
use common::models::{AnalysisRecord, AnalysisStatus};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "python" | "py" | "python3" => Some(Language::Python),
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }

    pub(crate) fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub default_language: Language,
    pub flag_iteration_pattern: bool,
    pub max_code_bytes: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            default_language: Language::Python,
            flag_iteration_pattern: true,
            max_code_bytes: 64 * 1024,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("submission is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Combines the syntax check, the conceptual heuristics and the structure
/// profile into one [`AnalysisRecord`].
///
/// Holds only read-only options, so one instance can serve every request.
#[derive(Debug, Clone)]
pub struct CodeAnalyzer {
    options: AnalyzerOptions,
    rules: Vec<HeuristicRule>,
}

impl CodeAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        let rules = heuristics::default_rules(options.flag_iteration_pattern);
        CodeAnalyzer { options, rules }
    }

    pub fn rules(&self) -> &[HeuristicRule] {
        &self.rules
    }

    /// Blank and unknown names fall back to the configured default grammar.
    pub fn resolve_language(&self, name: Option<&str>) -> Language {
        match name.and_then(Language::from_name) {
            Some(language) => language,
            None => {
                debug!(
                    "unsupported language {:?}, using {}",
                    name,
                    self.options.default_language.name()
                );
                self.options.default_language
            }
        }
    }

    pub fn analyze(
        &self,
        code: &str,
        language: Option<&str>,
    ) -> Result<AnalysisRecord, AnalysisError> {
        if code.trim().is_empty() {
            return Ok(AnalysisRecord::empty());
        }
        if code.len() > self.options.max_code_bytes {
            return Err(AnalysisError::TooLarge {
                size: code.len(),
                limit: self.options.max_code_bytes,
            });
        }

        let language = self.resolve_language(language);
        let source = match text::conversational_code_blocks(code) {
            Some(blocks) => blocks.join("\n"),
            None => code.to_string(),
        };

        let syntax = syntax::check_syntax(&source, language);
        let conceptual = heuristics::detect(&self.rules, &source);
        let structure = structure::profile(&source);

        Ok(AnalysisRecord {
            status: AnalysisStatus::Valid,
            has_errors: !syntax.is_valid,
            errors: syntax.errors,
            has_conceptual_issue: conceptual.has_issues,
            issue_type: conceptual.issue_type,
            warnings: conceptual.issues,
            structure,
            looks_like_code: text::looks_like_code(&source),
        })
    }
}

impl Default for CodeAnalyzer {
    fn default() -> Self {
        CodeAnalyzer::new(AnalyzerOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{ErrorKind, IssueKind, IssueType};

    #[test]
    fn blank_submissions_are_empty() {
        let analyzer = CodeAnalyzer::default();
        for code in ["", "   ", "\n\t  \n"] {
            let record = analyzer.analyze(code, Some("python")).unwrap();
            assert_eq!(record.status, AnalysisStatus::Empty);
            assert!(record.has_conceptual_issue);
            assert_eq!(record.issue_type, Some(IssueType::EmptyCode));
            assert!(record.warnings.is_empty());
            assert!(!record.has_errors);
        }
    }

    #[test]
    fn free_identifier_return_is_conceptual() {
        let record = CodeAnalyzer::default()
            .analyze("def calculate(x):\n    return x * y", Some("python"))
            .unwrap();
        assert_eq!(record.status, AnalysisStatus::Valid);
        assert!(!record.has_errors);
        assert!(record.errors.is_empty());
        assert!(record.has_conceptual_issue);
        assert_eq!(record.issue_type, Some(IssueType::Conceptual));
        assert!(record.structure.has_functions);
        assert!(record.looks_like_code);
    }

    #[test]
    fn raw_input_gets_type_conversion_warning() {
        let record = CodeAnalyzer::default()
            .analyze("x = input()\nresult = x + 10", Some("python"))
            .unwrap();
        assert!(
            record
                .warnings
                .iter()
                .any(|warning| warning.kind == IssueKind::TypeConversion)
        );
        assert!(record.has_conceptual_issue);
    }

    #[test]
    fn range_loop_is_clean() {
        let record = CodeAnalyzer::default()
            .analyze("for i in range(5):\n    print(i)", Some("python"))
            .unwrap();
        assert!(!record.has_errors);
        assert!(!record.has_conceptual_issue);
        assert_eq!(record.issue_type, None);
        assert!(record.warnings.is_empty());
        assert!(record.structure.has_loops);
        assert!(record.structure.patterns_detected.contains(&"Loops".to_string()));
    }

    #[test]
    fn syntax_errors_are_recorded() {
        let record = CodeAnalyzer::default()
            .analyze("def broken(:\n    pass", Some("python"))
            .unwrap();
        assert!(record.has_errors);
        assert_eq!(record.errors[0].kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn unknown_or_blank_language_uses_default() {
        let analyzer = CodeAnalyzer::default();
        assert_eq!(analyzer.resolve_language(Some("cobol")), Language::Python);
        assert_eq!(analyzer.resolve_language(Some("  ")), Language::Python);
        assert_eq!(analyzer.resolve_language(None), Language::Python);
        assert_eq!(analyzer.resolve_language(Some("JS")), Language::JavaScript);

        let record = analyzer.analyze("print('hi')", Some("")).unwrap();
        assert!(!record.has_errors);
    }

    #[test]
    fn default_language_is_configurable() {
        let analyzer = CodeAnalyzer::new(AnalyzerOptions {
            default_language: Language::JavaScript,
            ..AnalyzerOptions::default()
        });
        let record = analyzer
            .analyze("const add = (a, b) => a + b;", None)
            .unwrap();
        assert!(!record.has_errors);
    }

    #[test]
    fn analysis_is_idempotent() {
        let analyzer = CodeAnalyzer::default();
        let code = "value = input()\nfor ch in value:\n    if ch:\n        print(ch)\n";
        assert_eq!(
            analyzer.analyze(code, Some("python")),
            analyzer.analyze(code, Some("python"))
        );
    }

    #[test]
    fn fenced_blocks_are_analyzed_without_prose() {
        let message = "Why is my answer wrong?\n```python\nx = input()\nprint(x + 1)\n```";
        let record = CodeAnalyzer::default()
            .analyze(message, Some("python"))
            .unwrap();
        assert!(!record.has_errors);
        assert_eq!(record.warnings[0].kind, IssueKind::TypeConversion);
    }

    #[test]
    fn fences_inside_string_literals_stay_part_of_the_code() {
        let analyzer = CodeAnalyzer::default();

        let record = analyzer
            .analyze("s = \"\"\"\n```\nprint(\n```\n\"\"\"\n", Some("python"))
            .unwrap();
        assert!(!record.has_errors);
        assert!(record.errors.is_empty());

        let code = "doc = \"\"\"\n```\nx = 1\n```\n\"\"\"\nn = input()\nfor ch in n:\n    print(ch)";
        let record = analyzer.analyze(code, Some("python")).unwrap();
        let kinds: Vec<IssueKind> = record.warnings.iter().map(|warning| warning.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::TypeConversion, IssueKind::IterationPattern]
        );
        assert!(record.structure.has_loops);
    }

    #[test]
    fn oversized_submissions_are_rejected() {
        let analyzer = CodeAnalyzer::new(AnalyzerOptions {
            max_code_bytes: 8,
            ..AnalyzerOptions::default()
        });
        assert_eq!(
            analyzer.analyze("print('too long')", None),
            Err(AnalysisError::TooLarge { size: 17, limit: 8 })
        );
    }

    #[test]
    fn disabling_iteration_note_removes_the_issue() {
        let analyzer = CodeAnalyzer::new(AnalyzerOptions {
            flag_iteration_pattern: false,
            ..AnalyzerOptions::default()
        });
        assert_eq!(analyzer.rules().len(), 2);
        let record = analyzer
            .analyze("for name in names:\n    print(name)", None)
            .unwrap();
        assert!(!record.has_conceptual_issue);
    }
}
