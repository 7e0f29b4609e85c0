use common::models::{IssueDetail, IssueKind, IssueType};
use regex::Regex;
use std::sync::LazyLock;

// `return <name>` followed by anything other than `=`. Names are not resolved
// against their scope, so defined variables match as well.
static UNDEFINED_VARIABLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![Regex::new(r"return\s+(\w+)\s*[^=]").expect("undefined variable pattern")]
});
static INPUT_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\binput\s*\(").expect("input call pattern"));
static NUMERIC_CONVERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:int|float)\s*\(").expect("numeric conversion pattern"));
static FOR_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfor\b").expect("for keyword pattern"));
static IN_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bin\b").expect("in keyword pattern"));
static RANGE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brange\s*\(").expect("range call pattern"));

/// A named, pure check over the submitted text.
#[derive(Clone, Copy)]
pub struct HeuristicRule {
    pub name: &'static str,
    check: fn(&str) -> Vec<IssueDetail>,
}

impl HeuristicRule {
    pub const fn new(name: &'static str, check: fn(&str) -> Vec<IssueDetail>) -> Self {
        HeuristicRule { name, check }
    }

    pub fn apply(&self, code: &str) -> Vec<IssueDetail> {
        (self.check)(code)
    }
}

impl std::fmt::Debug for HeuristicRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeuristicRule")
            .field("name", &self.name)
            .finish()
    }
}

pub const UNDEFINED_VARIABLE: HeuristicRule =
    HeuristicRule::new("undefined_variable", undefined_variable);
pub const TYPE_CONVERSION: HeuristicRule = HeuristicRule::new("type_conversion", type_conversion);
pub const ITERATION_PATTERN: HeuristicRule =
    HeuristicRule::new("iteration_pattern", iteration_pattern);

/// Rules in evaluation order. The iteration note is complimentary but still
/// counts as a conceptual issue, so it can be left out of the set entirely.
pub fn default_rules(flag_iteration_pattern: bool) -> Vec<HeuristicRule> {
    let mut rules = vec![UNDEFINED_VARIABLE, TYPE_CONVERSION];
    if flag_iteration_pattern {
        rules.push(ITERATION_PATTERN);
    }
    rules
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptualReport {
    pub has_issues: bool,
    pub issue_type: Option<IssueType>,
    pub issues: Vec<IssueDetail>,
}

pub fn detect(rules: &[HeuristicRule], code: &str) -> ConceptualReport {
    let issues: Vec<IssueDetail> = rules.iter().flat_map(|rule| rule.apply(code)).collect();
    ConceptualReport {
        has_issues: !issues.is_empty(),
        issue_type: (!issues.is_empty()).then_some(IssueType::Conceptual),
        issues,
    }
}

fn undefined_variable(code: &str) -> Vec<IssueDetail> {
    for pattern in UNDEFINED_VARIABLE_PATTERNS.iter() {
        let names: Vec<&str> = pattern
            .captures_iter(code)
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str())
            .collect();
        if !names.is_empty() {
            return vec![IssueDetail {
                kind: IssueKind::PotentialUndefinedVariable,
                message: format!("Potential undefined variable detected: {}", names.join(", ")),
            }];
        }
    }
    vec![]
}

fn type_conversion(code: &str) -> Vec<IssueDetail> {
    if INPUT_CALL.is_match(code) && !NUMERIC_CONVERSION.is_match(code) {
        vec![IssueDetail {
            kind: IssueKind::TypeConversion,
            message: "Consider converting input to the appropriate type".to_string(),
        }]
    } else {
        vec![]
    }
}

fn iteration_pattern(code: &str) -> Vec<IssueDetail> {
    if FOR_KEYWORD.is_match(code) && IN_KEYWORD.is_match(code) && !RANGE_CALL.is_match(code) {
        vec![IssueDetail {
            kind: IssueKind::IterationPattern,
            message: "Good use of iteration! Consider what you're iterating over.".to_string(),
        }]
    } else {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(report: &ConceptualReport) -> Vec<IssueKind> {
        report.issues.iter().map(|issue| issue.kind).collect()
    }

    #[test]
    fn flags_returned_free_identifier() {
        let report = detect(&default_rules(true), "def calculate(x):\n    return x * y");
        assert!(report.has_issues);
        assert_eq!(report.issue_type, Some(IssueType::Conceptual));
        assert_eq!(kinds(&report), vec![IssueKind::PotentialUndefinedVariable]);
        assert_eq!(
            report.issues[0].message,
            "Potential undefined variable detected: x"
        );
    }

    #[test]
    fn lists_every_returned_name() {
        let code = "def a():\n    return first\n\ndef b():\n    return second\n";
        let issues = undefined_variable(code);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].message,
            "Potential undefined variable detected: first, second"
        );
    }

    #[test]
    fn flags_defined_names_too() {
        // no scope resolution: `total` is assigned but still reported
        let code = "def total_of(xs):\n    total = sum(xs)\n    return total\n";
        assert_eq!(undefined_variable(code).len(), 1);
    }

    #[test]
    fn bare_return_at_end_of_input_is_not_flagged() {
        assert!(undefined_variable("def f():\n    return x").is_empty());
    }

    #[test]
    fn suggests_conversion_for_raw_input() {
        let report = detect(&default_rules(true), "x = input()\nresult = x + 10");
        assert_eq!(kinds(&report), vec![IssueKind::TypeConversion]);
        assert_eq!(
            report.issues[0].message,
            "Consider converting input to the appropriate type"
        );
    }

    #[test]
    fn converted_input_is_fine() {
        assert!(type_conversion("x = int(input())\nresult = x + 10").is_empty());
        assert!(type_conversion("x = float(input('value: '))").is_empty());
        assert!(type_conversion("name = raw_input()").is_empty());
    }

    #[test]
    fn prompted_input_is_still_a_call() {
        assert_eq!(type_conversion("age = input('age? ')").len(), 1);
    }

    #[test]
    fn range_loop_gets_no_iteration_note() {
        let report = detect(&default_rules(true), "for i in range(5):\n    print(i)");
        assert!(!report.has_issues);
        assert_eq!(report.issue_type, None);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn collection_loop_gets_iteration_note() {
        let report = detect(&default_rules(true), "for name in names:\n    print(name)");
        assert!(report.has_issues);
        assert_eq!(kinds(&report), vec![IssueKind::IterationPattern]);
    }

    #[test]
    fn iteration_note_can_be_disabled() {
        let rules = default_rules(false);
        assert!(rules.iter().all(|rule| rule.name != ITERATION_PATTERN.name));
        assert!(!detect(&rules, "for name in names:\n    print(name)").has_issues);
    }

    #[test]
    fn keywords_inside_words_do_not_count() {
        assert!(iteration_pattern("print(format(info))").is_empty());
    }

    #[test]
    fn rules_report_in_declared_order() {
        let code = "value = input()\nfor ch in value:\n    print(ch)\n";
        let report = detect(&default_rules(true), code);
        assert_eq!(
            kinds(&report),
            vec![IssueKind::TypeConversion, IssueKind::IterationPattern]
        );
    }
}
