use crate::Language;
use common::models::{ErrorDetail, ErrorKind};
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxReport {
    pub is_valid: bool,
    pub errors: Vec<ErrorDetail>,
}

impl SyntaxReport {
    fn valid() -> Self {
        SyntaxReport {
            is_valid: true,
            errors: vec![],
        }
    }

    fn invalid(error: ErrorDetail) -> Self {
        SyntaxReport {
            is_valid: false,
            errors: vec![error],
        }
    }
}

/// Parses `code` with the tree-sitter grammar for `language`.
///
/// Only the first syntax error in document order is reported. Failures of the
/// parser itself are returned as a generic `Error` entry.
pub fn check_syntax(code: &str, language: Language) -> SyntaxReport {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&language.grammar()) {
        return SyntaxReport::invalid(generic_error(format!(
            "failed to load {} grammar: {e}",
            language.name()
        )));
    }

    let tree = match parser.parse(code, None) {
        Some(tree) => tree,
        None => {
            return SyntaxReport::invalid(generic_error(format!(
                "{} parser produced no syntax tree",
                language.name()
            )));
        }
    };

    let root = tree.root_node();
    let python = language == Language::Python;
    if !root.has_error() && !python {
        return SyntaxReport::valid();
    }

    match first_violation(root, code, python) {
        Some((node, message)) => {
            let position = node.start_position();
            SyntaxReport::invalid(ErrorDetail {
                kind: ErrorKind::SyntaxError,
                message,
                line: Some(position.row + 1),
                column: Some(position.column + 1),
            })
        }
        None if root.has_error() => SyntaxReport::invalid(ErrorDetail {
            kind: ErrorKind::SyntaxError,
            message: "invalid syntax".to_string(),
            line: None,
            column: None,
        }),
        None => SyntaxReport::valid(),
    }
}

/// Walks the tree in document order. Python trees are walked in full because
/// the grammar accepts constructs CPython rejects.
fn first_violation<'tree>(
    root: Node<'tree>,
    code: &str,
    python: bool,
) -> Option<(Node<'tree>, String)> {
    let mut cursor = root.walk();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some((node, describe(node)));
        }
        if python {
            if let Some(message) = python_violation(node, code) {
                return Some((node, message));
            }
        } else if !node.has_error() {
            continue;
        }
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        // reversed so the leftmost child is visited first
        stack.extend(children.into_iter().rev());
    }
    None
}

fn describe(node: Node<'_>) -> String {
    if node.is_missing() {
        format!("invalid syntax: missing `{}`", node.kind())
    } else {
        "invalid syntax".to_string()
    }
}

fn python_violation(node: Node<'_>, code: &str) -> Option<String> {
    match node.kind() {
        // Python 2 statements; `print (x)` is still a valid call
        "print_statement" | "exec_statement" => {
            let keyword = if node.kind() == "print_statement" {
                "print"
            } else {
                "exec"
            };
            let text = node.utf8_text(code.as_bytes()).unwrap_or_default();
            let rest = text.strip_prefix(keyword).unwrap_or(text).trim_start();
            (!rest.starts_with('('))
                .then(|| format!("Missing parentheses in call to '{keyword}'"))
        }
        // an unindented body leaves the block with nothing but comments
        "block" if !has_statement(node) => Some("expected an indented block".to_string()),
        "parameters" | "lambda_parameters" => default_order_violation(node),
        _ => None,
    }
}

fn has_statement(block: Node<'_>) -> bool {
    let mut cursor = block.walk();
    block
        .named_children(&mut cursor)
        .any(|child| child.kind() != "comment")
}

fn default_order_violation(parameters: Node<'_>) -> Option<String> {
    let mut cursor = parameters.walk();
    let mut seen_default = false;

    for parameter in parameters.named_children(&mut cursor) {
        let kind = match parameter.kind() {
            // `name: type`, `*args: type` and `**kw: type` share one node kind
            "typed_parameter" => {
                let mut inner = parameter.walk();
                parameter
                    .named_children(&mut inner)
                    .next()
                    .map_or("identifier", |first| first.kind())
            }
            kind => kind,
        };
        match kind {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "identifier" if seen_default => {
                return Some("non-default argument follows default argument".to_string());
            }
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => break,
            _ => {}
        }
    }
    None
}

fn generic_error(message: String) -> ErrorDetail {
    ErrorDetail {
        kind: ErrorKind::Error,
        message,
        line: None,
        column: None,
    }
}
