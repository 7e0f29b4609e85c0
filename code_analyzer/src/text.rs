use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\w*\n([\s\S]*?)```").expect("fenced block pattern"));

const CODE_KEYWORDS: [&str; 13] = [
    "def ", "function ", "import ", "class ", "const ", "let ", "var ", "print(", "for(",
    "while(", "if(", "return ", "=",
];
const OPERATORS: [char; 7] = ['=', '<', '>', '+', '-', '*', '/'];

/// Returns the bodies of Markdown fenced blocks, or `None` when the text has
/// no fences and should be treated as code as a whole.
pub fn extract_code_blocks(text: &str) -> Option<Vec<&str>> {
    let blocks: Vec<&str> = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|block| block.as_str())
        .collect();
    (!blocks.is_empty()).then_some(blocks)
}

/// Fenced blocks of a chat message. Text whose prose outside the fences
/// itself looks like code is a submission that merely contains fences (for
/// example inside a string literal) and yields `None`.
pub fn conversational_code_blocks(text: &str) -> Option<Vec<&str>> {
    let blocks = extract_code_blocks(text)?;
    let prose = FENCED_BLOCK.replace_all(text, "\n");
    (!looks_like_code(&prose)).then_some(blocks)
}

/// Rough guess whether a message is source code rather than conversation.
pub fn looks_like_code(text: &str) -> bool {
    if text.trim().chars().count() < 3 {
        return false;
    }
    if CODE_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        return true;
    }

    let has_operators = text.contains(OPERATORS);
    let has_parens = text.contains('(') && text.contains(')');
    let has_brackets =
        (text.contains('[') && text.contains(']')) || (text.contains('{') && text.contains('}'));
    has_operators && (has_parens || has_brackets)
}
