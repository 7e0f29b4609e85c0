use crate::llm::GuidanceRequest;
use askama::Template;

#[derive(Template)]
#[template(path = "persona.txt")]
struct PersonaTemplate<'a> {
    issue_type: &'a str,
    context: &'a str,
}

/// System prompt for one guidance request. The persona itself is fixed; only
/// the trailing session notes depend on the request.
pub fn render_system_prompt(request: &GuidanceRequest<'_>) -> Result<String, askama::Error> {
    PersonaTemplate {
        issue_type: request.issue_type.as_str(),
        context: request.context.trim(),
    }
    .render()
}
