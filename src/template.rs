/// Form page markup, embedded at compile time for portability. The page
/// carries a single `{{ result }}` slot the handlers fill per request.
const INDEX_HTML: &str = include_str!("../templates/index.html");

const RESULT_SLOT: &str = "{{ result }}";

/// Renders the page with the given result message, or with an empty slot for
/// the bare input form.
pub fn render(result: Option<&str>) -> String {
    INDEX_HTML.replace(RESULT_SLOT, result.unwrap_or(""))
}
