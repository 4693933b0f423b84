use crate::data::RenderedMessage;

pub const DEFAULT_TEMPLATE: &str =
    "{{name}} detected {{disk}} has {{out}} {{detect}} on {{hostname}}, which is {{modifier}} than {{in}}";

/// Field values substituted into the message template.
#[derive(Debug, Clone)]
pub struct MessageFields {
    pub name: String,
    pub disk: String,
    pub out: String,
    pub detect: String,
    pub hostname: String,
    pub modifier: String,
    pub threshold: String,
}

impl MessageFields {
    fn pairs(&self) -> [(&'static str, &str); 7] {
        [
            ("name", &self.name),
            ("disk", &self.disk),
            ("out", &self.out),
            ("detect", &self.detect),
            ("hostname", &self.hostname),
            ("modifier", &self.modifier),
            ("in", &self.threshold),
        ]
    }
}

/// Substitutes every `{{field}}` occurrence in the template (the default one
/// when none is supplied). Unmatched placeholders are left verbatim; rendering
/// never fails. The HTML variant replaces only the FIRST newline with a break
/// marker, matching long-standing behavior that downstream templates rely on.
pub fn render(fields: &MessageFields, template: Option<&str>) -> RenderedMessage {
    tracing::debug!("Compiling template data");
    let mut text = template.unwrap_or(DEFAULT_TEMPLATE).to_string();
    for (token, value) in fields.pairs() {
        text = text.replace(&format!("{{{{{token}}}}}"), value);
    }
    let html = text.replacen('\n', "<br />", 1);
    RenderedMessage { text, html }
}
