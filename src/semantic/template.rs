//! `{{ column }}` row templates.

use super::types::{value_to_text, SourceRow};

/// Substitute `{{ name }}` and `{{name}}` with the row's values.
///
/// NULL renders as the empty string. Placeholders naming columns the row does
/// not have are left in the text unchanged.
pub fn render(template: &str, row: &SourceRow) -> String {
    let mut text = template.to_string();
    for (name, value) in &row.columns {
        let value = value_to_text(value);
        text = text
            .replace(&format!("{{{{ {name} }}}}"), &value)
            .replace(&format!("{{{{{name}}}}}"), &value);
    }
    text
}

/// `{{ a }} {{ b }} ...` over every column, the default when no template is given.
pub fn default_template(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("{{{{ {c} }}}}"))
        .collect::<Vec<_>>()
        .join(" ")
}
