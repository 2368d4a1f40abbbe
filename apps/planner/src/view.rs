//! Text rendering for the planner form.

use shared::domain::FormField;

pub const TITLE: &str = "AI-Powered Itinerary Planner";

/// Answer that empties a budget or interests field.
pub const CLEAR_FIELD: &str = "-";

pub fn button_label(busy: bool) -> &'static str {
    if busy {
        "Generating..."
    } else {
        "Generate Itinerary"
    }
}

/// Budget and interests show their current value; a blank answer keeps it
/// and `-` clears it.
pub fn prompt_text(field: FormField, current: &str) -> String {
    let placeholder = field.placeholder();
    match field {
        FormField::Destination => format!("{placeholder} (blank to quit): "),
        _ if current.is_empty() => format!("{placeholder}: "),
        _ => format!("{placeholder} [{current}, {CLEAR_FIELD} to clear]: "),
    }
}

/// New value for a budget or interests field, or `None` to keep the current one.
pub fn field_edit(answer: &str) -> Option<String> {
    match answer {
        "" => None,
        CLEAR_FIELD => Some(String::new()),
        other => Some(other.to_string()),
    }
}

pub fn render_itinerary(itinerary: &str) -> String {
    format!("Your Itinerary:\n{}", itinerary.trim_end())
}
