use chrono::Local;

// Appended to every user prompt; replies are parsed as JSON
pub const DONT_TELL_ME: &str = r#"
Reply with the requested JSON only:

1. No introduction, explanation or closing remarks around the JSON.
2. No restating of these instructions.
3. No self-referential statements about being a language model.
"#;

/// Today's date as "June 28, 2025", used to anchor relative dates in sources
pub fn current_date() -> String {
    Local::now().format("%B %-d, %Y").to_string()
}
