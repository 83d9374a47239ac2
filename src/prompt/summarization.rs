use crate::prompt::common::DONT_TELL_ME;

pub const SUMMARY_SYSTEM: &str =
    "You are an assistant specialized in understanding and summarizing news events.";

/// Generate a prompt for summarizing one group of related events
///
/// `bullet_points` are `- <date>: <event>` lines in chronological order. `context`
/// is extra framing such as the time window the events fall in.
pub fn substory_summary_prompt(bullet_points: &str, context: Option<&str>) -> String {
    let context = match context {
        Some(context) => format!("\nCONTEXT: {}\n", context),
        None => String::new(),
    };

    format!(
        r#"Summarize the following related news events into a paragraph.
{context}
EVENTS:
{bullets}

Respond with a JSON object of the form:
{{"title": "<a headline of at most eight words>", "summary": "<one paragraph>"}}

The summary must read as a single narrative in chronological order, be written in a
neutral journalistic tone and mention only facts present in the events above.
{dont_tell_me}"#,
        context = context,
        bullets = bullet_points,
        dont_tell_me = DONT_TELL_ME
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_with_and_without_context() {
        let bullets = "- 2025-06-01: A thing happened";
        let with = substory_summary_prompt(bullets, Some("2025-06-01 – 2025-06-30"));
        assert!(with.contains("CONTEXT: 2025-06-01 – 2025-06-30"));
        assert!(with.contains(bullets));

        let without = substory_summary_prompt(bullets, None);
        assert!(!without.contains("CONTEXT:"));
    }
}
