use crate::prompt::common::{current_date, DONT_TELL_ME};

pub const EVENT_EXTRACTION_SYSTEM: &str = "You are an assistant specialized in extracting structured data from text. \
When given an input news article or snippet, output a JSON array of objects, each with event and date fields. \
You must include an accurate year, the month and day may be estimated. \
Dates must be in YYYY/MM/DD format. \
Do not output any other text.";

/// Generate a prompt asking for the dated events in one source document
pub fn event_extraction_prompt(source_text: &str, query: &str) -> String {
    format!(
        r#"The reader is building a timeline about: {query}

SOURCE:
-----------------------------
{source}
-----------------------------

Extract every discrete, dated event described in the source that helps tell the story above.

Rules:
1. Output ONLY a JSON array. Each element must be an object of the form
   {{"date": "YYYY/MM/DD", "event": "<one or two sentences describing what happened>"}}
2. Every event needs a single calendar date, never a range. Use the publish date to
   resolve relative expressions such as "yesterday" or "last week".
3. Describe each event in plain past-tense prose. Do not include commentary.
4. If the source contains no dated events, output an empty array: []

Today's date: {date}
{dont_tell_me}"#,
        query = query,
        source = source_text,
        date = current_date(),
        dont_tell_me = DONT_TELL_ME
    )
}
