//! Parsing backend replies into task lists and results.
//!
//! Parse failures are never fatal. Callers fall back to degraded but valid
//! data: the planner to a single task equal to the goal, the executor to
//! "no follow-on work".

use thiserror::Error;

use crate::executor::Execution;

/// Line that separates a task result from proposed follow-on tasks.
const NEW_TASKS_MARKER: &str = "new tasks";

/// Reply could not be read as an enumeration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response contains no task enumeration")]
    NoEnumeration,
}

/// Extract an ordered list of task descriptions from a reply.
///
/// A JSON array of strings anywhere in the text wins. Otherwise numbered
/// (`1.`, `2)`), bulleted (`-`, `*`, `•`) and `Task N:` lines are used.
/// Blank entries, "no more tasks" entries and repeats are dropped, so an
/// enumeration may legitimately come back empty.
pub fn parse_task_list(text: &str) -> Result<Vec<String>, ParseError> {
    let items = json_array(text)
        .or_else(|| line_enumeration(text))
        .ok_or(ParseError::NoEnumeration)?;

    let mut tasks: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let cleaned = clean(&item);
        if cleaned.is_empty() || is_no_op(&cleaned) || tasks.contains(&cleaned) {
            continue;
        }
        tasks.push(cleaned);
    }
    Ok(tasks)
}

/// Split an execution reply into its result and proposed follow-on tasks.
pub fn parse_execution(text: &str) -> Execution {
    let trimmed = text.trim();
    let Some((result, tail)) = split_at_marker(trimmed) else {
        return Execution {
            result: trimmed.to_string(),
            new_tasks: Vec::new(),
        };
    };

    let new_tasks = parse_task_list(tail).unwrap_or_default();
    let result = if result.is_empty() { trimmed } else { result };
    Execution {
        result: result.to_string(),
        new_tasks,
    }
}

fn json_array(text: &str) -> Option<Vec<String>> {
    text.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Vec<String>>()
            .next()
            .and_then(Result::ok)
    })
}

fn line_enumeration(text: &str) -> Option<Vec<String>> {
    let items: Vec<String> = text
        .lines()
        .filter_map(strip_list_marker)
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Return the item text if `line` starts with a list marker.
fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim();

    for bullet in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest);
        }
    }

    let line = match line.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("task ") => &line[5..],
        _ => line,
    };

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    // "1." needs whitespace or nothing after it, so "1.5 kg" stays prose.
    let item = match rest.strip_prefix('.') {
        Some(item) if item.is_empty() || item.starts_with(char::is_whitespace) => Some(item),
        Some(_) => None,
        None => [") ", ": "].iter().find_map(|sep| rest.strip_prefix(sep)),
    };
    item.map(str::trim)
}

fn clean(item: &str) -> String {
    item.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

/// Entries that only say there is nothing left to do.
fn is_no_op(item: &str) -> bool {
    let lower = item.to_lowercase();
    let lower = lower.trim_end_matches(['.', '!']);

    if matches!(
        lower,
        "none" | "n/a" | "nothing" | "done" | "task complete" | "tasks complete" | "complete"
    ) {
        return true;
    }

    lower.starts_with("no ")
        && ["task", "needed", "required", "necessary", "further"]
            .iter()
            .any(|word| lower.contains(word))
}

fn split_at_marker(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let bare = line
            .trim()
            .trim_start_matches(['#', '*', '_'])
            .trim()
            .to_lowercase();
        if bare.starts_with(NEW_TASKS_MARKER) {
            let result = text[..offset].trim();
            // Anything after the colon on the marker line belongs to the list.
            let marker_rest = line.split_once(':').map(|(_, rest)| rest).unwrap_or("");
            let tail_start = offset + line.len() - marker_rest.len();
            return Some((result, text[tail_start..].trim()));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_array() {
        let reply = r#"Sure! Here is the plan: ["Pick a date", "Book a venue", "Send invitations"]"#;
        assert_eq!(
            parse_task_list(reply).unwrap(),
            vec!["Pick a date", "Book a venue", "Send invitations"]
        );
    }

    #[test]
    fn test_numbered_lines() {
        let reply = "Plan:\n1. Pick a date\n2) Book a venue\nTask 3: Send invitations\n";
        assert_eq!(
            parse_task_list(reply).unwrap(),
            vec!["Pick a date", "Book a venue", "Send invitations"]
        );
    }

    #[test]
    fn test_decimal_numbers_are_not_list_markers() {
        let reply = "1. Buy 1.5 kg of flour\n2.5 cups of milk are already in the fridge\n2.\tBake";
        assert_eq!(
            parse_task_list(reply).unwrap(),
            vec!["Buy 1.5 kg of flour", "Bake"]
        );
        assert_eq!(
            parse_task_list("1.5 kg of flour"),
            Err(ParseError::NoEnumeration)
        );
    }

    #[test]
    fn test_bullets_and_quotes() {
        let reply = "- \"Order a cake\"\n* Buy balloons\n• Hire a DJ";
        assert_eq!(
            parse_task_list(reply).unwrap(),
            vec!["Order a cake", "Buy balloons", "Hire a DJ"]
        );
    }

    #[test]
    fn test_prose_is_not_an_enumeration() {
        assert_eq!(
            parse_task_list("I cannot help with that."),
            Err(ParseError::NoEnumeration)
        );
        assert_eq!(parse_task_list(""), Err(ParseError::NoEnumeration));
    }

    #[test]
    fn test_drops_no_op_blank_and_repeated_entries() {
        let reply = r#"["Buy cake", "", "Buy cake", "No further tasks are needed.", "None"]"#;
        assert_eq!(parse_task_list(reply).unwrap(), vec!["Buy cake"]);

        let reply = r#"["No additional tasks required"]"#;
        assert_eq!(parse_task_list(reply).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_year_is_not_a_list_marker() {
        assert_eq!(
            parse_task_list("2024 was a good year"),
            Err(ParseError::NoEnumeration)
        );
    }

    #[test]
    fn test_execution_without_marker() {
        let execution = parse_execution("  The venue is booked.  ");
        assert_eq!(execution.result, "The venue is booked.");
        assert!(execution.new_tasks.is_empty());
    }

    #[test]
    fn test_execution_with_new_tasks() {
        let reply = "The venue is booked for Saturday.\n\nNEW TASKS:\n1. Confirm catering\n2. Print menus";
        let execution = parse_execution(reply);
        assert_eq!(execution.result, "The venue is booked for Saturday.");
        assert_eq!(execution.new_tasks, vec!["Confirm catering", "Print menus"]);
    }

    #[test]
    fn test_execution_with_inline_json_tasks() {
        let reply = "Guest list drafted.\n**New tasks:** [\"Collect addresses\"]";
        let execution = parse_execution(reply);
        assert_eq!(execution.result, "Guest list drafted.");
        assert_eq!(execution.new_tasks, vec!["Collect addresses"]);
    }

    #[test]
    fn test_execution_with_unparsable_tail() {
        let execution = parse_execution("Done.\nNew tasks: nothing comes to mind");
        assert_eq!(execution.result, "Done.");
        assert!(execution.new_tasks.is_empty());
    }
}
