//! Prompt construction for planning and task execution.

use goalrun_core::Task;

/// Upper bound on tasks requested from the planner.
const MAX_PLANNED_TASKS: usize = 8;

/// Prompt asking the backend to break `goal` into tasks.
pub(crate) fn plan_prompt(goal: &str, language: &str) -> String {
    format!(
        "You are an autonomous task planning agent.\n\
         Your objective is: \"{goal}\".\n\n\
         Break the objective into a short, ordered list of at most {max} concrete \
         tasks that together achieve it. Each task must be a single sentence.\n\
         Write the tasks in the {language} language.\n\
         Reply ONLY with a JSON array of strings, for example: \
         [\"First task\", \"Second task\"].",
        goal = goal,
        max = MAX_PLANNED_TASKS,
        language = language,
    )
}

/// Prompt asking the backend to carry out `task`.
///
/// Only the last `window` completed tasks that produced a result are quoted,
/// oldest first, and each result is cut to `result_chars` characters.
pub(crate) fn execute_prompt(
    goal: &str,
    language: &str,
    task: &Task,
    completed: &[Task],
    window: usize,
    result_chars: usize,
) -> String {
    let mut prompt = format!(
        "You are an autonomous agent working towards the objective: \"{}\".\n\n",
        goal
    );

    let recent: Vec<&Task> = completed
        .iter()
        .rev()
        .filter(|t| t.result.is_some())
        .take(window)
        .collect();

    if !recent.is_empty() {
        prompt.push_str("Tasks completed so far:\n");
        for (i, done) in recent.iter().rev().enumerate() {
            let result = done.result.as_deref().unwrap_or_default();
            prompt.push_str(&format!(
                "{}. {}\n   Result: {}\n",
                i + 1,
                done.description,
                truncate(result, result_chars)
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Your current task: \"{}\".\n\
         Carry out the task and reply with its result. Write in the {} language.\n\
         If, and only if, more work is needed to reach the objective, end your reply \
         with a line \"NEW TASKS:\" followed by a JSON array of new task descriptions.",
        task.description, language
    ));
    prompt
}

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
