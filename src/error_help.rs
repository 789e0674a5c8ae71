//! Error helper module for user-friendly error messages
//!
//! Turns classified registry failures into messages with suggestions and
//! next steps for `promptctl` users.

use colored::*;
use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};

use crate::config::{ENV_INSECURE, ENV_TRACKING_TOKEN, ENV_TRACKING_URI};
use crate::error::{ErrorKind, RegistryError};

/// Closest matches for `name` among `candidates`, best first.
pub fn suggest<'a>(name: &str, candidates: &'a [String], limit: usize) -> Vec<&'a str> {
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(&str, i64)> = candidates
        .iter()
        .filter(|c| c.as_str() != name)
        .filter_map(|c| matcher.fuzzy_match(c, name).map(|score| (c.as_str(), score)))
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored.into_iter().take(limit).map(|(c, _)| c).collect()
}

/// Format a "prompt not found" error with helpful suggestions
pub fn format_prompt_not_found(prompt_name: &str, available_prompts: &[String]) -> String {
    let mut message = format!("Error: Prompt '{}' not found\n\n", prompt_name)
        .red()
        .to_string();

    let suggestions = suggest(prompt_name, available_prompts, 3);
    if !suggestions.is_empty() {
        message.push_str(&"Did you mean one of these?\n".yellow().to_string());
        for prompt in suggestions {
            message.push_str(&format!("  - {}\n", prompt));
        }
        message.push('\n');
    }

    message.push_str(&format!(
        "Try '{}' to see all available prompts.\n",
        "promptctl list".cyan()
    ));

    message
}

/// Format a missing-variables error, listing what to pass
pub fn format_missing_variables(names: &[String]) -> String {
    let mut message = format!("Error: Missing template variables: {}\n\n", names.join(", "))
        .red()
        .to_string();

    message.push_str("Provide them with:\n");
    let flags: Vec<String> = names.iter().map(|n| format!("--var {}=...", n)).collect();
    message.push_str(&format!("  {}\n", flags.join(" ").cyan()));
    message.push_str(&format!(
        "  or a file of name=value lines: {}\n",
        "--vars-file vars.env".cyan()
    ));

    message
}

/// Format an authentication or authorization failure
pub fn format_auth_error(kind: ErrorKind, detail: &str) -> String {
    let title = if kind == ErrorKind::Unauthorized {
        "Error: Not authenticated"
    } else {
        "Error: Permission denied"
    };
    let mut message = format!("{}\n{}\n\n", title, detail).red().to_string();

    message.push_str("Please check:\n");
    message.push_str(&format!(
        "  - The token in {}\n",
        ENV_TRACKING_TOKEN.cyan()
    ));
    message.push_str("  - That the token has access to the prompt registry\n");

    message
}

/// Format a network error with troubleshooting steps
pub fn format_network_error(error: &str) -> String {
    let mut message = format!("Error: Network connection failed\n{}\n\n", error)
        .red()
        .to_string();

    message.push_str("Please check:\n");
    message.push_str(&format!(
        "  - The server address in {}\n",
        ENV_TRACKING_URI.cyan()
    ));
    message.push_str(&format!(
        "  - For a local http server: {}\n",
        format!("{}=true", ENV_INSECURE).cyan()
    ));
    message.push_str("  - Retry the command in a few moments\n");

    message
}

/// Format an alias conflict on version deletion
pub fn format_alias_conflict(detail: &str) -> String {
    let mut message = format!("Error: Version is still referenced by an alias\n{}\n\n", detail)
        .red()
        .to_string();

    message.push_str(&format!(
        "Move or remove the alias first: {}\n",
        "promptctl alias delete <name> <alias>".cyan()
    ));

    message
}

/// Render any registry error for the terminal.
///
/// `known_prompts` feeds the "did you mean" list for not-found errors and
/// may be empty.
pub fn render(err: &RegistryError, prompt_name: Option<&str>, known_prompts: &[String]) -> String {
    match err.kind() {
        ErrorKind::NotFound => match prompt_name {
            Some(name) => {
                let mut message = format_prompt_not_found(name, known_prompts);
                message.push_str(&format!("{}\n", err.to_string().dimmed()));
                message
            }
            None => format!("Error: {}\n", err).red().to_string(),
        },
        ErrorKind::MissingVariable => match err {
            RegistryError::Template(template) => {
                format_missing_variables(template.missing_variables())
            }
            _ => format!("Error: {}\n", err).red().to_string(),
        },
        kind @ (ErrorKind::Unauthorized | ErrorKind::PermissionDenied) => {
            format_auth_error(kind, &err.to_string())
        }
        ErrorKind::Transport => format_network_error(&err.to_string()),
        ErrorKind::AliasConflict => format_alias_conflict(&err.to_string()),
        ErrorKind::Cancelled | ErrorKind::DeadlineExceeded => {
            format!("Interrupted: {}\n", err).yellow().to_string()
        }
        _ => format!("Error: {}\n", err).red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::template::TemplateError;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_suggest_ranks_close_names() {
        let candidates = names(&["greeting", "summary", "greeter", "translate"]);
        let found = suggest("greet", &candidates, 2);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.starts_with("greet")));
        assert!(suggest("zzzz", &candidates, 3).is_empty());
    }

    #[test]
    fn test_not_found_lists_suggestions() {
        colored::control::set_override(false);
        let err = RegistryError::from(ApiError::new(
            404,
            Some("RESOURCE_DOES_NOT_EXIST"),
            "Registered Model with name=greting not found",
        ));
        let message = render(&err, Some("greting"), &names(&["greeting", "summary"]));
        assert!(message.contains("Prompt 'greting' not found"));
        assert!(message.contains("- greeting"));
    }

    #[test]
    fn test_missing_variables_message() {
        colored::control::set_override(false);
        let err = RegistryError::from(TemplateError::MissingVariables {
            names: names(&["name", "id"]),
        });
        let message = render(&err, None, &[]);
        assert!(message.contains("name, id"));
        assert!(message.contains("--var name=... --var id=..."));
    }

    #[test]
    fn test_alias_conflict_message() {
        colored::control::set_override(false);
        let err = RegistryError::from(ApiError::new(409, Some("ALIAS_EXISTS"), "alias production"));
        let message = render(&err, Some("p"), &[]);
        assert!(message.contains("still referenced by an alias"));
    }
}
