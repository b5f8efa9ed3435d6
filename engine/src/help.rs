//! Help text rendering.
//!
//! The engine only decides *when* help is shown; formatting belongs to a
//! [`HelpRenderer`]. [`PlainHelp`] is a minimal uncolored default.

use std::fmt::Write as _;

use flagtree_core::display_value;

use crate::summary::{CommandSummary, FlagSummary, Requirement};

/// Turns a command summary into help text.
pub trait HelpRenderer: Send + Sync {
    fn render(&self, command: &CommandSummary) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHelp;

impl PlainHelp {
    fn flag_line(flag: &FlagSummary) -> String {
        let mut line = format!("  {}", flag.options.join(", "));
        if !flag.flag_only {
            let _ = write!(line, " <{}>", flag.type_label);
        }
        if let Some(desc) = &flag.description {
            let _ = write!(line, "  {desc}");
        }

        let mut notes = Vec::new();
        match flag.mandatory {
            Some(Requirement::Always) => notes.push("required".to_string()),
            Some(Requirement::Conditional) => notes.push("conditionally required".to_string()),
            None => {}
        }
        if let Some(default) = &flag.default {
            notes.push(format!("default: {}", display_value(default)));
        }
        if !flag.enum_values.is_empty() {
            let allowed: Vec<String> = flag.enum_values.iter().map(display_value).collect();
            notes.push(format!("one of: {}", allowed.join(", ")));
        }
        if flag.allow_multiple {
            notes.push("repeatable".to_string());
        }
        if !flag.env.is_empty() {
            notes.push(format!("env: {}", flag.env.join(", ")));
        }
        if !notes.is_empty() {
            let _ = write!(line, " [{}]", notes.join("; "));
        }
        line
    }
}

impl HelpRenderer for PlainHelp {
    fn render(&self, command: &CommandSummary) -> String {
        let mut out = format!("Usage: {}", command.path.join(" "));
        if !command.subcommands.is_empty() {
            out.push_str(" <command>");
        }
        if !command.flags.is_empty() {
            out.push_str(" [options]");
        }
        out.push('\n');

        if let Some(desc) = &command.description {
            let _ = write!(out, "\n{desc}\n");
        }

        if !command.subcommands.is_empty() {
            out.push_str("\nCommands:\n");
            let width = command
                .subcommands
                .iter()
                .map(|c| c.name.len())
                .max()
                .unwrap_or(0);
            for sub in &command.subcommands {
                let desc = sub.description.as_deref().unwrap_or("");
                let _ = writeln!(out, "  {:<width$}  {desc}", sub.name);
            }
        }

        if !command.flags.is_empty() {
            out.push_str("\nOptions:\n");
            for flag in &command.flags {
                out.push_str(&Self::flag_line(flag));
                out.push('\n');
            }
        }
        out.push_str("  -h, --help  Show this help\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use flagtree_core::FlagDefinition;

    use super::*;
    use crate::node::CommandNode;

    #[test]
    fn test_plain_help_lists_commands_and_options() {
        let mut root = CommandNode::new("app")
            .with_description("Demo app")
            .with_flag(
                FlagDefinition::new("format")
                    .options(["-f", "--format"])
                    .enum_values(["json", "text"])
                    .default_value("text")
                    .with_description("Output format"),
            )
            .unwrap();
        root.attach(CommandNode::new("serve").with_description("Start the server"));

        let text = PlainHelp.render(&root.summary());
        assert!(text.starts_with("Usage: app <command> [options]\n"));
        assert!(text.contains("Demo app"));
        assert!(text.contains("  serve  Start the server"));
        assert!(text.contains(
            "  -f, --format <string>  Output format [default: text; one of: json, text]"
        ));
        assert!(text.contains("--help"));
    }

    #[test]
    fn test_flag_only_has_no_placeholder() {
        let node = CommandNode::new("app")
            .with_flag(FlagDefinition::new("quiet").option("-q").flag_only().mandatory())
            .unwrap();
        let text = PlainHelp.render(&node.summary());
        assert!(text.contains("  -q [required]\n"));
    }
}
