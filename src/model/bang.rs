use std::sync::LazyLock;

use regex::Regex;

static ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|(\S+)"#).expect("valid bang argument regex"));

/// A host command queued by a measure through `MeasureHost::execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bang {
    SetVariable { name: String, value: String },
    Log { message: String },
    Unsupported { name: String, args: Vec<String> },
}

/// Split a command such as `[!SetVariable Count "3"][!Log done]` into bangs.
/// A single bare `!Name args` is accepted as well.
pub fn parse_bangs(command: &str) -> Vec<Bang> {
    let trimmed = command.trim();
    let wrapped;
    let command = if trimmed.starts_with('!') {
        wrapped = format!("[{trimmed}]");
        wrapped.as_str()
    } else {
        trimmed
    };

    bang_bodies(command)
        .into_iter()
        .filter_map(|body| {
            let name_len = body
                .find(|ch: char| !ch.is_ascii_alphabetic())
                .unwrap_or(body.len());
            if name_len == 0 {
                return None;
            }
            let (name, rest) = body.split_at(name_len);
            Some(to_bang(name, split_args(rest)))
        })
        .collect()
}

/// Text between `[!` and its matching `]`. Brackets inside quotes or nested
/// `[...]` references stay part of the body.
fn bang_bodies(command: &str) -> Vec<&str> {
    let mut bodies = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    let mut quoted = false;

    for (at, ch) in command.char_indices() {
        match ch {
            '"' if start.is_some() => quoted = !quoted,
            '[' if !quoted => {
                if depth == 0 && command[at + 1..].starts_with('!') {
                    start = Some(at + 2);
                }
                if start.is_some() {
                    depth += 1;
                }
            }
            ']' if !quoted && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(begin) = start.take() {
                        bodies.push(&command[begin..at]);
                    }
                }
            }
            _ => {}
        }
    }

    bodies
}

fn split_args(raw: &str) -> Vec<String> {
    ARG_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|arg| arg.as_str().to_string())
        .collect()
}

fn to_bang(name: &str, mut args: Vec<String>) -> Bang {
    if name.eq_ignore_ascii_case("SetVariable") && args.len() == 2 {
        let value = args.pop().unwrap_or_default();
        let name = args.pop().unwrap_or_default();
        return Bang::SetVariable { name, value };
    }

    if name.eq_ignore_ascii_case("Log") && !args.is_empty() {
        return Bang::Log {
            message: args.join(" "),
        };
    }

    Bang::Unsupported {
        name: name.to_string(),
        args,
    }
}
