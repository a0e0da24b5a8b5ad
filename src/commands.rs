use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use provider_api::TransportConfig;
use session_dump::{generate_dump_path, load_dump, write_dump, DumpFormat};

use crate::app::Session;
use crate::exec;
use crate::query;

pub const HELP_TEXT: &str = "\
This is Synergy. You are interacting with the command processor.

Meta-commands start with ','; anything else is sent to the active model.

  ,help                      show this text
  ,exit                      end the session
  ,pwd                       print the working directory
  ,cd <dir>                  change the working directory
  ,push <file>               push a file onto the context stack
  ,s                         show the context stack
  ,drop [i]                  drop the top item, or the item at index i
  ,swap                      exchange the top two stack items
  ,rot                       move the bottom stack item to the top
  ,reset                     clear stack and conversation, new session ID
  ,history                   print the conversation log
  ,model [name]              list models, or switch the active model
  ,encoded                   toggle base64 encoding of attachment bodies
  ,dump [file]               write the session as XML
  ,load <file>               replace the session from an XML dump
  ,apply_patch <file> <diff> apply conflict-marker edits to a file
  ,exec <cmd> [args...]      run an allow-listed read-only command
  ,comment <text>            ignored (for driving scripts)
";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Pwd,
    Cd(String),
    Push(String),
    Show,
    Drop(Option<String>),
    Swap,
    Rot,
    Reset,
    History,
    Model(Option<String>),
    Encoded,
    Dump(Option<String>),
    Load(String),
    ApplyPatch { file: String, diff: String },
    Exec(Vec<String>),
    Comment,
    Query(String),
    Blank,
    Unknown(String),
    MissingArg { command: &'static str, usage: &'static str },
}

/// What the REPL should do after executing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

pub fn parse_line(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Blank;
    }
    if !trimmed.starts_with(',') {
        return Command::Query(trimmed.to_string());
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or(trimmed);
    let rest = parts.next().map(str::trim).unwrap_or("");

    match command {
        ",help" => Command::Help,
        ",exit" => Command::Exit,
        ",pwd" => Command::Pwd,
        ",cd" => required_arg(rest, ",cd", "Usage: ,cd <dir>", Command::Cd),
        ",push" => required_arg(rest, ",push", "Usage: ,push <file>", Command::Push),
        ",s" => Command::Show,
        ",drop" => Command::Drop(non_empty(rest)),
        ",swap" => Command::Swap,
        ",rot" => Command::Rot,
        ",reset" => Command::Reset,
        ",history" => Command::History,
        ",model" => Command::Model(non_empty(rest)),
        ",encoded" => Command::Encoded,
        ",dump" => Command::Dump(non_empty(rest)),
        ",load" => required_arg(rest, ",load", "Usage: ,load <file>", Command::Load),
        ",apply_patch" => {
            let mut args = rest.splitn(2, char::is_whitespace);
            match (args.next().filter(|file| !file.is_empty()), args.next()) {
                (Some(file), Some(diff)) => Command::ApplyPatch {
                    file: file.to_string(),
                    diff: diff.to_string(),
                },
                _ => Command::MissingArg {
                    command: ",apply_patch",
                    usage: "Usage: ,apply_patch <file> <diff>",
                },
            }
        }
        ",exec" => Command::Exec(rest.split_whitespace().map(str::to_string).collect()),
        ",comment" => Command::Comment,
        unknown => Command::Unknown(unknown.to_string()),
    }
}

fn non_empty(rest: &str) -> Option<String> {
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn required_arg(
    rest: &str,
    command: &'static str,
    usage: &'static str,
    build: impl FnOnce(String) -> Command,
) -> Command {
    if rest.is_empty() {
        Command::MissingArg { command, usage }
    } else {
        build(rest.to_string())
    }
}

/// Execute one parsed command against the session, writing all user-facing
/// output to `out`.
pub fn execute(
    command: Command,
    session: &mut Session,
    config: &TransportConfig,
    out: &mut impl Write,
) -> Outcome {
    match command {
        Command::Help => {
            let _ = write!(out, "{HELP_TEXT}");
        }
        Command::Exit => return Outcome::Exit,
        Command::Pwd => match env::current_dir() {
            Ok(cwd) => {
                let _ = writeln!(out, "{}", cwd.display());
            }
            Err(error) => {
                let _ = writeln!(out, "ERROR: Cannot determine working directory: {error}");
            }
        },
        Command::Cd(dir) => match env::set_current_dir(&dir) {
            Ok(()) => {
                if let Ok(cwd) = env::current_dir() {
                    let _ = writeln!(out, "{}", cwd.display());
                }
            }
            Err(error) => {
                let _ = writeln!(out, "ERROR: Cannot change directory to '{dir}': {error}");
            }
        },
        Command::Push(file) => match env::current_dir() {
            Ok(cwd) => {
                session.stack.push_file(Path::new(&file), &cwd);
                let top = session.stack.len() - 1;
                let _ = writeln!(out, "[{top}] pushed {file}");
            }
            Err(error) => {
                let _ = writeln!(out, "ERROR: Cannot resolve '{file}': {error}");
            }
        },
        Command::Show => {
            let _ = write!(out, "{}", session.stack.render_display());
        }
        Command::Drop(index) => drop_item(session, index.as_deref(), out),
        Command::Swap => {
            if session.stack.swap() {
                let _ = writeln!(out, "Swapped top two items");
            } else {
                let _ = writeln!(out, "Stack has fewer than two items, nothing to swap");
            }
        }
        Command::Rot => {
            if session.stack.rot() {
                let _ = writeln!(out, "Rotated bottom item to top");
            } else {
                let _ = writeln!(out, "Stack is empty, nothing to rotate");
            }
        }
        Command::Reset => {
            session.reset();
            let _ = writeln!(out, "Session reset; new session ID {}", session.session_id);
        }
        Command::History => {
            let _ = write!(out, "{}", session.convo.render_history());
        }
        Command::Model(None) => {
            let _ = write!(out, "{}", session.models.render_list());
        }
        Command::Model(Some(name)) => match session.models.set_active(&name) {
            Ok(record) => {
                let _ = writeln!(
                    out,
                    "Active model is now '{}' ({} {})",
                    record.shortname,
                    record.provider.tag(),
                    record.wire_id
                );
            }
            Err(error) => {
                let _ = writeln!(out, "ERROR: {error}");
            }
        },
        Command::Encoded => {
            session.base64_to_assistant = !session.base64_to_assistant;
            let state = if session.base64_to_assistant { "on" } else { "off" };
            let _ = writeln!(out, "Base64 encoding to assistant: {state}");
        }
        Command::Dump(file) => dump_session(session, file.as_deref(), out),
        Command::Load(file) => load_session(session, &file, out),
        Command::ApplyPatch { file, diff } => match env::current_dir() {
            Ok(cwd) => {
                if let Err(error) = patch_engine::apply_patch(&cwd, &file, &diff, out) {
                    let _ = writeln!(out, "ERROR: {error}");
                }
            }
            Err(error) => {
                let _ = writeln!(out, "ERROR: Cannot determine working directory: {error}");
            }
        },
        Command::Exec(argv) => exec_command(session, &argv, out),
        Command::Comment => {}
        Command::Query(prompt) => match query::ask(session, &prompt, config) {
            Ok(reply) => {
                let _ = writeln!(out, "{reply}");
            }
            Err(error) => {
                let _ = writeln!(out, "ERROR: {error}");
            }
        },
        Command::Blank => {
            let _ = writeln!(out, "WARNING: Ignoring empty assistant query");
        }
        Command::Unknown(command) => {
            let _ = writeln!(out, "ERROR: Unknown command '{command}'. Try ,help");
        }
        Command::MissingArg { command, usage } => {
            let _ = writeln!(out, "ERROR: Missing argument for {command}. {usage}");
        }
    }

    Outcome::Continue
}

fn drop_item(session: &mut Session, index: Option<&str>, out: &mut impl Write) {
    match index {
        None => match session.stack.drop_top() {
            Some((index, item)) => {
                let _ = writeln!(out, "Dropped [{index}] {}", item.label());
            }
            None => {
                let _ = writeln!(out, "Stack is empty, nothing to drop");
            }
        },
        Some(raw) => match raw.parse::<usize>() {
            Ok(index) => match session.stack.drop_at(index) {
                Ok(item) => {
                    let _ = writeln!(out, "Dropped [{index}] {}", item.label());
                }
                Err(error) => {
                    let _ = writeln!(out, "ERROR: {error}");
                }
            },
            Err(_) => {
                let _ = writeln!(out, "ERROR: Invalid index '{raw}'");
            }
        },
    }
}

fn dump_session(session: &Session, file: Option<&str>, out: &mut impl Write) {
    let path = match file {
        Some(file) => {
            let path = PathBuf::from(file);
            if path.is_absolute() {
                path
            } else {
                env::current_dir().map(|cwd| cwd.join(&path)).unwrap_or(path)
            }
        }
        None => {
            let path = generate_dump_path(&session.root, &session.session_id);
            let _ = writeln!(
                out,
                "WARNING: No filename provided, using '{}'",
                path.display()
            );
            path
        }
    };

    match write_dump(&session.to_dump(), &path) {
        Ok(()) => {
            let _ = writeln!(out, "Dumped conversation to '{}'.", path.display());
        }
        Err(error) => {
            let _ = writeln!(out, "ERROR: {error}");
        }
    }
}

fn load_session(session: &mut Session, file: &str, out: &mut impl Write) {
    let (dump, format) = match load_dump(Path::new(file)) {
        Ok(loaded) => loaded,
        Err(error) => {
            let _ = writeln!(out, "ERROR: {error}");
            return;
        }
    };

    match format {
        DumpFormat::V1 => {
            let _ = writeln!(out, "WARNING: No session ID found in '{file}'");
        }
        DumpFormat::V2 => {
            let _ = writeln!(out, "Loading session ID...ok");
        }
    }

    for warning in session.apply_dump(dump, format) {
        let _ = writeln!(out, "WARNING: {warning}");
    }
    let _ = writeln!(
        out,
        "Loaded session from '{file}' ({} stack items, {} turns)",
        session.stack.len(),
        session.convo.len()
    );
}

fn exec_command(session: &mut Session, argv: &[String], out: &mut impl Write) {
    match exec::run(argv) {
        Ok(capture) => {
            let _ = writeln!(out, "Captured output to {}", capture.capture_path.display());
            let _ = writeln!(
                out,
                "COMMAND:\n{}\nOUTPUT:\n{}",
                capture.command_line, capture.output
            );
            if capture.status != 0 {
                let _ = writeln!(out, "WARNING: Command exited with status {}", capture.status);
            }
            session
                .stack
                .push_capture(capture.command_line, capture.output, capture.status);
        }
        Err(error) => {
            let _ = writeln!(out, "ERROR: {error}");
        }
    }
}
