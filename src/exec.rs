use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Read-only tools a `,exec` invocation may run. Anything else is refused;
/// this is a security boundary, not a convenience default.
pub const ALLOWED_COMMANDS: &[&str] = &[
    "grep", "egrep", "fgrep", "ls", "wc", "cat", "head", "tail", "find", "file", "diff", "stat",
    "sort", "uniq", "tr", "awk", "sed",
];

const METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '>', '<', '(', ')', '\n'];

/// Result of a sandboxed command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCapture {
    pub command_line: String,
    pub output: String,
    pub status: i32,
    pub capture_path: PathBuf,
}

/// Validate argv against the sandbox rules without running anything.
pub fn validate(argv: &[String]) -> Result<(), String> {
    let Some(command) = argv.first() else {
        return Err("No command provided to ,exec".to_string());
    };

    if !ALLOWED_COMMANDS.contains(&command.as_str()) {
        return Err(format!(
            "Command '{command}' not allowed in ,exec mode. Allowed commands: {}",
            ALLOWED_COMMANDS.join(", ")
        ));
    }

    if argv
        .iter()
        .any(|token| token.chars().any(|c| METACHARACTERS.contains(&c)))
    {
        return Err("Shell metacharacters not allowed".to_string());
    }

    Ok(())
}

/// Run a validated command, capture stdout to a temp file, and return the
/// capture. A non-zero exit is reported by the caller; the output is kept
/// either way.
pub fn run(argv: &[String]) -> Result<ExecCapture, String> {
    validate(argv)?;

    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .output()
        .map_err(|error| format!("Failed to run '{}': {error}", argv[0]))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let status = output.status.code().unwrap_or(-1);
    let command_line = argv.join(" ");

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let capture_path = env::temp_dir().join(format!(
        "synergy_exec_pid_{}_timestamp_{timestamp}.txt",
        std::process::id()
    ));
    fs::write(&capture_path, &stdout)
        .map_err(|error| format!("Failed to write capture file: {error}"))?;

    Ok(ExecCapture {
        command_line,
        output: stdout,
        status,
        capture_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn empty_argv_is_rejected() {
        let error = validate(&[]).expect_err("empty argv must fail");
        assert_eq!(error, "No command provided to ,exec");
    }

    #[test]
    fn commands_outside_the_allow_list_are_refused() {
        for forbidden in ["rm", "curl", "bash", "python3", "mv"] {
            let error = validate(&argv(&[forbidden, "-rf", "/"]))
                .expect_err("disallowed command must fail");
            assert!(error.contains(&format!("Command '{forbidden}' not allowed in ,exec mode")));
            assert!(error.contains("grep"), "rejection lists the allowed set");
        }
    }

    #[test]
    fn metacharacters_anywhere_in_argv_are_refused() {
        for bad in [
            "a;b", "a&b", "a|b", "a`b", "a$b", "a>b", "a<b", "a(b", "a)b", "a\nb",
        ] {
            let error =
                validate(&argv(&["ls", bad])).expect_err("metacharacter must fail");
            assert_eq!(error, "Shell metacharacters not allowed");
        }
    }

    #[test]
    fn allow_listed_command_runs_and_captures_stdout() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("seen.txt"), "content").expect("seed file");

        let capture = run(&argv(&["ls", dir.path().to_str().expect("utf8 path")]))
            .expect("ls runs");

        assert_eq!(capture.status, 0);
        assert!(capture.output.contains("seen.txt"));
        let persisted =
            std::fs::read_to_string(&capture.capture_path).expect("capture file exists");
        assert_eq!(persisted, capture.output);
        let name = capture
            .capture_path
            .file_name()
            .expect("file name")
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("synergy_exec_pid_"));
        assert!(name.contains("_timestamp_"));
    }

    #[test]
    fn nonzero_exit_still_captures_output() {
        let capture = run(&argv(&["ls", "/definitely/not/a/real/path"]))
            .expect("ls itself runs");
        assert_ne!(capture.status, 0);
    }
}
