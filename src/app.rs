use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use provider_api::{ChatTurn, Role};
use session_dump::{DumpFormat, DumpItem, DumpTurn, SessionDump};
use uuid::Uuid;

use crate::convo::Conversation;
use crate::models::ModelRegistry;
use crate::stack::{Attachment, ContextStack};

pub const ENV_ROOT: &str = "SYNERGY_ROOT";
pub const ENV_FORCE_AUTODUMP: &str = "SYNERGY_FORCE_AUTODUMP";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Synergy, a terminal assistant. Attached files \
and command output precede each question; answer using them when relevant. Be concise.";

/// Everything a Synergy session owns. Mutated only by the command
/// processor; dump/load serialize it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub stack: ContextStack,
    pub convo: Conversation,
    pub models: ModelRegistry,
    pub session_id: String,
    pub system_prompt: String,
    /// Encode attachment bodies in base64 in outgoing prompts.
    pub base64_to_assistant: bool,
    /// Root for dumps (`<root>/etc/dumps/`).
    pub root: PathBuf,
}

impl Session {
    pub fn new(root: PathBuf) -> Self {
        Self {
            stack: ContextStack::default(),
            convo: Conversation::default(),
            models: ModelRegistry::default(),
            session_id: Uuid::new_v4().to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            base64_to_assistant: true,
            root,
        }
    }

    /// Root discovery: `SYNERGY_ROOT`, else `$HOME/.synergy`, else the
    /// working directory.
    pub fn discover_root(cwd: &Path) -> PathBuf {
        if let Ok(root) = env::var(ENV_ROOT) {
            if !root.trim().is_empty() {
                return PathBuf::from(root);
            }
        }
        if let Ok(home) = env::var("HOME") {
            if !home.trim().is_empty() {
                return Path::new(&home).join(".synergy");
            }
        }
        cwd.to_path_buf()
    }

    /// Full session reset: stack, conversation, and a fresh identity.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.convo.clear();
        self.session_id = Uuid::new_v4().to_string();
    }

    /// Snapshot for the dumper. File bodies are embedded when readable so a
    /// dump survives the files changing underneath it.
    pub fn to_dump(&self) -> SessionDump {
        let stack = self
            .stack
            .items()
            .iter()
            .map(|item| match item {
                Attachment::File { path } => DumpItem::File {
                    path: path.display().to_string(),
                    body: fs::read(path).ok(),
                },
                Attachment::Capture {
                    command, output, ..
                } => DumpItem::Capture {
                    command: command.clone(),
                    output: output.clone(),
                },
            })
            .collect();

        let convo = self
            .convo
            .turns()
            .iter()
            .map(|turn| DumpTurn {
                role: turn.role.as_str().to_string(),
                text: turn.text.clone(),
            })
            .collect();

        SessionDump {
            session_id: Some(self.session_id.clone()),
            model: Some(self.models.active().shortname.to_string()),
            stack,
            convo,
            prompt: Some(self.system_prompt.clone()),
        }
    }

    /// Replace session state from a loaded dump. Returns warnings the REPL
    /// should print (model mismatches, skipped turns).
    pub fn apply_dump(&mut self, dump: SessionDump, format: DumpFormat) -> Vec<String> {
        let mut warnings = Vec::new();

        self.session_id = match (format, dump.session_id) {
            (DumpFormat::V2, Some(session_id)) => session_id,
            _ => Uuid::new_v4().to_string(),
        };

        if let Some(model) = dump.model {
            if let Err(_unknown) = self.models.set_active(&model) {
                warnings.push(format!(
                    "Unknown model '{model}' in dump, keeping '{}'",
                    self.models.active().shortname
                ));
            }
        }

        self.stack.clear();
        for item in dump.stack {
            match item {
                DumpItem::File { path, .. } => {
                    // Stack items are path references; embedded bodies are a
                    // dump-time snapshot only.
                    self.stack.push_file(Path::new(&path), &self.root);
                }
                DumpItem::Capture { command, output } => {
                    self.stack.push_capture(command, output, 0);
                }
            }
        }

        let mut turns = Vec::new();
        for turn in dump.convo {
            match Role::parse(&turn.role) {
                Some(role) => turns.push(ChatTurn {
                    role,
                    text: turn.text,
                }),
                None => warnings.push(format!(
                    "Skipping conversation turn with unknown role '{}'",
                    turn.role
                )),
            }
        }
        self.convo.replace(turns);

        if let Some(prompt) = dump.prompt {
            self.system_prompt = prompt;
        }

        warnings
    }
}
