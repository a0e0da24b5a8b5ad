/// Format version of a parsed dump document.
///
/// v1 is the legacy plain-text layout (no session attribute, no base64); it
/// can be loaded but is never written. v2 is the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    V1,
    V2,
}

/// One attachment as serialized on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpItem {
    File {
        path: String,
        /// Body snapshot taken at dump time when the file was readable.
        /// Ignored on load; the stack keeps path references.
        body: Option<Vec<u8>>,
    },
    Capture {
        command: String,
        output: String,
    },
}

/// One conversation turn as serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTurn {
    pub role: String,
    pub text: String,
}

/// The full serializable session aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDump {
    /// Present in v2 documents only.
    pub session_id: Option<String>,
    /// Active model shortname; v2 only.
    pub model: Option<String>,
    pub stack: Vec<DumpItem>,
    pub convo: Vec<DumpTurn>,
    /// The system prompt.
    pub prompt: Option<String>,
}
