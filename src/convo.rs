use std::fmt::Write as _;

use provider_api::{ChatTurn, Role};

/// Append-only conversation log. The system prompt lives on the session,
/// not in here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
    }

    /// Remove and return the newest turn. Used to roll back a provisional
    /// user turn when a dispatch fails.
    pub fn pop(&mut self) -> Option<ChatTurn> {
        self.turns.pop()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn replace(&mut self, turns: Vec<ChatTurn>) {
        self.turns = turns;
    }

    /// Human-readable transcript for `,history`.
    pub fn render_history(&self) -> String {
        if self.turns.is_empty() {
            return "No conversation history\n".to_string();
        }

        let mut out = String::new();
        for turn in &self.turns {
            let _ = writeln!(out, "{}: {}", turn.role.as_str(), turn.text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_turns_keep_order_and_roles() {
        let mut convo = Conversation::default();
        convo.append(Role::User, "q1");
        convo.append(Role::Assistant, "a1");

        assert_eq!(convo.len(), 2);
        assert_eq!(convo.turns()[0].role, Role::User);
        assert_eq!(convo.turns()[1].text, "a1");
    }

    #[test]
    fn pop_rolls_back_the_newest_turn() {
        let mut convo = Conversation::default();
        convo.append(Role::User, "orphan");
        let popped = convo.pop().expect("turn to pop");
        assert_eq!(popped.text, "orphan");
        assert!(convo.is_empty());
    }

    #[test]
    fn history_renders_role_prefixed_lines() {
        let mut convo = Conversation::default();
        convo.append(Role::User, "question");
        convo.append(Role::Assistant, "answer");

        let history = convo.render_history();
        assert_eq!(history, "user: question\nassistant: answer\n");
    }
}
