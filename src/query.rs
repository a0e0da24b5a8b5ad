use provider_api::{
    build_request, classify_response, extract_reply, post_with_retry, resolve_api_key,
    ProviderApiError, Role, TransportConfig,
};

use crate::app::Session;

/// Ask the active model, threading the context stack and conversation
/// history through the provider request.
///
/// The user turn is appended before dispatch and rolled back on any
/// failure, so a retried prompt never accumulates orphan turns; the
/// assistant turn is appended only on success.
pub fn ask(
    session: &mut Session,
    prompt: &str,
    config: &TransportConfig,
) -> Result<String, ProviderApiError> {
    let effective = compose_effective_message(session, prompt);
    session.convo.append(Role::User, effective);

    match dispatch(session, config) {
        Ok(reply) => {
            session.convo.append(Role::Assistant, reply.clone());
            Ok(reply)
        }
        Err(error) => {
            session.convo.pop();
            Err(error)
        }
    }
}

fn dispatch(session: &Session, config: &TransportConfig) -> Result<String, ProviderApiError> {
    if let Some(canned) = config.offline_reply() {
        tracing::debug!("offline mode active, returning canned reply");
        return Ok(canned.to_string());
    }

    let model = session.models.active();
    let api_key = resolve_api_key(model.provider)?;
    let request = build_request(
        model.provider,
        model.wire_id,
        model.max_tokens,
        &session.system_prompt,
        session.convo.turns(),
        &api_key,
    )?;

    let response = post_with_retry(&request, config)?;
    let body = classify_response(response)?;
    extract_reply(model.provider, &body)
}

fn compose_effective_message(session: &Session, prompt: &str) -> String {
    if session.stack.is_empty() {
        return prompt.to_string();
    }

    let attachments = session.stack.render_payload(session.base64_to_assistant);
    format!("{attachments}---\n{prompt}")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn offline_session() -> (Session, TransportConfig) {
        let session = Session::new(PathBuf::from("/tmp/synergy-test-root"));
        let config = TransportConfig::default().with_offline_response("canned reply");
        (session, config)
    }

    #[test]
    fn offline_ask_appends_both_turns() {
        let (mut session, config) = offline_session();

        let reply = ask(&mut session, "what is up", &config).expect("offline ask succeeds");

        assert_eq!(reply, "canned reply");
        assert_eq!(session.convo.len(), 2);
        assert_eq!(session.convo.turns()[0].role, Role::User);
        assert_eq!(session.convo.turns()[0].text, "what is up");
        assert_eq!(session.convo.turns()[1].text, "canned reply");
    }

    #[test]
    fn stack_contents_are_prepended_to_the_user_turn() {
        let (mut session, config) = offline_session();
        session
            .stack
            .push_capture("ls /work".to_string(), "a.txt\n".to_string(), 0);
        session.base64_to_assistant = false;

        ask(&mut session, "what files exist", &config).expect("offline ask succeeds");

        let user_turn = &session.convo.turns()[0].text;
        assert!(user_turn.contains("ls /work"));
        assert!(user_turn.contains("a.txt"));
        assert!(user_turn.ends_with("---\nwhat files exist"));
    }

    #[test]
    fn failed_dispatch_rolls_back_the_user_turn() {
        let (mut session, _) = offline_session();
        // Online config with retries disabled; the missing API key fails
        // before any transport call.
        let config = TransportConfig::default().with_max_retries(0);
        session.models.set_active("gpt-5").expect("switch model");
        std::env::remove_var("OPENAI_API_KEY");

        let error = ask(&mut session, "anything", &config).expect_err("missing key must fail");

        assert_eq!(error.to_string(), "Missing API key for provider 'openai'");
        assert!(session.convo.is_empty(), "user turn must be rolled back");
    }
}
