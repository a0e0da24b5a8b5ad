use std::fmt::Write as _;

use provider_api::Provider;

/// One registered model: a human shortname bound to a provider wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRecord {
    pub shortname: &'static str,
    pub provider: Provider,
    pub wire_id: &'static str,
    pub max_tokens: u32,
}

pub const DEFAULT_MODEL: &str = "gemini-flash";

const MODELS: &[ModelRecord] = &[
    ModelRecord {
        shortname: "gpt-5",
        provider: Provider::OpenAi,
        wire_id: "gpt-5",
        max_tokens: 8192,
    },
    ModelRecord {
        shortname: "gpt-5-mini",
        provider: Provider::OpenAi,
        wire_id: "gpt-5-mini",
        max_tokens: 8192,
    },
    ModelRecord {
        shortname: "claude-sonnet",
        provider: Provider::Anthropic,
        wire_id: "claude-sonnet-4-5",
        max_tokens: 8192,
    },
    ModelRecord {
        shortname: "claude-haiku",
        provider: Provider::Anthropic,
        wire_id: "claude-haiku-4-5",
        max_tokens: 8192,
    },
    ModelRecord {
        shortname: "gemini-flash",
        provider: Provider::Gemini,
        wire_id: "gemini-2.5-flash",
        max_tokens: 16384,
    },
    ModelRecord {
        shortname: "gemini-pro",
        provider: Provider::Gemini,
        wire_id: "gemini-2.5-pro",
        max_tokens: 16384,
    },
];

/// The static model table plus the active selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    active: &'static str,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            active: DEFAULT_MODEL,
        }
    }
}

impl ModelRegistry {
    pub fn active(&self) -> ModelRecord {
        // The active shortname is validated on every write, so lookup
        // cannot miss.
        *MODELS
            .iter()
            .find(|record| record.shortname == self.active)
            .expect("active model is always registered")
    }

    pub fn set_active(&mut self, shortname: &str) -> Result<ModelRecord, String> {
        match MODELS.iter().find(|record| record.shortname == shortname) {
            Some(record) => {
                self.active = record.shortname;
                Ok(*record)
            }
            None => Err(format!(
                "Unknown model '{shortname}'. Available models: {}",
                MODELS
                    .iter()
                    .map(|record| record.shortname)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// One line per model, the active one starred.
    pub fn render_list(&self) -> String {
        let mut out = String::new();
        for record in MODELS {
            let star = if record.shortname == self.active {
                "*"
            } else {
                " "
            };
            let _ = writeln!(
                out,
                "{star} {:<14} {:<10} {}",
                record.shortname,
                record.provider.tag(),
                record.wire_id
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_active_model_is_gemini_flash() {
        let registry = ModelRegistry::default();
        let active = registry.active();
        assert_eq!(active.shortname, "gemini-flash");
        assert_eq!(active.provider, Provider::Gemini);
    }

    #[test]
    fn set_active_switches_and_reports_the_record() {
        let mut registry = ModelRegistry::default();
        let record = registry.set_active("gpt-5").expect("gpt-5 is registered");
        assert_eq!(record.provider, Provider::OpenAi);
        assert_eq!(registry.active().shortname, "gpt-5");
    }

    #[test]
    fn unknown_model_is_rejected_with_the_available_list() {
        let mut registry = ModelRegistry::default();
        let error = registry
            .set_active("gpt-2")
            .expect_err("unknown model must fail");
        assert!(error.contains("Unknown model 'gpt-2'"));
        assert!(error.contains("gemini-flash"));
        assert_eq!(registry.active().shortname, DEFAULT_MODEL);
    }

    #[test]
    fn list_stars_exactly_the_active_model() {
        let mut registry = ModelRegistry::default();
        registry.set_active("claude-sonnet").expect("switch");
        let listing = registry.render_list();

        let starred: Vec<&str> = listing
            .lines()
            .filter(|line| line.starts_with('*'))
            .collect();
        assert_eq!(starred.len(), 1);
        assert!(starred[0].contains("claude-sonnet"));
    }
}
