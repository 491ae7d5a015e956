//! The deployment questionnaire.
//!
//! Six questions are asked in a fixed order. Each one is repeated until its
//! answer validates, and an accepted answer is never revisited.

mod prompter;
mod validate;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DefaultsSection;
use crate::discovery::{ContextList, RegistryList};

pub use prompter::{Prompter, ScriptedPrompter, TerminalPrompter};
pub use validate::{validate_entrypoint, validate_env, validate_port, validate_registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKey {
    Env,
    Port,
    Protocol,
    Entrypoint,
    Context,
    Registry,
}

impl QuestionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKey::Env => "env",
            QuestionKey::Port => "port",
            QuestionKey::Protocol => "protocol",
            QuestionKey::Entrypoint => "entrypoint",
            QuestionKey::Context => "context",
            QuestionKey::Registry => "registry",
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// Free text.
    Input,
    /// One of the listed choices, nothing else.
    Select(Vec<String>),
    /// One of the listed choices or free text.
    Suggest(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Question {
    pub key: QuestionKey,
    pub message: String,
    pub kind: QuestionKind,
    pub default: Option<String>,
}

impl Question {
    fn new(key: QuestionKey, message: &str, kind: QuestionKind, default: Option<&str>) -> Self {
        Self {
            key,
            message: message.to_string(),
            kind,
            default: default.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Tcp,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Http, Protocol::Https, Protocol::Tcp];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|protocol| protocol.as_str() == value)
            .ok_or_else(|| format!("unknown protocol `{value}`"))
    }
}

/// A fully validated questionnaire. Only [`QuestionFlow::run`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answers {
    env: String,
    port: String,
    protocol: Protocol,
    entrypoint: String,
    context: String,
    registry: String,
}

impl Answers {
    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }
}

pub struct QuestionFlow<'a> {
    env_default: &'a str,
    defaults: &'a DefaultsSection,
    project_root: &'a Path,
}

impl<'a> QuestionFlow<'a> {
    pub fn new(
        env_default: &'a str,
        defaults: &'a DefaultsSection,
        project_root: &'a Path,
    ) -> Self {
        Self {
            env_default,
            defaults,
            project_root,
        }
    }

    pub async fn run(
        &self,
        prompter: &mut dyn Prompter,
        registries: &RegistryList,
        contexts: &ContextList,
    ) -> Result<Answers> {
        let env = ask_until_valid(
            prompter,
            &Question::new(
                QuestionKey::Env,
                "Which environment are you deploying to?",
                QuestionKind::Input,
                Some(self.env_default),
            ),
            validate_env,
        )
        .await?;

        let port = ask_until_valid(
            prompter,
            &Question::new(
                QuestionKey::Port,
                "What port does your application listen on?",
                QuestionKind::Input,
                Some(self.defaults.port.as_str()),
            ),
            validate_port,
        )
        .await?;

        let protocol_choices = Protocol::ALL.iter().map(|p| p.to_string()).collect();
        let protocol = ask_until_valid(
            prompter,
            &Question::new(
                QuestionKey::Protocol,
                "Which protocol does your application speak?",
                QuestionKind::Select(protocol_choices),
                Some(self.defaults.protocol.as_str()),
            ),
            |_| Ok(()),
        )
        .await?
        .parse::<Protocol>()
        .map_err(anyhow::Error::msg)?;

        let entrypoint = ask_until_valid(
            prompter,
            &Question::new(
                QuestionKey::Entrypoint,
                "Where is your application's entrypoint?",
                QuestionKind::Input,
                Some(self.defaults.entrypoint.as_str()),
            ),
            |input| validate_entrypoint(self.project_root, input),
        )
        .await?;

        let context = ask_until_valid(
            prompter,
            &Question::new(
                QuestionKey::Context,
                "Which Kubernetes context do you want to use?",
                QuestionKind::Select(contexts.as_slice().to_vec()),
                Some(contexts.first()),
            ),
            |_| Ok(()),
        )
        .await?;

        let registry = ask_until_valid(
            prompter,
            &Question::new(
                QuestionKey::Registry,
                "Which docker registry do you want to use?",
                QuestionKind::Suggest(registries.as_slice().to_vec()),
                None,
            ),
            validate_registry,
        )
        .await?;

        Ok(Answers {
            env,
            port,
            protocol,
            entrypoint,
            context,
            registry,
        })
    }
}

async fn ask_until_valid<F>(
    prompter: &mut dyn Prompter,
    question: &Question,
    validate: F,
) -> Result<String>
where
    F: Fn(&str) -> Result<(), String>,
{
    loop {
        let raw = prompter.ask(question).await?;
        let answer = match (&question.default, raw.is_empty()) {
            (Some(default), true) => default.clone(),
            _ => raw,
        };

        let verdict = match &question.kind {
            QuestionKind::Select(choices) if !choices.contains(&answer) => {
                Err(format!("choose one of: {}", choices.join(", ")))
            }
            _ => validate(&answer),
        };

        match verdict {
            Ok(()) => {
                debug!(question = %question.key, "answer accepted");
                return Ok(answer);
            }
            Err(message) => {
                debug!(question = %question.key, %message, "answer rejected");
                prompter.reject(question, &message);
            }
        }
    }
}
