use std::collections::VecDeque;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use super::{Question, QuestionKey, QuestionKind};

const OTHER_CHOICE: &str = "Other (type it in)";

/// Something that can put a [`Question`] to the user.
///
/// The returned answer is raw: the question flow applies defaults and
/// validation, and calls [`Prompter::reject`] before asking again.
#[async_trait]
pub trait Prompter: Send {
    async fn ask(&mut self, question: &Question) -> Result<String>;

    fn reject(&mut self, question: &Question, message: &str);
}

/// Interactive prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn ask(&mut self, question: &Question) -> Result<String> {
        let question = question.clone();
        tokio::task::spawn_blocking(move || prompt_blocking(&question))
            .await
            .context("prompt task did not complete")?
    }

    fn reject(&mut self, _question: &Question, message: &str) {
        eprintln!(">> {message}");
    }
}

fn prompt_blocking(question: &Question) -> Result<String> {
    let theme = ColorfulTheme::default();
    match &question.kind {
        QuestionKind::Input => read_line(&theme, question),
        QuestionKind::Select(choices) => {
            let index = pick(&theme, question, choices)?;
            Ok(choices[index].clone())
        }
        QuestionKind::Suggest(choices) => {
            let mut items = choices.clone();
            items.push(OTHER_CHOICE.to_string());
            let index = pick(&theme, question, &items)?;
            match choices.get(index) {
                Some(choice) => Ok(choice.clone()),
                None => read_line(&theme, question),
            }
        }
    }
}

fn read_line(theme: &ColorfulTheme, question: &Question) -> Result<String> {
    let mut input = Input::<String>::with_theme(theme)
        .with_prompt(question.message.as_str())
        .allow_empty(true);
    if let Some(default) = &question.default {
        input = input.default(default.clone());
    }
    input
        .interact_text()
        .with_context(|| format!("failed to read answer for `{}`", question.key))
}

fn pick(theme: &ColorfulTheme, question: &Question, items: &[String]) -> Result<usize> {
    let default = question
        .default
        .as_ref()
        .and_then(|default| items.iter().position(|item| item == default))
        .unwrap_or(0);
    Select::with_theme(theme)
        .with_prompt(question.message.as_str())
        .items(items)
        .default(default)
        .interact()
        .with_context(|| format!("failed to read choice for `{}`", question.key))
}

/// Replays a fixed list of answers, one per `ask`.
///
/// An empty string stands for "accept the default". Running out of answers is
/// an error, so a script that keeps failing validation terminates.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<QuestionKey>,
    rejections: Vec<(QuestionKey, String)>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every question asked, in order, including repeats.
    pub fn asked(&self) -> &[QuestionKey] {
        &self.asked
    }

    pub fn rejections(&self) -> &[(QuestionKey, String)] {
        &self.rejections
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask(&mut self, question: &Question) -> Result<String> {
        self.asked.push(question.key);
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer left for `{}`", question.key))
    }

    fn reject(&mut self, question: &Question, message: &str) {
        self.rejections.push((question.key, message.to_string()));
    }
}
