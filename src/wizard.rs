//! Runs the whole wizard: preflight, discovery, questions, then pairing when
//! the user picked the hosted registry.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::WizardConfig;
use crate::discovery::{self, ContextStoreReader, HomeStores, RegistryStoreReader};
use crate::pairing::{
    BrowserLauncher, ConnectionState, Connector, PairingHandle, PairingSession, SystemBrowser,
    WebSocketConnector,
};
use crate::preflight::{self, BinaryLookup, PathLookup, REQUIRED_BINARIES};
use crate::questions::{Answers, Prompter, QuestionFlow};

pub struct Wizard {
    config: WizardConfig,
    project_root: PathBuf,
    binaries: Box<dyn BinaryLookup>,
    registry_store: Box<dyn RegistryStoreReader>,
    context_store: Box<dyn ContextStoreReader>,
    connector: Arc<dyn Connector>,
    browser: Box<dyn BrowserLauncher>,
}

pub struct WizardOutcome {
    pub answers: Answers,
    /// Present only when the hosted registry was chosen.
    pub pairing: Option<PairingHandle>,
}

/// What to do with a running pairing session once the answers are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingWait {
    /// Keep the session alive until the interrupt future resolves.
    UntilInterrupted,
    /// Shut the session down straight away.
    Detach,
}

impl Wizard {
    /// Wired to the real machine: `PATH`, the home directory stores, a
    /// websocket connection and the system browser.
    pub fn system(config: WizardConfig, project_root: PathBuf) -> Self {
        let stores = HomeStores::from_env();
        Self {
            config,
            project_root,
            binaries: Box::new(PathLookup),
            registry_store: Box::new(stores.clone()),
            context_store: Box::new(stores),
            connector: Arc::new(WebSocketConnector),
            browser: Box::new(SystemBrowser),
        }
    }

    pub fn with_binaries(mut self, binaries: impl BinaryLookup + 'static) -> Self {
        self.binaries = Box::new(binaries);
        self
    }

    pub fn with_stores<S>(mut self, stores: S) -> Self
    where
        S: RegistryStoreReader + ContextStoreReader + Clone + 'static,
    {
        self.registry_store = Box::new(stores.clone());
        self.context_store = Box::new(stores);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_browser(mut self, browser: impl BrowserLauncher + 'static) -> Self {
        self.browser = Box::new(browser);
        self
    }

    /// `env` seeds the default answer of the environment question.
    ///
    /// Any pairing session is started on the current tokio runtime and is
    /// owned by the returned outcome.
    pub async fn run(&self, env: &str, prompter: &mut dyn Prompter) -> Result<WizardOutcome> {
        preflight::check_binaries(self.binaries.as_ref(), &REQUIRED_BINARIES)?;
        preflight::check_project(&self.project_root)?;

        let discovery_defaults = &self.config.discovery;
        let contexts = discovery::discover_contexts(
            self.context_store.as_ref(),
            &discovery_defaults.default_context,
        )?;
        let registries = discovery::discover_registries(
            self.registry_store.as_ref(),
            &discovery_defaults.default_registry,
        )?;

        let answers = QuestionFlow::new(env, &self.config.defaults, &self.project_root)
            .run(prompter, &registries, &contexts)
            .await?;

        let pairing = if answers.registry() == discovery_defaults.default_registry {
            Some(PairingSession::start(
                self.config.pairing.to_pairing_config(),
                Arc::clone(&self.connector),
                self.browser.as_ref(),
            ))
        } else {
            None
        };

        Ok(WizardOutcome { answers, pairing })
    }
}

/// Winds a pairing session down according to `wait`.
///
/// `interrupt` is usually `tokio::signal::ctrl_c()`. If it fails the failure
/// is logged and the session is shut down at once.
///
/// Returns the final connection state, or `None` when no session was running.
pub async fn wind_down<F>(
    pairing: Option<PairingHandle>,
    wait: PairingWait,
    interrupt: F,
) -> Option<ConnectionState>
where
    F: Future<Output = io::Result<()>>,
{
    let handle = pairing?;
    if wait == PairingWait::UntilInterrupted {
        info!(session = %handle.session_id(), "waiting for registration to complete");
        if let Err(err) = interrupt.await {
            warn!("failed to listen for Ctrl-C, closing the pairing session now: {err}");
        }
    }
    Some(handle.shutdown().await)
}
