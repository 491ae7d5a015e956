use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deploy_node_app::config::WizardConfig;
use deploy_node_app::discovery::HomeStores;
use deploy_node_app::pairing::{BrowserLauncher, ConnectionState, Connector, Link, TransportError};
use deploy_node_app::preflight::BinaryLookup;
use deploy_node_app::questions::{Protocol, ScriptedPrompter};
use deploy_node_app::wizard::{self, PairingWait, Wizard};
use tempfile::TempDir;

struct AllBinaries;

impl BinaryLookup for AllBinaries {
    fn find(&self, name: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/local/bin").join(name))
    }
}

struct NoBinaries;

impl BinaryLookup for NoBinaries {
    fn find(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

#[derive(Clone, Default)]
struct RecordingBrowser {
    opened: Arc<Mutex<Vec<String>>>,
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Never finishes connecting, so the session sits in `Connecting`.
struct Unreachable;

#[async_trait]
impl Connector for Unreachable {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Link>, TransportError> {
        std::future::pending().await
    }
}

struct Fixture {
    home: TempDir,
    project: TempDir,
    browser: RecordingBrowser,
}

impl Fixture {
    fn new() -> Self {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("package.json"), "{}").unwrap();
        fs::write(project.path().join("index.js"), "").unwrap();
        Self {
            home,
            project,
            browser: RecordingBrowser::default(),
        }
    }

    fn wizard(&self) -> Wizard {
        Wizard::system(WizardConfig::default(), self.project.path().to_path_buf())
            .with_binaries(AllBinaries)
            .with_stores(HomeStores::at(self.home.path()))
            .with_connector(Arc::new(Unreachable))
            .with_browser(self.browser.clone())
    }

    fn write_home(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.home.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }
}

#[tokio::test]
async fn custom_registry_does_not_start_pairing() {
    let fixture = Fixture::new();
    let mut prompter = ScriptedPrompter::new([
        "staging",
        "8080",
        "http",
        "index.js",
        "kubesail",
        "registry.io",
    ]);

    let outcome = fixture.wizard().run("production", &mut prompter).await.unwrap();

    let answers = &outcome.answers;
    assert_eq!(answers.env(), "staging");
    assert_eq!(answers.port(), "8080");
    assert_eq!(answers.protocol(), Protocol::Http);
    assert_eq!(answers.entrypoint(), "index.js");
    assert_eq!(answers.context(), "kubesail");
    assert_eq!(answers.registry(), "registry.io");
    assert!(outcome.pairing.is_none());
    assert!(fixture.browser.opened.lock().unwrap().is_empty());

    assert_eq!(
        serde_json::to_value(answers).unwrap(),
        serde_json::json!({
            "env": "staging",
            "port": "8080",
            "protocol": "http",
            "entrypoint": "index.js",
            "context": "kubesail",
            "registry": "registry.io",
        })
    );
}

#[tokio::test]
async fn default_registry_starts_pairing_and_opens_browser_once() {
    let fixture = Fixture::new();
    let mut prompter = ScriptedPrompter::new([
        "staging",
        "8080",
        "http",
        "index.js",
        "kubesail",
        "registry.kubesail.io",
    ]);

    let outcome = fixture.wizard().run("production", &mut prompter).await.unwrap();
    let handle = outcome.pairing.expect("pairing session should start");
    let session = handle.session_id().to_string();

    let opened = fixture.browser.opened.lock().unwrap().clone();
    assert_eq!(
        opened,
        [format!("https://localhost:3000/register?session={session}")]
    );

    assert_eq!(handle.shutdown().await, ConnectionState::Closed);
}

#[tokio::test]
async fn discovered_stores_feed_the_choices() {
    let fixture = Fixture::new();
    fixture.write_home(
        ".docker/config.json",
        r#"{"auths": {"ghcr.io": {}, "registry.kubesail.io": {}}}"#,
    );
    fixture.write_home(
        ".kube/config",
        "contexts:\n  - name: minikube\n  - context: { cluster: prod-cluster }\n",
    );
    // empty answers take defaults; the context default is the first discovered one
    let mut prompter = ScriptedPrompter::new(["", "", "", "", "", "ghcr.io"]);

    let outcome = fixture.wizard().run("qa1", &mut prompter).await.unwrap();

    assert_eq!(outcome.answers.env(), "qa1");
    assert_eq!(outcome.answers.context(), "minikube");
    assert_eq!(outcome.answers.registry(), "ghcr.io");
    assert!(outcome.pairing.is_none());
}

#[tokio::test]
async fn malformed_credential_store_is_fatal_and_names_the_file() {
    let fixture = Fixture::new();
    let path = fixture.write_home(".docker/config.json", "{\"auths\": ");
    let mut prompter = ScriptedPrompter::new(Vec::<String>::new());

    let err = fixture
        .wizard()
        .run("production", &mut prompter)
        .await
        .err()
        .unwrap();

    assert!(err.to_string().contains(&path.display().to_string()));
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn malformed_context_store_is_fatal_and_names_the_file() {
    let fixture = Fixture::new();
    let path = fixture.write_home(".kube/config", "contexts: {broken");
    let mut prompter = ScriptedPrompter::new(Vec::<String>::new());

    let err = fixture
        .wizard()
        .run("production", &mut prompter)
        .await
        .err()
        .unwrap();

    assert!(err.to_string().contains(&path.display().to_string()));
}

#[tokio::test]
async fn preflight_runs_before_any_question() {
    let fixture = Fixture::new();
    let mut prompter = ScriptedPrompter::new(["staging"]);

    let err = fixture
        .wizard()
        .with_binaries(NoBinaries)
        .run("production", &mut prompter)
        .await
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "You need to install docker!");

    fs::remove_file(fixture.project.path().join("package.json")).unwrap();
    let err = fixture
        .wizard()
        .run("production", &mut prompter)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("doesn't appear to be a Node.js application"));
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn wind_down_waits_for_interrupt_then_closes() {
    let fixture = Fixture::new();
    let mut prompter =
        ScriptedPrompter::new(["", "", "", "", "", "registry.kubesail.io"]);
    let outcome = fixture.wizard().run("production", &mut prompter).await.unwrap();
    let state = outcome.pairing.as_ref().unwrap().state();

    let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel::<()>();
    let waiter = wizard::wind_down(outcome.pairing, PairingWait::UntilInterrupted, async {
        let _ = interrupt_rx.await;
        Ok::<(), std::io::Error>(())
    });
    tokio::pin!(waiter);

    // still running while nobody interrupts
    tokio::select! {
        _ = &mut waiter => panic!("wind_down returned before the interrupt"),
        _ = tokio::task::yield_now() => {}
    }
    assert_eq!(*state.borrow(), ConnectionState::Connecting);

    interrupt_tx.send(()).unwrap();
    assert_eq!(waiter.await, Some(ConnectionState::Closed));
}

#[tokio::test]
async fn detach_closes_without_waiting() {
    let fixture = Fixture::new();
    let mut prompter =
        ScriptedPrompter::new(["", "", "", "", "", "registry.kubesail.io"]);
    let outcome = fixture.wizard().run("production", &mut prompter).await.unwrap();

    let final_state = wizard::wind_down(
        outcome.pairing,
        PairingWait::Detach,
        std::future::pending::<std::io::Result<()>>(),
    )
    .await;
    assert_eq!(final_state, Some(ConnectionState::Closed));

    assert_eq!(
        wizard::wind_down(
            None,
            PairingWait::UntilInterrupted,
            std::future::pending::<std::io::Result<()>>(),
        )
        .await,
        None
    );
}

#[tokio::test]
async fn unavailable_interrupt_signal_still_closes_the_session() {
    let fixture = Fixture::new();
    let mut prompter =
        ScriptedPrompter::new(["", "", "", "", "", "registry.kubesail.io"]);
    let outcome = fixture.wizard().run("production", &mut prompter).await.unwrap();

    let final_state = wizard::wind_down(outcome.pairing, PairingWait::UntilInterrupted, async {
        Err::<(), _>(std::io::Error::other("signal handler unavailable"))
    })
    .await;
    assert_eq!(final_state, Some(ConnectionState::Closed));
}
