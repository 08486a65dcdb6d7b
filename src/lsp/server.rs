use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{stdin, stdout};
use tokio::sync::RwLock;
use tower_lsp::{LspService, Server};

use crate::Config;
use crate::config::{SettingsHandle, spawn_settings_watcher};
use crate::keywords::KeywordSet;
use crate::lsp::backend::Backend;

/// Start the LSP server
pub async fn serve() -> Result<()> {
    let config = Config::from_args_and_env()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.clone()),
    )
    .init();

    // Keyword asset is loaded once here and injected into the caser
    let keywords = KeywordSet::load_embedded();
    log::info!("Loaded {} keywords", keywords.len());

    let settings: SettingsHandle = Arc::new(RwLock::new(config.load_settings()));

    // If running under the integration test, exit after a short delay so the
    // test can read stdout to EOF.
    if std::env::var("ABAP_FORMAT_LS_TEST_EXIT").as_deref() == Ok("1") {
        thread::spawn(|| {
            thread::sleep(Duration::from_secs(1));
            std::process::exit(0);
        });
    }

    let (service, socket) = LspService::build(move |client| {
        let watcher =
            match spawn_settings_watcher(config.clone(), settings.clone(), Some(client.clone())) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    log::warn!("Config watching unavailable: {e}");
                    None
                }
            };

        Backend::new(client, &keywords, settings.clone(), watcher)
    })
    .finish();

    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}
