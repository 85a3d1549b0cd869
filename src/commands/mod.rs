pub mod deploy;
pub mod show;

use crate::Context;
use crate::ui;
use anyhow::{Context as _, Result};
use cloudapi::{Client, PollObserver};
use deployment::DesiredState;
use std::fs;
use std::path::Path;

/// Build a client from the resolved settings.
pub fn client(ctx: &Context, observer: Option<Box<dyn PollObserver>>) -> Client {
    let settings = &ctx.settings;
    let client = Client::new(&settings.api_endpoint, settings.api_key.as_deref())
        .with_poll_config(settings.poll_config());
    match observer {
        Some(observer) => client.with_observer(observer),
        None => client,
    }
}

/// Read a desired-state TOML file.
pub fn load_desired(path: &Path) -> Result<DesiredState> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid desired state in {}", path.display()))
}

/// Print advice for a control-plane error and convert it for `main`.
pub fn report(err: cloudapi::Error) -> anyhow::Error {
    ui::dim(err.category().advice());
    err.into()
}
