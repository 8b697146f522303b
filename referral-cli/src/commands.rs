use anyhow::Result;
use log::{error, info, warn};
use referral_shared::api::ReferralApi;
use referral_shared::config::ClientConfig;
use referral_shared::stats::TreeStats;
use registration_form::{RegisterForm, SubmitOutcome};
use std::io::Write;
use std::sync::Arc;
use tree_view::{ForestCache, TreeView, TreeViewError};

use crate::errors::CommandError;

#[derive(Debug, Clone)]
pub struct RegisterInput {
    /// Falls back to the configured default invitor when absent
    pub invitor_id: Option<String>,
    pub user_id: String,
    pub name: String,
    pub show_tree: bool,
}

/// Fills in the form the way a user would, waits for the background
/// checks, reports what they found and submits.
pub async fn register<A, W>(
    api: Arc<A>,
    config: &ClientConfig,
    input: RegisterInput,
    out: &mut W,
) -> Result<()>
where
    A: ReferralApi + 'static,
    W: Write,
{
    // One cache for the whole command, so the form can invalidate what the view shows
    let cache = Arc::new(ForestCache::new(config.tree_cache_ttl));
    let mut view = input
        .show_tree
        .then(|| TreeView::new(Arc::clone(&api), Arc::clone(&cache), config));

    // Show the tree as it was before registering
    if let Some(view) = view.as_mut() {
        let loaded = view.mount(0).await;
        print_tree(view, loaded, out)?;
        writeln!(out)?;
    }

    // Create the form; a successful registration makes the cached tree stale
    let hook_cache = Arc::clone(&cache);
    let form = RegisterForm::new(Arc::clone(&api), config).on_success(move |user| {
        if let Some(user) = user {
            info!("Registered {}, invalidating cached tree", user.name);
        }
        hook_cache.invalidate();
    });

    // Fill in the fields and wait for the invitor lookup and id check
    form.mount();
    if let Some(invitor_id) = &input.invitor_id {
        form.set_invitor_id(invitor_id);
    }
    form.set_your_id(&input.user_id);
    form.set_your_name(&input.name);
    form.settle().await;

    // Report what the background checks found
    let checked = form.snapshot();
    if !checked.invitor_name.is_empty() {
        writeln!(out, "Invitor: {}", checked.invitor_name)?;
    }
    for (field, message) in checked.errors.iter() {
        warn!("{}: {}", field, message);
        writeln!(out, "{}: {}", field, message)?;
    }

    // Submit regardless of field errors; the service decides
    match form.submit().await {
        SubmitOutcome::Registered(_) => {
            if let Some(message) = form.snapshot().message {
                writeln!(out, "{}", message)?;
            }
        }
        SubmitOutcome::Invalid(message) => {
            return Err(CommandError::RegistrationInvalid(message).into())
        }
        SubmitOutcome::Failed(message) => {
            return Err(CommandError::RegistrationFailed(message).into())
        }
        SubmitOutcome::InFlight => return Err(CommandError::RegistrationInFlight.into()),
    }

    if let Some(view) = view.as_mut() {
        // the success hook invalidated the cache, so this refetches
        let loaded = view.refresh().await;
        writeln!(out)?;
        print_tree(view, loaded, out)?;
    }

    Ok(())
}

/// Prints the outline, or why it couldn't be loaded. The tree is only shown
/// alongside a registration, so a failed load never fails the command.
fn print_tree<A, W>(
    view: &TreeView<A>,
    loaded: std::result::Result<(), TreeViewError>,
    out: &mut W,
) -> std::io::Result<()>
where
    A: ReferralApi,
    W: Write,
{
    match loaded {
        Ok(()) => write!(out, "{}", view.render()),
        Err(e) => {
            error!("Not showing invitation tree: {}", e);
            writeln!(out, "{}", e)
        }
    }
}

pub async fn tree<A: ReferralApi>(api: Arc<A>, config: &ClientConfig) -> Result<String> {
    let mut view = TreeView::new(api, Arc::new(ForestCache::new(config.tree_cache_ttl)), config);
    view.mount(0).await?;
    Ok(view.render())
}

pub async fn stats<A: ReferralApi>(api: Arc<A>, config: &ClientConfig) -> Result<TreeStats> {
    let mut view = TreeView::new(api, Arc::new(ForestCache::new(config.tree_cache_ttl)), config);
    view.mount(0).await?;
    Ok(view.stats())
}
