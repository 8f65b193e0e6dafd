use super::render::{render_contacts, render_guests, render_messages};
use super::{Cli, Commands, MessagesArgs};
use crate::api::{HttpHistoryBackend, IdentifierKind, StaticToken};
use crate::config::ChatdeskConfig;
use crate::history::{DataSource, FetchState, HistoryController, HistoryView};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;

fn build_controller(config: &ChatdeskConfig) -> HistoryController {
    let tokens = Arc::new(StaticToken::new(config.api_token.clone()));
    let backend = HttpHistoryBackend::with_timeout(
        &config.api_url,
        tokens,
        config.fetch.request_timeout_secs,
    );
    HistoryController::new(Arc::new(backend), config)
}

fn ensure_loaded(view: &HistoryView, source: DataSource) -> Result<()> {
    if let FetchState::Failed(reason) = view.state(source) {
        bail!("Could not load {source}: {reason}");
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: ChatdeskConfig) -> Result<()> {
    let controller = build_controller(&config);
    tracing::debug!(api_url = %config.api_url, "Using history backend");

    let outcome = match cli.command {
        Commands::Messages(args) => show_messages(&controller, &args).await,
        Commands::Guests => show_guests(&controller).await,
        Commands::Contacts => show_contacts(&controller).await,
        Commands::ExportPdf { target, out } => match target.identifier() {
            Some((kind, identifier)) => export_pdf(&controller, kind, identifier, &out).await,
            None => Err(anyhow::anyhow!("Pass one of --email, --phone or --session")),
        },
    };

    controller.shutdown().await;
    outcome
}

async fn show_messages(controller: &HistoryController, args: &MessagesArgs) -> Result<()> {
    let filters = args.filter_state()?;
    controller.replace_filters(filters).await?;
    if args.page > 1 {
        controller.go_to_page(args.page).await;
    }

    let view = controller.snapshot().await;
    ensure_loaded(&view, DataSource::Messages)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", render_messages(&view));
    }
    Ok(())
}

async fn show_guests(controller: &HistoryController) -> Result<()> {
    controller.refresh().await;
    let view = controller.snapshot().await;
    ensure_loaded(&view, DataSource::Sessions)?;
    println!("{}", render_guests(&view.guests));
    Ok(())
}

async fn show_contacts(controller: &HistoryController) -> Result<()> {
    controller.refresh().await;
    let view = controller.snapshot().await;
    ensure_loaded(&view, DataSource::Contacts)?;
    println!("{}", render_contacts(&view.contacts));
    Ok(())
}

async fn export_pdf(
    controller: &HistoryController,
    kind: IdentifierKind,
    identifier: &str,
    out: &Path,
) -> Result<()> {
    let bytes = controller
        .export_pdf(kind, identifier)
        .await
        .with_context(|| format!("Failed to export transcript for {kind} {identifier}"))?;
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}
