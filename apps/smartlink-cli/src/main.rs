//! smartlink: operator command line for SmartLink.
//!
//! Resolves tracks through the link resolution provider, walks the creation
//! wizard and publishes to the backend. `open` follows a short code the way
//! a visitor would.
//!
//! Set SMARTLINK_API_URL for the backend and RESOLVER_ENDPOINT (plus
//! optional RESOLVER_TIMEOUT_SECS) for link resolution.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use domain::redirect::RedirectState;
use domain::validate::validate;
use domain::wizard::{SnapshotStatus, Wizard};
use domain::{PlatformId, PlatformLink, ResolvedTrack, Template};
use odesli::OdesliClient;
use serde::Serialize;
use smartlink_cli::api_client::ApiClient;
use smartlink_cli::plan::{parse_platform, parse_platform_link, parse_template, EditPlan};
use smartlink_cli::{follow_short_code, init_tracing};
use tracing::{info, warn};

const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "smartlink", about = "SmartLink operator CLI", version)]
struct Cli {
    /// Backend base URL
    #[arg(
        long,
        env = "SMARTLINK_API_URL",
        default_value = "http://localhost:3001",
        global = true
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an input as a streaming URL, ISRC or UPC
    Validate {
        input: String,
    },
    /// Resolve an input into track metadata and platform links
    Resolve {
        input: String,
        /// Storefront country for the lookup
        #[arg(long, env = "USER_COUNTRY", default_value = "US")]
        country: String,
    },
    /// Walk the creation wizard and publish a SmartLink
    Create(CreateArgs),
    /// Follow a short code like a visitor and print where it leads
    Open {
        code: String,
        /// Public site origin; prints a full URL instead of a path
        #[arg(long, env = "PUBLIC_BASE_URL")]
        site_url: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Streaming URL, ISRC or UPC
    input: String,
    #[arg(long, env = "USER_COUNTRY", default_value = "US")]
    country: String,
    /// Override the resolved artist name
    #[arg(long)]
    artist: Option<String>,
    /// Override the resolved track title
    #[arg(long)]
    title: Option<String>,
    /// Disable a detected platform (repeatable)
    #[arg(long, value_parser = parse_platform)]
    disable: Vec<PlatformId>,
    /// Platforms to list first, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_platform)]
    order: Vec<PlatformId>,
    /// Add a link by hand as platform=url (repeatable)
    #[arg(long, value_parser = parse_platform_link)]
    add: Vec<(PlatformId, String)>,
    /// Custom track slug
    #[arg(long)]
    slug: Option<String>,
    #[arg(long, value_parser = parse_template)]
    template: Option<Template>,
    /// Primary color, #rgb or #rrggbb
    #[arg(long)]
    color: Option<String>,
    /// Google Analytics 4 measurement id (G-...)
    #[arg(long)]
    ga4: Option<String>,
    #[arg(long)]
    meta_pixel: Option<String>,
    /// Print the creation payload instead of publishing
    #[arg(long)]
    dry_run: bool,
}

impl CreateArgs {
    fn plan(&self) -> EditPlan {
        EditPlan {
            artist: self.artist.clone(),
            title: self.title.clone(),
            add: self.add.clone(),
            disable: self.disable.clone(),
            order: self.order.clone(),
            slug: self.slug.clone(),
            template: self.template,
            color: self.color.clone(),
            ga4: self.ga4.clone(),
            meta_pixel: self.meta_pixel.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackOut<'a> {
    title: &'a str,
    artist_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    album: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    isrc: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artwork_url: Option<&'a str>,
    input_type: &'static str,
    source_provider: &'a str,
    platform_links: Vec<PlatformLink>,
}

impl<'a> From<&'a ResolvedTrack> for TrackOut<'a> {
    fn from(t: &'a ResolvedTrack) -> Self {
        Self {
            title: &t.title,
            artist_name: &t.artist_name,
            album: t.album.as_deref(),
            isrc: t.isrc.as_deref(),
            release_date: t.release_date.as_deref(),
            artwork_url: t.artwork_url.as_deref(),
            input_type: t.input_type.as_str(),
            source_provider: &t.source_provider,
            platform_links: t
                .platform_links
                .iter()
                .map(|(platform, url)| PlatformLink {
                    platform: platform.clone(),
                    url: url.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishedOut {
    id: String,
    short_id: String,
    short_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_pending: Option<String>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn resolver() -> anyhow::Result<OdesliClient> {
    OdesliClient::from_env().context("Link resolution is not configured")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { input } => {
            let source = validate(&input)?;
            print_json(&serde_json::json!({
                "kind": source.kind().as_str(),
                "value": source.value(),
                "platformHint": source.platform_hint().map(|p| p.as_str()),
            }))?;
        }
        Commands::Resolve { input, country } => {
            let source = validate(&input)?;
            let track = resolver()?
                .resolve(source.value(), &country)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            print_json(&TrackOut::from(&track))?;
        }
        Commands::Create(args) => {
            let api = ApiClient::new(&cli.api_url, API_TIMEOUT)?;
            create(&api, &args).await?;
        }
        Commands::Open { code, site_url } => {
            let api = ApiClient::new(&cli.api_url, API_TIMEOUT)?;
            match follow_short_code(&api, Some(&code)).await {
                RedirectState::Navigate(path) => match site_url {
                    Some(base) => println!("{}{}", base.trim_end_matches('/'), path),
                    None => println!("{}", path),
                },
                RedirectState::Failed(err) => {
                    warn!(code = %code, err = %err, "short code not resolved");
                    bail!(err.user_message());
                }
                other => bail!("resolver did not settle: {:?}", other),
            }
        }
    }

    Ok(())
}

async fn create(api: &ApiClient, args: &CreateArgs) -> anyhow::Result<()> {
    let resolver = resolver()?;
    let mut wizard = Wizard::new();

    let ticket = wizard.begin_search(&args.input)?;
    let result = resolver
        .resolve(ticket.source().value(), &args.country)
        .await;
    wizard.complete_search(ticket, result)?;
    if let Some(e) = wizard.search_state().failed() {
        bail!(e.user_message());
    }

    args.plan().apply(&mut wizard)?;
    if args.dry_run {
        return print_json(&wizard.preview()?);
    }

    wizard.next()?;
    let ticket = wizard.begin_publish()?;
    let result = api.create(ticket.payload()).await;
    wizard.complete_publish(ticket, result)?;
    if let Some(e) = wizard.publish_state().failed() {
        bail!(e.user_message());
    }
    let created = wizard
        .created()
        .cloned()
        .ok_or_else(|| anyhow!("publish finished without a SmartLink"))?;
    info!(short_id = %created.short_id, "smartlink published");

    let snapshot = api.generate_snapshot(&created.short_id).await;
    if let Err(e) = &snapshot {
        warn!(short_id = %created.short_id, err = %e, "snapshot not generated");
    }
    wizard.record_snapshot(snapshot)?;

    let (snapshot_url, snapshot_pending) = match wizard.snapshot_status() {
        SnapshotStatus::Ready { url } => (Some(url.clone()), None),
        SnapshotStatus::Pending { reason } => (None, Some(reason.clone())),
        SnapshotStatus::NotRequested => (None, None),
    };
    print_json(&PublishedOut {
        short_url: api.short_url(&created.short_id),
        canonical_path: wizard.snapshot_input().map(|i| i.target_path()),
        id: created.id,
        short_id: created.short_id,
        snapshot_url,
        snapshot_pending,
    })
}
