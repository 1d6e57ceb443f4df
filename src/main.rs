use anyhow::{bail, Context, Result};
use autolot::admin::{table_rows, AdminService, AuthState, InventorySummary, ListingForm, LoginForm, NewImage};
use autolot::backend::{Backend, MemoryBackend, SupabaseClient};
use autolot::catalog::{CatalogQuery, CatalogView, SortKey};
use autolot::config::Config;
use autolot::listings::{FetchOptions, ListingFeed, RefreshPolicy};
use autolot::site::ListingCard;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_EMAIL: &str = "admin@autolot.local";
const DEMO_PASSWORD: &str = "demo-password";

#[derive(Parser)]
#[command(name = "autolot", version, about = "Dealership catalog and listing admin")]
struct Cli {
    /// Use the in-memory backend with sample listings
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse the public catalog
    Catalog(CatalogArgs),
    /// Follow the catalog and report every change
    Watch {
        /// Patch the cached list instead of refetching on each change
        #[arg(long)]
        patch: bool,
    },
    /// Manage listings (requires admin credentials)
    Admin {
        #[command(flatten)]
        login: LoginArgs,

        #[command(subcommand)]
        action: AdminCommand,
    },
}

#[derive(Args)]
struct CatalogArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_year: Option<i32>,
    #[arg(long)]
    max_year: Option<i32>,
    /// newest, price-low, price-high, year-new or year-old
    #[arg(long, default_value = "newest")]
    sort: SortKey,
    /// Number of pages to reveal
    #[arg(long, default_value_t = 1)]
    pages: usize,
    /// Retry a failed load this many extra times
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long, env = "AUTOLOT_ADMIN_EMAIL")]
    email: Option<String>,
    #[arg(long, env = "AUTOLOT_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Inventory totals and the listings table
    Summary,
    /// Create a listing
    Add(ListingArgs),
    /// Edit a listing; omitted fields keep their value
    Edit {
        id: String,
        #[command(flatten)]
        fields: ListingArgs,
        /// Drop the existing image at this position (repeatable)
        #[arg(long = "remove-image")]
        remove_images: Vec<usize>,
    },
    /// Delete a listing and its images
    Delete { id: String },
}

#[derive(Args)]
struct ListingArgs {
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Image file to upload (repeatable)
    #[arg(long = "image")]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    info!("🚗 autolot - dealership catalog");

    let (backend, demo) = connect(&config, cli.demo)?;
    info!("Using {} backend", backend.table.backend_name());

    match cli.command {
        Command::Catalog(args) => show_catalog(&config, &backend, args).await,
        Command::Watch { patch } => watch(&config, &backend, patch).await,
        Command::Admin { login, action } => {
            let session = sign_in(&backend, demo.as_deref(), login).await?;
            let result = run_admin(&config, &backend, &session, action).await;
            if let Err(e) = backend.auth.sign_out(&session).await {
                warn!("Sign out failed: {}", e);
            }
            result
        }
    }
}

fn connect(config: &Config, demo: bool) -> Result<(Backend, Option<Arc<MemoryBackend>>)> {
    if demo {
        let memory = Arc::new(MemoryBackend::with_sample_listings());
        memory.register_admin(DEMO_EMAIL, DEMO_PASSWORD);
        return Ok((Backend::from_shared(memory.clone()), Some(memory)));
    }

    config.require_project()?;
    let client = Arc::new(SupabaseClient::new(config)?);
    Ok((Backend::from_shared(client), None))
}

async fn show_catalog(config: &Config, backend: &Backend, args: CatalogArgs) -> Result<()> {
    let options = FetchOptions {
        max_attempts: args.retries + 1,
        ..FetchOptions::default()
    };
    let mut feed = ListingFeed::new(backend.table.clone(), backend.changes.clone(), &config.table, options);
    feed.refetch().await.context("Failed to load listings")?;

    let defaults = CatalogQuery::default();
    let mut view = CatalogView::new(config.page_size);
    view.replace_listings(feed.items());
    view.set_query(CatalogQuery {
        search: args.search,
        brand: args.brand,
        price_range: (
            args.min_price.unwrap_or(defaults.price_range.0),
            args.max_price.unwrap_or(defaults.price_range.1),
        ),
        year_range: (
            args.min_year.unwrap_or(defaults.year_range.0),
            args.max_year.unwrap_or(defaults.year_range.1),
        ),
        sort: args.sort,
    });
    for _ in 1..args.pages {
        view.reveal_more();
    }

    info!("{}", view.results_label());
    if view.is_empty() {
        println!("No cars match. Try adjusting your search criteria or filters.");
        return Ok(());
    }

    for (i, listing) in view.visible().iter().enumerate() {
        let card = ListingCard::new(listing, &config.phone_number);
        println!("{}. {} ({})", i + 1, card.title, card.price);
        println!("   Year: {}", card.year);
        if let Some(description) = &card.description {
            println!("   {}", description.lines().next().unwrap_or_default());
        }
        println!("   Images: {}", card.gallery.len());
        println!("   Call: {}", card.call_link());
        println!();
    }

    if view.has_more() {
        println!(
            "Showing {} of {} (use --pages to see more)",
            view.visible().len(),
            view.filtered_count()
        );
    }
    println!("Brands: {}", view.brands().join(", "));

    Ok(())
}

async fn watch(config: &Config, backend: &Backend, patch: bool) -> Result<()> {
    let options = FetchOptions {
        policy: if patch { RefreshPolicy::Patch } else { RefreshPolicy::Refetch },
        ..FetchOptions::default()
    };
    let mut feed = ListingFeed::new(backend.table.clone(), backend.changes.clone(), &config.table, options);
    feed.start().await.context("Failed to subscribe to listing changes")?;

    let mut updates = feed.watch();
    let mut view = CatalogView::new(config.page_size);

    loop {
        {
            let state = updates.borrow_and_update();
            if let Some(message) = &state.error_message {
                warn!("Catalog unavailable: {}", message);
            } else if !state.is_loading {
                view.replace_listings(state.items.clone());
                info!("{}", view.results_label());
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                break;
            }
        }
    }

    feed.shutdown();
    Ok(())
}

async fn sign_in(
    backend: &Backend,
    demo: Option<&MemoryBackend>,
    login: LoginArgs,
) -> Result<autolot::backend::AdminSession> {
    let (email, password) = match (login.email, login.password, demo) {
        (Some(email), Some(password), _) => (email, password),
        (None, None, Some(_)) => (DEMO_EMAIL.to_string(), DEMO_PASSWORD.to_string()),
        _ => bail!("Admin commands need AUTOLOT_ADMIN_EMAIL and AUTOLOT_ADMIN_PASSWORD"),
    };

    let mut form = LoginForm {
        email,
        password,
        ..LoginForm::default()
    };

    match form.submit(backend.auth.as_ref()).await {
        AuthState::SignedIn(session) => Ok(session),
        AuthState::SignedOut => bail!(
            "Sign in failed: {}",
            form.error.or(form.notice).unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

async fn run_admin(
    config: &Config,
    backend: &Backend,
    session: &autolot::backend::AdminSession,
    action: AdminCommand,
) -> Result<()> {
    let service = AdminService::new(backend.table.clone(), backend.storage.clone());

    match action {
        AdminCommand::Summary => {
            let listings = backend.table.list().await?;
            let summary = InventorySummary::from_listings(&listings);
            println!("Total cars: {}", summary.total_listings);
            println!("Total inventory value: {}", summary.total_value_text());
            println!();
            for row in table_rows(&listings) {
                println!("{}  {}  {}  {}  added {}", row.id, row.title, row.year, row.price, row.added);
            }
        }
        AdminCommand::Add(fields) => {
            let mut form = ListingForm::create();
            apply_fields(&mut form, fields).await?;
            let listing = service.submit(session, &mut form).await?;
            println!("Created {} ({})", listing.title(), listing.id);
        }
        AdminCommand::Edit {
            id,
            fields,
            mut remove_images,
        } => {
            let listing = find_listing(backend, &id).await?;
            let mut form = ListingForm::edit(&listing);

            remove_images.sort_unstable();
            for index in remove_images.into_iter().rev() {
                if form.images.remove_existing(index).is_none() {
                    bail!("Listing {} has no image at position {}", id, index);
                }
            }

            apply_fields(&mut form, fields).await?;
            let listing = service.submit(session, &mut form).await?;
            println!("Updated {} ({})", listing.title(), listing.id);
        }
        AdminCommand::Delete { id } => {
            let listing = find_listing(backend, &id).await?;
            service.delete(session, &listing).await?;
            println!("Deleted {}", listing.title());
        }
    }

    info!("Admin action finished against {}", config.table);
    Ok(())
}

async fn find_listing(backend: &Backend, id: &str) -> Result<autolot::models::Listing> {
    backend
        .table
        .list()
        .await?
        .into_iter()
        .find(|listing| listing.id == id)
        .with_context(|| format!("No listing with id {}", id))
}

async fn apply_fields(form: &mut ListingForm, fields: ListingArgs) -> Result<()> {
    if let Some(brand) = fields.brand {
        form.draft.brand = brand;
    }
    if let Some(model) = fields.model {
        form.draft.model = model;
    }
    if let Some(year) = fields.year {
        form.draft.year = year;
    }
    if let Some(price) = fields.price {
        form.draft.price = price;
    }
    if let Some(description) = fields.description {
        form.draft.description = description;
    }

    for path in fields.images {
        form.images.add_files([NewImage::from_path(&path).await?]);
    }
    Ok(())
}
