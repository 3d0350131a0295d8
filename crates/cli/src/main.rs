//! `YouShop` CLI - browse the catalog, manage the cart and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! ys products list --category tea --limit 10
//! ys products show prod_42
//! ys categories
//!
//! # Cart
//! ys cart add prod_42 --quantity 2
//! ys cart show
//!
//! # Account
//! YOUSHOP_PASSWORD=... ys login -e sam@example.com
//! ys whoami
//!
//! # Orders
//! ys checkout --email sam@example.com --first-name Sam ...
//! ys orders list
//! ys orders resubmit local-0b6f...
//! ```
//!
//! # Environment Variables
//!
//! - `YOUSHOP_API_URL` - Backend base URL
//! - `YOUSHOP_STORAGE_DIR` - Where credentials, cart and local orders are
//!   kept (default `.youshop`)
//! - `YOUSHOP_PASSWORD` - Password for `login` and `register` when
//!   `--password` is not given
//! - `YOUSHOP_LOG_FORMAT` - `json` for structured logs on stderr
//! - `RUST_LOG` - Log filter

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use youshop_storefront::Storefront;
use youshop_storefront::catalog::{ProductQuery, SortOrder};
use youshop_storefront::config::StorefrontConfig;

#[allow(clippy::print_stdout)]
mod commands;

use commands::CheckoutArgs;

const DEFAULT_STORAGE_DIR: &str = ".youshop";

#[derive(Parser)]
#[command(name = "ys")]
#[command(author, version, about = "YouShop storefront CLI")]
struct Cli {
    /// Directory for persisted state (overrides `YOUSHOP_STORAGE_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List product categories
    Categories,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (falls back to `YOUSHOP_PASSWORD`)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(short, long)]
        email: String,

        /// Password (falls back to `YOUSHOP_PASSWORD`)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Place an order for the cart
    Checkout(CheckoutArgs),
    /// View and manage orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List(ListArgs),
    /// Show one product with related products
    Show { id: String },
    /// Search products by name or description
    Search { term: String },
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    page: Option<u32>,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    sort_by: Option<String>,

    #[arg(long, value_enum)]
    sort_order: Option<SortArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => Self::Asc,
            SortArg::Desc => Self::Desc,
        }
    }
}

impl From<ListArgs> for ProductQuery {
    fn from(args: ListArgs) -> Self {
        Self {
            page: args.page,
            limit: args.limit,
            search: None,
            category: args.category,
            sort_by: args.sort_by,
            sort_order: args.sort_order.map(SortOrder::from),
        }
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add a product
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set a line's quantity (0 or less removes it)
    Update {
        product_id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List confirmed and locally kept orders
    List,
    /// Show one order
    Show { id: String },
    /// Cancel an order
    Cancel { id: String },
    /// Submit a locally kept order to the backend again
    Resubmit { id: String },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "youshop_cli=info,youshop_storefront=info".into());

    let json_logs = std::env::var("YOUSHOP_LOG_FORMAT").is_ok_and(|f| f == "json");
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_storage_dir(dir);
    } else if config.storage_dir.is_none() {
        config = config.with_storage_dir(DEFAULT_STORAGE_DIR);
    }

    let shop = Storefront::start(config).await?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List(args) => commands::catalog::list(&shop, &args.into()).await?,
            ProductsAction::Show { id } => commands::catalog::show(&shop, &id).await?,
            ProductsAction::Search { term } => commands::catalog::search(&shop, &term).await?,
        },
        Commands::Categories => commands::catalog::categories(&shop).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop),
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&shop, &product_id, quantity).await?,
            CartAction::Update {
                product_id,
                quantity,
            } => commands::cart::update(&shop, &product_id, quantity)?,
            CartAction::Remove { product_id } => commands::cart::remove(&shop, &product_id),
            CartAction::Clear => commands::cart::clear(&shop),
        },
        Commands::Login { email, password } => {
            commands::account::login(&shop, &email, password).await?;
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            commands::account::register(&shop, &first_name, &last_name, &email, password).await?;
        }
        Commands::Logout => commands::account::logout(&shop).await,
        Commands::Whoami => commands::account::whoami(&shop),
        Commands::Checkout(args) => commands::orders::checkout(&shop, args).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(&shop).await?,
            OrdersAction::Show { id } => commands::orders::show(&shop, &id).await?,
            OrdersAction::Cancel { id } => commands::orders::cancel(&shop, &id).await?,
            OrdersAction::Resubmit { id } => commands::orders::resubmit(&shop, &id).await?,
        },
    }
    Ok(())
}
