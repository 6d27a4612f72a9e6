use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lowerthird_core::dto::{PublishTemplateInput, ResolvedLowerThird};
use lowerthird_core::{
    normalize_descriptor, normalize_params, resolve_params, resolve_svg_markup,
    validate_template_draft, Caller, CoreError, LowerThirdService,
};
use lowerthird_db::PgLowerThirdStore;

mod config;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "lowerthird", version, about = "Lower-third template tooling")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a template draft and print its canonical descriptor.
    Validate(DraftArgs),
    /// Render a template locally with a params file.
    Render(RenderArgs),
    /// Resolve a saved config from the database.
    Resolve(ResolveArgs),
    /// Preview an explicit template version from the database.
    Preview(PreviewArgs),
    /// Publish a template draft as the next version of its key.
    Publish(PublishArgs),
    /// Apply pending database migrations.
    Migrate,
}

#[derive(Parser, Debug)]
struct DraftArgs {
    /// SVG markup file.
    #[arg(long)]
    svg: PathBuf,

    /// Descriptor JSON file.
    #[arg(long)]
    descriptor: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Params JSON object. Descriptor defaults are used when omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Output SVG path (default: stdout).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    #[arg(long)]
    config_id: i64,

    /// Calling user id.
    #[arg(long)]
    user: i64,

    /// Act with admin capability.
    #[arg(long)]
    admin: bool,

    /// Print the full result as JSON instead of bare SVG.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[arg(long)]
    template_key: String,

    #[arg(long)]
    template_version: i64,

    /// Params JSON object.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Calling user id.
    #[arg(long)]
    user: i64,

    /// Print the full result as JSON instead of bare SVG.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct PublishArgs {
    #[command(flatten)]
    draft: DraftArgs,

    #[arg(long)]
    template_key: String,

    #[arg(long)]
    label: String,

    #[arg(long)]
    category: Option<String>,

    /// Publishing admin's user id.
    #[arg(long)]
    user: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lowerthird=info,lowerthird_core=info,lowerthird_db=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CliConfig::from_env()?;

    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Render(args) => cmd_render(args),
        Command::Resolve(args) => cmd_resolve(&config, args).await,
        Command::Preview(args) => cmd_preview(&config, args).await,
        Command::Publish(args) => cmd_publish(&config, args).await,
        Command::Migrate => cmd_migrate(&config).await,
    }
}

/* --------------------------------------------------------------------------
   Local commands
   -------------------------------------------------------------------------- */

fn cmd_validate(args: DraftArgs) -> anyhow::Result<()> {
    let svg = read_text(&args.svg)?;
    let descriptor = read_json(&args.descriptor)?;
    let draft = validate_template_draft(&svg, &descriptor).map_err(domain)?;
    println!("{}", serde_json::to_string_pretty(&draft.descriptor.to_json())?);
    tracing::info!(svg = %args.svg.display(), "Template draft is valid");
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let svg = read_text(&args.draft.svg)?;
    let descriptor = normalize_descriptor(&read_json(&args.draft.descriptor)?).map_err(domain)?;
    let raw_params = match &args.params {
        Some(path) => read_json(path)?,
        None => Value::Null,
    };
    let provided = normalize_params(&raw_params).map_err(domain)?;
    let params = resolve_params(&descriptor, &provided).map_err(domain)?;
    let out = resolve_svg_markup(&svg, &descriptor, &params).map_err(domain)?;
    write_output(args.out.as_deref(), &out)
}

/* --------------------------------------------------------------------------
   Database commands
   -------------------------------------------------------------------------- */

async fn connect(config: &CliConfig) -> anyhow::Result<LowerThirdService<PgLowerThirdStore>> {
    let pool = lowerthird_db::create_pool(config.require_database_url()?, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    lowerthird_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::debug!("Database connection pool created");
    Ok(LowerThirdService::new(PgLowerThirdStore::new(pool)))
}

async fn cmd_resolve(config: &CliConfig, args: ResolveArgs) -> anyhow::Result<()> {
    let service = connect(config).await?;
    let caller = Caller {
        user_id: args.user,
        is_admin: args.admin,
    };
    let resolved = service
        .resolve_for_saved_config(args.config_id, caller)
        .await
        .map_err(domain)?;
    print_resolved(&resolved, args.json)
}

async fn cmd_preview(config: &CliConfig, args: PreviewArgs) -> anyhow::Result<()> {
    let service = connect(config).await?;
    let raw_params = match &args.params {
        Some(path) => read_json(path)?,
        None => Value::Null,
    };
    let resolved = service
        .resolve_for_explicit_template(
            &args.template_key,
            args.template_version,
            &raw_params,
            Caller::user(args.user),
        )
        .await
        .map_err(domain)?;
    print_resolved(&resolved, args.json)
}

async fn cmd_publish(config: &CliConfig, args: PublishArgs) -> anyhow::Result<()> {
    let input = PublishTemplateInput {
        template_key: args.template_key,
        label: args.label,
        category: args.category,
        svg_markup: read_text(&args.draft.svg)?,
        descriptor: read_json(&args.draft.descriptor)?,
    };
    let service = connect(config).await?;
    let template = service
        .publish_template(&input, Caller::admin(args.user))
        .await
        .map_err(domain)?;
    println!("{}", serde_json::to_string_pretty(&template)?);
    Ok(())
}

async fn cmd_migrate(config: &CliConfig) -> anyhow::Result<()> {
    let pool = lowerthird_db::create_pool(config.require_database_url()?, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    lowerthird_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/* --------------------------------------------------------------------------
   Helpers
   -------------------------------------------------------------------------- */

/// Surface domain failures as `code: message`.
fn domain(err: CoreError) -> anyhow::Error {
    anyhow::anyhow!("{}: {err}", err.code())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON in '{}'", path.display()))
}

fn write_output(out: Option<&Path>, svg: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            fs::write(path, svg).with_context(|| format!("write '{}'", path.display()))?;
            tracing::info!(out = %path.display(), bytes = svg.len(), "Rendered lower third");
        }
        None => println!("{svg}"),
    }
    Ok(())
}

fn print_resolved(resolved: &ResolvedLowerThird, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(resolved)?);
    } else {
        println!("{}", resolved.svg);
    }
    Ok(())
}
