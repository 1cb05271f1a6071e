//! crmql: compile and inspect CRM queries from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Print the SOQL for a filter
//! crmql compile --model Opportunity --select id,name \
//!     --where '{"amount": {"$gte": 25000}}' --order createdDate:desc --limit 100
//!
//! # Show the normalized condition tree and chunk directives
//! crmql explain --model Opportunity --where '{"id": {"$in": ["1","2"], "$chunk": {"size": 1}}}'
//!
//! # List declared models
//! crmql models --models ./models.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use colored::*;
use crmql::config::ConfigFile;
use crmql::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crmql")]
#[command(version)]
#[command(about = "Typed CRM filters in, provider queries out", long_about = None)]
#[command(after_help = "EXAMPLES:
    crmql compile --model Opportunity --where '{\"stageName\": \"Won\"}'
    crmql explain --model Opportunity --where '{\"$or\": [{\"amount\": {\"$gt\": 1}}, {\"ownerId\": null}]}'
    crmql models")]
struct Cli {
    /// Models file (defaults to <config dir>/crmql/models.toml)
    #[arg(long, global = true, env = "CRMQL_MODELS")]
    models: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the provider query for a model and filter
    Compile(QueryArgs),
    /// Show the normalized condition tree, chunk directives and query
    Explain(QueryArgs),
    /// List declared models and their field paths
    Models,
}

#[derive(Args)]
struct QueryArgs {
    /// Model name as declared in the models file
    #[arg(short, long)]
    model: String,

    /// Logical keys to select
    #[arg(short, long, value_delimiter = ',')]
    select: Vec<String>,

    /// Filter document as JSON
    #[arg(short, long = "where")]
    filter: Option<String>,

    /// Ordering as key:asc|desc
    #[arg(short, long, value_delimiter = ',')]
    order: Vec<String>,

    #[arg(short, long)]
    limit: Option<u64>,

    #[arg(long)]
    offset: Option<u64>,

    /// Drop unknown fields and operators instead of failing
    #[arg(long)]
    lenient: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Compile(args) => compile(&cli, args),
        Commands::Explain(args) => explain(&cli, args),
        Commands::Models => list_models(&cli),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "crmql=debug" } else { "crmql=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(cli: &Cli) -> Result<ModelRegistry> {
    let config = ConfigFile::load_or_default(cli.models.as_deref())?;
    let (_, registry) = config.into_parts()?;
    Ok(registry)
}

impl QueryArgs {
    fn policy(&self) -> UnknownFieldPolicy {
        if self.lenient {
            UnknownFieldPolicy::Ignore
        } else {
            UnknownFieldPolicy::Reject
        }
    }

    fn parsed_filter(&self) -> Result<Option<Filter>> {
        let Some(text) = &self.filter else {
            return Ok(None);
        };
        let doc: serde_json::Value =
            serde_json::from_str(text).context("--where is not valid JSON")?;
        Ok(Some(Filter::from_json_with(&doc, self.policy())?))
    }
}

fn build_select(cli: &Cli, args: &QueryArgs) -> Result<SelectBuilder> {
    let registry = load_registry(cli)?;
    let model = registry
        .get(&args.model)
        .ok_or_else(|| anyhow!("model '{}' is not declared", args.model))?;

    let mut builder = SelectBuilder::new(model).unknown_fields(args.policy());
    if !args.select.is_empty() {
        builder = builder.select_fields(args.select.iter().map(|s| s.trim()));
    }
    if let Some(filter) = args.parsed_filter()? {
        builder = builder.filter(filter);
    }
    if !args.order.is_empty() {
        let pairs = args.order.iter().map(|o| match o.split_once(':') {
            Some((key, dir)) => (key.trim(), dir.trim()),
            None => (o.trim(), "asc"),
        });
        builder = builder.order_by(order_pairs_to_list(pairs));
    }
    if let Some(n) = args.limit {
        builder = builder.limit(n);
    }
    if let Some(n) = args.offset {
        builder = builder.offset(n);
    }
    Ok(builder)
}

fn compile(cli: &Cli, args: &QueryArgs) -> Result<()> {
    let ast = build_select(cli, args)?.build()?;
    println!("{}", ast.to_query()?);
    Ok(())
}

fn explain(cli: &Cli, args: &QueryArgs) -> Result<()> {
    let builder = build_select(cli, args)?;
    let model = builder.model().clone();

    let filter = args.parsed_filter()?;
    let normalized = crmql::normalizer::normalize_with(&model, filter.as_ref(), args.policy())?;

    println!("{}", "Query Explanation".cyan().bold());
    println!();
    println!("  {} {} ({})", "Model:".dimmed(), model.name.white(), model.object.yellow());
    println!("  {} {}", "Provider:".dimmed(), model.provider.to_string().cyan());

    println!();
    println!("{}", "Condition Tree:".green().bold());
    match &normalized.ast {
        Some(tree) => {
            for line in tree.pretty().lines() {
                println!("  {}", line);
            }
        }
        None => println!("  {}", "(no filter)".dimmed()),
    }

    if !normalized.chunks.is_empty() {
        println!();
        println!("{}", "Chunks:".green().bold());
        for chunk in &normalized.chunks {
            println!(
                "  {} {} {} value(s) in {} batch(es)",
                chunk.field_path.white(),
                chunk.op.to_string().cyan(),
                chunk.values.len(),
                chunk.batches().len()
            );
        }
    }

    println!();
    println!("{}", "Generated Query:".green().bold());
    println!("  {}", builder.build()?.to_query()?.white());
    Ok(())
}

fn list_models(cli: &Cli) -> Result<()> {
    let registry = load_registry(cli)?;
    if registry.is_empty() {
        println!("{}", "(no models)".dimmed());
        return Ok(());
    }

    for model in registry.iter() {
        println!(
            "{} {} {}",
            model.name.cyan().bold(),
            format!("[{}]", model.provider).dimmed(),
            model.object.yellow()
        );
        for field in model.fields() {
            let schema = match model.schema.get(&field.key) {
                Some(s) => {
                    let optional = if s.required { "" } else { "?" };
                    format!("{:?}{}", s.ty, optional).to_lowercase()
                }
                None => String::new(),
            };
            println!("  {:20} {:30} {}", field.key.white(), field.path, schema.dimmed());
        }
        for rel in model.relations() {
            println!(
                "  {} {} -> {}.{}",
                "rel".dimmed(),
                rel.key.white(),
                rel.model.cyan(),
                rel.foreign_key
            );
        }
    }
    Ok(())
}
