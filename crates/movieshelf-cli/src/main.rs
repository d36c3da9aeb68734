use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use movieshelf_core::{fields, FilterInput, FindOptions, QueryParams, SortOrder};
use movieshelf_storage::{snapshot, Catalog};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "movieshelf")]
#[command(about = "Movieshelf catalog developer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the store filter a listing request compiles to
    Explain {
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// List movies from a snapshot file
    List {
        #[arg(long)]
        data: PathBuf,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Print the facet summary of a snapshot file
    Facets {
        #[arg(long)]
        data: PathBuf,
    },
    Count {
        #[arg(long)]
        data: PathBuf,
    },
}

fn parse_params(raw: &[String]) -> Result<QueryParams> {
    raw.iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("expected KEY=VALUE, got {kv:?}"))
        })
        .collect()
}

fn open_catalog(data: &Path) -> Result<Catalog> {
    let store = snapshot::load_store(data)
        .with_context(|| format!("reading snapshot {}", data.display()))?;
    Ok(Catalog::new(Arc::new(store)))
}

fn print_json(v: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Explain { params } => {
            let input = FilterInput::from_params(&parse_params(&params)?)?;
            let opts = FindOptions::sorted_by(fields::RANKING, SortOrder::Asc);
            print_json(&serde_json::json!({
                "filter": input.to_expr().to_mongo(),
                "sort": opts.sort_document(),
            }))?;
        }
        Cmd::List { data, params } => {
            let catalog = open_catalog(&data)?;
            let movies = catalog.list_movies(&parse_params(&params)?).await?;
            print_json(&movies)?;
        }
        Cmd::Facets { data } => {
            print_json(&open_catalog(&data)?.facets().await?)?;
        }
        Cmd::Count { data } => {
            println!("{}", open_catalog(&data)?.count().await?);
        }
    }
    Ok(())
}
