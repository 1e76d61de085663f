#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tagview::app::TagViewApp;
use tagview::repo::FileRepo;

#[derive(Parser, Debug)]
#[command(name = "tagview")]
#[command(about = "Tag-based file repository browser")]
struct Args {
    #[arg(default_value = "")]
    query: String,
    #[arg(long)]
    root: Option<PathBuf>,
    #[arg(long, default_value_t = 1000)]
    limit: usize,
    #[arg(long, default_value_t = false)]
    cli: bool,
}

fn run_cli(args: &Args) -> Result<()> {
    let root = args
        .root
        .clone()
        .context("--cli requires --root <path>")?;
    let repo = FileRepo::open(&root)
        .with_context(|| format!("cannot open repository at {}", root.display()))?;
    let ids = repo
        .query_ids(args.query.trim())
        .context("query failed")?;
    for id in ids.into_iter().take(args.limit.min(1000)) {
        let details = repo.item_details(id)?;
        if details.tags.is_empty() {
            println!("{}", details.path.display());
        } else {
            let tags: Vec<&str> = details.tags.iter().map(String::as_str).collect();
            println!("{}\t#{}", details.path.display(), tags.join(" #"));
        }
    }
    Ok(())
}

fn run_gui(args: &Args) -> Result<()> {
    let root = args
        .root
        .as_ref()
        .map(|r| r.canonicalize().unwrap_or_else(|_| r.clone()));
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport =
        eframe::egui::ViewportBuilder::default().with_inner_size(eframe::egui::vec2(1400.0, 900.0));
    let query = args.query.clone();

    eframe::run_native(
        "TagView",
        native_options,
        Box::new(move |_cc| Ok(Box::new(TagViewApp::new(root, query)))),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.cli {
        run_cli(&args)
    } else {
        run_gui(&args)
    }
}
