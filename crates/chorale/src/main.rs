//! Loads a chorale project against the installed singers, reports how each track got bound, and
//! optionally writes the project back out.

use std::path::PathBuf;

use anyhow::Context;
use chorale_lib::{
    PhonemizerTable, Project, Registries, RendererTable, SingerCatalogue, ValidateOptions,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod disk;
mod report;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "chorale")]
#[command(about = "Resolve the singers, phonemizers and renderers of a project")]
#[command(version)]
struct Args {
    /// Config file. Defaults to ./chorale.toml if it exists
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Singer directory to scan, replacing the ones from the config. Can be repeated
    #[arg(short, long = "singers")]
    singers: Vec<PathBuf>,

    /// Project file (JSON)
    project: PathBuf,

    /// Write the project back out, to OUT if given
    #[arg(short, long, value_name = "OUT", num_args = 0..=1)]
    write: Option<Option<PathBuf>>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let singer_dirs = if args.singers.is_empty() {
        config.singer_dirs()
    } else {
        args.singers.clone()
    };
    let mut singers = SingerCatalogue::new();
    let banks = disk::rescan(&mut singers, &singer_dirs);
    let preloads: Vec<_> = if config.preload_singers {
        banks.iter().map(|bank| bank.load_in_background()).collect()
    } else {
        Vec::new()
    };

    let phonemizers = PhonemizerTable::new();
    let mut renderers = RendererTable::new();
    config.apply_default_renderers(&mut renderers);

    let text = std::fs::read_to_string(&args.project)
        .with_context(|| format!("failed to read {}", args.project.display()))?;
    let mut project = Project::from_json(&text)?;
    project.after_load(Registries::new(&singers, &phonemizers, &renderers));

    for preload in preloads {
        if let Err(err) = preload.wait() {
            tracing::warn!("{err:#}");
        }
    }
    project.validate(&ValidateOptions::default());

    println!("{} ({} tracks)", project.name, project.tracks.len());
    for line in report::describe(&project) {
        println!("{line}");
    }

    if let Some(out) = args.write {
        let out = out.unwrap_or(args.project);
        let json = project.save_json()?;
        std::fs::write(&out, json).with_context(|| format!("failed to write {}", out.display()))?;
        tracing::info!("saved {}", out.display());
    }

    Ok(())
}
