//! cpdl-ingest CLI - Import choral catalogue pages
//!
//! # Main Commands
//!
//! ```bash
//! cpdl-ingest serve                  # Start HTTP server (port 3000)
//! cpdl-ingest import page.json       # Import a saved parse envelope
//! cpdl-ingest fetch 3788             # Fetch a page from the wiki and import it
//! cpdl-ingest search "Gesualdo"      # Find page ids
//! cpdl-ingest cache list             # Inspect the URL cache
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! cpdl-ingest partition page.json    # Show edition groups of a page
//! cpdl-ingest validate result.json   # Validate an import result against the schema
//! ```

use clap::{Args, Parser, Subcommand};
use cpdl_ingest::{
    extract_page, import_json, validate_import_json, write_files_csv, CachingResolver,
    ImportOptions, ImportResult, MediaWikiClient, PageDocument, Settings, UrlCache,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cpdl-ingest")]
#[command(about = "Import choral catalogue pages into normalized records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a page from a saved `action=parse` envelope
    Import {
        /// Input JSON envelope
        input: PathBuf,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Fetch a page from the wiki and import it
    Fetch {
        /// Page id
        page_id: u64,

        /// Print the raw envelope instead of importing it
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Search the wiki for pages
    Search {
        /// Search terms
        terms: Vec<String>,
    },

    /// Show how the manifest of a page splits into editions
    Partition {
        /// Input JSON envelope
        input: PathBuf,

        /// Leading manifest entries to skip
        #[arg(long, default_value = "2")]
        furniture: usize,

        /// Extension of the file opening each edition
        #[arg(long, default_value = "pdf")]
        primary_ext: String,
    },

    /// Validate an import result JSON file against the schema
    Validate {
        /// Input JSON file
        input: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage the resolved URL cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// Output file for the result JSON (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the file table as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Do not resolve URLs
    #[arg(long)]
    offline: bool,

    /// Do not use the URL cache
    #[arg(long)]
    no_cache: bool,

    /// Skip schema validation
    #[arg(long)]
    no_validate: bool,

    /// Leading manifest entries to skip
    #[arg(long, default_value = "2")]
    furniture: usize,

    /// Extension of the file opening each edition
    #[arg(long, default_value = "pdf")]
    primary_ext: String,
}

impl ImportArgs {
    fn options(&self) -> ImportOptions {
        ImportOptions {
            furniture_count: self.furniture,
            primary_extension: self.primary_ext.clone(),
            skip_validation: self.no_validate,
            offline: self.offline,
            ..ImportOptions::default()
        }
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached URLs
    List,

    /// Remove every cached URL
    Clear,
}

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { input, import } => cmd_import(&input, &import, &settings).await,

        Commands::Fetch {
            page_id,
            raw,
            import,
        } => cmd_fetch(page_id, raw, &import, &settings).await,

        Commands::Search { terms } => cmd_search(&terms.join(" "), &settings).await,

        Commands::Partition {
            input,
            furniture,
            primary_ext,
        } => cmd_partition(&input, furniture, &primary_ext),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Serve { port } => cmd_serve(port, settings).await,

        Commands::Cache { action } => cmd_cache(action, &settings),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_import(
    input: &Path,
    args: &ImportArgs,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Importing: {}", input.display());
    let envelope = fs::read_to_string(input)?;
    run_import(&envelope, args, settings).await
}

async fn cmd_fetch(
    page_id: u64,
    raw: bool,
    args: &ImportArgs,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = MediaWikiClient::new(settings)?;
    let envelope = client.fetch_page(page_id).await?;
    if raw {
        return write_output(&envelope, args.output.as_deref());
    }
    run_import(&envelope, args, settings).await
}

async fn run_import(
    envelope: &str,
    args: &ImportArgs,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.options();
    let client = MediaWikiClient::new(settings)?;

    let result = if args.no_cache {
        import_json(envelope, &client, &options).await?
    } else {
        let resolver = CachingResolver::new(client, UrlCache::with_dir(&settings.cache_dir))
            .with_namespace(options.namespace.clone());
        import_json(envelope, &resolver, &options).await?
    };

    print_summary(&result);

    if let Some(csv_path) = &args.csv {
        write_files_csv(&result, fs::File::create(csv_path)?)?;
        eprintln!("💾 File table written to: {}", csv_path.display());
    }

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, args.output.as_deref())?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_summary(result: &ImportResult) {
    let work = &result.work;
    eprintln!("\n🎼 {}", work.title);
    if let Some(composer) = &work.composer {
        eprintln!("   Composer: {}", composer);
    }
    if let Some(voices) = work.original_num_voices {
        eprintln!(
            "   Voices: {} {}",
            voices,
            work.original_voicing.as_deref().unwrap_or("")
        );
    }

    if result.is_empty() {
        eprintln!("   No sheet music attached yet");
        return;
    }

    for edition in &result.editions {
        eprintln!(
            "   Edition {} (CPDL #{}): {} files",
            edition.index,
            edition.metadata.identifier.as_deref().unwrap_or("?"),
            1 + edition.files.len()
        );
    }
    if result.resolution_gaps > 0 {
        eprintln!("   ⚠️  {} files without URL", result.resolution_gaps);
    }
    for warning in &result.warnings {
        eprintln!("   ⚠️  {}", warning);
    }
}

async fn cmd_search(terms: &str, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if terms.trim().is_empty() {
        return Err("missing search terms".into());
    }
    eprintln!("🔎 Searching: {}", terms);

    let client = MediaWikiClient::new(settings)?;
    let hits = client.search(terms).await?;

    eprintln!("   {} pages found\n", hits.len());
    for hit in hits {
        println!("{}\t{}", hit.page_id, hit.title);
    }
    Ok(())
}

fn cmd_partition(
    input: &Path,
    furniture: usize,
    primary_ext: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = PageDocument::from_file(input)?;
    let options = ImportOptions {
        furniture_count: furniture,
        primary_extension: primary_ext.to_string(),
        ..ImportOptions::default()
    };
    let page = extract_page(&doc, &options)?;

    eprintln!("📦 {} media files", page.media_files.len());
    for group in &page.groups {
        let metadata = page.lists.metadata_at(group.index);
        println!(
            "{}  {}  (CPDL #{})",
            group.index,
            group.primary.name,
            metadata.identifier.as_deref().unwrap_or("?")
        );
        for entry in &group.secondary {
            println!("      {}", entry.name);
        }
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;

    match validate_import_json(&value) {
        Ok(()) => {
            eprintln!("✅ Valid import result");
            Ok(())
        }
        Err(errors) => {
            for err in errors.iter().take(10) {
                eprintln!("   - {}", err);
            }
            Err(format!("{} schema violations", errors.len()).into())
        }
    }
}

async fn cmd_serve(port: u16, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    cpdl_ingest::server::start_server(port, settings, ImportOptions::default()).await?;
    Ok(())
}

fn cmd_cache(action: CacheAction, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = UrlCache::with_dir(&settings.cache_dir);

    match action {
        CacheAction::List => {
            if cache.is_empty() {
                eprintln!("📋 No cached URLs in {}", cache.path().display());
                return Ok(());
            }
            eprintln!("📋 Cached URLs ({}):\n", cache.len());
            for entry in cache.list() {
                println!("{}\t{}\t{}", entry.key, entry.url, entry.resolved_at);
            }
        }

        CacheAction::Clear => {
            let removed = cache.clear()?;
            eprintln!("🗑️  Removed {} cached URLs", removed);
        }
    }

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
