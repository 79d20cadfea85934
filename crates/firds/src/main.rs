use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use firds_core::config::{AppConfig, HttpSection, DEFAULT_CONFIG_PATH};
use firds_core::{
    create_csv, locate_archive, unzip_file, upload_file, HttpFetcher, Pipeline, RunOptions,
};
use firds_parser::{parse_index_entries, DEFAULT_FILE_TYPE};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "FIRDS delta file to CSV pipeline", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every stage: index, archive, extraction, CSV, upload
    Run(RunArgs),
    /// Download a single resource
    Fetch(FetchArgs),
    /// Show the archive referenced by an index document
    Index(IndexArgs),
    /// Extract a ZIP archive
    Unzip(UnzipArgs),
    /// Convert a DLTINS XML file to CSV
    Transform(TransformArgs),
    /// Upload a file to the configured bucket
    Upload(UploadArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Stop after writing the CSV file
    #[arg(long)]
    skip_upload: bool,
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[arg(long)]
    url: String,
    #[arg(long)]
    dir: PathBuf,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct IndexArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long, default_value = DEFAULT_FILE_TYPE)]
    file_type: String,
    /// List every entry instead of selecting one
    #[arg(long)]
    list: bool,
}

#[derive(Args, Debug)]
struct UnzipArgs {
    #[arg(long)]
    archive: PathBuf,
    #[arg(long)]
    dir: PathBuf,
}

#[derive(Args, Debug)]
struct TransformArgs {
    #[arg(long)]
    xml: PathBuf,
    #[arg(long)]
    dir: PathBuf,
}

#[derive(Args, Debug)]
struct UploadArgs {
    #[arg(long)]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(&cli.config, args).await,
        Command::Fetch(args) => handle_fetch(&cli.config, args).await,
        Command::Index(args) => handle_index(args),
        Command::Unzip(args) => handle_unzip(args),
        Command::Transform(args) => handle_transform(args),
        Command::Upload(args) => handle_upload(&cli.config, args).await,
    }
}

fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = AppConfig::load(path)
        .with_context(|| format!("failed to load configuration from '{}'", path.display()))?;
    config.apply_env_overrides();
    Ok(config)
}

async fn handle_run(config_path: &Path, args: RunArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::new(config).context("failed to configure pipeline")?;
    let report = pipeline
        .run(RunOptions {
            skip_upload: args.skip_upload,
        })
        .await
        .context("pipeline run failed")?;

    println!("Archive:  {}", report.reference.archive_url);
    println!("CSV:      {} ({} rows)", report.csv.path.display(), report.csv.records);
    match &report.upload {
        Some(receipt) => println!("Uploaded: s3://{}/{}", receipt.bucket, receipt.key),
        None => println!("Upload skipped."),
    }
    Ok(())
}

/// `[http]` settings for standalone fetches; defaults apply when no config file exists.
fn fetch_settings(config_path: &Path) -> Result<HttpSection> {
    if !config_path.exists() {
        return Ok(HttpSection::default());
    }
    Ok(load_config(config_path)?.http)
}

async fn handle_fetch(config_path: &Path, args: FetchArgs) -> Result<()> {
    let fetcher = HttpFetcher::new(&fetch_settings(config_path)?)?;
    let path = fetcher
        .download(&args.url, &args.dir, &args.name)
        .await
        .with_context(|| format!("failed to download '{}'", args.url))?;
    println!("{}", path.display());
    Ok(())
}

fn handle_index(args: IndexArgs) -> Result<()> {
    if args.list {
        let file = File::open(&args.file)
            .with_context(|| format!("failed to open index '{}'", args.file.display()))?;
        let entries = parse_index_entries(BufReader::new(file))
            .with_context(|| format!("failed to parse index '{}'", args.file.display()))?;
        if entries.is_empty() {
            println!("Index contains no entries.");
        }
        for entry in &entries {
            println!(
                "{}\t{}\t{}\t{}",
                entry.file_type.as_deref().unwrap_or("-"),
                entry
                    .publication_date
                    .map(|date| date.date_naive().to_string())
                    .unwrap_or_else(|| "-".to_string()),
                entry.file_name.as_deref().unwrap_or("-"),
                entry.download_link.as_deref().unwrap_or("-"),
            );
        }
        return Ok(());
    }

    let (name, url) = locate_archive(&args.file, &args.file_type)?.into_pair();
    println!("{name}\t{url}");
    Ok(())
}

fn handle_unzip(args: UnzipArgs) -> Result<()> {
    let extracted = unzip_file(&args.archive, &args.dir)
        .with_context(|| format!("failed to extract '{}'", args.archive.display()))?;
    for path in &extracted.files {
        println!("{}", path.display());
    }
    Ok(())
}

fn handle_transform(args: TransformArgs) -> Result<()> {
    let output = create_csv(&args.xml, &args.dir)
        .with_context(|| format!("failed to transform '{}'", args.xml.display()))?;
    info!(rows = output.records, "transform complete");
    println!("{}", output.path.display());
    Ok(())
}

async fn handle_upload(config_path: &Path, args: UploadArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let s3_config = config.s3_config()?;
    let receipt = upload_file(&args.file, &s3_config)
        .await
        .with_context(|| format!("failed to upload '{}'", args.file.display()))?;
    println!("s3://{}/{}", receipt.bucket, receipt.key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_uses_http_section_from_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("firds.toml");
        std::fs::write(
            &path,
            r#"
[sourcefile]
xml_source_url = "http://localhost/index.xml"

[download]
download_path = "downloads"

[csv]
csv_path = "csv"

[http]
connect_timeout_secs = 3
timeout_secs = 7
"#,
        )
        .expect("write config");

        let settings = fetch_settings(&path).expect("settings");
        assert_eq!(settings.connect_timeout_secs, 3);
        assert_eq!(settings.timeout_secs, 7);
    }

    #[test]
    fn fetch_falls_back_to_default_timeouts_without_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = fetch_settings(&dir.path().join("missing.toml")).expect("settings");
        assert_eq!(settings.timeout_secs, HttpSection::default().timeout_secs);
    }
}
