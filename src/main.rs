use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cache_buster::{Attachment, CacheBuster, CacheBusterConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable consulted when neither the flag nor the config sets a version.
const VERSION_ENV: &str = "CACHE_BUSTER_VERSION";

/// Append a release version marker to script and stylesheet references in HTML.
#[derive(Parser)]
#[command(name = "cache-buster", version, long_about = None)]
struct Cli {
    /// Input file. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Output file. Writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Version marker to append, overriding config and environment.
    #[arg(long)]
    version_marker: Option<String>,

    /// Content type the response is declared with.
    #[arg(long, default_value = cache_buster::filter::HTML_CONTENT_TYPE)]
    content_type: String,

    /// Request path used to decide whether the response is a page at all.
    #[arg(long)]
    path: Option<String>,

    /// Configuration file. Defaults to cache-buster.config.json in the working directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_buster=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CacheBusterConfig::load_from_path(path)?,
        None => {
            let cwd = env::current_dir().context("failed to resolve working directory")?;
            CacheBusterConfig::discover(&cwd)
        }
    };

    let env_version = env::var(VERSION_ENV).ok();
    let buster = CacheBuster::resolve(
        cli.version_marker.as_deref(),
        &config,
        env_version.as_deref(),
    )
    .context("invalid version marker")?;
    info!(version = %buster.version(), "cache buster ready");

    ensure_distinct_paths(cli.input.as_deref(), cli.output.as_deref())?;

    let mut reader = open_input(cli.input.as_ref())?;
    let sink = open_output(cli.output.as_ref())?;

    let attachment = match &cli.path {
        Some(path) => buster.attach(path, sink),
        None => Attachment::Filtered(buster.filter(sink)),
    };

    match attachment {
        Attachment::Filtered(mut filter) => {
            io::copy(&mut reader, &mut filter).context("failed to read input")?;
            filter
                .finalize(&cli.content_type)
                .context("failed to write output")?;
        }
        Attachment::Bypass(mut sink) => {
            io::copy(&mut reader, &mut sink).context("failed to copy input")?;
            sink.flush().context("failed to write output")?;
        }
    }

    Ok(())
}

/// Refuse to write the output over the input, which would truncate it before it is read.
fn ensure_distinct_paths(input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let (Some(input), Some(output)) = (input, output) else {
        return Ok(());
    };

    let same = input == output
        || match (input.canonicalize(), output.canonicalize()) {
            (Ok(input), Ok(output)) => input == output,
            _ => false,
        };
    if same {
        bail!("refusing to overwrite input {} in place", input.display());
    }
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn allows_streams_and_distinct_files() {
        assert!(ensure_distinct_paths(None, None).is_ok());
        assert!(ensure_distinct_paths(Some(Path::new("in.html")), None).is_ok());
        assert!(ensure_distinct_paths(None, Some(Path::new("out.html"))).is_ok());
        assert!(
            ensure_distinct_paths(Some(Path::new("in.html")), Some(Path::new("out.html"))).is_ok()
        );
    }

    #[test]
    fn refuses_identical_paths() {
        let path = Path::new("page.html");
        let err = ensure_distinct_paths(Some(path), Some(path)).unwrap_err();
        assert!(err.to_string().contains("page.html"));
    }

    #[test]
    fn refuses_different_spellings_of_the_same_file() {
        let temp = tempdir().expect("failed to create temp dir");
        let file = temp.path().join("page.html");
        fs::write(&file, "<script src=\"a.js\"></script>").unwrap();
        let respelled = temp.path().join(".").join("page.html");

        assert!(ensure_distinct_paths(Some(file.as_path()), Some(respelled.as_path())).is_err());
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "<script src=\"a.js\"></script>"
        );
    }
}
