use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use credscan::config::{ScanLimits, DEFAULT_KEY_FIELD, DEFAULT_MAX_ARTIFACT_LEN};
use credscan::crypto::aead::SealedSecret;
use credscan::crypto::token::extract_key_token;
use credscan::crypto::unwrap::KEY_TOKEN_MARKER;
use credscan::pipeline::read_artifact;
use credscan::storage::header::StoreHeader;
use credscan::{CredScanError, CredentialTuple, DecryptFailure, ScanStats, Scanner};

const EXIT_OK: i32 = 0;
const EXIT_TRUNCATED: i32 = 10;
const EXIT_FATAL_ERROR: i32 = 20;

/// Site and account values are cut to this many bytes for display.
const DISPLAY_LIMIT: usize = 100;

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormatArg {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "credscan-inspect",
    about = "List credential rows of a store without decrypting them"
)]
struct Cli {
    /// Path to the store database file
    db_path: PathBuf,

    /// Key artifact to check for a well-formed key token (never unwrapped)
    #[arg(long, value_name = "PATH")]
    key_artifact: Option<PathBuf>,

    /// Field holding the key token inside the artifact
    #[arg(long, default_value = DEFAULT_KEY_FIELD)]
    key_field: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormatArg,

    /// Maximum number of pages visited
    #[arg(long)]
    page_limit: Option<u32>,

    /// Maximum number of cells visited per leaf page
    #[arg(long)]
    cell_limit: Option<u16>,

    /// Maximum number of columns per record header
    #[arg(long)]
    column_limit: Option<usize>,

    /// Cells pointing this close to the page end are skipped
    #[arg(long)]
    safety_margin: Option<usize>,
}

impl Cli {
    fn limits(&self) -> ScanLimits {
        let defaults = ScanLimits::default();
        ScanLimits {
            page_limit: self.page_limit.unwrap_or(defaults.page_limit),
            cell_limit: self.cell_limit.unwrap_or(defaults.cell_limit),
            column_limit: self.column_limit.unwrap_or(defaults.column_limit),
            safety_margin: self.safety_margin.unwrap_or(defaults.safety_margin),
        }
    }
}

/// Shape of a key token, for display only.
struct TokenShape {
    decoded_len: usize,
    marker_ok: bool,
}

fn inspect_token(cli: &Cli) -> Option<Result<TokenShape, String>> {
    let path = cli.key_artifact.as_ref()?;
    let shape = read_artifact(path, DEFAULT_MAX_ARTIFACT_LEN)
        .and_then(|bytes| extract_key_token(&bytes, &cli.key_field))
        .map(|token| TokenShape {
            decoded_len: token.len(),
            marker_ok: token.starts_with(KEY_TOKEN_MARKER),
        })
        .map_err(|e| e.to_string());
    Some(shape)
}

fn display(bytes: &[u8]) -> String {
    let cut = &bytes[..bytes.len().min(DISPLAY_LIMIT)];
    String::from_utf8_lossy(cut).into_owned()
}

fn secret_summary(tuple: &CredentialTuple) -> (&'static str, Option<usize>) {
    match SealedSecret::split(&tuple.secret) {
        Ok(sealed) => ("sealed", Some(sealed.ciphertext.len())),
        Err(CredScanError::Decrypt(DecryptFailure::Truncated)) => ("truncated", None),
        Err(_) => ("unrecognized", None),
    }
}

fn header_json(header: &StoreHeader) -> Value {
    json!({
        "page_size": header.page_size,
        "page_count": header.page_count,
        "write_version": header.write_version,
        "read_version": header.read_version,
        "reserved_per_page": header.reserved_per_page,
        "change_counter": header.change_counter,
        "text_encoding": header.text_encoding,
        "user_version": header.user_version,
        "engine_version": header.engine_version,
    })
}

fn stats_json(stats: &ScanStats) -> Value {
    json!({
        "pages_visited": stats.pages_visited,
        "leaf_pages": stats.leaf_pages,
        "pages_skipped": stats.pages_skipped,
        "cells_examined": stats.cells_examined,
        "cells_out_of_bounds": stats.cells_out_of_bounds,
        "cells_malformed": stats.cells_malformed,
        "records_over_column_limit": stats.records_over_column_limit,
        "tuples_emitted": stats.tuples_emitted,
        "page_limit_hit": stats.page_limit_hit,
        "cell_limit_hit": stats.cell_limit_hit,
        "stopped_at_eof": stats.stopped_at_eof,
    })
}

fn tuple_json(tuple: &CredentialTuple) -> Value {
    let (state, ciphertext_len) = secret_summary(tuple);
    json!({
        "page": tuple.location.page,
        "cell": tuple.location.cell,
        "site": display(&tuple.site),
        "account": tuple.account.as_deref().map(display),
        "secret_len": tuple.secret.len(),
        "secret_state": state,
        "ciphertext_len": ciphertext_len,
    })
}

fn print_text(
    header: &StoreHeader,
    tuples: &[CredentialTuple],
    stats: &ScanStats,
    token: Option<&Result<TokenShape, String>>,
) {
    println!(
        "Store: page_size={} page_count={} engine_version={}",
        header.page_size, header.page_count, header.engine_version
    );

    match token {
        Some(Ok(shape)) => println!(
            "Key token: {} bytes, marker {}",
            shape.decoded_len,
            if shape.marker_ok { "ok" } else { "missing" }
        ),
        Some(Err(msg)) => println!("Key token: unavailable ({})", msg),
        None => {}
    }

    for tuple in tuples {
        let (state, _) = secret_summary(tuple);
        println!();
        println!("[{}]", tuple.location);
        println!("URL: {}", display(&tuple.site));
        if let Some(account) = &tuple.account {
            println!("Username: {}", display(account));
        }
        println!("Secret: {} bytes ({})", tuple.secret.len(), state);
    }

    println!();
    println!(
        "Found {} credential rows ({} pages, {} leaf pages, {} cells)",
        stats.tuples_emitted, stats.pages_visited, stats.leaf_pages, stats.cells_examined
    );
    if stats.truncated() {
        println!("WARNING: scan truncated by limits");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("credscan=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut scanner = match Scanner::open_path(&cli.db_path, cli.limits()) {
        Ok(scanner) => scanner,
        Err(e) => {
            match cli.format {
                OutputFormatArg::Text => eprintln!("ERROR: {}", e),
                OutputFormatArg::Json => println!(
                    "{}",
                    json!({
                        "db_path": cli.db_path.display().to_string(),
                        "status": "fatal",
                        "fatal_error": e.to_string(),
                        "exit_code": EXIT_FATAL_ERROR,
                    })
                ),
            }
            process::exit(EXIT_FATAL_ERROR);
        }
    };

    let header = *scanner.header();
    let tuples: Vec<CredentialTuple> = scanner.by_ref().collect();
    let stats = scanner.stats();
    let token = inspect_token(&cli);
    let exit_code = if stats.truncated() {
        EXIT_TRUNCATED
    } else {
        EXIT_OK
    };

    match cli.format {
        OutputFormatArg::Text => print_text(&header, &tuples, &stats, token.as_ref()),
        OutputFormatArg::Json => {
            let token_json = match &token {
                Some(Ok(shape)) => json!({
                    "decoded_len": shape.decoded_len,
                    "marker_ok": shape.marker_ok,
                }),
                Some(Err(msg)) => json!({ "error": msg }),
                None => Value::Null,
            };
            println!(
                "{}",
                json!({
                    "db_path": cli.db_path.display().to_string(),
                    "status": if stats.truncated() { "warning" } else { "ok" },
                    "header": header_json(&header),
                    "key_token": token_json,
                    "credentials": tuples.iter().map(tuple_json).collect::<Vec<_>>(),
                    "stats": stats_json(&stats),
                    "exit_code": exit_code,
                })
            );
        }
    }

    process::exit(exit_code);
}
