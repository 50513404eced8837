//! giwire - Convert and inspect .gia asset files
//!
//! This tool converts `.gia` files to pretty-printed JSON and JSON back to
//! `.gia`, and prints the envelope header and top-level field layout of any
//! file in the family.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use giwire_core::wire::consume_field;
use giwire_core::{CodecConfig, Envelope, FileKind, GiaDocument, ObjectCodec, WireTag};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Convert and inspect .gia asset files
#[derive(Parser, Debug)]
#[command(name = "giwire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert .gia files to JSON and JSON files back to .gia
    Convert(ConvertArgs),
    /// Print the envelope header and top-level fields of a file
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    input: InputMode,

    /// Output directory (defaults to the directory of each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,

    /// Dry run - don't write files, just show what would be converted
    #[arg(long)]
    dry_run: bool,

    /// Fail on field ids the schema does not know instead of dropping them
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single .gia or .json file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory to convert recursively
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Path to the file to inspect
    #[arg(short, long)]
    file: PathBuf,
}

/// Direction of a conversion, picked from the input extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    GiaToJson,
    JsonToGia,
}

impl Conversion {
    fn for_path(path: &Path) -> Option<Self> {
        if FileKind::from_path(path) == Some(FileKind::Gia) {
            return Some(Conversion::GiaToJson);
        }
        let ext = path.extension()?.to_str()?;
        ext.eq_ignore_ascii_case("json").then_some(Conversion::JsonToGia)
    }

    fn output_extension(self) -> &'static str {
        match self {
            Conversion::GiaToJson => "json",
            Conversion::JsonToGia => FileKind::Gia.extension(),
        }
    }
}

#[derive(Debug, Default)]
struct ConversionStats {
    converted: usize,
    skipped: usize,
    failed: usize,
}

impl ConversionStats {
    fn print_summary(&self) {
        info!(
            "Summary: {} converted, {} skipped, {} failed",
            self.converted, self.skipped, self.failed
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Inspect(args) => {
            print!("{}", inspect_file(&args.file)?);
            Ok(())
        }
    }
}

fn run_convert(args: &ConvertArgs) -> Result<()> {
    let codec = ObjectCodec::with_config(CodecConfig::new().with_reject_unknown_fields(args.strict));

    let stats = if let Some(ref file) = args.input.file {
        process_single_file(args, &codec, file)?
    } else if let Some(ref directory) = args.input.directory {
        process_directory(args, &codec, directory)?
    } else {
        bail!("Either --file or --directory must be specified")
    };

    if !args.dry_run {
        stats.print_summary();
    }
    Ok(())
}

/// Convert a single file
fn process_single_file(args: &ConvertArgs, codec: &ObjectCodec, file: &Path) -> Result<ConversionStats> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }
    let Some(conversion) = Conversion::for_path(file) else {
        bail!("Unsupported input (expected .gia or .json): {}", file.display());
    };

    let mut stats = ConversionStats::default();
    convert_file(args, codec, file, conversion, args.output.as_deref())?;
    stats.converted += 1;
    Ok(stats)
}

/// Convert every supported file under a directory
fn process_directory(args: &ConvertArgs, codec: &ObjectCodec, directory: &Path) -> Result<ConversionStats> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    // Collect every input up front so files written by this run are never
    // picked up as inputs of the same run
    let mut jobs = Vec::new();
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || is_hidden(path) {
            continue;
        }

        let Some(conversion) = Conversion::for_path(path) else {
            trace!("Skipping unsupported file: {}", path.display());
            continue;
        };

        // Mirror the input tree below --output
        let output_dir = args.output.as_ref().map(|root| {
            match path.strip_prefix(directory).ok().and_then(Path::parent) {
                Some(relative) => root.join(relative),
                None => root.clone(),
            }
        });

        let target = output_path(path, output_dir.as_deref(), conversion)?;
        jobs.push(Job {
            input: path.to_path_buf(),
            conversion,
            output_dir,
            target,
        });
    }

    let derived = derived_inputs(&jobs);
    let sources: HashSet<&Path> = jobs
        .iter()
        .map(|job| job.input.as_path())
        .filter(|input| !derived.contains(input))
        .collect();

    let mut stats = ConversionStats::default();

    for job in &jobs {
        let path = job.input.as_path();

        if derived.contains(path) {
            debug!("Skipping {}: produced from a .gia in this run", path.display());
            stats.skipped += 1;
            continue;
        }
        if sources.contains(job.target.as_path()) {
            warn!(
                "Skipping {}: {} is itself an input",
                path.display(),
                job.target.display()
            );
            stats.skipped += 1;
            continue;
        }
        if job.target.exists() && !args.force {
            warn!(
                "Skipping {}: {} already exists (use --force to overwrite)",
                path.display(),
                job.target.display()
            );
            stats.skipped += 1;
            continue;
        }

        debug!("Converting: {}", path.display());
        match convert_file(args, codec, path, job.conversion, job.output_dir.as_deref()) {
            Ok(()) => stats.converted += 1,
            Err(e) if is_malformed_input(&e) => {
                // Log error but continue with other files
                warn!("Error converting {}: {:#}", path.display(), e);
                stats.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}

/// One planned conversion in directory mode
#[derive(Debug)]
struct Job {
    input: PathBuf,
    conversion: Conversion,
    output_dir: Option<PathBuf>,
    target: PathBuf,
}

/// JSON inputs that a `.gia` input of the same run writes to.
///
/// The `.gia` is the source of truth: converting its JSON back would
/// re-encode it through the schema and drop fields the schema does not model.
fn derived_inputs(jobs: &[Job]) -> HashSet<&Path> {
    let inputs: HashSet<&Path> = jobs.iter().map(|job| job.input.as_path()).collect();
    jobs.iter()
        .filter(|job| job.conversion == Conversion::GiaToJson)
        .filter_map(|job| inputs.get(job.target.as_path()).copied())
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// True when the failure comes from the input's bytes rather than the
/// environment
fn is_malformed_input(err: &anyhow::Error) -> bool {
    // The .gia schema is fixed, so a schema mismatch can only come from the file
    err.chain().any(|cause| {
        cause.downcast_ref::<giwire_core::Error>().is_some_and(|e| {
            e.is_malformed_input() || matches!(e, giwire_core::Error::SchemaMismatch(_))
        }) || cause.is::<serde_json::Error>()
    })
}

/// Where the converted form of `input` goes
fn output_path(input: &Path, output_dir: Option<&Path>, conversion: Conversion) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .with_context(|| format!("Input path has no file name: {}", input.display()))?;
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let mut name = stem.to_os_string();
    name.push(".");
    name.push(conversion.output_extension());
    Ok(dir.join(name))
}

/// Convert one file and write the result next to it or under `output_dir`
fn convert_file(
    args: &ConvertArgs,
    codec: &ObjectCodec,
    input: &Path,
    conversion: Conversion,
    output_dir: Option<&Path>,
) -> Result<()> {
    trace!("Reading {}", input.display());
    let data = fs::read(input).with_context(|| format!("Failed to read input file: {}", input.display()))?;
    trace!("Read {} bytes from {}", data.len(), input.display());

    let bytes = match conversion {
        Conversion::GiaToJson => {
            let document = GiaDocument::from_bytes_with(&data, codec)
                .with_context(|| format!("Failed to decode {}", input.display()))?;
            let mut json = serde_json::to_vec_pretty(&document)
                .with_context(|| format!("Failed to serialize {}", input.display()))?;
            json.push(b'\n');
            json
        }
        Conversion::JsonToGia => {
            let document: GiaDocument = serde_json::from_slice(&data)
                .with_context(|| format!("Failed to parse JSON: {}", input.display()))?;
            document
                .to_bytes()
                .with_context(|| format!("Failed to encode {}", input.display()))?
        }
    };

    let target = output_path(input, output_dir, conversion)?;
    if args.dry_run {
        println!("Would write: {} ({} bytes)", target.display(), bytes.len());
        return Ok(());
    }

    write_output(&target, &bytes, args.force)?;
    println!("Wrote {}", target.display());
    Ok(())
}

/// Write a file atomically: a temporary file in the target directory is
/// persisted over the final name once fully written
fn write_output(output_path: &Path, bytes: &[u8], force: bool) -> Result<()> {
    let parent = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Create parent directories
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    // Check if file exists
    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    let mut file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {}", parent.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;
    file.persist(output_path)
        .with_context(|| format!("Failed to move file into place: {}", output_path.display()))?;

    Ok(())
}

/// Compute a short hash of the content (first 8 chars of blake3)
fn content_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hash.to_hex()[..8].to_string()
}

/// One top-level field of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSummary {
    offset: usize,
    tag: WireTag,
    len: usize,
}

fn top_level_fields(envelope: &Envelope<'_>) -> Result<Vec<FieldSummary>> {
    let mut reader = envelope.reader()?;
    let mut fields = Vec::new();
    while !reader.is_empty() {
        let offset = reader.position();
        let (tag, len) = consume_field(&mut reader)
            .with_context(|| format!("Malformed field at offset {}", offset))?;
        trace!("Field {} at offset {} spans {} bytes", tag, offset, len);
        fields.push(FieldSummary { offset, tag, len });
    }
    Ok(fields)
}

/// Render the header and field layout of a file
fn inspect_file(path: &Path) -> Result<String> {
    let data = fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let envelope = Envelope::parse(&data).with_context(|| format!("Invalid file: {}", path.display()))?;
    let header = envelope.header();

    let kind = match FileKind::try_from(header.type_code) {
        Ok(kind) => kind.to_string(),
        Err(_) => "unknown".to_string(),
    };

    let mut out = String::new();
    writeln!(out, "File:       {}", path.display())?;
    writeln!(out, "Kind:       {} (type {})", kind, header.type_code)?;
    writeln!(out, "Version:    {}", header.version)?;
    writeln!(out, "Total size: {}", header.total_size)?;
    writeln!(
        out,
        "Payload:    {} bytes, blake3 {}",
        header.content_length,
        content_hash(envelope.payload())
    )?;

    let fields = top_level_fields(&envelope)?;
    writeln!(out, "Fields:     {}", fields.len())?;
    for field in &fields {
        writeln!(
            out,
            "  {:>8}  #{:<6} {:<16} {} bytes",
            field.offset, field.tag.id, field.tag.wire_type, field.len
        )?;
    }
    Ok(out)
}
