//! docxify CLI - layout-preserving PDF to DOCX conversion

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docxify::convert::collect_pdfs;
use docxify::{
    BatchOptions, CleanupPreset, ConversionResult, ConvertOptions, Converter, LayoutConfig, PageSelection,
    PdfInfo,
};

#[derive(Parser)]
#[command(name = "docxify")]
#[command(version)]
#[command(about = "Convert PDF documents to DOCX with their column layout preserved", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output DOCX file (default: input with .docx extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[command(flatten)]
    convert: ConvertArgs,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one PDF to DOCX
    Convert {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output DOCX file (default: input with .docx extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print the conversion result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Convert several PDFs, or every PDF in a directory
    Batch {
        /// Input files or directories
        #[arg(value_name = "PATH", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (default: next to each source)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Search directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Keep going after a failed file
        #[arg(long)]
        continue_on_error: bool,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Flags shared by every converting command.
#[derive(Args, Clone)]
struct ConvertArgs {
    /// Page selection, 0-based (e.g., "0-5" end exclusive, "0,2,4")
    #[arg(long)]
    pages: Option<String>,

    /// Credential for the layout hint service
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Never request layout hints
    #[arg(long)]
    no_hints: bool,

    /// Skip fidelity validation
    #[arg(long)]
    no_validate: bool,

    /// Text cleanup preset
    #[arg(long, value_enum)]
    cleanup: Option<CleanupLevel>,

    /// JSON file with layout thresholds
    #[arg(long, value_name = "JSON")]
    layout_config: Option<PathBuf>,

    /// Analyze pages in parallel
    #[arg(long)]
    parallel: bool,

    /// Fail on page-level extraction problems
    #[arg(long)]
    strict: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CleanupLevel {
    /// Unicode normalization and invalid characters only
    Minimal,
    /// Adds ligatures, hyphenation and empty paragraphs
    Standard,
    /// Adds private-use characters and bullet unification
    Aggressive,
}

impl From<CleanupLevel> for CleanupPreset {
    fn from(level: CleanupLevel) -> Self {
        match level {
            CleanupLevel::Minimal => CleanupPreset::Minimal,
            CleanupLevel::Standard => CleanupPreset::Standard,
            CleanupLevel::Aggressive => CleanupPreset::Aggressive,
        }
    }
}

impl ConvertArgs {
    fn to_options(&self) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
        let mut options = ConvertOptions::new()
            .with_hints(!self.no_hints)
            .with_validation(!self.no_validate)
            .with_parallel(self.parallel);

        if let Some(pages) = &self.pages {
            options = options.with_pages(PageSelection::parse(pages)?);
        }
        if let Some(key) = &self.api_key {
            options = options.with_api_key(key);
        }
        if let Some(level) = self.cleanup {
            options.render = options.render.with_cleanup_preset(level.into());
        }
        if let Some(path) = &self.layout_config {
            options = options.with_layout(LayoutConfig::from_json_file(path)?);
        }
        if self.strict {
            options = options.strict();
        }
        Ok(options)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            json,
            convert,
        }) => cmd_convert(&input, output.as_deref(), &convert, json),
        Some(Commands::Batch {
            inputs,
            output,
            recursive,
            continue_on_error,
            convert,
        }) => cmd_batch(&inputs, output, recursive, continue_on_error, &convert),
        Some(Commands::Info { input, json }) => cmd_info(&input, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &cli.convert, false)
            } else {
                println!("{}", "Usage: docxify <FILE> [-o OUTPUT]".yellow());
                println!("       docxify --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    args: &ConvertArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let converter = Converter::new(args.to_options()?);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Converting {}...", input.display()));

    let result = converter.try_convert(input, output);
    pb.finish_and_clear();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn cmd_batch(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    recursive: bool,
    continue_on_error: bool,
    args: &ConvertArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(collect_pdfs(input, recursive)?);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        println!("{}", "No PDF files found".yellow());
        return Ok(());
    }

    let mut batch = BatchOptions::new()
        .recursive(recursive)
        .continue_on_error(continue_on_error);
    if let Some(dir) = output {
        batch = batch.with_output_dir(dir);
    }

    let converter = Converter::new(args.to_options()?);
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = converter.batch_convert_with(&files, &batch, |_, result| {
        let name = result
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !result.success {
            pb.println(format!(
                "{} {}: {}",
                "Failed".red(),
                name,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        pb.set_message(name);
        pb.inc(1);
    })?;
    pb.finish_with_message("Done!");

    println!();
    println!("{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Converted".bold(), report.succeeded().to_string().green());
    if report.failed() > 0 {
        println!("{}: {}", "Failed".bold(), report.failed().to_string().red());
    }
    if report.skipped > 0 {
        println!("{}: {}", "Not attempted".bold(), report.skipped);
    }

    if report.failed() > 0 && !continue_on_error {
        return Err("batch stopped after a failed conversion".into());
    }
    Ok(())
}

fn print_summary(result: &ConversionResult) {
    let stats = &result.stats;

    println!("{}", "Conversion Complete".green().bold());
    println!("{}", "─".repeat(40).dimmed());
    if let Some(output) = &result.output {
        println!("{}: {}", "Output".bold(), output.display());
    }
    println!("{}: {}", "Pages".bold(), result.pages_converted);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Column layouts".bold(), stats.layout_table_count);
    if stats.images_skipped > 0 {
        println!(
            "{}: {} ({} replaced by placeholder)",
            "Images".bold(),
            stats.image_count,
            stats.images_skipped.to_string().yellow()
        );
    } else {
        println!("{}: {}", "Images".bold(), stats.image_count);
    }
    if stats.hints_used > 0 {
        println!("{}: {}", "Hinted pages".bold(), stats.hints_used);
    }

    if let Some(report) = &result.fidelity {
        let score = format!("{:.1}%", report.score * 100.0);
        let score = if report.valid { score.green() } else { score.yellow() };
        println!();
        println!("{}", "Fidelity".cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
        println!("{}: {}", "Score".bold(), score);
        println!(
            "{}: {} / {}",
            "Words".bold(),
            report.output_word_count,
            report.source_word_count
        );
        for (issue, advice) in report.issues.iter().zip(&report.recommendations) {
            println!("  {} {} ({})", "!".yellow(), issue, advice.dimmed());
        }
        if !report.missing_words.is_empty() {
            println!("{}: {}", "Missing".bold(), report.missing_words.join(", ").dimmed());
        }
    }

    for warning in &result.warnings {
        println!("{} {}", "warning:".yellow(), warning);
    }
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let info = PdfInfo::from_path(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), info.version);
    println!("{}: {}", "Pages".bold(), info.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if info.encrypted { "Yes" } else { "No" }
    );

    let metadata = &info.metadata;
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for page in &info.pages {
        let text = if page.has_text {
            "text".normal()
        } else {
            "no text".yellow()
        };
        println!(
            "  {:>4}  {:.0} x {:.0} pt  rotate {}  {} images  {}",
            page.index, page.width, page.height, page.rotation, page.image_count, text
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docxify".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Layout-preserving PDF to DOCX converter");
    println!();
    println!("License: MIT");
}
