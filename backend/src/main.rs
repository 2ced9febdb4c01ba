//! colscript CLI - Rewrite CSV columns with a script
//!
//! # Main Commands
//!
//! ```bash
//! colscript run input.csv -c "first, last" -s merge.json   # Transform a CSV
//! colscript serve                                          # Start HTTP server
//! colscript script list                                    # Manage stored scripts
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! colscript parse input.csv         # Show how a CSV is read
//! colscript operations              # Show available script operations
//! colscript example-script          # Show an example script
//! ```

use clap::{Parser, Subcommand};
use colscript::api::logs::LOG_BROADCASTER;
use colscript::parser::format_delimiter;
use colscript::{
    example_script, parse_bytes_with_delimiter, parse_csv_file_auto, resolve_selection,
    transform_file, Config, DslScript, ScriptRegistry,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "colscript")]
#[command(about = "Rewrite selected CSV columns with a column script", long_about = None)]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a CSV file with a script
    Run {
        /// Input CSV file
        input: PathBuf,

        /// Columns to transform, or "<" / ">" / ">N<" to add columns
        #[arg(short, long)]
        columns: Option<String>,

        /// Script JSON file
        #[arg(short, long, conflicts_with = "script_id", required_unless_present = "script_id")]
        script: Option<PathBuf>,

        /// Stored script ID
        #[arg(long)]
        script_id: Option<String>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show available script operations
    Operations,

    /// Show example script
    ExampleScript,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: COLSCRIPT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage stored scripts
    Script {
        #[command(subcommand)]
        action: ScriptAction,
    },
}

#[derive(Subcommand)]
enum ScriptAction {
    /// List all stored scripts
    List,

    /// Import a script JSON file
    Import {
        /// Script JSON file to import
        file: PathBuf,
        /// Name for the script
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show details of a script
    Show {
        /// Script ID
        id: String,
    },

    /// Delete a script
    Delete {
        /// Script ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }
    let config = Config::from_env();

    let result = match cli.command {
        Commands::Run {
            input,
            columns,
            script,
            script_id,
            output,
            delimiter,
        } => cmd_run(
            &config,
            &input,
            columns.as_deref(),
            script.as_deref(),
            script_id.as_deref(),
            output.as_deref(),
            delimiter,
        ),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Operations => cmd_operations(),

        Commands::ExampleScript => cmd_example_script(),

        Commands::Serve { port } => cmd_serve(config, port).await,

        Commands::Script { action } => cmd_script(&config, action),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(
    config: &Config,
    input: &Path,
    columns: Option<&str>,
    script_path: Option<&Path>,
    script_id: Option<&str>,
    output: Option<&Path>,
    delimiter: Option<char>,
) -> CliResult {
    let mut registry = ScriptRegistry::with_dir(&config.registry_dir);

    let mut script = match (script_path, script_id) {
        (Some(path), _) => DslScript::load(path)?,
        (None, Some(id)) => registry.load_script(id)?,
        (None, None) => return Err("Provide --script or --script-id".into()),
    };
    let selection = resolve_selection(columns, &script)?;

    eprintln!("Processing: {}", input.display());
    let result = transform_file(input, &selection, &mut script, delimiter)?;

    if let Some(id) = script_id.filter(|_| script_path.is_none()) {
        registry.record_use(id)?;
    }

    write_output(&result.to_csv()?, output)?;
    Ok(())
}

fn cmd_parse(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> CliResult {
    eprintln!("Parsing CSV: {}", input.display());

    let result = match delimiter {
        Some(d) => parse_bytes_with_delimiter(&fs::read(input)?, d)?,
        None => parse_csv_file_auto(input)?,
    };

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers().join(", "));
    eprintln!("Parsed {} rows", result.row_count());

    let json = serde_json::to_string_pretty(&json!({
        "header": result.headers(),
        "rows": result.table.all_rows(),
    }))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_example_script() -> CliResult {
    println!("{}", example_script().to_json()?);
    Ok(())
}

fn cmd_operations() -> CliResult {
    println!("{}", colscript::operations_description());
    Ok(())
}

async fn cmd_serve(mut config: Config, port: Option<u16>) -> CliResult {
    if let Some(port) = port {
        config.port = port;
    }
    colscript::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}

fn cmd_script(config: &Config, action: ScriptAction) -> CliResult {
    let mut registry = ScriptRegistry::with_dir(&config.registry_dir);

    match action {
        ScriptAction::List => {
            let scripts = registry.list();
            if scripts.is_empty() {
                eprintln!("No scripts stored yet.");
                eprintln!("   Use 'colscript script import <file>' to add one.");
                return Ok(());
            }

            eprintln!("Stored scripts ({}):\n", scripts.len());
            for s in scripts {
                println!("  {} ({})", s.name, s.id);
                if !s.script.description.is_empty() {
                    println!("     {}", s.script.description);
                }
                println!("     Columns out: {}", s.script.headers.len());
                println!("     Uses: {}", s.use_count);
                if let Some(last) = s.last_used {
                    println!("     Last used: {}", last.to_rfc3339());
                }
                println!();
            }
        }

        ScriptAction::Import { file, name } => {
            eprintln!("Importing script from: {}", file.display());
            let id = registry.import(&file, name.as_deref())?;
            eprintln!("Script saved with ID: {}", id);
        }

        ScriptAction::Show { id } => {
            let s = registry.get(&id)?;
            println!("Script: {} ({})\n", s.name, s.id);
            if let Some(selection) = &s.script.selection {
                println!("Columns: {}", selection.to_text());
            }
            println!("Created: {}", s.created_at.to_rfc3339());
            println!("Uses: {}", s.use_count);
            println!("\n{}", s.script.to_json()?);
        }

        ScriptAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("Script deleted: {}", id);
        }
    }

    Ok(())
}
