//! tierconf CLI - Command-line interface for layered configuration
//!
//! Usage:
//!   tierconf load --config app.yaml --overrides prod/config-override.json
//!   tierconf validate --config app.json --schema schema.json
//!   tierconf convert --config app.toml --output app.yaml --format yaml

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tierconf_core::{
    convert_configuration, export_configuration, format, import_configuration,
    test_configuration, Context, Format, ImportOptions, Schema, Value,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// tierconf - Layered configuration with overrides and schema checks
#[derive(Parser, Debug)]
#[command(name = "tierconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Source selection shared by the loading subcommands
#[derive(Args, Debug)]
struct Source {
    /// Base configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Override files; the directory of each is searched for config-override.json
    #[arg(long, value_delimiter = ',')]
    overrides: Vec<PathBuf>,

    /// Expand $VAR, ${VAR} and %VAR% references in string values
    #[arg(long)]
    expand_env: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a configuration with its overrides and print it
    Load {
        #[command(flatten)]
        source: Source,

        /// Validate against this schema while loading
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Output format: json, toml, yaml, ini
        #[arg(short, long, default_value = "json")]
        format: Format,

        /// Pretty-print JSON output
        #[arg(long)]
        indent: bool,
    },

    /// Validate a configuration against a schema
    Validate {
        #[command(flatten)]
        source: Source,

        /// Path to schema file
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Convert a configuration file to another format
    Convert {
        /// Input configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: json, toml, yaml, ini
        #[arg(short, long)]
        format: Format,

        /// Pretty-print JSON output
        #[arg(long)]
        indent: bool,
    },

    /// Run the configuration checks and print a report
    Test {
        /// Configuration file to check
        #[arg(short, long)]
        config: PathBuf,

        /// Optional schema to validate against
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Also report references to unset environment variables
        #[arg(long)]
        expand_env: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a configuration with its overrides and write it to a file
    Export {
        #[command(flatten)]
        source: Source,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format: json, toml, yaml, ini
        #[arg(short, long)]
        format: Format,

        /// Pretty-print JSON output
        #[arg(long)]
        indent: bool,
    },

    /// Import (and optionally export) a configuration, then print the audit trail
    Audit {
        #[command(flatten)]
        source: Source,

        /// Also export to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Format of the exported file: json, toml, yaml, ini
        #[arg(short, long, default_value = "json")]
        format: Format,
    },

    /// Write sample files, load them with an override and export every format
    Demo {
        /// Directory for the sample files
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Load {
            source,
            schema,
            format,
            indent,
        } => cmd_load(source, schema, format, indent),

        Commands::Validate { source, schema } => cmd_validate(source, schema),

        Commands::Convert {
            config,
            output,
            format,
            indent,
        } => cmd_convert(config, output, format, indent),

        Commands::Test {
            config,
            schema,
            expand_env,
            json,
        } => cmd_test(config, schema, expand_env, json),

        Commands::Export {
            source,
            output,
            format,
            indent,
        } => cmd_export(source, output, format, indent),

        Commands::Audit {
            source,
            output,
            format,
        } => cmd_audit(source, output, format),

        Commands::Demo { output } => cmd_demo(output),
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    // Also installs the `log` bridge used by tierconf-core
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_schema(path: &Path) -> Result<Schema, String> {
    Schema::from_file(path).map_err(|e| format!("Failed to load schema {}: {}", path.display(), e))
}

fn import(ctx: &mut Context, source: &Source, schema: Option<Schema>) -> Result<Value, String> {
    let options = ImportOptions {
        expand_env: source.expand_env,
        validate: schema.is_some(),
        schema,
        ..ImportOptions::default()
    };
    import_configuration(ctx, &source.config, &source.overrides, &options)
        .map_err(|e| format!("Failed to load {}: {}", source.config.display(), e))
}

fn cmd_load(source: Source, schema: Option<PathBuf>, format: Format, indent: bool) -> ExitCode {
    let schema = match schema.as_deref().map(load_schema).transpose() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    let mut ctx = Context::default();
    let value = match import(&mut ctx, &source, schema) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    match format::encode(format, &value, indent) {
        Ok(content) => {
            print!("{}", content);
            if format == Format::Json {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_validate(source: Source, schema_path: PathBuf) -> ExitCode {
    let schema = match load_schema(&schema_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    let mut ctx = Context::default();
    match import(&mut ctx, &source, Some(schema)) {
        Ok(_) => {
            println!("{} {} is valid", "✓".green(), source.config.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} Validation failed\n", "✗".red());
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn cmd_convert(input: PathBuf, output: PathBuf, format: Format, indent: bool) -> ExitCode {
    let mut ctx = Context::default();
    match convert_configuration(&mut ctx, &input, &output, format, indent) {
        Ok(_) => {
            eprintln!(
                "{} Converted {} to {} ({})",
                "✓".green(),
                input.display(),
                output.display(),
                format
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_test(config: PathBuf, schema: Option<PathBuf>, expand_env: bool, json: bool) -> ExitCode {
    let schema = match schema.as_deref().map(load_schema).transpose() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    let report = test_configuration(&config, schema.as_ref(), expand_env);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        }
    } else {
        println!("{}", config.display().to_string().bold());
        for (test, passed) in &report.tests {
            let mark = if *passed { "✓".green() } else { "✗".red() };
            println!("  {} {}", mark, test);
        }
        for error in &report.errors {
            println!("  {}: {}", "error".red(), error);
        }
        for warning in &report.warnings {
            println!("  {}: {}", "warning".yellow(), warning);
        }
    }

    if report.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn cmd_export(source: Source, output: PathBuf, format: Format, indent: bool) -> ExitCode {
    let mut ctx = Context::default();
    let value = match import(&mut ctx, &source, None) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(1);
        }
    };

    match export_configuration(&mut ctx, &value, &output, format, indent) {
        Ok(()) => {
            eprintln!("{} Wrote to {}", "✓".green(), output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_audit(source: Source, output: Option<PathBuf>, format: Format) -> ExitCode {
    let mut ctx = Context::default();

    if let Ok(value) = import(&mut ctx, &source, None) {
        if let Some(output) = &output {
            // Failures are recorded in the audit trail
            let _ = export_configuration(&mut ctx, &value, output, format, true);
        }
    }

    match serde_json::to_string_pretty(ctx.audit_log()) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    }

    if ctx.has_error() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

const DEMO_BASE: &str = r#"{
  "Name": "demo-service",
  "Database": {
    "Host": "localhost",
    "Port": 5432,
    "Timeout": 30
  },
  "Paths": {
    "Home": "${HOME}"
  }
}
"#;

const DEMO_OVERRIDE: &str = r#"{
  "Database": {
    "Host": "db.prod.internal",
    "Timeout": 60
  }
}
"#;

const DEMO_SCHEMA: &str = r#"{
  "type": "object",
  "required": ["Name", "Database"],
  "properties": {
    "Name": { "type": "string", "minLength": 1 },
    "Database": { "type": "object" }
  }
}
"#;

fn cmd_demo(output: Option<PathBuf>) -> ExitCode {
    let dir = output.unwrap_or_else(|| std::env::temp_dir().join("tierconf-demo"));
    match run_demo(&dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn run_demo(dir: &Path) -> Result<(), String> {
    let write = |path: &Path, content: &str| -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        std::fs::write(path, content).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    };

    let base = dir.join("app.json");
    let over = dir.join("prod").join(tierconf_core::OVERRIDE_FILE_NAME);
    let schema_path = dir.join("schema.json");
    write(&base, DEMO_BASE)?;
    write(&over, DEMO_OVERRIDE)?;
    write(&schema_path, DEMO_SCHEMA)?;
    println!("{} Wrote sample files to {}", "✓".green(), dir.display());

    let schema = load_schema(&schema_path)?;
    let mut ctx = Context::default();
    let options = ImportOptions {
        schema: Some(schema.clone()),
        ..ImportOptions::default()
    };
    let value = import_configuration(&mut ctx, &base, &[over], &options).map_err(|e| e.to_string())?;
    println!("{} Loaded with override:\n{}", "✓".green(), value);

    for format in Format::ALL {
        let path = dir.join("out").join(format!("config.{}", format));
        export_configuration(&mut ctx, &value, &path, format, true).map_err(|e| e.to_string())?;
        let report = test_configuration(&path, Some(&schema), false);
        let mark = if report.is_valid { "✓".green() } else { "✗".red() };
        println!("  {} {} ({})", mark, path.display(), format);
        for error in &report.errors {
            println!("    {}: {}", "error".red(), error);
        }
    }

    println!("{} {} audit entries", "✓".green(), ctx.audit_log().len());
    Ok(())
}
