use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    FieldValues, FormDefinition, FormSession, build_render_payload, check_definition, compile,
    definition_schema, render_json_ui, render_text, validate, values_schema,
};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form definition toolkit",
    long_about = "Validates values against form definitions, previews forms and formats submissions"
)]
struct Cli {
    /// Log compiler and session events to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SubmitFormat {
    Json,
    Text,
    Cbor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum PreviewFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a values file and print the result of every field.
    Validate {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the JSON object of field values.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Validate and, when valid, print the label-keyed submission.
    Submit {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Output encoding; CBOR is written as raw bytes.
        #[arg(long, value_enum, env = "FORMKIT_FORMAT", default_value_t = SubmitFormat::Json)]
        format: SubmitFormat,
    },
    /// Show the sections and fields a renderer would draw.
    Preview {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional values; when given, every active field is validated first.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = PreviewFormat::Text)]
        format: PreviewFormat,
    },
    /// Print a JSON Schema for a form's values, or for the definition format itself.
    Schema {
        #[arg(long, value_name = "FORM", required_unless_present = "definition")]
        form: Option<PathBuf>,
        #[arg(long, value_name = "VALUES", requires = "form")]
        values: Option<PathBuf>,
        /// Emit the schema of the definition JSON format.
        #[arg(long, conflicts_with = "form")]
        definition: bool,
    },
    /// List authoring problems in a form definition.
    Check {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Exit with an error when any issue is found.
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    match cli.command {
        Command::Validate { form, values } => run_validate(form, values),
        Command::Submit {
            form,
            values,
            format,
        } => run_submit(form, values, format),
        Command::Preview {
            form,
            values,
            format,
        } => run_preview(form, values, format),
        Command::Schema {
            form,
            values,
            definition,
        } => run_schema(form, values, definition),
        Command::Check { form, strict } => run_check(form, strict),
    }
}

fn init_logging(verbose: bool) -> CliResult<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_definition(path: &Path) -> CliResult<FormDefinition> {
    let contents = fs::read_to_string(path)?;
    let definition = FormDefinition::from_json(&contents)?;
    debug!(path = %path.display(), sections = definition.sections.len(), "loaded form definition");
    Ok(definition)
}

fn load_values(path: &Path) -> CliResult<FieldValues> {
    let contents = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(format!("{} must contain a JSON object of field values", path.display()).into()),
    }
}

/// Builds a session pre-filled with `values`; keys naming no field are skipped.
fn session_with(definition: &FormDefinition, values: FieldValues) -> FormSession {
    let mut session = FormSession::from_definition(definition);
    for (id, value) in values {
        if let Err(err) = session.set_value(&id, value) {
            warn!(field = %id, "{}", err);
        }
    }
    session
}

fn run_validate(form_path: PathBuf, values_path: PathBuf) -> CliResult<()> {
    let definition = load_definition(&form_path)?;
    let values = load_values(&values_path)?;
    let form = compile(&definition);

    let report = validate(&form, &values);
    println!(
        "Validation result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    for field in form.fields() {
        let id = field.id();
        let status = if report.inactive.iter().any(|inactive| inactive == id) {
            "inactive".to_string()
        } else if let Some(message) = report.errors.get(id) {
            format!("error - {}", message)
        } else {
            "ok".to_string()
        };
        println!("  {}: {}", id, status);
    }
    if !report.unknown_fields.is_empty() {
        println!("Unknown value fields: {}", report.unknown_fields.join(", "));
    }

    if report.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_submit(form_path: PathBuf, values_path: PathBuf, format: SubmitFormat) -> CliResult<()> {
    let definition = load_definition(&form_path)?;
    let values = load_values(&values_path)?;
    let mut session = session_with(&definition, values);

    let Some(submission) = session.submit() else {
        eprintln!("Validation errors:");
        for (id, message) in session.errors() {
            eprintln!("  {}: {}", id, message);
        }
        return Err("submission blocked by invalid fields".into());
    };

    let mut stdout = io::stdout().lock();
    match format {
        SubmitFormat::Json => writeln!(stdout, "{}", submission.to_json_pretty()?)?,
        SubmitFormat::Text => writeln!(stdout, "{}", submission.to_text())?,
        SubmitFormat::Cbor => stdout.write_all(&submission.to_cbor()?)?,
    }
    stdout.flush()?;
    Ok(())
}

fn run_preview(
    form_path: PathBuf,
    values_path: Option<PathBuf>,
    format: PreviewFormat,
) -> CliResult<()> {
    let definition = load_definition(&form_path)?;
    let session = match values_path {
        Some(path) => {
            let mut session = session_with(&definition, load_values(&path)?);
            session.validate_all();
            session
        }
        None => FormSession::from_definition(&definition),
    };

    let payload = build_render_payload(&session);
    match format {
        PreviewFormat::Text => println!("{}", render_text(&payload)),
        PreviewFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?)
        }
    }
    Ok(())
}

fn run_schema(
    form_path: Option<PathBuf>,
    values_path: Option<PathBuf>,
    definition_only: bool,
) -> CliResult<()> {
    let schema = if definition_only {
        serde_json::to_value(definition_schema())?
    } else {
        let form_path = form_path.ok_or("--form is required unless --definition is set")?;
        let form = compile(&load_definition(&form_path)?);
        let values = match values_path {
            Some(path) => load_values(&path)?,
            None => FieldValues::new(),
        };
        values_schema(&form, &values)
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_check(form_path: PathBuf, strict: bool) -> CliResult<()> {
    let definition = load_definition(&form_path)?;
    let issues = check_definition(&definition);
    if issues.is_empty() {
        println!("No issues found");
        return Ok(());
    }

    println!("Issues:");
    for issue in &issues {
        println!("  {} [{}] {}", issue.target, issue.code.as_str(), issue.message);
    }
    if strict {
        Err(format!("{} authoring issue(s) found", issues.len()).into())
    } else {
        Ok(())
    }
}
