//! Command-line front end for the policy engine: loads a policy module plus
//! optional `input`/`data` JSON documents, evaluates a query against them,
//! and prints the result as text or JSON.

use std::{fs, process::ExitCode, time::Instant};

use clap::Parser;
use policy_engine::{evaluate, Error, EvalResult, QueryInput, Value};

/// Evaluate a policy module against input/data documents
#[derive(Parser, Debug)]
#[command(name = "policy-engine", version, about, long_about = None)]
struct Args {
    /// Policy source file
    #[arg(long)]
    policy: String,

    /// JSON file bound to `input`
    #[arg(long)]
    input: Option<String>,

    /// JSON file bound to `data`
    #[arg(long)]
    data: Option<String>,

    /// Dotted query path, e.g. `data.example.allow`; defaults to the whole
    /// package document when omitted
    #[arg(long)]
    query: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Accepted for compatibility; bundle aliasing is not implemented
    #[arg(long)]
    yaml_aliases: bool,

    /// Accepted for compatibility; profiling output is not implemented
    #[arg(long)]
    profile: bool,

    /// Accepted for compatibility; no config file format is defined
    #[arg(long)]
    config: Option<String>,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.yaml_aliases || args.profile || args.config.is_some() {
        eprintln!("warning: --yaml-aliases/--profile/--config are accepted but not implemented");
    }

    let source = match fs::read_to_string(&args.policy) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: failed to read policy file {}: {err}", args.policy);
            return ExitCode::from(2);
        }
    };
    let input = match load_document(args.input.as_deref()) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    let data = match load_document(args.data.as_deref()) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    let query = args.query.map(QueryInput::Path);

    let start = Instant::now();
    let result = evaluate(&source, input, data, query);
    let elapsed = start.elapsed();

    match result {
        Ok(result) => {
            eprintln!("evaluation finished in {elapsed:?}");
            print_result(&result, args.format);
            if result.success { ExitCode::SUCCESS } else { ExitCode::from(1) }
        }
        Err(err) => {
            eprintln!("evaluation failed after {elapsed:?}");
            print_error(&err, args.format);
            ExitCode::from(2)
        }
    }
}

fn load_document(path: Option<&str>) -> Result<Value, String> {
    let Some(path) = path else { return Ok(Value::Null) };
    let text = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|err| format!("invalid JSON in {path}: {err}"))?;
    Ok(serde_json::from_value(json).map_err(|err| format!("unsupported JSON in {path}: {err}"))?)
}

fn print_result(result: &EvalResult, format: Format) {
    match format {
        Format::Text => {
            println!("{}", result.value);
            if !result.bindings.is_empty() {
                let mut names: Vec<&String> = result.bindings.keys().collect();
                names.sort();
                for name in names {
                    println!("  {name} = {}", result.bindings[name]);
                }
            }
        }
        Format::Json => {
            let payload = serde_json::json!({
                "value": result.value,
                "success": result.success,
                "bindings": result.bindings,
            });
            match serde_json::to_string_pretty(&payload) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("error: failed to serialize result: {err}"),
            }
        }
    }
}

fn print_error(err: &Error, format: Format) {
    match format {
        Format::Text => eprintln!("{err}"),
        Format::Json => {
            let payload = serde_json::json!({
                "kind": err.kind.to_string(),
                "message": err.message,
                "rule": err.rule_name,
            });
            eprintln!("{}", serde_json::to_string_pretty(&payload).unwrap_or_else(|_| err.to_string()));
        }
    }
}
