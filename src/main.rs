//! Autograde CLI
//!
//! Commands:
//!   compile  - Compile a problem spec to canonical IR
//!   generate - Generate the test harness for a spec
//!   run      - Grade a submission against a spec in the sandbox

use autograde::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start())
        .ok();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "compile" => cmd_compile(&args[2..]),
        "generate" => cmd_generate(&args[2..]),
        "run" => cmd_run(&args[2..]).await,
        "version" | "--version" | "-v" => {
            println!("autograde {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_input_error() => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
Autograde - spec-driven auto-grading

USAGE:
    autograde <COMMAND> [OPTIONS]

COMMANDS:
    compile <spec.yaml>                  Compile a problem spec to canonical IR
    generate <spec.yaml> [--lang]        Generate the test harness for a spec
    run <spec.yaml> <solution-file>      Grade a submission in the sandbox
    version                              Print version

OPTIONS:
    --lang <python>          Target language (default: python)
    --output <file>          Output file (default: stdout)
    --runtime <slug>         Runtime slug, e.g. python312
    --timeout <seconds>      Per-case timeout (default: 5)
    --memory <mib>           Memory cap in MiB (default: 256)
    --overall-timeout <s>    Overall budget (default: 2x per-case timeout)
    --json                   JSON output format
    --debug                  Include raw failure details in output

EXAMPLES:
    autograde compile factorial.yaml
    autograde generate factorial.yaml --lang python > test_runner.py
    autograde run factorial.yaml solution.py --timeout 2
    autograde run counter.yaml counter.py --json --debug
"#
    );
}

fn cmd_compile(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err("Usage: autograde compile <spec.yaml>".into());
    }

    let spec_text = fs::read_to_string(&args[0]).map_err(Error::Io)?;
    let ir = compile_spec(&spec_text)?;

    write_output(&parse_output_arg(args), &ir.to_json_pretty()?)?;
    Ok(())
}

fn cmd_generate(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err("Usage: autograde generate <spec.yaml> [--lang python]".into());
    }

    let spec_text = fs::read_to_string(&args[0]).map_err(Error::Io)?;
    let ir = compile_spec(&spec_text)?;

    let language = parse_flag(args, "--lang").unwrap_or("python");
    let registry = GeneratorRegistry::with_builtins();
    let harness = registry.generate(language, &ir)?;

    write_output(&parse_output_arg(args), &harness)?;
    Ok(())
}

async fn cmd_run(args: &[String]) -> Result<()> {
    if args.len() < 2 {
        return Err("Usage: autograde run <spec.yaml> <solution-file>".into());
    }

    let spec_text = fs::read_to_string(&args[0]).map_err(Error::Io)?;
    let student_source = fs::read_to_string(&args[1]).map_err(Error::Io)?;

    if !docker_available().await {
        eprintln!("warning: docker daemon not reachable; the sandbox run will fail");
    }

    let orchestrator = Orchestrator::new(OrchestratorConfig::default());
    orchestrator.store_problem("cli", &spec_text)?;

    let debug = args.contains(&"--debug".to_string());
    let opts = SubmitOptions {
        runtime: parse_flag(args, "--runtime").map(String::from),
        language: parse_flag(args, "--lang").map(String::from),
        timeout_s: parse_u32_flag(args, "--timeout")?,
        memory_mb: parse_u32_flag(args, "--memory")?,
        overall_timeout_s: parse_u32_flag(args, "--overall-timeout")?,
        debug,
        cancel: None,
    };

    let outcome = orchestrator.run_submission("cli", &student_source, opts).await?;

    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let view = outcome.verdict.student_view(debug);
    println!("{}: {}", outcome.verdict.status, view.title);
    println!("{}", view.message);
    if let Some(test) = &view.failed_test {
        println!("  first failure: {}", test);
        if let Some(message) = &view.failure_message {
            println!("  {}", message);
        }
        if let Some(details) = &view.failure_details {
            println!("---\n{}", details);
        }
    }
    if debug {
        if !outcome.record.stdout_tail.is_empty() {
            println!("--- stdout ---\n{}", outcome.record.stdout_tail);
        }
        if !outcome.record.stderr_tail.is_empty() {
            println!("--- stderr ---\n{}", outcome.record.stderr_tail);
        }
    }

    Ok(())
}

fn parse_flag<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn parse_u32_flag(args: &[String], flag: &str) -> Result<Option<u32>> {
    match parse_flag(args, flag) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| Error::Other(format!("{} expects a positive integer, got '{}'", flag, raw))),
    }
}

fn parse_output_arg(args: &[String]) -> Option<PathBuf> {
    parse_flag(args, "--output").map(PathBuf::from)
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).map_err(Error::Io)?;
            eprintln!("Written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
