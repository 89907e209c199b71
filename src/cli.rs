use crate::config::config::JudgeConfig;
use crate::config::presets::{self, InterpreterEnvelope};
use crate::config::types::{ExecutionRequest, JudgeError};
use crate::exec::executor::Judge;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Built-in interpreter envelope replacing the configured one (e.g. python3-v1)
    #[arg(long, global = true)]
    envelope: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one submission against its tests
    Execute {
        /// Request JSON file ({"source", "tests", "timeoutSeconds"}); stdin when omitted
        #[arg(long, conflicts_with_all = ["source", "test"])]
        request: Option<PathBuf>,
        /// Program source file (use with --test)
        #[arg(long, requires = "test")]
        source: Option<PathBuf>,
        /// Test statement, repeatable
        #[arg(long)]
        test: Vec<String>,
        /// Wall-clock limit in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },
    /// Evaluate JSON Lines requests concurrently, answering in input order
    Batch {
        /// Input file with one request per line; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Worker threads (config value when omitted)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Check that the configured interpreter is installed
    CheckDeps {
        /// Verbose output showing detailed version information
        #[arg(long)]
        verbose: bool,
    },
}

extern "C" fn signal_handler(sig: i32) {
    // Async-signal-safe only: raw write and _exit. Contexts die with us
    // through their parent-death signal.
    let msg = b"judgebox: signal received, exiting\n";
    unsafe {
        libc::write(2, msg.as_ptr() as *const libc::c_void, msg.len());
        libc::_exit(128 + sig);
    }
}

fn setup_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as usize);
        libc::signal(libc::SIGINT, signal_handler as usize);
    }
}

pub fn run() -> Result<()> {
    setup_signal_handlers();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = JudgeConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(id) = cli.envelope.as_deref() {
        config.interpreter = select_envelope(id)?;
    }

    match cli.command {
        Commands::Execute {
            request,
            source,
            test,
            timeout,
            pretty,
        } => {
            let request = match source {
                Some(path) => inline_request(&path, test, timeout)?,
                None => {
                    let mut request = read_request(request.as_deref())?;
                    if timeout.is_some() {
                        request.timeout_seconds = timeout;
                    }
                    request
                }
            };
            execute_one(config, &request, pretty)
        }
        Commands::Batch { input, workers } => {
            let workers = workers.unwrap_or(config.workers).max(1);
            let judge = Judge::new(config)?;
            match input {
                Some(path) => {
                    let file = std::fs::File::open(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    run_batch(&judge, BufReader::new(file), std::io::stdout().lock(), workers)
                }
                None => {
                    let stdin = std::io::stdin().lock();
                    run_batch(&judge, stdin, std::io::stdout().lock(), workers)
                }
            }
        }
        Commands::CheckDeps { verbose } => check_interpreter(&config, verbose),
    }
}

fn select_envelope(id: &str) -> Result<InterpreterEnvelope> {
    presets::envelope_by_id(id).ok_or_else(|| anyhow::anyhow!("unknown interpreter envelope '{}'", id))
}

fn inline_request(
    source: &Path,
    tests: Vec<String>,
    timeout: Option<u64>,
) -> Result<ExecutionRequest> {
    let source = std::fs::read_to_string(source)
        .with_context(|| format!("failed to read source file {}", source.display()))?;
    Ok(ExecutionRequest {
        source,
        tests,
        timeout_seconds: timeout,
    })
}

fn read_request(path: Option<&Path>) -> Result<ExecutionRequest> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read request from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("request is not valid JSON")
}

fn execute_one(config: JudgeConfig, request: &ExecutionRequest, pretty: bool) -> Result<()> {
    let judge = Judge::new(config)?;
    let result = match judge.execute(request) {
        Ok(result) => result,
        Err(JudgeError::InvalidRequest(reason)) => {
            eprintln!("Error: {}", reason);
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    if !result.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Answer for one batch line
fn batch_response(judge: &Judge, line: &str) -> String {
    let outcome = serde_json::from_str::<ExecutionRequest>(line)
        .map_err(|e| format!("invalid request: {}", e))
        .and_then(|request| judge.execute(&request).map_err(|e| e.to_string()));

    let encoded = match outcome {
        Ok(result) => serde_json::to_string(&result).map_err(|e| e.to_string()),
        Err(reason) => Err(reason),
    };
    encoded.unwrap_or_else(|reason| serde_json::json!({ "error": reason }).to_string())
}

/// Fan requests out to `workers` threads; write responses in input order.
pub fn run_batch<R: BufRead, W: Write>(
    judge: &Judge,
    input: R,
    mut output: W,
    workers: usize,
) -> Result<()> {
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, String)>();
    let (done_tx, done_rx) = crossbeam_channel::unbounded::<(usize, String)>();

    std::thread::scope(|scope| -> Result<()> {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (index, line) in job_rx {
                    if done_tx.send((index, batch_response(judge, &line))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(done_tx);

        let mut total = 0;
        for line in input.lines() {
            let line = line.context("failed to read batch input")?;
            if line.trim().is_empty() {
                continue;
            }
            job_tx
                .send((total, line))
                .map_err(|_| anyhow::anyhow!("batch workers stopped"))?;
            total += 1;
        }
        drop(job_tx);

        let mut pending = BTreeMap::new();
        let mut next = 0;
        for (index, response) in done_rx {
            pending.insert(index, response);
            while let Some(response) = pending.remove(&next) {
                writeln!(output, "{}", response)?;
                next += 1;
            }
        }
        output.flush()?;

        log::info!("batch finished: {} requests", total);
        Ok(())
    })
}

/// Check that the configured interpreter is installed
fn check_interpreter(config: &JudgeConfig, verbose: bool) -> Result<()> {
    use std::process::Command;

    println!("🔍 Checking interpreter...");
    println!();

    let envelope = &config.interpreter;
    let mut command = Command::new(&envelope.executable);
    command.arg("--version");
    if !envelope.inherit_environment {
        command.env_clear();
    }
    command.envs(envelope.environment.iter().map(|(k, v)| (k, v)));

    let version = match command.output() {
        Ok(output) if output.status.success() => {
            let text = if !output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stdout)
            } else {
                String::from_utf8_lossy(&output.stderr)
            };
            Ok(text.lines().next().unwrap_or("").trim().to_string())
        }
        Ok(output) => Err(format!("exited with {}", output.status)),
        Err(e) => Err(format!("NOT FOUND ({})", e)),
    };

    match version {
        Ok(version) => {
            println!("✅ {} ({}) - OK", envelope.language, envelope.id);
            if verbose {
                println!("  {} -> {}", envelope.executable, version);
                println!();
                println!("💡 Usage example:");
                println!(
                    "  judgebox execute --source solution.py --test 'assert add(1, 2) == 3'"
                );
            }
            Ok(())
        }
        Err(reason) => {
            println!("❌ {} ({}) - MISSING", envelope.language, envelope.id);
            if verbose {
                println!("  {} -> {}", envelope.executable, reason);
            }
            println!();
            println!("Install manually:");
            println!("  • Python: sudo apt install python3");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_execute_arguments() {
        let cli = Cli::try_parse_from([
            "judgebox",
            "--config",
            "judge.json",
            "execute",
            "--source",
            "sol.py",
            "--test",
            "assert f() == 1",
            "--test",
            "assert f() != 2",
            "--timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("judge.json")));
        match cli.command {
            Commands::Execute {
                source,
                test,
                timeout,
                ..
            } => {
                assert_eq!(source, Some(PathBuf::from("sol.py")));
                assert_eq!(test.len(), 2);
                assert_eq!(timeout, Some(5));
            }
            _ => panic!("expected execute"),
        }
    }

    #[test]
    fn test_envelope_selection() {
        let cli = Cli::try_parse_from(["judgebox", "check-deps", "--envelope", "python3-v1"]).unwrap();
        let envelope = select_envelope(cli.envelope.as_deref().unwrap()).unwrap();
        assert_eq!(envelope.id, "python3-v1");
        assert!(select_envelope("java17-v1").is_err());
    }

    #[test]
    fn test_request_conflicts_with_inline_source() {
        assert!(Cli::try_parse_from([
            "judgebox", "execute", "--request", "r.json", "--source", "s.py", "--test", "x"
        ])
        .is_err());
    }

    #[test]
    fn test_batch_reports_invalid_lines_in_order() {
        let judge = Judge::new(JudgeConfig::default()).unwrap();
        let input = "not json\n\n{\"source\": \"\", \"tests\": [\"x\"]}\n";
        let mut output = Vec::new();

        run_batch(&judge, input.as_bytes(), &mut output, 2).unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0]["error"].as_str().unwrap().starts_with("invalid request"));
        assert!(lines[1]["error"]
            .as_str()
            .unwrap()
            .contains("No code provided"));
    }
}
