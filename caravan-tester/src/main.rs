mod assets;
mod live;
mod logic;
mod scenarios;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assets::{FileLoader, TesterAssets};
use live::LiveRunner;
use logic::{CaravanSimulator, LogicTester, ScenarioResult};
use scenarios::{all_scenario_names, get_scenario, list_scenarios};
use util::{parse_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "caravan-tester", version = "0.1.0")]
#[command(about = "Seeded and live simulation harness for the caravan economy")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x-hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Drive the scheduler from a tokio interval and run actors as concurrent tasks
    #[arg(long)]
    live: bool,

    /// Scheduler period in live mode, in milliseconds
    #[arg(long, default_value_t = 5)]
    tick_ms: u64,

    /// Catalog JSON to load instead of the embedded reference data
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Economy config JSON to load instead of the defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = parse_seeds(&args.seeds)?;
    let assets = Arc::new(load_assets(&args)?);

    let results = if args.live {
        run_live_scenarios(&args, &scenarios, &seeds, &assets).await?
    } else {
        run_logic_scenarios(&args, &scenarios, &seeds, &assets)
    };

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🐫 Caravan Economy Tester".bright_cyan().bold());
    println!("{}", "=========================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for name in all_scenario_names() {
            if !scenarios.contains(&name) {
                scenarios.push(name);
            }
        }
    }
    scenarios
}

fn load_assets(args: &Args) -> Result<TesterAssets> {
    if args.catalog.is_none() && args.config.is_none() {
        return Ok(TesterAssets::load_default());
    }
    let loader = FileLoader {
        catalog_path: args.catalog.clone(),
        config_path: args.config.clone(),
    };
    TesterAssets::load(&loader).context("loading simulation assets")
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    assets: &Arc<TesterAssets>,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Seeded Simulations".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(CaravanSimulator::new(Arc::clone(assets), args.verbose), args.verbose);
    let mut results = Vec::new();
    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }
    results
}

async fn run_live_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    assets: &Arc<TesterAssets>,
) -> Result<Vec<ScenarioResult>> {
    println!("{}", "🛰️  Running Live Simulations".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());

    let runner = LiveRunner::new(
        Arc::clone(assets),
        Duration::from_millis(args.tick_ms.max(1)),
        args.verbose,
    );
    let mut results = Vec::new();
    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(
                runner
                    .run_scenario(&scenario, seeds, args.iterations)
                    .await
                    .with_context(|| format!("live scenario {scenario_name}"))?,
            );
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }
    Ok(results)
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Caravan Simulation Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            let duration = start_time.elapsed();
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            live: false,
            tick_ms: 2,
            catalog: None,
            config: None,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("caravan-main-{label}-{}", std::process::id()))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded[0], "smoke");
        assert_eq!(expanded.len(), 6);
        assert!(expanded.contains(&"full-economy".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("looted-convoy,smoke");
        assert_eq!(expanded, vec!["looted-convoy".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_path("list");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("attack-race"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let assets = Arc::new(TesterAssets::load_default());
        let results = run_logic_scenarios(&base_args(), &["bogus".to_string()], &[1], &assets);
        assert!(results.is_empty());
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_path("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No scenarios executed"));
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_path("full.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        let assets = Arc::new(TesterAssets::load_default());
        let results = run_logic_scenarios(&args, &["smoke".to_string()], &[1], &assets);
        write_reports(&args, &results, Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("\"scenario_name\": \"smoke\""));
        assert!(content.contains("\"passed\": true"));
    }

    #[test]
    fn missing_catalog_file_is_reported() {
        let args = Args {
            catalog: Some(PathBuf::from("/nonexistent/caravans.json")),
            ..base_args()
        };
        let err = load_assets(&args).unwrap_err();
        assert!(format!("{err:#}").contains("loading simulation assets"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
