use std::fs;
use std::io::{self, Read};

use clap::{Args, Parser, Subcommand};

use super::api_request_from_json;
use crate::core::{DEFAULT_MAX_MONTHS, EngineConfig, compare_strategies};

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Debt payoff simulator: compares avalanche, snowball and weighted repayment plans"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the comparison API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Compare strategies for a JSON request and print the report
    Compare {
        #[arg(
            long,
            default_value = "-",
            help = "Path to a JSON request body, or - to read stdin"
        )]
        input: String,
        #[arg(long, help = "Pretty-print the JSON report")]
        pretty: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct EngineArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_MONTHS,
        help = "Safety ceiling on simulated months before a plan is declared non-convergent"
    )]
    pub max_months: u32,
    #[arg(
        long,
        help = "Run strategies one after another instead of on the worker pool"
    )]
    pub sequential: bool,
}

pub fn build_engine_config(args: EngineArgs) -> Result<EngineConfig, String> {
    if args.max_months == 0 {
        return Err("--max-months must be > 0".to_string());
    }
    Ok(EngineConfig {
        max_months: args.max_months,
        parallel: !args.sequential,
    })
}

pub fn run_compare_command(
    input: &str,
    pretty: bool,
    engine: EngineArgs,
) -> Result<String, String> {
    let config = build_engine_config(engine)?;
    let body = read_input(input)?;
    let request = api_request_from_json(&body).map_err(|e| e.to_string())?;
    let report = compare_strategies(&request, &config).map_err(|e| e.to_string())?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    rendered.map_err(|e| format!("Failed to render report: {e}"))
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut body = String::new();
        io::stdin()
            .read_to_string(&mut body)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        return Ok(body);
    }
    fs::read_to_string(input).map_err(|e| format!("Failed to read {input}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    fn engine_args() -> EngineArgs {
        EngineArgs {
            max_months: DEFAULT_MAX_MONTHS,
            sequential: true,
        }
    }

    fn write_temp_request(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("payoff-{}-{name}.json", std::process::id()));
        fs::write(&path, body).expect("failed to write temp request");
        path
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compare_arguments_with_defaults() {
        let cli = Cli::try_parse_from(["payoff", "compare", "--input", "debts.json"])
            .expect("arguments should parse");
        match cli.command {
            Command::Compare {
                input,
                pretty,
                engine,
            } => {
                assert_eq!(input, "debts.json");
                assert!(!pretty);
                assert_eq!(engine.max_months, DEFAULT_MAX_MONTHS);
                assert!(!engine.sequential);
            }
            Command::Serve { .. } => panic!("expected compare"),
        }
    }

    #[test]
    fn parses_serve_arguments() {
        let cli = Cli::try_parse_from([
            "payoff",
            "serve",
            "--port",
            "9090",
            "--max-months",
            "600",
            "--sequential",
        ])
        .expect("arguments should parse");
        let Command::Serve { port, engine } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(port, 9090);
        let config = build_engine_config(engine).expect("valid config");
        assert_eq!(config.max_months, 600);
        assert!(!config.parallel);
    }

    #[test]
    fn build_engine_config_rejects_zero_ceiling() {
        let mut args = engine_args();
        args.max_months = 0;
        let err = build_engine_config(args).expect_err("zero ceiling");
        assert!(err.contains("--max-months"));
    }

    #[test]
    fn compare_command_renders_report_from_file() {
        let path = write_temp_request(
            "ok",
            r#"{
              "debts": [{"id": "card", "balance": 1200, "annualRatePercent": 24, "minimumPayment": 60}],
              "extraMonthlyPayment": 0,
              "strategies": ["avalanche"]
            }"#,
        );
        let output = run_compare_command(path.to_str().expect("utf-8 path"), false, engine_args())
            .expect("compare should succeed");
        fs::remove_file(&path).ok();

        let json: serde_json::Value = serde_json::from_str(&output).expect("output is JSON");
        assert_eq!(json["baseline"]["monthsToPayoff"], 26);
        assert_eq!(json["results"][0]["totalInterestPaid"], "347.88");
    }

    #[test]
    fn compare_command_surfaces_validation_errors() {
        let path = write_temp_request("bad", r#"{"debts": []}"#);
        let err = run_compare_command(path.to_str().expect("utf-8 path"), true, engine_args())
            .expect_err("empty portfolio");
        fs::remove_file(&path).ok();
        assert!(err.contains("at least one debt"));
    }

    #[test]
    fn compare_command_reports_missing_file() {
        let err = run_compare_command("/definitely/not/here.json", false, engine_args())
            .expect_err("missing file");
        assert!(err.starts_with("Failed to read"));
    }
}
