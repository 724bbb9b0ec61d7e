//! # Profile Host
//!
//! Measures a start-to-end path between two boundary tiles on a simulated
//! partition and prints the counter readings.

use profile_io::StatusCode;
use profiled::{parse_port, parse_tile, ProfileRun, ProfiledConfig};
use std::env;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let config = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(&args[0]);
        process::exit(exit_code(StatusCode::InvalidArgs));
    });

    let run = ProfileRun::new(config).unwrap_or_else(|e| {
        error!(error = %e, "failed to set up profile run");
        process::exit(exit_code(e.status()));
    });

    match run.execute() {
        Ok(outcome) => print!("{}", outcome.render(run.config().json)),
        Err(e) => {
            error!(error = %e, "profile run failed");
            process::exit(exit_code(e.status()));
        }
    }
}

fn exit_code(status: StatusCode) -> i32 {
    match status {
        StatusCode::Ok => 0,
        StatusCode::Failure => 1,
        StatusCode::InvalidArgs => 2,
    }
}

fn parse_args(args: &[String]) -> Result<ProfiledConfig, String> {
    let mut config = ProfiledConfig::default();
    let mut i = 1;

    while i < args.len() {
        let option = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i)
                .map(String::as_str)
                .ok_or_else(|| format!("Missing value for {}", option))
        };
        match option {
            "--config" | "-c" => {
                let path = value()?;
                config
                    .load_broker(path)
                    .map_err(|e| format!("Failed to load config: {}", e))?;
            }
            "--start" => config.start = parse_tile(value()?).map_err(|e| e.to_string())?,
            "--start-port" => {
                config.start_port = parse_port(value()?).map_err(|e| e.to_string())?
            }
            "--end" => config.end = parse_tile(value()?).map_err(|e| e.to_string())?,
            "--end-port" => config.end_port = parse_port(value()?).map_err(|e| e.to_string())?,
            "--lead-cycles" => {
                let text = value()?;
                config.lead_cycles = text
                    .parse()
                    .map_err(|_| format!("Invalid lead-cycles value: {}", text))?;
            }
            "--span-cycles" => {
                let text = value()?;
                config.span_cycles = text
                    .parse()
                    .map_err(|_| format!("Invalid span-cycles value: {}", text))?;
            }
            "--json" => config.json = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      Broker configuration (topology and capacities, JSON)");
    eprintln!("  --start <COL,ROW>        Start tile (default 6,0)");
    eprintln!("  --start-port <PORT>      Start port (default slave/south/0)");
    eprintln!("  --end <COL,ROW>          End tile (default 9,0)");
    eprintln!("  --end-port <PORT>        End port (default master/south/0)");
    eprintln!("  --lead-cycles <N>        Cycles before traffic on the start port");
    eprintln!("  --span-cycles <N>        Cycles between start and end port traffic");
    eprintln!("  --json                   Print the report as JSON");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --start 6,0 --end 9,0", program);
    eprintln!("  RUST_LOG=debug {} --config partition.json --json", program);
}
