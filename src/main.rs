//! Simulator entry point: CLI wiring, scenario construction, and export.

use std::path::Path;
use std::process;

use energymix_sim::aggregate::aggregate_scenario;
use energymix_sim::catalog::SourceCatalog;
use energymix_sim::config::ScenarioConfig;
use energymix_sim::io::export::{export_hourly_csv, export_yearly_csv};
use energymix_sim::project::ProjectContext;
use energymix_sim::sim::engine::Scenario;
use energymix_sim::sim::kpi::ScenarioKpis;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    catalog_path: Option<String>,
    seed_override: Option<u64>,
    load_mw: f64,
    hourly_out: Option<String>,
    yearly_out: Option<String>,
}

fn print_help() {
    eprintln!("energymix-sim — hybrid on-site power supply simulator");
    eprintln!();
    eprintln!("Usage: energymix-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>     Load scenario from TOML config file");
    eprintln!("  --preset <name>       Use a built-in preset (baseline)");
    eprintln!("  --catalog <path>      Load source types from TOML instead of built-ins");
    eprintln!("  --seed <u64>          Override the availability-seeding random seed");
    eprintln!("  --load-mw <f64>       Constant demand for the synthetic demo project (default 5.0)");
    eprintln!("  --hourly-out <path>   Export per-hour records to CSV");
    eprintln!("  --yearly-out <path>   Export per-year records to CSV");
    eprintln!("  --help                Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        catalog_path: None,
        seed_override: None,
        load_mw: 5.0,
        hourly_out: None,
        yearly_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--catalog" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --catalog requires a path argument");
                    process::exit(1);
                }
                cli.catalog_path = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(seed) = args[i].parse::<u64>() {
                    cli.seed_override = Some(seed);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--load-mw" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --load-mw requires a f64 argument");
                    process::exit(1);
                }
                if let Ok(load) = args[i].parse::<f64>() {
                    cli.load_mw = load;
                } else {
                    eprintln!("error: --load-mw value \"{}\" is not a valid f64", args[i]);
                    process::exit(1);
                }
            }
            "--hourly-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --hourly-out requires a path argument");
                    process::exit(1);
                }
                cli.hourly_out = Some(args[i].clone());
            }
            "--yearly-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --yearly-out requires a path argument");
                    process::exit(1);
                }
                cli.yearly_out = Some(args[i].clone());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = parse_args();

    let mut config = if let Some(path) = &cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    } else {
        let preset = cli.preset.as_deref().unwrap_or("baseline");
        match ScenarioConfig::from_preset(preset) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    };
    if let Some(seed) = cli.seed_override {
        config.scenario.seed = seed;
    }

    let catalog = if let Some(path) = &cli.catalog_path {
        match SourceCatalog::from_toml_file(Path::new(path)) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    } else {
        SourceCatalog::builtin()
    };

    // Synthetic demo inputs: constant demand, a midday solar bell, and a
    // 60 % critical share. Real load/solar tensors come from the
    // out-of-core loader in production use.
    let project = ProjectContext::uniform(cli.load_mw)
        .with_solar_profile(|_, _, hour| {
            let h = hour as f64;
            (5.0 * (1.0 - ((h - 12.0) / 6.0).powi(2))).max(0.0)
        })
        .with_load_projection(
            [energymix_sim::project::LoadProjection {
                critical_load_mw: cli.load_mw * 0.6,
                total_load_mw: cli.load_mw,
            }; energymix_sim::calendar::YEARS],
        )
        .with_loss_during_failure(250_000.0);

    let mut scenario = match Scenario::from_config(&config, &catalog, &project) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = scenario.simulate() {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let records = aggregate_scenario(&scenario);
    let kpis = ScenarioKpis::from_year_records(&records, project.site.loss_during_failure);
    println!("{kpis}");

    if let Some(path) = &cli.hourly_out {
        if let Err(e) = export_hourly_csv(&scenario, Path::new(path)) {
            eprintln!("error: failed to write \"{path}\": {e}");
            process::exit(1);
        }
        println!("Hourly records written to {path}");
    }
    if let Some(path) = &cli.yearly_out {
        if let Err(e) = export_yearly_csv(&records, Path::new(path)) {
            eprintln!("error: failed to write \"{path}\": {e}");
            process::exit(1);
        }
        println!("Yearly records written to {path}");
    }
}
