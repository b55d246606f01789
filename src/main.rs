use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use log::{error, info};

use petrol_station_simulator::report::{render_cars_csv, render_report, write_json};
use petrol_station_simulator::{Simulation, SimulationConfig, SimulationError, SimulationReport};

const DEFAULT_ENV_FILE: &str = "setup.env";

/// Origen de la configuración elegido por línea de comandos.
#[derive(Debug, PartialEq)]
enum ConfigSource {
    Toml(PathBuf),
    Env(PathBuf),
}

#[derive(Debug, PartialEq)]
struct Options {
    source: ConfigSource,
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
}

fn usage(bin: &str) -> String {
    format!(
        "Uso:\n  {bin} [--config <archivo.toml> | --env <archivo.env>] [--json <salida.json>] [--csv <salida.csv>]\n\
         Sin --config ni --env se lee '{DEFAULT_ENV_FILE}' del directorio actual.\n\
         El nivel de log se controla con RUST_LOG (por defecto: info)."
    )
}

/// Parseo de CLI: banderas con un valor cada una.
fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut source = None;
    let mut json = None;
    let mut csv = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .map(PathBuf::from)
                .ok_or_else(|| format!("Falta el valor de {flag}"))
        };
        match flag {
            "--config" | "--env" => {
                if source.is_some() {
                    return Err("--config y --env son excluyentes".to_string());
                }
                source = Some(if flag == "--config" {
                    ConfigSource::Toml(value()?)
                } else {
                    ConfigSource::Env(value()?)
                });
            }
            "--json" => json = Some(value()?),
            "--csv" => csv = Some(value()?),
            other => return Err(format!("Argumento desconocido: {other}")),
        }
        i += 2;
    }

    Ok(Options {
        source: source.unwrap_or_else(|| ConfigSource::Env(PathBuf::from(DEFAULT_ENV_FILE))),
        json,
        csv,
    })
}

fn run(options: &Options) -> Result<(), SimulationError> {
    let config = match &options.source {
        ConfigSource::Toml(path) => SimulationConfig::from_toml_file(path)?,
        ConfigSource::Env(path) => SimulationConfig::from_env_file(path)?,
    };

    let simulation = Simulation::new(config)?;
    let report = simulation.run()?;

    println!("{}", render_report(&report));
    write_outputs(options, &report)
}

/// Escribe los archivos pedidos con `--json` y `--csv`.
fn write_outputs(options: &Options, report: &SimulationReport) -> Result<(), SimulationError> {
    if let Some(path) = &options.json {
        write_json(path, report).map_err(|source| SimulationError::Output { path: path.clone(), source })?;
        info!("Reporte JSON guardado en {}", path.display());
    }
    if let Some(path) = &options.csv {
        fs::write(path, render_cars_csv(&report.cars))
            .map_err(|source| SimulationError::Output { path: path.clone(), source })?;
        info!("Reporte CSV guardado en {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = env::args().collect();
    let bin = args.first().map(String::as_str).unwrap_or("petrol-station");

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("{}\nError: {}", usage(bin), e);
        process::exit(1);
    });

    if let Err(e) = run(&options) {
        error!("{}", e);
        process::exit(1);
    }
}
