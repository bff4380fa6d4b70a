#[macro_use]
extern crate clap;

use {
    anyhow::{bail, Result},
    log::{error, info},
    qbo_composites::{
        analysis::{self, Report},
        catalog::PhaseIndexLoader,
        experiment::Frequency,
        field::RawFieldReader,
        parameters::Parameters,
        season::Period,
    },
    simplelog::{Config as LogConfig, LevelFilter, TermLogger, TerminalMode},
    std::fs::{create_dir_all, File},
};

#[quit::main]
fn main() {
    let matches = clap_app!(qbo_composites =>
        (version: crate_version!())
        (@arg PARAMETERS: -p --parameters +takes_value +required "Path to file containing analysis parameters.")
        (@subcommand cold_extremes =>
            (about: "Counts days below the control's low percentile of T1000 in the sea ice experiments.")
        )
        (@subcommand vortex_location =>
            (about: "Composites seasonal Z30 by QBO phase and locates the polar vortex.")
            (@arg PERIOD: --period +takes_value "Season to composite, overriding the parameters file (ON, DJ, FM, DJF, M, D, N, ND).")
        )
        (@subcommand stationarity =>
            (about: "Rolling ensemble mean of the Holton-Tan U30 difference.")
        )
        (@subcommand partition =>
            (about: "Checks the QBO phase catalogs partition each ensemble.")
        )
    )
    .get_matches();

    TermLogger::init(
        LevelFilter::Debug,
        LogConfig::default(),
        TerminalMode::Mixed,
    )
    .expect("Failed to initialize logger");

    let mut params = {
        // Should never panic as clap should return an error if the argument was not supplied
        let path = matches
            .value_of("PARAMETERS")
            .expect("Path to parameters file not supplied");

        let file = File::open(path).unwrap_or_else(|e| {
            error!("Failed to open {}: \"{}\"", path, e);
            quit::with_code(1);
        });

        let params = serde_yaml::from_reader::<_, Parameters>(file).unwrap_or_else(|e| {
            error!("Failed to parse parameters from {}: \"{}\"", path, e);
            quit::with_code(1);
        });

        info!(
            "Successfully loaded analysis parameters from \"{}\": \n{:#?}",
            path, params
        );

        params
    };

    if let Some(period) = matches
        .subcommand_matches("vortex_location")
        .and_then(|m| m.value_of("PERIOD"))
    {
        params.analysis.period = period.parse::<Period>().unwrap_or_else(|e| {
            error!("{}", e);
            quit::with_code(1);
        });
    }

    if let Err(e) = params.validate() {
        error!("Invalid parameters: \"{}\"", e);
        quit::with_code(1);
    }

    run_subcommand(matches.subcommand_name(), params).unwrap_or_else(|e| {
        error!("Error: \"{}\"", e);
        quit::with_code(1);
    });
}

fn run_subcommand(subcmd: Option<&str>, params: Parameters) -> Result<()> {
    let subcmd = match subcmd {
        Some(s) => s,
        None => bail!("No subcommand selected"),
    };

    let output = &params.environment.output_root;
    create_dir_all(output)?;

    let index = PhaseIndexLoader::new(&params);

    info!("Starting {}", subcmd);

    match subcmd {
        "cold_extremes" => {
            let reader = RawFieldReader::from_parameters(&params, Frequency::Daily);
            analysis::cold_extremes(&params, &index, &reader)?.write(output)?;
        }
        "vortex_location" => {
            let reader = RawFieldReader::from_parameters(&params, Frequency::Monthly);
            let result = analysis::vortex_location(&params, &index, &reader)?;

            for climatology in &result.climatologies {
                if let Some(min) = climatology.minimum {
                    info!(
                        "{} {} vortex minimum {:.1} m at {:.1}N {:.1}E",
                        climatology.experiment,
                        climatology.phase.label(),
                        min.value,
                        min.latitude,
                        min.longitude
                    );
                }
            }

            result.write(output)?;
        }
        "stationarity" => {
            let reader = RawFieldReader::from_parameters(&params, Frequency::Daily);
            analysis::stationarity(&params, &index, &reader)?.write(output)?;
        }
        "partition" => {
            let reports = analysis::partition(&params, &index)?;
            let failed = reports.iter().filter(|(_, r)| !r.is_partition()).count();

            if failed > 0 {
                bail!("{} of {} experiments have inconsistent phase catalogs", failed, reports.len());
            }
        }
        _ => bail!("Unknown subcommand {}", subcmd),
    }

    info!("Finished {}", subcmd);

    Ok(())
}
