//! Stationarity of the Holton-Tan relationship across the ensemble.
//!
//! The Holton-Tan effect is the weaker polar vortex under the easterly QBO.
//! Its strength in every member is the time mean of the 30 hPa zonal wind
//! difference between QBO-E and QBO-W members, and a rolling mean over
//! consecutive members shows whether it drifts.

use {
    super::{Output, Report},
    crate::{
        catalog::PhaseIndex,
        composite::{
            align_members, cross_year, paired_difference, reduce, select, Over, Reduction,
            TimeWindow,
        },
        constants::{CROSS_YEAR_HEAD, CROSS_YEAR_TAIL},
        error::Result,
        experiment::{Experiment, Level, Phase},
        field::FieldReader,
        parameters::Parameters,
    },
    log::info,
    ndarray::{Array1, ArrayD, Ix1},
};

pub const VARIABLE: &str = "U";

#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleDrift {
    pub experiment: Experiment,
    /// Per member QBO-E minus QBO-W time mean
    pub difference: Array1<f64>,
    /// Trailing mean of `difference`, NaN until the window fills
    pub moving_average: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stationarity {
    pub window: usize,
    pub experiments: Vec<EnsembleDrift>,
}

impl Stationarity {
    pub fn get(&self, experiment: Experiment) -> Option<&EnsembleDrift> {
        self.experiments.iter().find(|e| e.experiment == experiment)
    }
}

impl Report for Stationarity {
    fn name(&self) -> &'static str {
        "stationarity"
    }

    fn outputs(&self) -> Vec<Output> {
        self.experiments
            .iter()
            .flat_map(|e| {
                let name = e.experiment.name().to_lowercase();
                vec![
                    Output::new(format!("{}_diff", name), e.difference.clone().into_dyn()),
                    Output::new(
                        format!("{}_moving{}", name, self.window),
                        e.moving_average.clone().into_dyn(),
                    ),
                ]
            })
            .collect()
    }
}

/// Time steps of `phase` members, `[member, time]`.
fn phase_window(
    data: &ArrayD<f64>,
    members: &[usize],
    window: &TimeWindow,
    crosses_year: bool,
) -> Result<ArrayD<f64>> {
    if crosses_year {
        cross_year(data.view(), members, CROSS_YEAR_TAIL, CROSS_YEAR_HEAD)
    } else {
        select(data.view(), members, window)
    }
}

pub fn stationarity(
    parameters: &Parameters,
    index: &dyn PhaseIndex,
    reader: &dyn FieldReader,
) -> Result<Stationarity> {
    let analysis = &parameters.analysis;
    let window = TimeWindow::range(analysis.daily_window.start, analysis.daily_window.end);

    let mut experiments = Vec::with_capacity(analysis.experiments.len());

    for &experiment in &analysis.experiments {
        let field = reader
            .read(VARIABLE, experiment, Level::Profile)?
            .select_level(analysis.profile_level)?;

        // Single-source runs are continuous, so their winters span two members
        let crosses_year = parameters.catalog.single_source.contains(&experiment);

        let negative = phase_window(
            &field.data,
            &index.load(experiment, Phase::Negative)?,
            &window,
            crosses_year,
        )?;
        let positive = phase_window(
            &field.data,
            &index.load(experiment, Phase::Positive)?,
            &window,
            crosses_year,
        )?;

        let (negative, positive) = align_members(negative.view(), positive.view());
        let difference = reduce(
            paired_difference(negative.view(), positive.view())?.view(),
            &Reduction::Mean(Over::Time),
        )?;
        let moving_average = reduce(
            difference.view(),
            &Reduction::MovingAverage(analysis.moving_window),
        )?;

        info!(
            "{}: Holton-Tan difference over {} members",
            experiment,
            difference.len()
        );

        experiments.push(EnsembleDrift {
            experiment,
            difference: difference.into_dimensionality::<Ix1>()?,
            moving_average: moving_average.into_dimensionality::<Ix1>()?,
        });
    }

    Ok(Stationarity {
        window: analysis.moving_window,
        experiments,
    })
}
