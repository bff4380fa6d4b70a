//! Frequency of cold extremes in the perturbed sea ice experiments.
//!
//! For each ensemble member, a cold extreme is a day colder than the
//! member's own low percentile of 1000 hPa temperature in the control
//! experiment. Counting such days in the perturbed experiments shows how much
//! more often the control's extremes are reached.

use {
    super::{Output, Report},
    crate::{
        catalog::PhaseIndex,
        composite::{align_members, reduce, select, Over, Reduction, TimeWindow},
        error::Result,
        experiment::{Experiment, Level, Phase},
        field::FieldReader,
        parameters::Parameters,
        significance::{ttest_ind, Significance},
        stats::nanmean_axis,
    },
    log::info,
    ndarray::{ArrayD, Axis},
};

pub const VARIABLE: &str = "T1000";
pub const CONTROL: Experiment = Experiment::Hit;
pub const PERTURBED: [Experiment; 2] = [Experiment::Fit, Experiment::Fict];
pub const PHASES: [Phase; 2] = [Phase::Positive, Phase::Negative];

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseExtremes {
    pub experiment: Experiment,
    pub phase: Phase,
    /// Ensemble mean number of days below the control percentile, `[lat, lon]`
    pub mean_count: ArrayD<f64>,
    /// Perturbed against control percentiles
    pub significance: Significance,
    /// `mean_count` where the percentiles differ significantly
    pub masked_count: ArrayD<f64>,
}

impl PhaseExtremes {
    fn prefix(&self) -> String {
        format!(
            "{}_{}",
            self.experiment.name().to_lowercase(),
            self.phase.tag()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColdExtremes {
    pub phases: Vec<PhaseExtremes>,
}

impl ColdExtremes {
    pub fn get(&self, experiment: Experiment, phase: Phase) -> Option<&PhaseExtremes> {
        self.phases
            .iter()
            .find(|p| p.experiment == experiment && p.phase == phase)
    }
}

impl Report for ColdExtremes {
    fn name(&self) -> &'static str {
        "cold_extremes"
    }

    fn outputs(&self) -> Vec<Output> {
        self.phases
            .iter()
            .flat_map(|p| {
                let prefix = p.prefix();
                vec![
                    Output::new(format!("{}_count", prefix), p.mean_count.clone()),
                    Output::new(format!("{}_pvalue", prefix), p.significance.p_value.clone()),
                    Output::new(format!("{}_masked", prefix), p.masked_count.clone()),
                ]
            })
            .collect()
    }
}

pub fn cold_extremes(
    parameters: &Parameters,
    index: &dyn PhaseIndex,
    reader: &dyn FieldReader,
) -> Result<ColdExtremes> {
    let analysis = &parameters.analysis;
    let window = TimeWindow::range(analysis.daily_window.start, analysis.daily_window.end);
    let percentile = Reduction::Percentile(Over::Time, analysis.percentile);

    let mut control = reader.read(VARIABLE, CONTROL, Level::Surface)?;
    control.to_celsius();

    let mut perturbed = Vec::with_capacity(PERTURBED.len());
    for &experiment in PERTURBED.iter() {
        let mut field = reader.read(VARIABLE, experiment, Level::Surface)?;
        field.to_celsius();
        perturbed.push(field);
    }

    let mut phases = Vec::new();

    for &phase in PHASES.iter() {
        let members = index.load(CONTROL, phase)?;
        let reference = reduce(
            select(control.data.view(), &members, &window)?.view(),
            &percentile,
        )?;

        for field in &perturbed {
            let members = index.load(field.experiment, phase)?;
            let selection = select(field.data.view(), &members, &window)?;
            let extremes = reduce(selection.view(), &percentile)?;

            // Member n is compared with the control's member n
            let (selection, threshold) = align_members(selection.view(), reference.view());
            let counts = reduce(selection.view(), &Reduction::CountBelow(threshold))?;
            let mean_count = nanmean_axis(counts.view(), Axis(0));

            let significance = ttest_ind(extremes.view(), reference.view())?;
            let masked_count = significance.mask(mean_count.view(), analysis.significance_level)?;

            info!(
                "{} {}: {} of {} grid points differ significantly",
                field.experiment,
                phase.label(),
                significance.count(analysis.significance_level),
                significance.p_value.len()
            );

            phases.push(PhaseExtremes {
                experiment: field.experiment,
                phase,
                mean_count,
                significance,
                masked_count,
            });
        }
    }

    Ok(ColdExtremes { phases })
}
