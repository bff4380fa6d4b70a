//! Location of the stratospheric polar vortex in each QBO phase, from the
//! seasonal 30 hPa geopotential height.

use {
    super::{Output, Report},
    crate::{
        catalog::PhaseIndex,
        composite::{
            align_members, minimum_location, paired_difference, reduce, select, Extremum,
            Reduction, TimeWindow,
        },
        error::Result,
        experiment::{Experiment, Level, Phase},
        field::FieldReader,
        parameters::Parameters,
        season::{seasonal, Period},
        stats::nanmean_axis,
    },
    log::{info, warn},
    ndarray::{arr1, ArrayD, Axis},
};

pub const VARIABLE: &str = "Z30";
pub const CONTROL: Experiment = Experiment::Hit;
pub const EXPERIMENTS: [Experiment; 3] = [Experiment::Hit, Experiment::Fit, Experiment::Fict];

/// Phase composites of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct Climatology {
    pub experiment: Experiment,
    pub phase: Phase,
    /// Ensemble mean, `[lat, lon]`
    pub mean: ArrayD<f64>,
    /// Grid point of the lowest height, `None` if every value is missing
    pub minimum: Option<Extremum>,
}

/// Ensemble mean of member-by-member differences from the control.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub experiment: Experiment,
    pub phase: Phase,
    pub mean: ArrayD<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VortexLocation {
    pub period: Period,
    pub climatologies: Vec<Climatology>,
    pub differences: Vec<Difference>,
}

impl VortexLocation {
    pub fn climatology(&self, experiment: Experiment, phase: Phase) -> Option<&Climatology> {
        self.climatologies
            .iter()
            .find(|c| c.experiment == experiment && c.phase == phase)
    }

    pub fn difference(&self, experiment: Experiment, phase: Phase) -> Option<&Difference> {
        self.differences
            .iter()
            .find(|d| d.experiment == experiment && d.phase == phase)
    }
}

impl Report for VortexLocation {
    fn name(&self) -> &'static str {
        "vortex_location"
    }

    fn outputs(&self) -> Vec<Output> {
        let name = |kind: &str, experiment: Experiment, phase: Phase| {
            format!(
                "{}_{}_{}_{}",
                kind,
                experiment.name().to_lowercase(),
                phase.tag(),
                self.period
            )
        };

        let climatologies = self
            .climatologies
            .iter()
            .map(|c| Output::new(name("climo", c.experiment, c.phase), c.mean.clone()));

        let differences = self.differences.iter().map(|d| {
            Output::new(name("diff", d.experiment, d.phase), d.mean.clone())
        });

        // Latitude, longitude and height of every minimum
        let minima = self.climatologies.iter().filter_map(|c| {
            c.minimum.map(|m| {
                Output::new(
                    name("min", c.experiment, c.phase),
                    arr1(&[m.latitude, m.longitude, m.value]).into_dyn(),
                )
            })
        });

        climatologies.chain(differences).chain(minima).collect()
    }
}

/// Members of each phase with a complete season. A season crossing the year
/// pairs every December with the following member, so the last member has
/// none and is dropped. Any other index is passed on and checked when
/// selected.
fn phase_members(
    index: &dyn PhaseIndex,
    experiment: Experiment,
    phase: Phase,
    period: Period,
    members: usize,
) -> Result<Vec<usize>> {
    let mut indices = index.load(experiment, phase)?;

    if period.crosses_year() && indices.contains(&members) {
        indices.retain(|&m| m != members);
        warn!(
            "{} {}: member {} has no complete {} season",
            experiment,
            phase.label(),
            members,
            period
        );
    }

    Ok(indices)
}

pub fn vortex_location(
    parameters: &Parameters,
    index: &dyn PhaseIndex,
    reader: &dyn FieldReader,
) -> Result<VortexLocation> {
    let period = parameters.analysis.period;

    let mut seasons = Vec::with_capacity(EXPERIMENTS.len());
    for &experiment in EXPERIMENTS.iter() {
        let field = reader.read(VARIABLE, experiment, Level::Surface)?;
        let season = seasonal(field.data.view(), period)?;

        info!("{} {} season: {:?}", experiment, period, season.shape());

        seasons.push((experiment, field, season));
    }

    let mut climatologies = Vec::new();
    let mut differences = Vec::new();

    for &phase in Phase::ALL.iter() {
        let mut composites = Vec::with_capacity(seasons.len());

        for (experiment, field, season) in &seasons {
            let members = phase_members(index, *experiment, phase, period, season.len_of(Axis(0)))?;
            let selection = select(season.view(), &members, &TimeWindow::All)?;
            let mean = reduce(selection.view(), &Reduction::mean())?;
            let minimum = minimum_location(mean.view(), &field.latitudes, &field.longitudes)?;

            climatologies.push(Climatology {
                experiment: *experiment,
                phase,
                mean,
                minimum,
            });
            composites.push((*experiment, selection));
        }

        let control = composites
            .iter()
            .find(|(experiment, _)| *experiment == CONTROL)
            .map(|(_, selection)| selection);

        if let Some(control) = control {
            for (experiment, selection) in composites.iter().filter(|(e, _)| *e != CONTROL) {
                let (perturbed, control) = align_members(selection.view(), control.view());
                let diff = paired_difference(perturbed.view(), control.view())?;

                differences.push(Difference {
                    experiment: *experiment,
                    phase,
                    mean: nanmean_axis(diff.view(), Axis(0)),
                });
            }
        }
    }

    Ok(VortexLocation {
        period,
        climatologies,
        differences,
    })
}
