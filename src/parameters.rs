use {
    crate::{
        constants::DEFAULT_MERGE_OFFSET,
        error::{Error, Result},
        experiment::Experiment,
        season::Period,
    },
    serde::Deserialize,
    std::{ops::Range, path::PathBuf},
};

/// Analysis parameters
#[derive(Debug, PartialEq, Default, Deserialize)]
pub struct Parameters {
    pub environment: Environment,
    pub catalog: Catalog,
    pub ensemble: Ensemble,
    pub analysis: Analysis,
}

impl Parameters {
    /// Rejects combinations the pipelines cannot run with.
    pub fn validate(&self) -> Result<()> {
        for &experiment in Experiment::ALL.iter() {
            for pair in self.member_blocks(experiment).windows(2) {
                if pair[1].start < pair[0].indices().end {
                    return Err(Error::InvalidParameters(format!(
                        "merge offset {} would overlap the {} members of {} stored under {}",
                        self.catalog.merge_offset,
                        pair[0].members,
                        experiment,
                        pair[0].root.display()
                    )));
                }
            }
        }

        let percentile = self.analysis.percentile;
        if !(0.0..=100.0).contains(&percentile) {
            return Err(Error::InvalidPercentile(percentile));
        }

        if self.analysis.moving_window == 0 {
            return Err(Error::InvalidWindow(0));
        }

        let days = &self.analysis.daily_window;
        if days.start >= days.end {
            return Err(Error::InvalidParameters(format!(
                "daily window {}..{} is empty",
                days.start, days.end
            )));
        }

        if !(0.0..=1.0).contains(&self.analysis.significance_level) {
            return Err(Error::InvalidParameters(format!(
                "significance level {} is outside [0, 1]",
                self.analysis.significance_level
            )));
        }

        Ok(())
    }

    /// Storage of an experiment's members in merged index order.
    ///
    /// Single-source experiments keep the whole ensemble under the primary
    /// root. Otherwise the block under the second root starts at the merge
    /// offset, and experiments with swapped roots list the secondary root
    /// first.
    pub fn member_blocks(&self, experiment: Experiment) -> Vec<MemberBlock> {
        let environment = &self.environment;
        let ensemble = &self.ensemble;

        if self.catalog.single_source.contains(&experiment) {
            return vec![MemberBlock {
                root: environment.primary_root.clone(),
                start: 0,
                members: ensemble.total(),
            }];
        }

        let primary = (environment.primary_root.clone(), ensemble.primary_members);
        let secondary = (environment.secondary_root.clone(), ensemble.secondary_members);

        let ((first, first_members), (second, second_members)) =
            if self.catalog.swapped_roots.contains(&experiment) {
                (secondary, primary)
            } else {
                (primary, secondary)
            };

        vec![
            MemberBlock {
                root: first,
                start: 0,
                members: first_members,
            },
            MemberBlock {
                root: second,
                start: self.catalog.merge_offset,
                members: second_members,
            },
        ]
    }
}

/// Members stored under one root, numbered from 1 on disk and from `start`
/// in the merged ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberBlock {
    pub root: PathBuf,
    pub start: usize,
    pub members: usize,
}

impl MemberBlock {
    /// Merged indices of the block
    pub fn indices(&self) -> Range<usize> {
        self.start..self.start + self.members
    }
}

/// Length of the merged ensemble, gaps between blocks included.
pub fn ensemble_len(blocks: &[MemberBlock]) -> usize {
    blocks.iter().map(|b| b.indices().end).max().unwrap_or(0)
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Environment {
    /// Root holding the first block of ensemble members and their catalogs
    pub primary_root: PathBuf,
    /// Root holding the second block of ensemble members and their catalogs
    pub secondary_root: PathBuf,
    /// Directory composites are written to
    pub output_root: PathBuf,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            primary_root: PathBuf::from("data/primary"),
            secondary_root: PathBuf::from("data/secondary"),
            output_root: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Catalog {
    /// Added to every index read from the secondary catalog
    pub merge_offset: usize,
    /// Experiments whose primary catalog lives under the secondary root
    pub swapped_roots: Vec<Experiment>,
    /// Experiments classified by a single catalog under the primary root
    pub single_source: Vec<Experiment>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            merge_offset: DEFAULT_MERGE_OFFSET,
            swapped_roots: vec![Experiment::Fsub, Experiment::Fpol],
            single_source: vec![Experiment::Ctlq],
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Ensemble {
    /// Number of members stored under the primary root
    pub primary_members: usize,
    /// Number of members stored under the secondary root
    pub secondary_members: usize,
}

impl Ensemble {
    pub fn total(&self) -> usize {
        self.primary_members + self.secondary_members
    }
}

impl Default for Ensemble {
    fn default() -> Self {
        Ensemble {
            primary_members: 100,
            secondary_members: 100,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Analysis {
    /// Percentile defining a cold extreme
    pub percentile: f64,
    /// p-value above which differences are masked
    pub significance_level: f64,
    /// Number of ensemble members in the rolling mean
    pub moving_window: usize,
    /// Pressure level (hPa) of profile variables
    pub profile_level: f64,
    /// Season of monthly composites
    pub period: Period,
    /// Day-of-year indices of daily composites
    pub daily_window: DayWindow,
    /// Experiments included in the stationarity analysis
    pub experiments: Vec<Experiment>,
}

impl Default for Analysis {
    fn default() -> Self {
        Analysis {
            percentile: 10.0,
            significance_level: 0.05,
            moving_window: 40,
            profile_level: 30.0,
            period: Period::Dj,
            daily_window: DayWindow::default(),
            experiments: Experiment::ALL.to_vec(),
        }
    }
}

/// Half-open range of day indices
#[derive(Debug, PartialEq, Deserialize)]
pub struct DayWindow {
    pub start: usize,
    pub end: usize,
}

impl Default for DayWindow {
    fn default() -> Self {
        // December, with day 0 on 1 September
        DayWindow { start: 90, end: 120 }
    }
}

#[cfg(test)]
mod test {
    use {super::*, std::fs::File};

    #[test]
    fn defaults() {
        assert_eq!(
            Parameters::default(),
            serde_yaml::from_reader::<_, Parameters>(
                File::open("src/testdata/defaults.yaml").unwrap()
            )
            .unwrap()
        );
    }

    #[test]
    fn defaults_are_valid() {
        Parameters::default().validate().unwrap();
    }

    #[test]
    fn overlapping_offset() {
        let mut params = Parameters::default();
        params.catalog.merge_offset = 99;

        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn swapped_roots_overlap() {
        let mut params = Parameters::default();
        params.ensemble.primary_members = 90;
        params.ensemble.secondary_members = 110;

        // FSUB stores its first 110 members under the secondary root
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn blocks_follow_catalogs() {
        let mut params = Parameters::default();
        params.ensemble.primary_members = 2;
        params.ensemble.secondary_members = 3;
        params.catalog.merge_offset = 4;
        params.validate().unwrap();

        let hit = params.member_blocks(Experiment::Hit);
        assert_eq!(hit[0].root, params.environment.primary_root);
        assert_eq!(hit[0].indices(), 0..2);
        assert_eq!(hit[1].root, params.environment.secondary_root);
        assert_eq!(hit[1].indices(), 4..7);
        assert_eq!(ensemble_len(&hit), 7);

        let fsub = params.member_blocks(Experiment::Fsub);
        assert_eq!(fsub[0].root, params.environment.secondary_root);
        assert_eq!(fsub[0].indices(), 0..3);
        assert_eq!(fsub[1].indices(), 4..6);

        let ctlq = params.member_blocks(Experiment::Ctlq);
        assert_eq!(ctlq.len(), 1);
        assert_eq!(ctlq[0].root, params.environment.primary_root);
        assert_eq!(ctlq[0].indices(), 0..5);
    }

    #[test]
    fn bad_percentile() {
        let mut params = Parameters::default();
        params.analysis.percentile = 101.0;

        assert!(matches!(
            params.validate(),
            Err(Error::InvalidPercentile(_))
        ));
    }

    #[test]
    fn empty_day_window() {
        let mut params = Parameters::default();
        params.analysis.daily_window = DayWindow { start: 120, end: 90 };

        assert!(params.validate().is_err());
    }
}
