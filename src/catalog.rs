//! QBO phase catalogs.
//!
//! Each experiment classifies its ensemble members into the three QBO phases
//! with plain-text files named `QBO_<tag>_<EXPERIMENT>.txt`, one member index
//! per row. The members are split over two storage roots, so the catalog under
//! the secondary root is merged in after shifting its indices past those of
//! the primary root.

use {
    crate::{
        error::{Error, Result},
        experiment::{Experiment, Phase},
        parameters::Parameters,
    },
    log::{debug, info, warn},
    std::{
        collections::{BTreeMap, BTreeSet, HashMap},
        fs,
        io::ErrorKind,
        ops::Range,
        path::{Path, PathBuf},
    },
};

/// A directory tree holding phase catalog files.
pub trait CatalogSource {
    fn root(&self) -> &Path;

    fn location(&self, experiment: Experiment, phase: Phase) -> PathBuf {
        self.root()
            .join(experiment.name())
            .join("monthly")
            .join(format!("QBO_{}_{}.txt", phase.tag(), experiment))
    }

    /// Member indices as they appear in the file.
    fn read(&self, experiment: Experiment, phase: Phase) -> Result<Vec<usize>> {
        let path = self.location(experiment, phase);

        let contents = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::MissingCatalog {
                experiment,
                phase,
                path: path.clone(),
            },
            _ => Error::Io(e),
        })?;

        let indices = parse(&contents).map_err(|(line, content)| Error::MalformedCatalog {
            experiment,
            phase,
            path: path.clone(),
            line,
            content,
        })?;

        debug!(
            "Read {} {} members of {} from {}",
            indices.len(),
            phase,
            experiment,
            path.display()
        );

        Ok(indices)
    }
}

/// Catalog stored alongside the first block of ensemble members.
#[derive(Debug, Clone)]
pub struct PrimaryCatalog {
    root: PathBuf,
}

impl PrimaryCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl CatalogSource for PrimaryCatalog {
    fn root(&self) -> &Path {
        &self.root
    }
}

/// Catalog stored alongside the second block of ensemble members, whose
/// indices restart at zero.
#[derive(Debug, Clone)]
pub struct SecondaryCatalog {
    root: PathBuf,
}

impl SecondaryCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl CatalogSource for SecondaryCatalog {
    fn root(&self) -> &Path {
        &self.root
    }
}

/// Parses column 0 of every non-blank, non-comment row.
///
/// On failure returns the 1-based line number and the offending row.
fn parse(contents: &str) -> std::result::Result<Vec<usize>, (usize, String)> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let row = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            row.split_whitespace().next().map(|first| (i + 1, line, first))
        })
        .map(|(line_number, line, first)| {
            first
                .parse::<usize>()
                .map_err(|_| (line_number, line.trim().to_owned()))
        })
        .collect()
}

/// Concatenates `primary` with `secondary` shifted by `offset`.
pub fn merge(primary: &[usize], secondary: &[usize], offset: usize) -> Result<Vec<usize>> {
    if let Some(&max_primary) = primary.iter().max() {
        if offset <= max_primary {
            return Err(Error::InvalidMergeOffset {
                offset,
                max_primary,
            });
        }
    }

    Ok(primary
        .iter()
        .copied()
        .chain(secondary.iter().map(|i| i + offset))
        .collect())
}

/// Loads merged phase indices for any experiment.
#[derive(Debug, Clone)]
pub struct PhaseIndexLoader {
    primary: PrimaryCatalog,
    secondary: SecondaryCatalog,
    offset: usize,
    swapped_roots: Vec<Experiment>,
    single_source: Vec<Experiment>,
}

impl PhaseIndexLoader {
    pub fn new(parameters: &Parameters) -> Self {
        Self {
            primary: PrimaryCatalog::new(&parameters.environment.primary_root),
            secondary: SecondaryCatalog::new(&parameters.environment.secondary_root),
            offset: parameters.catalog.merge_offset,
            swapped_roots: parameters.catalog.swapped_roots.clone(),
            single_source: parameters.catalog.single_source.clone(),
        }
    }
}

/// Source of the member indices of each QBO phase.
pub trait PhaseIndex {
    fn load(&self, experiment: Experiment, phase: Phase) -> Result<Vec<usize>>;

    fn load_all(&self, experiment: Experiment) -> Result<PhaseCatalog> {
        Ok(PhaseCatalog {
            experiment,
            positive: self.load(experiment, Phase::Positive)?,
            neutral: self.load(experiment, Phase::Neutral)?,
            negative: self.load(experiment, Phase::Negative)?,
        })
    }
}

impl PhaseIndex for PhaseIndexLoader {
    fn load(&self, experiment: Experiment, phase: Phase) -> Result<Vec<usize>> {
        if self.single_source.contains(&experiment) {
            return self.primary.read(experiment, phase);
        }

        let (first, second) = if self.swapped_roots.contains(&experiment) {
            (
                self.secondary.read(experiment, phase)?,
                self.primary.read(experiment, phase)?,
            )
        } else {
            (
                self.primary.read(experiment, phase)?,
                self.secondary.read(experiment, phase)?,
            )
        };

        let merged = merge(&first, &second, self.offset)?;

        info!(
            "Loaded {} {} members for {} ({} + {})",
            merged.len(),
            phase.label(),
            experiment,
            first.len(),
            second.len()
        );

        Ok(merged)
    }
}

/// Phase indices held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    phases: HashMap<(Experiment, Phase), Vec<usize>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, experiment: Experiment, phase: Phase, members: Vec<usize>) {
        self.phases.insert((experiment, phase), members);
    }
}

impl PhaseIndex for MemoryIndex {
    fn load(&self, experiment: Experiment, phase: Phase) -> Result<Vec<usize>> {
        self.phases
            .get(&(experiment, phase))
            .cloned()
            .ok_or_else(|| Error::MissingCatalog {
                experiment,
                phase,
                path: PathBuf::new(),
            })
    }
}

/// Merged member indices of every phase of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCatalog {
    pub experiment: Experiment,
    pub positive: Vec<usize>,
    pub neutral: Vec<usize>,
    pub negative: Vec<usize>,
}

impl PhaseCatalog {
    pub fn get(&self, phase: Phase) -> &[usize] {
        match phase {
            Phase::Positive => &self.positive,
            Phase::Neutral => &self.neutral,
            Phase::Negative => &self.negative,
        }
    }

    /// Checks the phases split an ensemble of `members` into disjoint sets.
    pub fn partition(&self, members: usize) -> PartitionReport {
        self.partition_ranges(&[0..members])
    }

    /// As [`partition`](Self::partition) for an ensemble whose members hold
    /// the indices in `ranges`.
    pub fn partition_ranges(&self, ranges: &[Range<usize>]) -> PartitionReport {
        let members = ranges.iter().map(|r| r.len()).sum::<usize>();
        let mut report = PartitionReport::default();
        let mut owner = BTreeMap::<usize, Phase>::new();

        for &phase in Phase::ALL.iter() {
            let mut seen = BTreeSet::new();

            for &index in self.get(phase) {
                if !ranges.iter().any(|r| r.contains(&index)) {
                    report.out_of_range.push(index);
                }

                if !seen.insert(index) {
                    report.duplicates.push((phase, index));
                    continue;
                }

                if let Some(&other) = owner.get(&index) {
                    report.overlapping.push((other, phase, index));
                } else {
                    owner.insert(index, phase);
                }
            }
        }

        report.unclassified = ranges
            .iter()
            .cloned()
            .flatten()
            .filter(|i| !owner.contains_key(i))
            .collect();

        if !report.is_partition() {
            warn!(
                "{} phases do not partition {} members: {}",
                self.experiment, members, report
            );
        }

        report
    }
}

/// Ways in which phase catalogs fail to partition an ensemble.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionReport {
    /// Index listed more than once within a phase
    pub duplicates: Vec<(Phase, usize)>,
    /// Index listed under two phases
    pub overlapping: Vec<(Phase, Phase, usize)>,
    /// Member listed under no phase
    pub unclassified: Vec<usize>,
    /// Index past the end of the ensemble
    pub out_of_range: Vec<usize>,
}

impl PartitionReport {
    pub fn is_partition(&self) -> bool {
        self.duplicates.is_empty()
            && self.overlapping.is_empty()
            && self.unclassified.is_empty()
            && self.out_of_range.is_empty()
    }
}

impl std::fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} duplicated, {} overlapping, {} unclassified, {} out of range",
            self.duplicates.len(),
            self.overlapping.len(),
            self.unclassified.len(),
            self.out_of_range.len()
        )
    }
}
