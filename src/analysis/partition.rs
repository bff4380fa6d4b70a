//! Consistency check of the phase catalogs against the ensemble size.

use {
    crate::{
        catalog::{PartitionReport, PhaseIndex},
        error::Result,
        experiment::Experiment,
        parameters::{ensemble_len, Parameters},
    },
    log::info,
};

/// Loads every phase of each configured experiment and checks the phases
/// split the members its storage blocks hold.
pub fn partition(
    parameters: &Parameters,
    index: &dyn PhaseIndex,
) -> Result<Vec<(Experiment, PartitionReport)>> {
    parameters
        .analysis
        .experiments
        .iter()
        .map(|&experiment| {
            let blocks = parameters.member_blocks(experiment);
            let ranges = blocks.iter().map(|b| b.indices()).collect::<Vec<_>>();

            let report = index.load_all(experiment)?.partition_ranges(&ranges);

            if report.is_partition() {
                info!(
                    "{} phases partition {} members in {:?}",
                    experiment,
                    ensemble_len(&blocks),
                    ranges
                );
            }

            Ok((experiment, report))
        })
        .collect()
}
