use {
    crate::{
        analysis::{self, Report},
        catalog::{merge, PhaseIndex, PhaseIndexLoader},
        composite::{composite, Over, Reduction, TimeWindow},
        constants::ZERO_CELSIUS,
        experiment::{Experiment, Frequency, Phase},
        field::RawFieldReader,
        parameters::{DayWindow, Parameters},
        significance::ttest_ind,
        stats::{count_below, moving_average, nanmean},
        utils::{read_r8, write_r8},
    },
    approx::assert_abs_diff_eq,
    lazy_static::lazy_static,
    ndarray::{arr1, Array4, ArrayD, Axis},
    std::{fs, path::Path},
    tempdir::TempDir,
};

lazy_static! {
    /// `[10 members, 30 days, 4 lat, 4 lon]`: 5.0 in members 0, 2 and 4, 10.0
    /// in members 1 and 3 and a ramp in the rest
    static ref FIELD: ArrayD<f64> = Array4::from_shape_fn((10, 30, 4, 4), |(m, t, _, _)| {
        match m {
            0 | 2 | 4 => 5.0,
            1 | 3 => 10.0,
            _ => (m * t) as f64,
        }
    })
    .into_dyn();
}

const POSITIVE: [usize; 3] = [0, 2, 4];

mod composites {
    use super::*;

    #[test]
    fn constant_mean() {
        let mean = composite(
            FIELD.view(),
            &POSITIVE,
            &TimeWindow::range(0, 30),
            &Reduction::mean(),
        )
        .unwrap();

        assert_eq!(mean.shape(), &[30, 4, 4]);
        assert!(mean.iter().all(|&x| x == 5.0));
    }

    #[test]
    fn constant_percentile() {
        let p = composite(
            FIELD.view(),
            &POSITIVE,
            &TimeWindow::range(0, 30),
            &Reduction::percentile(10.0),
        )
        .unwrap();

        assert!(p.iter().all(|&x| x == 5.0));
    }

    #[test]
    fn deterministic() {
        let run = || {
            composite(
                FIELD.view(),
                &[9, 1, 6, 7],
                &TimeWindow::range(3, 27),
                &Reduction::Percentile(Over::Time, 37.5),
            )
            .unwrap()
        };

        let first = run();
        let second = run();

        assert!(first
            .iter()
            .zip(second.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn nan_member() {
        let mut field = FIELD.clone();
        field[[2, 0, 1, 1]] = f64::NAN;
        for m in 0..10 {
            field[[m, 0, 3, 3]] = f64::NAN;
        }

        let mean = composite(
            field.view(),
            &[0, 1, 2],
            &TimeWindow::All,
            &Reduction::mean(),
        )
        .unwrap();

        // Members 0 and 1 only
        assert_eq!(mean[[0, 1, 1]], 7.5);
        assert_eq!(mean[[0, 0, 0]], 20.0 / 3.0);
        assert!(mean[[0, 3, 3]].is_nan());
    }
}

mod reductions {
    use super::*;

    #[test]
    fn moving_average_first_window() {
        let series = arr1(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        let window = 4;
        let ave = moving_average(series.view(), window).unwrap();

        assert_eq!(ave.len(), series.len());
        assert!(ave.iter().take(window - 1).all(|x| x.is_nan()));
        assert_eq!(ave[window - 1], nanmean(series.slice(ndarray::s![..window])));
    }

    #[test]
    fn count_below_extremes() {
        let series = FIELD.index_axis(Axis(0), 9);
        let lane = series.index_axis(Axis(1), 0);
        let lane = lane.index_axis(Axis(1), 0);

        assert_eq!(count_below(lane.iter(), 1000.0), 30.0);
        assert_eq!(count_below(lane.iter(), -1.0), 0.0);
    }

    #[test]
    fn identical_ensembles() {
        let sample = FIELD.select(Axis(0), &[5, 6, 7, 8, 9]);
        let sig = ttest_ind(sample.view(), sample.view()).unwrap();

        // Day 0 has no spread, every other day has a zero statistic
        assert!(sig
            .p_value
            .iter()
            .all(|&p| (p - 1.0).abs() < 1.0E-12));
    }

    #[test]
    fn merged_indices_unique() {
        let merged = merge(&[0, 4, 99], &[0, 1, 99], 100).unwrap();
        let mut unique = merged.clone();
        unique.sort_unstable();
        unique.dedup();

        assert_eq!(unique.len(), merged.len());
        assert!(merge(&[0, 100], &[0], 100).is_err());
    }
}

/// Cold extremes read from catalogs and raw files on disk.
mod on_disk {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn archive(root: &Path, experiment: Experiment) -> std::path::PathBuf {
        root.join(experiment.name()).join(Frequency::Daily.directory())
    }

    /// Two members under each root, one day per index on a single grid cell.
    /// Perturbed experiments are one degree colder than the control.
    fn populate(primary: &Path, secondary: &Path) {
        for &experiment in [Experiment::Hit, Experiment::Fit, Experiment::Fict].iter() {
            let shift = if experiment == Experiment::Hit { 0.0 } else { -1.0 };

            for (root, first) in [(primary, 0), (secondary, 2)].iter() {
                write(
                    &archive(root, experiment).join("coordinates.yaml"),
                    "latitudes: [75.0]\nlongitudes: [10.0]\ntimes: [0.0, 1.0, 2.0, 3.0]\n",
                );

                for member in 1..=2 {
                    let values = (0..4)
                        .map(|t| ZERO_CELSIUS + shift + (t + first + member) as f64)
                        .collect::<Vec<_>>();
                    write_r8(
                        &archive(root, experiment)
                            .join(format!("{}{}", experiment, member))
                            .join(format!("T1000_{}.r8", member)),
                        values,
                    )
                    .unwrap();
                }

                for &phase in Phase::ALL.iter() {
                    let rows = match phase {
                        Phase::Positive => "0\n",
                        Phase::Neutral => "",
                        Phase::Negative => "1\n",
                    };
                    write(
                        &root
                            .join(experiment.name())
                            .join("monthly")
                            .join(format!("QBO_{}_{}.txt", phase.tag(), experiment)),
                        rows,
                    );
                }
            }
        }
    }

    #[test]
    fn cold_extremes() {
        let primary = TempDir::new("qbo-primary").unwrap();
        let secondary = TempDir::new("qbo-secondary").unwrap();
        let output = TempDir::new("qbo-output").unwrap();

        populate(primary.path(), secondary.path());

        let mut params = Parameters::default();
        params.environment.primary_root = primary.path().to_owned();
        params.environment.secondary_root = secondary.path().to_owned();
        params.environment.output_root = output.path().to_owned();
        params.catalog.merge_offset = 2;
        params.ensemble.primary_members = 2;
        params.ensemble.secondary_members = 2;
        params.analysis.daily_window = DayWindow { start: 0, end: 4 };
        params.validate().unwrap();

        let index = PhaseIndexLoader::new(&params);
        assert_eq!(index.load(Experiment::Fit, Phase::Positive).unwrap(), vec![0, 2]);

        let reader = RawFieldReader::from_parameters(&params, Frequency::Daily);
        let result = analysis::cold_extremes(&params, &index, &reader).unwrap();
        result.write(output.path()).unwrap();

        // Control percentile lies 0.3 above its coldest day, so the colder
        // experiments reach it on two days
        let fit = result.get(Experiment::Fit, Phase::Positive).unwrap();
        assert_abs_diff_eq!(fit.mean_count[[0, 0]], 2.0);

        let written = read_r8(output.path().join("cold_extremes/fit_pos_count.r8"));
        assert_eq!(written, vec![2.0]);
        assert_eq!(
            fs::read_to_string(output.path().join("cold_extremes/fit_pos_count.shape")).unwrap(),
            "1\n1\n"
        );
    }
}
