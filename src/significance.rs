//! Welch's unequal-variance t-test between two ensembles.

use {
    crate::{
        error::{Error, Result},
        stats::{distribution::student_t_two_sided, nanmoments},
    },
    ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, Zip},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
}

impl TTest {
    const UNDEFINED: TTest = TTest {
        statistic: f64::NAN,
        p_value: f64::NAN,
    };
}

/// Welch's t-test on the non-NaN samples of `a` and `b`.
///
/// Undefined (NaN) unless both samples hold at least two values. Samples
/// without spread give a statistic of zero when their means agree and an
/// infinite one otherwise.
pub fn welch(a: ArrayView1<f64>, b: ArrayView1<f64>) -> TTest {
    let (na, mean_a, var_a) = nanmoments(a);
    let (nb, mean_b, var_b) = nanmoments(b);

    if na < 2 || nb < 2 {
        return TTest::UNDEFINED;
    }

    let sa = var_a / na as f64;
    let sb = var_b / nb as f64;
    let se2 = sa + sb;

    if se2 == 0.0 {
        return if mean_a == mean_b {
            TTest {
                statistic: 0.0,
                p_value: 1.0,
            }
        } else {
            TTest {
                statistic: (mean_a - mean_b).signum() * f64::INFINITY,
                p_value: 0.0,
            }
        };
    }

    let statistic = (mean_a - mean_b) / se2.sqrt();

    // Welch-Satterthwaite degrees of freedom
    let df = se2 * se2 / (sa * sa / (na - 1) as f64 + sb * sb / (nb - 1) as f64);

    TTest {
        statistic,
        p_value: student_t_two_sided(statistic, df),
    }
}

/// Per grid point t-test results.
#[derive(Debug, Clone, PartialEq)]
pub struct Significance {
    pub statistic: ArrayD<f64>,
    pub p_value: ArrayD<f64>,
}

impl Significance {
    /// Copy of `values` with NaN wherever the difference is not significant
    /// at level `alpha`.
    pub fn mask(&self, values: ArrayViewD<f64>, alpha: f64) -> Result<ArrayD<f64>> {
        if values.shape() != self.p_value.shape() {
            return Err(Error::shape_mismatch(self.p_value.shape(), values.shape()));
        }

        Ok(Zip::from(&values)
            .and(&self.p_value)
            .map_collect(|&v, &p| if p <= alpha { v } else { f64::NAN }))
    }

    /// Number of grid points significant at level `alpha`
    pub fn count(&self, alpha: f64) -> usize {
        self.p_value.iter().filter(|&&p| p <= alpha).count()
    }
}

/// Independent two-sample t-test along the ensemble axis.
///
/// `a` and `b` are `[member, ...]` and may hold different numbers of
/// members, but must agree on every other axis.
pub fn ttest_ind(a: ArrayViewD<f64>, b: ArrayViewD<f64>) -> Result<Significance> {
    if a.ndim() == 0 || a.ndim() != b.ndim() || a.shape()[1..] != b.shape()[1..] {
        return Err(Error::shape_mismatch(a.shape(), b.shape()));
    }

    let tests: ArrayD<TTest> = Zip::from(a.lanes(Axis(0)))
        .and(b.lanes(Axis(0)))
        .par_map_collect(welch);

    Ok(Significance {
        statistic: tests.mapv(|t| t.statistic),
        p_value: tests.mapv(|t| t.p_value),
    })
}
