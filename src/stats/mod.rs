//! NaN-aware reductions.
//!
//! Every reduction skips NaN samples. A lane whose samples are all NaN (or
//! which is empty) reduces to NaN.

pub mod distribution;


use {
    crate::error::{Error, Result},
    ndarray::{Array1, ArrayD, ArrayView1, ArrayViewD, Axis, Dimension, Zip},
};

/// Mean of the non-NaN samples.
pub fn nanmean<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));

    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Count, mean and unbiased variance of the non-NaN samples.
pub fn nanmoments<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> (usize, f64, f64) {
    let valid = values
        .into_iter()
        .copied()
        .filter(|x| !x.is_nan())
        .collect::<Vec<f64>>();
    let n = valid.len();

    if n == 0 {
        return (0, f64::NAN, f64::NAN);
    }

    let mean = valid.iter().sum::<f64>() / n as f64;

    if n == 1 {
        return (1, mean, f64::NAN);
    }

    let var = valid.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

    (n, mean, var)
}

fn check_percentile(q: f64) -> Result<()> {
    if (0.0..=100.0).contains(&q) {
        Ok(())
    } else {
        Err(Error::InvalidPercentile(q))
    }
}

/// `q`th percentile of the non-NaN samples, interpolating linearly between
/// the two closest ranks. `q` must already lie in [0, 100].
fn percentile_unchecked<'a, I: IntoIterator<Item = &'a f64>>(values: I, q: f64) -> f64 {
    let mut sorted = values
        .into_iter()
        .copied()
        .filter(|x| !x.is_nan())
        .collect::<Vec<f64>>();

    if sorted.is_empty() {
        return f64::NAN;
    }

    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn nanpercentile<'a, I: IntoIterator<Item = &'a f64>>(values: I, q: f64) -> Result<f64> {
    check_percentile(q)?;
    Ok(percentile_unchecked(values, q))
}

/// Number of samples strictly below `threshold`.
///
/// NaN samples never count; NaN if every sample is NaN or the threshold is.
pub fn count_below<'a, I: IntoIterator<Item = &'a f64>>(values: I, threshold: f64) -> f64 {
    let (valid, below) = values
        .into_iter()
        .filter(|x| !x.is_nan())
        .fold((0usize, 0usize), |(valid, below), &x| {
            (valid + 1, below + (x < threshold) as usize)
        });

    if valid == 0 || threshold.is_nan() {
        f64::NAN
    } else {
        below as f64
    }
}

/// Trailing moving average over `window` samples.
///
/// The output has the same length as `series`; the first `window - 1`
/// entries are NaN. A window longer than the series gives all NaN.
pub fn moving_average(series: ArrayView1<f64>, window: usize) -> Result<Array1<f64>> {
    if window == 0 {
        return Err(Error::InvalidWindow(window));
    }

    Ok(Array1::from_shape_fn(series.len(), |i| {
        if i + 1 < window {
            f64::NAN
        } else {
            nanmean(series.slice(ndarray::s![i + 1 - window..=i]))
        }
    }))
}

/// Mean along `axis`, removing it.
pub fn nanmean_axis(a: ArrayViewD<f64>, axis: Axis) -> ArrayD<f64> {
    a.map_axis(axis, |lane| nanmean(lane))
}

/// Percentile along `axis`, removing it.
pub fn nanpercentile_axis(a: ArrayViewD<f64>, axis: Axis, q: f64) -> Result<ArrayD<f64>> {
    check_percentile(q)?;

    Ok(Zip::from(a.lanes(axis)).par_map_collect(|lane| percentile_unchecked(lane, q)))
}

/// Per-lane count of samples along `axis` below `reference`, which has the
/// shape of `a` with `axis` removed.
pub fn count_below_axis(
    a: ArrayViewD<f64>,
    axis: Axis,
    reference: ArrayViewD<f64>,
) -> Result<ArrayD<f64>> {
    let mut expected = a.shape().to_vec();
    expected.remove(axis.index());

    if reference.shape() != expected.as_slice() {
        return Err(Error::shape_mismatch(&expected, reference.shape()));
    }

    Ok(Zip::from(a.lanes(axis))
        .and(&reference)
        .par_map_collect(|lane, &threshold| count_below(lane, threshold)))
}

/// Moving average of every lane along `axis`, keeping the shape.
pub fn moving_average_axis(a: ArrayViewD<f64>, axis: Axis, window: usize) -> Result<ArrayD<f64>> {
    if window == 0 {
        return Err(Error::InvalidWindow(window));
    }

    let mut out = ArrayD::from_elem(a.raw_dim(), f64::NAN);

    for (series, mut smoothed) in a.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        smoothed.assign(&moving_average(series, window)?);
    }

    Ok(out)
}

/// Index of the smallest non-NaN value, `None` if there is none.
pub fn nanargmin(a: ArrayViewD<f64>) -> Option<(Vec<usize>, f64)> {
    a.indexed_iter()
        .filter(|(_, x)| !x.is_nan())
        .fold(None, |min: Option<(Vec<usize>, f64)>, (index, &x)| match min {
            Some((_, m)) if m <= x => min,
            _ => Some((index.slice().to_vec(), x)),
        })
}
