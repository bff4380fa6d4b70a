//! Phase composites of ensemble fields.
//!
//! A composite selects the members of one QBO phase and a window of time
//! steps from a field shaped `[member, time, ...]`, then reduces the
//! selection along the ensemble or time axis.

use {
    crate::{
        error::{Error, Result},
        stats::{
            count_below_axis, moving_average_axis, nanargmin, nanmean_axis, nanpercentile_axis,
        },
    },
    log::{debug, warn},
    ndarray::{concatenate, Array1, ArrayD, ArrayViewD, Axis, IxDyn},
};

const ENSEMBLE: Axis = Axis(0);
const TIME: Axis = Axis(1);

/// Time steps included in a composite.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeWindow {
    All,
    /// Half-open range of time steps
    Range { start: usize, end: usize },
    /// Explicit time steps, in order
    Days(Vec<usize>),
}

impl TimeWindow {
    pub fn range(start: usize, end: usize) -> Self {
        TimeWindow::Range { start, end }
    }

    fn indices(&self, len: usize) -> Result<Option<Vec<usize>>> {
        let indices = match self {
            TimeWindow::All => return Ok(None),
            TimeWindow::Range { start, end } => (*start..*end).collect::<Vec<_>>(),
            TimeWindow::Days(days) => days.clone(),
        };

        check_indices("time", &indices, len)?;

        Ok(Some(indices))
    }
}

/// Axis a reduction collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Over {
    Ensemble,
    Time,
}

impl Over {
    fn axis(self) -> Axis {
        match self {
            Over::Ensemble => ENSEMBLE,
            Over::Time => TIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// NaN-aware mean
    Mean(Over),
    /// NaN-aware percentile in [0, 100]
    Percentile(Over, f64),
    /// Per member, number of time steps below a reference value. The
    /// reference is broadcast against the selection without its time axis.
    CountBelow(ArrayD<f64>),
    /// Trailing mean over a window of consecutive members, NaN-padded
    MovingAverage(usize),
}

impl Reduction {
    /// Ensemble mean
    pub fn mean() -> Self {
        Reduction::Mean(Over::Ensemble)
    }

    /// Ensemble percentile
    pub fn percentile(q: f64) -> Self {
        Reduction::Percentile(Over::Ensemble, q)
    }
}

fn check_indices(axis: &'static str, indices: &[usize], len: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(Error::out_of_range(axis, index, len)),
        None => Ok(()),
    }
}

/// Copies `field[members, window, ...]`.
pub fn select(field: ArrayViewD<f64>, members: &[usize], window: &TimeWindow) -> Result<ArrayD<f64>> {
    if field.ndim() < 2 {
        return Err(Error::shape_mismatch(&[0, 0], field.shape()));
    }

    check_indices("member", members, field.len_of(ENSEMBLE))?;

    let selected = field.select(ENSEMBLE, members);

    Ok(match window.indices(field.len_of(TIME))? {
        Some(days) => selected.select(TIME, &days),
        None => selected,
    })
}

/// Reduces a selection that is already laid out `[member, time, ...]`.
pub fn reduce(selection: ArrayViewD<f64>, reduction: &Reduction) -> Result<ArrayD<f64>> {
    match reduction {
        Reduction::Mean(over) => Ok(nanmean_axis(selection, over.axis())),
        Reduction::Percentile(over, q) => nanpercentile_axis(selection, over.axis(), *q),
        Reduction::CountBelow(reference) => {
            let mut shape = selection.shape().to_vec();
            shape.remove(TIME.index());

            let reference = reference
                .broadcast(IxDyn(&shape))
                .ok_or_else(|| Error::shape_mismatch(&shape, reference.shape()))?;

            count_below_axis(selection, TIME, reference)
        }
        Reduction::MovingAverage(window) => moving_average_axis(selection, ENSEMBLE, *window),
    }
}

/// Selects the members and time window of `field` and reduces them.
pub fn composite(
    field: ArrayViewD<f64>,
    members: &[usize],
    window: &TimeWindow,
    reduction: &Reduction,
) -> Result<ArrayD<f64>> {
    let selection = select(field, members, window)?;

    debug!(
        "Compositing {} members over {:?} with {:?}",
        members.len(),
        selection.shape(),
        reduction
    );

    reduce(selection.view(), reduction)
}

/// Season spanning the turn of the year: the last `tail` steps of every
/// selected member followed by the first `head` steps of the next member.
///
/// Members whose following year lies beyond the ensemble are dropped.
pub fn cross_year(
    field: ArrayViewD<f64>,
    members: &[usize],
    tail: usize,
    head: usize,
) -> Result<ArrayD<f64>> {
    let len = field.len_of(ENSEMBLE);
    let steps = field.len_of(TIME);

    check_indices("member", members, len)?;

    if tail > steps {
        return Err(Error::out_of_range("time", tail, steps));
    }
    if head > steps {
        return Err(Error::out_of_range("time", head, steps));
    }

    let (paired, dropped): (Vec<usize>, Vec<usize>) =
        members.iter().partition(|&&m| m + 1 < len);

    if !dropped.is_empty() {
        warn!(
            "Dropping members {:?} from cross-year window, no following year",
            dropped
        );
    }

    let following = paired.iter().map(|m| m + 1).collect::<Vec<_>>();

    let ends = field.select(ENSEMBLE, &paired);
    let starts = field.select(ENSEMBLE, &following);

    let ends = ends.slice_axis(TIME, (steps - tail..steps).into());
    let starts = starts.slice_axis(TIME, (0..head).into());

    concatenate(TIME, &[ends.view(), starts.view()])
        .map_err(|_| Error::shape_mismatch(ends.shape(), starts.shape()))
}

/// Member-by-member difference `a - b`.
pub fn paired_difference(a: ArrayViewD<f64>, b: ArrayViewD<f64>) -> Result<ArrayD<f64>> {
    if a.shape() != b.shape() {
        return Err(Error::shape_mismatch(a.shape(), b.shape()));
    }

    Ok(&a - &b)
}

/// Truncates both ensembles to the shorter one.
pub fn align_members(a: ArrayViewD<f64>, b: ArrayViewD<f64>) -> (ArrayD<f64>, ArrayD<f64>) {
    let n = a.len_of(ENSEMBLE).min(b.len_of(ENSEMBLE));

    if a.len_of(ENSEMBLE) != b.len_of(ENSEMBLE) {
        warn!(
            "Aligning ensembles of {} and {} members to {}",
            a.len_of(ENSEMBLE),
            b.len_of(ENSEMBLE),
            n
        );
    }

    (
        a.slice_axis(ENSEMBLE, (0..n).into()).to_owned(),
        b.slice_axis(ENSEMBLE, (0..n).into()).to_owned(),
    )
}

/// Grid point of the smallest value of a `[lat, lon]` composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
}

pub fn minimum_location(
    composite: ArrayViewD<f64>,
    latitudes: &Array1<f64>,
    longitudes: &Array1<f64>,
) -> Result<Option<Extremum>> {
    let expected = [latitudes.len(), longitudes.len()];
    if composite.shape() != expected {
        return Err(Error::shape_mismatch(&expected, composite.shape()));
    }

    Ok(nanargmin(composite).map(|(index, value)| Extremum {
        latitude: latitudes[index[0]],
        longitude: longitudes[index[1]],
        value,
    }))
}
