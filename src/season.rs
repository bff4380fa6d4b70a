//! Seasonal means of monthly fields.

use {
    crate::{
        composite::{cross_year, select, TimeWindow},
        constants::MONTHS,
        error::{Error, Result},
        stats::nanmean_axis,
    },
    ndarray::{ArrayD, ArrayViewD, Axis},
    serde::Deserialize,
    std::{fmt, str::FromStr},
};

/// Months averaged into a season. Each member holds one year, January to
/// December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    On,
    Dj,
    Fm,
    Djf,
    M,
    D,
    N,
    Nd,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::On,
        Period::Dj,
        Period::Fm,
        Period::Djf,
        Period::M,
        Period::D,
        Period::N,
        Period::Nd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Period::On => "ON",
            Period::Dj => "DJ",
            Period::Fm => "FM",
            Period::Djf => "DJF",
            Period::M => "M",
            Period::D => "D",
            Period::N => "N",
            Period::Nd => "ND",
        }
    }

    /// Whether the season runs into the following year
    pub fn crosses_year(self) -> bool {
        matches!(self, Period::Dj | Period::Djf)
    }

    /// Zero-based months of a single-year season
    fn months(self) -> Vec<usize> {
        match self {
            Period::On => vec![9, 10],
            Period::Fm => vec![1, 2],
            Period::M => vec![2],
            Period::D => vec![11],
            Period::N => vec![10],
            Period::Nd => vec![10, 11],
            // December, then the next year's January (and February)
            Period::Dj => vec![11, 12],
            Period::Djf => vec![11, 12, 13],
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidParameters(format!("unknown period {:?}", s)))
    }
}

/// Mean over the months of `period` of a `[member, month, ...]` field.
///
/// Single-year seasons keep every member. Seasons crossing the year pair
/// member `n` with member `n + 1` and so return one member fewer.
pub fn seasonal(field: ArrayViewD<f64>, period: Period) -> Result<ArrayD<f64>> {
    if field.ndim() < 2 || field.len_of(Axis(1)) != MONTHS {
        return Err(Error::InvalidParameters(format!(
            "seasonal means need {} months per member, found shape {:?}",
            MONTHS,
            field.shape()
        )));
    }

    let members = (0..field.len_of(Axis(0))).collect::<Vec<_>>();

    let months = if period.crosses_year() {
        let head = period.months().len() - 1;
        // The last member has no following year
        let paired = &members[..members.len().saturating_sub(1)];
        cross_year(field, paired, 1, head)?
    } else {
        select(field, &members, &TimeWindow::Days(period.months()))?
    };

    Ok(nanmean_axis(months.view(), Axis(1)))
}
