pub mod raw;

use {
    crate::{
        constants::ZERO_CELSIUS,
        error::{Error, Result},
        experiment::{Experiment, Level},
    },
    ndarray::{Array1, ArrayD, Axis},
    std::collections::HashMap,
};

pub use raw::RawFieldReader;

/// Ensemble of a single model variable.
///
/// `data` is indexed `[member, time, ...]` where the trailing axes are
/// `[lat, lon]` for surface variables and `[level]` for spatially averaged
/// profiles. Missing observations are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub variable: String,
    pub experiment: Experiment,
    pub latitudes: Array1<f64>,
    pub longitudes: Array1<f64>,
    pub times: Array1<f64>,
    pub levels: Option<Array1<f64>>,
    pub data: ArrayD<f64>,
}

impl Field {
    pub fn members(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn time_steps(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Drops the level axis, keeping the slice at `level`.
    pub fn select_level(&self, level: f64) -> Result<Field> {
        let missing = || Error::MissingLevel {
            variable: self.variable.clone(),
            level,
        };

        let index = self
            .levels
            .as_ref()
            .ok_or_else(missing)?
            .iter()
            .position(|&l| l == level)
            .ok_or_else(missing)?;

        if self.data.ndim() < 3 {
            return Err(missing());
        }

        Ok(Field {
            variable: self.variable.clone(),
            experiment: self.experiment,
            latitudes: self.latitudes.clone(),
            longitudes: self.longitudes.clone(),
            times: self.times.clone(),
            levels: None,
            data: self.data.index_axis(Axis(2), index).to_owned(),
        })
    }

    /// Converts a temperature field from Kelvin.
    pub fn to_celsius(&mut self) {
        self.data.mapv_inplace(|t| t - ZERO_CELSIUS);
    }
}

/// Source of experiment output.
pub trait FieldReader {
    fn read(&self, variable: &str, experiment: Experiment, level: Level) -> Result<Field>;
}

/// Fields prepared in memory, keyed by variable and experiment.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    fields: HashMap<(String, Experiment), Field>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field) {
        self.fields
            .insert((field.variable.clone(), field.experiment), field);
    }
}

impl FieldReader for MemoryReader {
    fn read(&self, variable: &str, experiment: Experiment, _: Level) -> Result<Field> {
        self.fields
            .get(&(variable.to_owned(), experiment))
            .cloned()
            .ok_or_else(|| Error::MissingField {
                variable: variable.to_owned(),
                experiment,
            })
    }
}

#[cfg(test)]
mod test {
    use {super::*, approx::assert_abs_diff_eq, ndarray::Array};

    fn profile() -> Field {
        // value = 100 * member + 10 * time + level index
        let data = Array::from_shape_fn((2, 3, 4), |(m, t, l)| (100 * m + 10 * t + l) as f64);

        Field {
            variable: "U".to_owned(),
            experiment: Experiment::Hit,
            latitudes: Array1::zeros(0),
            longitudes: Array1::zeros(0),
            times: Array1::range(0.0, 3.0, 1.0),
            levels: Some(Array1::from(vec![10.0, 30.0, 50.0, 100.0])),
            data: data.into_dyn(),
        }
    }

    #[test]
    fn select_level() {
        let field = profile().select_level(30.0).unwrap();

        assert_eq!(field.data.shape(), &[2, 3]);
        assert_eq!(field.data[[1, 2]], 121.0);
        assert!(field.levels.is_none());
    }

    #[test]
    fn select_missing_level() {
        assert!(matches!(
            profile().select_level(20.0),
            Err(Error::MissingLevel { .. })
        ));
    }

    #[test]
    fn celsius() {
        let mut field = profile();
        field.to_celsius();

        assert_abs_diff_eq!(field.data[[0, 0, 0]], -273.15, epsilon = 1.0E-12);
    }

    #[test]
    fn memory_reader() {
        let mut reader = MemoryReader::new();
        reader.insert(profile());

        assert_eq!(
            reader.read("U", Experiment::Hit, Level::Profile).unwrap(),
            profile()
        );
        assert!(reader.read("U", Experiment::Fit, Level::Profile).is_err());
    }
}
