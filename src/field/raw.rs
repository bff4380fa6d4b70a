//! Reader for ensemble output stored as raw little-endian `.r8` records.
//!
//! Every member lives in its own directory under the experiment's archive,
//! `<root>/<EXPERIMENT>/<daily|monthly>/<EXPERIMENT><member>/<variable>_<member>.r8`,
//! with members numbered from 1 at each root. A `coordinates.yaml` next to the
//! member directories describes the grid shared by all members.
//!
//! Members are placed in the ensemble following the experiment's
//! [`MemberBlock`]s, so field indices match the merged phase catalogs. Indices
//! between blocks are filled with NaN.

use {
    super::{Field, FieldReader},
    crate::{
        constants::RECORD_HEADER,
        error::{Error, Result},
        experiment::{Experiment, Frequency, Level},
        parameters::{ensemble_len, MemberBlock, Parameters},
    },
    byteorder::{ByteOrder, LittleEndian},
    log::{debug, info, warn},
    ndarray::{Array1, ArrayD, IxDyn},
    serde::Deserialize,
    std::{
        collections::HashMap,
        fs::File,
        io::{ErrorKind, Read},
        path::{Path, PathBuf},
    },
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Coordinates {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub times: Vec<f64>,
    #[serde(default)]
    pub levels: Option<Vec<f64>>,
    /// Values at or beyond this magnitude are missing
    #[serde(default)]
    pub fill_value: Option<f64>,
}

impl Coordinates {
    /// Shape of a single member, `[time, (level), (lat, lon)]`
    fn member_shape(&self, level: Level) -> Vec<usize> {
        let mut shape = vec![self.times.len()];
        if let Some(levels) = &self.levels {
            shape.push(levels.len());
        }
        if level == Level::Surface {
            shape.push(self.latitudes.len());
            shape.push(self.longitudes.len());
        }
        shape
    }
}

#[derive(Debug, Clone)]
pub struct RawFieldReader {
    blocks: HashMap<Experiment, Vec<MemberBlock>>,
    frequency: Frequency,
}

impl RawFieldReader {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            blocks: HashMap::new(),
            frequency,
        }
    }

    pub fn from_parameters(parameters: &Parameters, frequency: Frequency) -> Self {
        let mut reader = Self::new(frequency);
        for &experiment in Experiment::ALL.iter() {
            reader.insert(experiment, parameters.member_blocks(experiment));
        }
        reader
    }

    /// Sets where the members of `experiment` are stored.
    pub fn insert(&mut self, experiment: Experiment, blocks: Vec<MemberBlock>) {
        self.blocks.insert(experiment, blocks);
    }

    fn blocks(&self, experiment: Experiment, variable: &str) -> Result<&[MemberBlock]> {
        self.blocks
            .get(&experiment)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingField {
                variable: variable.to_owned(),
                experiment,
            })
    }

    fn archive(&self, root: &Path, experiment: Experiment) -> PathBuf {
        root.join(experiment.name()).join(self.frequency.directory())
    }

    fn member_path(
        &self,
        root: &Path,
        experiment: Experiment,
        variable: &str,
        member: usize,
    ) -> PathBuf {
        self.archive(root, experiment)
            .join(format!("{}{}", experiment, member))
            .join(format!("{}_{}.r8", variable, member))
    }

    fn coordinates(&self, experiment: Experiment, blocks: &[MemberBlock]) -> Result<Coordinates> {
        let mut last = None;

        for block in blocks {
            let path = self.archive(&block.root, experiment).join("coordinates.yaml");
            match File::open(&path) {
                Ok(f) => return Ok(serde_yaml::from_reader(f)?),
                Err(e) if e.kind() == ErrorKind::NotFound => last = Some(e),
                Err(e) => return Err(e.into()),
            }
        }

        Err(last
            .unwrap_or_else(|| std::io::Error::new(ErrorKind::NotFound, "no storage roots"))
            .into())
    }

    /// Reads one member, `None` if its file does not exist.
    fn read_member(
        path: &Path,
        expected: usize,
        fill_value: Option<f64>,
    ) -> Result<Option<Vec<f64>>> {
        let mut bytes = Vec::new();
        match File::open(path) {
            Ok(mut f) => f.read_to_end(&mut bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let found = bytes.len().saturating_sub(RECORD_HEADER) / 8;
        if bytes.len() < RECORD_HEADER
            || found != expected
            || (bytes.len() - RECORD_HEADER) % 8 != 0
        {
            return Err(Error::FieldLength {
                path: path.to_owned(),
                expected,
                found,
            });
        }

        Ok(Some(
            bytes[RECORD_HEADER..]
                .chunks(8)
                .map(LittleEndian::read_f64)
                .map(|x| match fill_value {
                    Some(fill) if x.abs() >= fill.abs() => f64::NAN,
                    _ => x,
                })
                .collect(),
        ))
    }
}

impl FieldReader for RawFieldReader {
    fn read(&self, variable: &str, experiment: Experiment, level: Level) -> Result<Field> {
        let blocks = self.blocks(experiment, variable)?;
        let coordinates = self.coordinates(experiment, blocks)?;
        let member_shape = coordinates.member_shape(level);
        let member_len = member_shape.iter().product::<usize>();
        let members = ensemble_len(blocks);

        let mut values = vec![f64::NAN; members * member_len];

        for block in blocks {
            for (member, index) in (1..=block.members).zip(block.indices()) {
                let path = self.member_path(&block.root, experiment, variable, member);

                match Self::read_member(&path, member_len, coordinates.fill_value)? {
                    Some(member_values) => values
                        [index * member_len..(index + 1) * member_len]
                        .copy_from_slice(&member_values),
                    None => warn!("{} is missing, filling member with NaN", path.display()),
                }
            }

            debug!(
                "Read {} members of {} from {} into {:?}",
                block.members,
                experiment,
                block.root.display(),
                block.indices()
            );
        }

        let mut shape = vec![members];
        shape.extend_from_slice(&member_shape);

        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|_| Error::shape_mismatch(&shape, &[members * member_len]))?;

        info!("Read {} for {}: {:?}", variable, experiment, data.shape());

        Ok(Field {
            variable: variable.to_owned(),
            experiment,
            latitudes: Array1::from(coordinates.latitudes),
            longitudes: Array1::from(coordinates.longitudes),
            times: Array1::from(coordinates.times),
            levels: coordinates.levels.map(Array1::from),
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::utils::write_r8,
        ndarray::Axis,
        std::{fs, io::Write},
        tempdir::TempDir,
    };

    fn write_coordinates(archive: &Path, contents: &str) {
        fs::create_dir_all(archive).unwrap();
        File::create(archive.join("coordinates.yaml"))
            .unwrap()
            .write_all(contents.as_bytes())
            .unwrap();
    }

    fn block(root: &Path, start: usize, members: usize) -> MemberBlock {
        MemberBlock {
            root: root.to_owned(),
            start,
            members,
        }
    }

    /// One value per member on a single-cell, single-day grid, `100 * root + member`
    fn populate(reader: &RawFieldReader, roots: &[&Path], experiment: Experiment, members: usize) {
        for (r, root) in roots.iter().enumerate() {
            write_coordinates(
                &reader.archive(root, experiment),
                "latitudes: [0.0]\nlongitudes: [0.0]\ntimes: [0.0]\n",
            );
            for member in 1..=members {
                write_r8(
                    &reader.member_path(root, experiment, "U", member),
                    vec![(100 * r + member) as f64],
                )
                .unwrap();
            }
        }
    }

    fn members(field: &Field) -> Vec<f64> {
        field.data.iter().copied().collect()
    }

    #[test]
    fn reads_both_roots() {
        let primary = TempDir::new("qbo-primary").unwrap();
        let secondary = TempDir::new("qbo-secondary").unwrap();

        let mut reader = RawFieldReader::new(Frequency::Daily);
        reader.insert(
            Experiment::Hit,
            vec![block(primary.path(), 0, 2), block(secondary.path(), 2, 1)],
        );

        write_coordinates(
            &reader.archive(primary.path(), Experiment::Hit),
            "latitudes: [80.0, 85.0]\nlongitudes: [0.0]\ntimes: [0.0, 1.0, 2.0]\nfill_value: 1.0e20\n",
        );

        for member in 1..=2 {
            let values = (0..6).map(|i| (10 * member + i) as f64).collect::<Vec<_>>();
            write_r8(
                &reader.member_path(primary.path(), Experiment::Hit, "T1000", member),
                values,
            )
            .unwrap();
        }
        write_r8(
            &reader.member_path(secondary.path(), Experiment::Hit, "T1000", 1),
            vec![1.0, 2.0, 1.0e20, 4.0, 5.0, 6.0],
        )
        .unwrap();

        let field = reader.read("T1000", Experiment::Hit, Level::Surface).unwrap();

        assert_eq!(field.data.shape(), &[3, 3, 2, 1]);
        assert_eq!(field.data[[0, 0, 0, 0]], 10.0);
        assert_eq!(field.data[[1, 2, 1, 0]], 25.0);
        assert_eq!(field.data[[2, 0, 0, 0]], 1.0);
        assert!(field.data[[2, 1, 0, 0]].is_nan());
        assert_eq!(field.latitudes, Array1::from(vec![80.0, 85.0]));
    }

    #[test]
    fn single_source_reads_one_root() {
        let primary = TempDir::new("qbo-primary").unwrap();
        let secondary = TempDir::new("qbo-secondary").unwrap();

        let mut params = Parameters::default();
        params.environment.primary_root = primary.path().to_owned();
        params.environment.secondary_root = secondary.path().to_owned();
        params.ensemble.primary_members = 2;
        params.ensemble.secondary_members = 2;
        params.catalog.merge_offset = 2;

        let reader = RawFieldReader::from_parameters(&params, Frequency::Daily);
        populate(&reader, &[primary.path()], Experiment::Ctlq, 4);

        let field = reader.read("U", Experiment::Ctlq, Level::Surface).unwrap();

        assert_eq!(members(&field), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn swapped_roots_read_secondary_first() {
        let primary = TempDir::new("qbo-primary").unwrap();
        let secondary = TempDir::new("qbo-secondary").unwrap();

        let mut params = Parameters::default();
        params.environment.primary_root = primary.path().to_owned();
        params.environment.secondary_root = secondary.path().to_owned();
        params.ensemble.primary_members = 2;
        params.ensemble.secondary_members = 2;
        params.catalog.merge_offset = 2;

        let reader = RawFieldReader::from_parameters(&params, Frequency::Daily);
        populate(&reader, &[primary.path(), secondary.path()], Experiment::Fsub, 2);

        let field = reader.read("U", Experiment::Fsub, Level::Surface).unwrap();

        assert_eq!(members(&field), vec![101.0, 102.0, 1.0, 2.0]);
    }

    #[test]
    fn offset_past_primary_leaves_gap() {
        let primary = TempDir::new("qbo-primary").unwrap();
        let secondary = TempDir::new("qbo-secondary").unwrap();

        let mut params = Parameters::default();
        params.environment.primary_root = primary.path().to_owned();
        params.environment.secondary_root = secondary.path().to_owned();
        params.ensemble.primary_members = 2;
        params.ensemble.secondary_members = 2;
        params.catalog.merge_offset = 3;
        params.validate().unwrap();

        let reader = RawFieldReader::from_parameters(&params, Frequency::Daily);
        populate(&reader, &[primary.path(), secondary.path()], Experiment::Hit, 2);

        let field = reader.read("U", Experiment::Hit, Level::Surface).unwrap();
        let values = members(&field);

        // Secondary member 1 sits at merged index 3
        assert_eq!(values.len(), 5);
        assert_eq!(&values[..2], &[1.0, 2.0]);
        assert!(values[2].is_nan());
        assert_eq!(&values[3..], &[101.0, 102.0]);
    }

    #[test]
    fn missing_member_is_nan() {
        let root = TempDir::new("qbo-primary").unwrap();
        let mut reader = RawFieldReader::new(Frequency::Monthly);
        reader.insert(Experiment::Ctlq, vec![block(root.path(), 0, 2)]);

        write_coordinates(
            &reader.archive(root.path(), Experiment::Ctlq),
            "latitudes: []\nlongitudes: []\ntimes: [0.0, 1.0]\nlevels: [10.0, 30.0]\n",
        );
        write_r8(
            &reader.member_path(root.path(), Experiment::Ctlq, "U", 1),
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        let field = reader.read("U", Experiment::Ctlq, Level::Profile).unwrap();

        assert_eq!(field.data.shape(), &[2, 2, 2]);
        assert_eq!(field.data[[0, 1, 1]], 4.0);
        assert!(field.data.index_axis(Axis(0), 1).iter().all(|x| x.is_nan()));
    }

    #[test]
    fn wrong_length() {
        let root = TempDir::new("qbo-primary").unwrap();
        let mut reader = RawFieldReader::new(Frequency::Daily);
        reader.insert(Experiment::Fit, vec![block(root.path(), 0, 1)]);

        write_coordinates(
            &reader.archive(root.path(), Experiment::Fit),
            "latitudes: [0.0]\nlongitudes: [0.0]\ntimes: [0.0, 1.0]\n",
        );
        write_r8(
            &reader.member_path(root.path(), Experiment::Fit, "T1000", 1),
            vec![1.0],
        )
        .unwrap();

        assert!(matches!(
            reader.read("T1000", Experiment::Fit, Level::Surface),
            Err(Error::FieldLength {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn unconfigured_experiment() {
        let reader = RawFieldReader::new(Frequency::Daily);

        assert!(matches!(
            reader.read("U", Experiment::Cit, Level::Surface),
            Err(Error::MissingField { .. })
        ));
    }
}
