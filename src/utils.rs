use {
    crate::{constants::RECORD_HEADER, error::Result},
    byteorder::{ByteOrder, LittleEndian},
    ndarray::ArrayViewD,
    std::{fs, path::Path},
};

#[cfg(test)]
use std::{fs::File, io::Read};

/// Appends `data` to `record` as little-endian `f64`s.
fn append_record(record: &mut Vec<u8>, data: impl Iterator<Item = f64>) {
    let mut buf = [0u8; 8];
    for e in data {
        LittleEndian::write_f64(&mut buf, e);
        record.extend_from_slice(&buf);
    }
}

/// Writes `values` after an empty header record, creating parent directories.
pub fn write_r8<I: IntoIterator<Item = f64>>(path: &Path, values: I) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut record = vec![0u8; RECORD_HEADER];
    append_record(&mut record, values.into_iter());
    fs::write(path, record)?;

    Ok(())
}

/// Writes `<directory>/<name>.r8` in C order with a `<name>.shape` sidecar
/// holding the dimensions, one per line.
pub fn write_array(directory: &Path, name: &str, array: ArrayViewD<f64>) -> Result<()> {
    write_r8(&directory.join(format!("{}.r8", name)), array.iter().copied())?;

    let shape = array
        .shape()
        .iter()
        .map(|n| format!("{}\n", n))
        .collect::<String>();
    fs::write(directory.join(format!("{}.shape", name)), shape)?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn read_r8<P: AsRef<Path>>(path: P) -> Vec<f64> {
    let mut bytes = Vec::new();
    File::open(path).unwrap().read_to_end(&mut bytes).unwrap();

    bytes[RECORD_HEADER..]
        .chunks(8)
        .map(LittleEndian::read_f64)
        .collect()
}

#[cfg(test)]
mod test {
    use {super::*, ndarray::Array, tempdir::TempDir};

    #[test]
    fn header_then_values() {
        let dir = TempDir::new("qbo-utils").unwrap();
        let path = dir.path().join("nested/values.r8");

        write_r8(&path, vec![1.5, -2.0]).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 24);
        assert_eq!(read_r8(&path), vec![1.5, -2.0]);
    }

    #[test]
    fn array_in_c_order() {
        let dir = TempDir::new("qbo-utils").unwrap();
        let array = Array::from_shape_vec((2, 3), (0..6).map(f64::from).collect())
            .unwrap()
            .reversed_axes()
            .into_dyn();

        write_array(dir.path(), "transposed", array.view()).unwrap();

        assert_eq!(
            read_r8(dir.path().join("transposed.r8")),
            vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("transposed.shape")).unwrap(),
            "3\n2\n"
        );
    }
}
