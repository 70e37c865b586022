use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Reads the whole sales file. Exports from older point-of-sale systems are
/// Latin-1, so bytes that are not valid UTF-8 are decoded byte-for-byte.
pub fn read_sales_data<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::file(path, e))?;
    debug!("read {} bytes from '{}'", bytes.len(), path.display());

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!(
                "'{}' is not valid UTF-8, decoding as Latin-1",
                path.display()
            );
            Ok(err.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

pub fn create_output<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::file(path, e))?;
    Ok(BufWriter::new(file))
}
