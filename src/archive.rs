use std::fs::File;
use std::io::{self, Cursor};
use std::path::PathBuf;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::{ServiceError, ServiceResult};

/// Assembles a zip archive from (entry name, source path) pairs: sequential,
/// single pass, one file at a time. Each source handle lives only for its own
/// entry, so every exit path - including a failure mid-loop - releases it.
pub fn zip_files(entries: &[(String, PathBuf)]) -> ServiceResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in entries {
        let mut file = File::open(path).map_err(|source| ServiceError::StorageRead {
            path: path.clone(),
            source,
        })?;

        writer.start_file(name.clone(), options).map_err(archive_error)?;
        io::copy(&mut file, &mut writer).map_err(|source| ServiceError::StorageRead {
            path: path.clone(),
            source,
        })?;
    }

    let cursor = writer.finish().map_err(archive_error)?;
    Ok(cursor.into_inner())
}

fn archive_error(source: zip::result::ZipError) -> ServiceError {
    ServiceError::StorageWrite {
        path: PathBuf::from("<zip archive>"),
        source: std::io::Error::other(source.to_string()),
    }
}
