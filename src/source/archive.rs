//! Tar member listing. Gzip is detected from the stream's magic bytes.

use std::io::{BufRead, BufReader, Read};

use flate2::read::GzDecoder;
use tracing::debug;

use super::SourceError;
use crate::core::tokenize::Entry;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Normalize a member name: drop one leading `./` and trailing slashes.
pub fn normalize_member(name: &str) -> &str {
    name.strip_prefix("./")
        .unwrap_or(name)
        .trim_end_matches('/')
}

/// List `(path, size)` for every member of a tar stream, in archive order.
/// The archive root (`./`) is skipped.
pub fn read_archive_members<R: Read>(reader: R) -> Result<Vec<Entry>, SourceError> {
    let mut buffered = BufReader::new(reader);
    let gzipped = buffered
        .fill_buf()
        .map_err(SourceError::Archive)?
        .starts_with(&GZIP_MAGIC);

    let inner: Box<dyn Read + '_> = if gzipped {
        Box::new(GzDecoder::new(buffered))
    } else {
        Box::new(buffered)
    };

    let mut archive = tar::Archive::new(inner);
    let mut members = Vec::new();

    for item in archive.entries().map_err(SourceError::Archive)? {
        let item = item.map_err(SourceError::Archive)?;
        let raw = item.path().map_err(SourceError::Archive)?;
        let raw = raw.to_string_lossy();
        let name = normalize_member(&raw);

        if name.is_empty() || name == "." {
            continue;
        }

        let size = item.header().size().map_err(SourceError::Archive)?;
        members.push(Entry::new(name, size));
    }

    debug!(members = members.len(), gzipped, "read archive listing");
    Ok(members)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Build an in-memory tar laid out like `tar -C dir .` output (root entry first).
    pub fn tar_bytes(files: &[(&str, &[u8])], dirs: &[&str], gzip: bool) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut root = tar::Header::new_gnu();
        root.set_entry_type(tar::EntryType::Directory);
        root.set_size(0);
        root.set_mode(0o755);
        root.set_cksum();
        builder.append_data(&mut root, "./", std::io::empty()).unwrap();

        for dir in dirs {
            let mut h = tar::Header::new_gnu();
            h.set_entry_type(tar::EntryType::Directory);
            h.set_size(0);
            h.set_mode(0o755);
            h.set_cksum();
            builder.append_data(&mut h, format!("./{dir}/"), std::io::empty()).unwrap();
        }

        for (path, body) in files {
            let mut h = tar::Header::new_gnu();
            h.set_size(body.len() as u64);
            h.set_mode(0o644);
            h.set_cksum();
            builder.append_data(&mut h, format!("./{path}"), *body).unwrap();
        }

        let bytes = builder.into_inner().unwrap();
        if !gzip {
            return bytes;
        }

        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        std::io::Write::write_all(&mut enc, &bytes).unwrap();
        enc.finish().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::tar_bytes;
    use super::*;

    #[test]
    fn normalizes_member_names() {
        assert_eq!(normalize_member("./v1/FV3_fix/C96.nc"), "v1/FV3_fix/C96.nc");
        assert_eq!(normalize_member("./v1.2.0/"), "v1.2.0");
        assert_eq!(normalize_member("plain/a.nc"), "plain/a.nc");
        assert_eq!(normalize_member("./"), "");
    }

    #[test]
    fn lists_plain_and_gzipped_archives() {
        let files: &[(&str, &[u8])] = &[("v1/FV3_fix/C96.mx100.nc", b"0123456789"), ("v1/FV3_fix/README", b"x")];
        for gzip in [false, true] {
            let bytes = tar_bytes(files, &["v1", "v1/FV3_fix"], gzip);
            let members = read_archive_members(&bytes[..]).unwrap();
            let paths: Vec<&str> = members.iter().map(|e| e.path.as_str()).collect();
            assert_eq!(paths, ["v1", "v1/FV3_fix", "v1/FV3_fix/C96.mx100.nc", "v1/FV3_fix/README"]);
            assert_eq!(members[2].size, 10);
        }
    }
}
