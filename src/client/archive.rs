//! Archive extraction collaborator.

use crate::checkpoint::list_files;
use crate::models::{PipelineError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Unpack every member of the tar at `archive` into `dest`.
///
/// Members that would escape `dest` are skipped by `tar`. Returns the
/// number of members unpacked.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let extract_err = |source: io::Error| PipelineError::Extract {
        archive: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(extract_err)?;
    let mut tar = tar::Archive::new(BufReader::new(file));

    let mut count = 0;
    for entry in tar.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        if entry.unpack_in(dest).map_err(extract_err)? {
            count += 1;
        }
    }

    debug!(archive = %archive.display(), members = count, "Archive unpacked");
    Ok(count)
}

/// Replace every `*.gz` file under `dir` with its decompressed content.
///
/// `GSM1_sample.txt.gz` becomes `GSM1_sample.txt`. Returns the paths written.
pub fn gunzip_members(dir: &Path) -> Result<Vec<PathBuf>> {
    let paths = list_files(dir, "**/*.gz")?;

    let mut written = Vec::with_capacity(paths.len());
    for gz_path in paths {
        let out_path = gz_path.with_extension("");
        let gz_err = |source: io::Error| PipelineError::Extract {
            archive: gz_path.clone(),
            source,
        };

        let mut decoder = GzDecoder::new(BufReader::new(File::open(&gz_path).map_err(gz_err)?));
        let mut out = BufWriter::new(File::create(&out_path).map_err(gz_err)?);
        io::copy(&mut decoder, &mut out).map_err(gz_err)?;
        out.flush().map_err(gz_err)?;

        fs::remove_file(&gz_path).map_err(|e| {
            PipelineError::io(format!("removing {}", gz_path.display()), e)
        })?;
        debug!(file = %out_path.display(), "Decompressed member");
        written.push(out_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn build_tar(path: &Path, members: &[(&str, &str)]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, data) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_bytes()).unwrap();
        }
        builder.finish().unwrap();
    }

    #[test]
    fn test_extract_archive_unpacks_members() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("GSE1_RAW.tar");
        build_tar(&archive, &[("a.txt", "[A]\nx\n"), ("b.csv", "1,2\n")]);

        let dest = temp_dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        assert_eq!(extract_archive(&archive, &dest).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "[A]\nx\n");
        assert!(dest.join("b.csv").exists());
    }

    #[test]
    fn test_corrupt_archive_is_extract_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("GSE1_RAW.tar");
        fs::write(&archive, vec![0xffu8; 700]).unwrap();

        let dest = temp_dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        let err = extract_archive(&archive, &dest).unwrap_err();
        assert!(matches!(err, PipelineError::Extract { .. }));
    }

    #[test]
    fn test_gunzip_members_replaces_gz_files() {
        let temp_dir = TempDir::new().unwrap();
        let gz_path = temp_dir.path().join("sample.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&gz_path).unwrap(), Compression::default());
        encoder.write_all(b"[Heading]\nk\tv\n").unwrap();
        encoder.finish().unwrap();

        let written = gunzip_members(temp_dir.path()).unwrap();
        assert_eq!(written, vec![temp_dir.path().join("sample.txt")]);
        assert!(!gz_path.exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("sample.txt")).unwrap(),
            "[Heading]\nk\tv\n"
        );
    }
}
