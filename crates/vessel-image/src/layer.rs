//! Layer blob verification and extraction.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;

use vessel_common::error::{Result, VesselError};

/// Computes the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_hex(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| VesselError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).map_err(|e| VesselError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verifies a downloaded blob against its registry digest.
///
/// # Errors
///
/// Returns a validation error on digest mismatch, or an I/O error if the
/// blob cannot be read.
pub fn verify_digest(path: &Path, digest: &str) -> Result<()> {
    let expected = digest.strip_prefix("sha256:").unwrap_or(digest);
    let actual = sha256_hex(path)?;
    if actual != expected {
        return Err(VesselError::validation(format!(
            "digest mismatch for {}: expected {expected}, got {actual}",
            path.display()
        )));
    }
    Ok(())
}

/// Unpacks a layer archive (tar, gzipped or not) into a directory.
///
/// Compression is detected from the gzip magic bytes rather than the file
/// name, since registries serve blobs under digest names.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or unpacked.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| VesselError::io(dest, e))?;

    let mut file = File::open(archive).map_err(|e| VesselError::io(archive, e))?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic).map_err(|e| VesselError::io(archive, e))?;
    let gzipped = n == 2 && magic == [0x1f, 0x8b];

    let file = File::open(archive).map_err(|e| VesselError::io(archive, e))?;
    let result = if gzipped {
        Archive::new(GzDecoder::new(BufReader::new(file))).unpack(dest)
    } else {
        Archive::new(BufReader::new(file)).unpack(dest)
    };
    result.map_err(|e| VesselError::io(dest, e))?;

    tracing::debug!(archive = %archive.display(), dest = %dest.display(), "layer extracted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_tar(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("layer.tar");
        let file = File::create(&path).expect("create tar");
        let mut builder = tar::Builder::new(file);
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "etc/greeting", "hello".as_bytes())
            .expect("append");
        builder.finish().expect("finish tar");
        path
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("blob");
        std::fs::write(&path, "hello").expect("write blob");
        assert_eq!(
            sha256_hex(&path).expect("hash failed"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn verify_digest_rejects_mismatch() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("blob");
        std::fs::write(&path, "hello").expect("write blob");
        assert!(verify_digest(&path, "sha256:0000").is_err());
        verify_digest(
            &path,
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        )
        .expect("verify failed");
    }

    #[test]
    fn extract_unpacks_a_plain_tar() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let tar = build_tar(dir.path());
        let dest = dir.path().join("rootfs");
        extract(&tar, &dest).expect("extract failed");
        let content = std::fs::read_to_string(dest.join("etc/greeting")).expect("read failed");
        assert_eq!(content, "hello");
    }

    #[test]
    fn extract_unpacks_a_gzipped_tar() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let tar = build_tar(dir.path());
        let gz = dir.path().join("layer.tar.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&gz).expect("create gz"),
            flate2::Compression::default(),
        );
        encoder
            .write_all(&std::fs::read(&tar).expect("read tar"))
            .expect("compress");
        let _ = encoder.finish().expect("finish gz");

        let dest = dir.path().join("rootfs");
        extract(&gz, &dest).expect("extract failed");
        assert!(dest.join("etc/greeting").is_file());
    }
}
