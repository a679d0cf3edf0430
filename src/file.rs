// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{
    fs::File,
    io::Write,
    path::Path,
};

pub const MAGIC_BYTES: [u8; 4] = [b'T', b'S', b'V', 0];

pub const RECORDS_FOLDER: &str = "records";
pub const ANALYSIS_FOLDER: &str = "analysis";

pub const TIER_FILE_EXT: &str = "tier";
pub const CHECKPOINT_FILE_EXT: &str = "ckpt";
pub const STAT_FILE_EXT: &str = "stat";
pub const MAP_FILE_EXT: &str = "map";

/// Reads bytes from a file at an absolute offset.
pub fn read_exact_at(file: &File, offset: u64, size: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; size];

    #[cfg(unix)]
    let bytes_read = {
        use std::os::unix::fs::FileExt;
        file.read_at(&mut buf, offset)?
    };

    #[cfg(windows)]
    let bytes_read = {
        use std::os::windows::fs::FileExt;
        file.seek_read(&mut buf, offset)?
    };

    if bytes_read != size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "read_exact_at({bytes_read}) at {offset} did not read enough bytes {size}; file has length {}",
                file.metadata()?.len(),
            ),
        ));
    }

    Ok(buf)
}

/// Atomically (re)writes a file.
pub fn rewrite_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    #[allow(clippy::expect_used)]
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file_mut().sync_all()?;
    temp_file.persist(path)?;

    #[cfg(not(target_os = "windows"))]
    {
        fsync_directory(folder)?;
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    let file = File::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}

#[cfg(target_os = "windows")]
pub fn fsync_directory(_path: &Path) -> std::io::Result<()> {
    // Cannot fsync directory on Windows
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn atomic_rewrite() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join("test.txt");
        {
            let mut file = File::create(&path)?;
            write!(file, "asdasdasdasdasd")?;
        }

        rewrite_atomic(&path, b"newcontent")?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!("newcontent", content);

        Ok(())
    }

    #[test]
    fn read_at_offset() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let path = dir.path().join("blob");
        std::fs::write(&path, b"0123456789")?;

        let file = File::open(&path)?;
        assert_eq!(b"345".to_vec(), read_exact_at(&file, 3, 3)?);
        assert!(read_exact_at(&file, 8, 5).is_err());

        Ok(())
    }
}
