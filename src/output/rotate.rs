use std::convert::TryFrom;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use chrono::Duration;
use tracing::{debug, info, warn};

use super::sink::{Sink, WriteResult};
use crate::error::{short_write, Error, PartialWrite, Result};
use crate::utils::time::{format_backup_time, parse_backup_time};

/// A log file that is moved aside once it would grow past `max_size`.
///
/// Rotation only ever happens between two `write` calls, so a file never ends
/// in the middle of a chunk. Put a `LineFlushingWriter` in front of it and
/// every file holds whole lines only. A single write larger than `max_size`
/// goes, whole, into a fresh file.
///
/// Backups live next to the file as `<stem>-<timestamp>.<ext>`, e.g.
/// `app-2021-01-01T00-00-00.000.log`. With `max_backups > 0` only that many
/// of the newest are kept.
///
/// A failed rotation leaves the file usable: the log path is reopened, and
/// if even that fails the next write tries again.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_size: usize,
    max_backups: usize,
    file: Option<File>,
    closed: bool,
    size: u64,
    last_rotation: Option<DateTime<Utc>>,
}

impl RotatingFile {
    pub fn open<P: AsRef<Path>>(path: P, max_size: usize, max_backups: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(Error::invalid_configuration(
                "maximum log file size must be greater than 0",
            ));
        }

        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(Error::invalid_configuration(format!(
                "log file path has no file name: {}",
                path.display()
            )));
        }

        let (file, size) = open_append(&path)?;
        debug!(path = %path.display(), size, "opened log file");

        Ok(Self {
            path,
            max_size,
            max_backups,
            file: Some(file),
            closed: false,
            size,
            last_rotation: None,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the current file.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Moves the current file aside and starts a new one.
    ///
    /// Whatever happens to the rename, the log path is reopened afterwards so
    /// later writes land in a file. A rename error is reported before an open
    /// error.
    pub fn rotate(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(self.closed_error());
        }
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                self.file = Some(file);
                return Err(e);
            }
        }

        let t = self.next_rotation_time();
        let backup = self.backup_path(t);
        let renamed = fs::rename(&self.path, &backup);
        match &renamed {
            Ok(()) => info!(
                path = %self.path.display(),
                backup = %backup.display(),
                size = self.size,
                "rotated log file"
            ),
            Err(e) => warn!(
                path = %self.path.display(),
                backup = %backup.display(),
                error = %e,
                "failed to rotate log file, reopening it"
            ),
        }

        let reopened = self.reopen().map(|_| ());
        renamed?;
        reopened?;
        self.prune()
    }

    /// Rotated files of this log, oldest first.
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        let (stem, ext) = self.name_parts();
        let prefix = format!("{}-", stem);

        let mut backups = Vec::new();
        for entry in fs::read_dir(self.dir())? {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            let stamp = match name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&ext))
                .and_then(parse_backup_time)
            {
                Some(stamp) => stamp,
                None => continue,
            };
            backups.push((stamp, path));
        }

        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    fn prune(&self) -> io::Result<()> {
        if self.max_backups == 0 {
            return Ok(());
        }

        let backups = self.backups()?;
        if backups.len() <= self.max_backups {
            return Ok(());
        }

        for stale in &backups[..backups.len() - self.max_backups] {
            debug!(backup = %stale.display(), "removing old log file");
            fs::remove_file(stale)?;
        }
        Ok(())
    }

    fn reopen(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let (file, size) = open_append(&self.path)?;
                self.size = size;
                file
            }
        };
        Ok(self.file.insert(file))
    }

    fn closed_error(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::BrokenPipe,
            format!("log file is closed: {}", self.path.display()),
        )
    }

    // Backup names must sort in rotation order, even for rotations that land
    // in the same millisecond.
    fn next_rotation_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let t = match self.last_rotation {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_rotation = Some(t);
        t
    }

    fn backup_path(&self, t: DateTime<Utc>) -> PathBuf {
        let (stem, ext) = self.name_parts();
        self.dir()
            .join(format!("{}-{}{}", stem, format_backup_time(&t), ext))
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn name_parts(&self) -> (String, String) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

impl Sink for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> WriteResult {
        if self.closed {
            return Err(PartialWrite::new(0, self.closed_error()));
        }

        // A size that does not fit u64 can never fit max_size either.
        let incoming = u64::try_from(buf.len()).unwrap_or(u64::MAX);
        let max_size = u64::try_from(self.max_size).unwrap_or(u64::MAX);
        if self.size > 0 && self.size.saturating_add(incoming) > max_size {
            self.rotate().map_err(|e| PartialWrite::new(0, e))?;
        }

        let file = self.reopen().map_err(|e| PartialWrite::new(0, e))?;

        let mut written = 0;
        let result = loop {
            if written == buf.len() {
                break Ok(written);
            }
            match file.write(&buf[written..]) {
                Ok(0) => break Err(PartialWrite::new(written, short_write())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(PartialWrite::new(written, e)),
            }
        };
        self.size += written as u64;
        result
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(self.closed_error());
        }
        self.closed = true;

        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        debug!(path = %self.path.display(), size = self.size, "closed log file");
        Ok(())
    }
}
