use crate::domain::ports::RecordSink;
use crate::utils::error::Result;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// 結果記錄：每行加上時間戳記，寫入檔案並同時輸出到 stdout
pub struct RecordLog {
    path: PathBuf,
    file: File,
    echo: bool,
}

impl RecordLog {
    /// 在 `dir` 下建立 `YYYYmmdd-HHMMSS-balance.log`
    pub fn create_in<P: AsRef<Path>>(dir: P, echo: bool) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let name = format!("{}-balance.log", Local::now().format("%Y%m%d-%H%M%S"));
        Self::open(dir.join(name), echo)
    }

    pub fn open<P: Into<PathBuf>>(path: P, echo: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file, echo })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for RecordLog {
    fn write_record(&mut self, message: &str) -> Result<()> {
        let line = format!("{}\t{}", Local::now().format(TIMESTAMP_FORMAT), message);
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        if self.echo {
            println!("{}", line);
        }
        Ok(())
    }
}
