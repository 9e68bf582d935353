use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::aggregator::{TopicFrequency, TopicSet};

const TOPICS_LABEL: &str = "**抽出されたトピック**";

#[derive(Debug, Error)]
#[error("failed to access report file {path}: {source}")]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl ReportError {
    fn new(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `{date}.md` for a `YYYY-MM-DD` date. Anything else is reduced to ASCII
/// alphanumerics and `-` so it cannot leave the output directory.
pub fn daily_file_name(date: &str) -> String {
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() {
        return format!("{}.md", date);
    }

    let sanitized: String = date
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "unknown-date.md".to_string()
    } else {
        format!("unknown-date_{}.md", sanitized)
    }
}

pub fn monthly_file_name(year: i32, month: u32) -> String {
    format!("{}_{:02}.md", year, month)
}

pub fn summary_file_name(year: i32, month: u32) -> String {
    format!("result_{}_{:02}.md", year, month)
}

pub fn yearly_file_name(year: i32) -> String {
    format!("{}.md", year)
}

pub fn render_daily(date: &str, topics: &TopicSet) -> String {
    format!(
        "# {}の国会議事録 トピック要約\n\n{}: {}\n\n",
        date,
        TOPICS_LABEL,
        topics.join(", ")
    )
}

pub fn render_monthly(year: i32, month: u32, days: &[(String, TopicSet)]) -> String {
    let mut content = format!("# {}年{}月の国会議事録 トピック要約\n\n", year, month);
    for (date, topics) in days {
        content.push_str(&format!(
            "### 日付: {}\n{}: {}\n\n",
            date,
            TOPICS_LABEL,
            topics.join(", ")
        ));
    }
    content
}

pub fn render_yearly(year: i32, frequency: &TopicFrequency, top_n: usize) -> String {
    let mut content = format!("# {}年の国会議事録 トピック傾向\n\n", year);
    content.push_str(&format!(
        "抽出されたトピック数: {}（延べ {} 件）\n\n",
        frequency.distinct(),
        frequency.total()
    ));

    let top = frequency.top(top_n);
    if top.is_empty() {
        return content;
    }

    content.push_str(&format!("## 頻出トピック Top {}\n\n", top.len()));
    content.push_str("| 順位 | トピック | 出現回数 |\n|---:|---|---:|\n");
    for (rank, (topic, count)) in top.iter().enumerate() {
        content.push_str(&format!(
            "| {} | {} | {} |\n",
            rank + 1,
            topic.replace('|', "\\|"),
            count
        ));
    }
    content
}

pub fn render_summary(year: i32, month: u32, summary: &str) -> String {
    format!(
        "# {}年{}月の国会議事録 議論トピックと概要\n\n{}\n",
        year,
        month,
        summary.trim()
    )
}

/// Writes report files under one output directory. Existing files with the
/// same name are replaced.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| ReportError::new(&output_dir, e))?;
        Ok(Self { output_dir })
    }

    pub fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(file_name);
        fs::write(&path, content).map_err(|e| ReportError::new(&path, e))?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(path)
    }

    pub fn read(&self, path: &Path) -> Result<String, ReportError> {
        fs::read_to_string(path).map_err(|e| ReportError::new(path, e))
    }

    pub fn write_daily(&self, date: &str, topics: &TopicSet) -> Result<PathBuf, ReportError> {
        self.write(&daily_file_name(date), &render_daily(date, topics))
    }

    pub fn write_monthly(
        &self,
        year: i32,
        month: u32,
        days: &[(String, TopicSet)],
    ) -> Result<PathBuf, ReportError> {
        let path = self.write(
            &monthly_file_name(year, month),
            &render_monthly(year, month, days),
        )?;
        info!("Monthly topic report written to {}", path.display());
        Ok(path)
    }

    pub fn write_yearly(
        &self,
        year: i32,
        frequency: &TopicFrequency,
        top_n: usize,
    ) -> Result<PathBuf, ReportError> {
        let path = self.write(
            &yearly_file_name(year),
            &render_yearly(year, frequency, top_n),
        )?;
        info!("Yearly topic report written to {}", path.display());
        Ok(path)
    }

    pub fn write_summary(
        &self,
        year: i32,
        month: u32,
        summary: &str,
    ) -> Result<PathBuf, ReportError> {
        let path = self.write(
            &summary_file_name(year, month),
            &render_summary(year, month, summary),
        )?;
        info!("Discussion summary written to '{}'", path.display());
        Ok(path)
    }
}

/// Append-only markdown log of every chunk's extracted topics.
#[derive(Debug, Clone)]
pub struct TopicLog {
    path: PathBuf,
}

impl TopicLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        label: &str,
        chunk_index: usize,
        chunk_count: usize,
        topics: &[String],
    ) -> Result<(), ReportError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ReportError::new(&self.path, e))?;

        let entry = format!(
            "## {} (chunk {}/{})\n\n{}: {}\n\n",
            label,
            chunk_index + 1,
            chunk_count,
            TOPICS_LABEL,
            topics.join(", ")
        );
        file.write_all(entry.as_bytes())
            .map_err(|e| ReportError::new(&self.path, e))
    }
}
