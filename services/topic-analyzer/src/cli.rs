//! Command-line interface for diet-topics

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kokkai_connector::{DateRange, DateRangeError};
use std::path::PathBuf;

use crate::pipeline::ReportingPeriod;

/// Extract and report policy topics from Diet meeting records
#[derive(Parser, Debug)]
#[command(name = "diet-topics", version, about = "Topic reports for Diet meeting records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory for report files (overrides OUTPUT_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One topic report per meeting day of a month
    Daily {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// One topic report per meeting day between two dates (inclusive)
    Range {
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: NaiveDate,
        #[arg(long, value_name = "YYYY-MM-DD")]
        until: NaiveDate,
    },

    /// A single report for the month, then a discussion summary
    Monthly {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        /// Write the monthly report only
        #[arg(long)]
        skip_summary: bool,
    },

    /// Topic frequencies for a whole year with a top-10 chart
    Yearly {
        #[arg(long)]
        year: i32,
    },
}

impl Command {
    pub fn period(&self) -> Result<ReportingPeriod, DateRangeError> {
        match self {
            Command::Daily { year, month } => ReportingPeriod::daily_for_month(*year, *month),
            Command::Range { from, until } => Ok(ReportingPeriod::Daily {
                range: DateRange::days(*from, *until)?,
            }),
            Command::Monthly {
                year,
                month,
                skip_summary,
            } => {
                DateRange::month(*year, *month)?;
                Ok(ReportingPeriod::Monthly {
                    year: *year,
                    month: *month,
                    summarize: !skip_summary,
                })
            }
            Command::Yearly { year } => Ok(ReportingPeriod::Yearly { year: *year }),
        }
    }

    pub fn is_yearly(&self) -> bool {
        matches!(self, Command::Yearly { .. })
    }
}
