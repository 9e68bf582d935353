use std::io::{self, Write};

use crate::aggregator::TopicFrequency;

pub const DEFAULT_TOP_N: usize = 10;
const DEFAULT_BAR_WIDTH: usize = 40;

/// Horizontal bar chart of the most frequent topics, rendered as text.
#[derive(Debug, Clone)]
pub struct TrendVisualizer {
    top_n: usize,
    bar_width: usize,
}

impl Default for TrendVisualizer {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }
}

impl TrendVisualizer {
    pub fn new(top_n: usize, bar_width: usize) -> Self {
        Self {
            top_n,
            bar_width: bar_width.max(1),
        }
    }

    pub fn select(&self, frequency: &TopicFrequency) -> Vec<(String, u64)> {
        frequency.top(self.top_n)
    }

    /// Most frequent first. Bars scale against the leading count; any topic
    /// with a non-zero count gets at least one block.
    pub fn render(&self, year: i32, frequency: &TopicFrequency) -> String {
        let top = self.select(frequency);
        let mut chart = format!("{}年 国会で頻出した政策トピック Top {}\n", year, top.len());

        let Some(max_count) = top.first().map(|(_, count)| *count) else {
            chart.push_str("(トピックなし)\n");
            return chart;
        };

        let label_width = top
            .iter()
            .map(|(topic, _)| display_width(topic))
            .max()
            .unwrap_or(0);

        for (topic, count) in &top {
            let scaled = (*count as u128 * self.bar_width as u128 / max_count.max(1) as u128) as usize;
            let bar = "█".repeat(scaled.max(1));
            let padding = " ".repeat(label_width - display_width(topic));
            chart.push_str(&format!("{}{} │{} {}\n", topic, padding, bar, count));
        }

        chart
    }

    pub fn show(&self, year: i32, frequency: &TopicFrequency) -> io::Result<()> {
        let chart = self.render(year, frequency);
        let mut stdout = io::stdout().lock();
        stdout.write_all(chart.as_bytes())?;
        stdout.flush()
    }
}

/// Terminal column estimate: wide (CJK and full-width) characters take two
/// columns, everything else one.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| match c as u32 {
            0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6 => 2,
            _ => 1,
        })
        .sum()
}
