// AI
//! 📊 progress.rs: "Are we there yet?" Every pipeline, every time, forever.
//!
//! 🚀 This module answers the age-old question: "how fast is our data moving?"
//! With cold hard numbers, a progress bar, and a table so comfy it has lumbar support.
//!
//! 📏 Two ways to measure "how far along": documents (a scroll knows its total
//! up front, give or take) or bytes (an archive knows its size on disk). Both
//! counters are shown, only one of them drives the bar.
//!
//! ⚠️  Warning: Watching this progress bar will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! 🦆 The duck has nothing to do with this module. It's just vibing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

// -- 📏 one mebibyte: not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// 📏 Which counter the bar's position and the ETA are computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProgressUnit {
    /// 📄 A scroll: total = documents the cluster advertised.
    Docs,
    /// 📦 An archive: total = bytes on disk.
    Bytes,
}

/// 📦 Raw bytes, human-readable. Because "1073741824 bytes" is a war crime in a UI.
fn format_bytes(bytes: u64) -> String {
    if bytes >= 512 * MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        // -- 🐛 raw bytes mode. small files need love too.
        format!("{} bytes", bytes)
    }
}

/// 🔢 "1000000 docs" → "1,000,000 docs": you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS or HH:MM:SS. If it shows HH:MM:SS, you should probably call your mom.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📡 A snapshot of throughput at any given moment. A speedometer that can't get you a ticket.
struct Rates {
    docs_per_sec: f64,
    mib_per_sec: f64,
}

/// 📊 Tracks bytes, docs, rates, and your sanity.
///
/// Uses a sliding 5-second window for rate calculations so spikes don't scare you.
///
/// # Ancient Proverb
/// "He who runs a migration without a progress bar, migrates alone and in darkness."
pub(crate) struct ProgressMetrics {
    /// 🏷️ what are we even moving? a name to display in the UI
    label: String,
    unit: ProgressUnit,
    /// 📏 total in `unit`s, 0 if we have no idea
    total: u64,
    total_bytes: u64,
    total_docs: u64,
    progress_bar: ProgressBar,
    /// 🔄 sliding window of (timestamp, bytes, docs)
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("unit", &self.unit)
            .field("total", &self.total)
            .field("total_bytes", &self.total_bytes)
            .field("total_docs", &self.total_docs)
            .finish()
    }
}

impl ProgressMetrics {
    /// 🚀 Spin up a progress display. `total` is in `unit`s; 0 means "unknown, for now".
    pub(crate) fn new(label: String, total: u64, unit: ProgressUnit) -> Self {
        let progress_bar = ProgressBar::new(total);
        // -- the template is a literal; if indicatif ever rejects it, a plain bar beats no bar
        let style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        progress_bar.set_style(style);

        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        rate_samples.push_back((start_time, 0u64, 0u64));

        Self {
            label,
            unit,
            total,
            total_bytes: 0,
            total_docs: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔢 The total became known after the fact (first scroll page, typically).
    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
        self.progress_bar.set_length(total);
    }

    /// 🔄 Feed the metrics engine. Either counter may be zero.
    pub(crate) fn update(&mut self, bytes: u64, docs: u64) {
        self.total_bytes += bytes;
        self.total_docs += docs;

        let rates = self.calculate_rates();
        self.render(rates);
        self.progress_bar.set_position(self.position());
    }

    /// ✅ Mark the progress bar done. Ring the bell. We made it.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn position(&self) -> u64 {
        match self.unit {
            ProgressUnit::Docs => self.total_docs,
            ProgressUnit::Bytes => self.total_bytes,
        }
    }

    fn percent(&self) -> f64 {
        if self.total > 0 {
            (self.position() as f64 / self.total as f64 * 100.0).min(100.0)
        } else {
            // ⚠️ unknown total: percent is meaningless, and so is the ETA
            0.0
        }
    }

    /// 📈 Throughput over the last 5 seconds, so short bursts don't look like a seismograph.
    fn calculate_rates(&mut self) -> Rates {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples.push_back((now, self.total_bytes, self.total_docs));

        if let Some(&(oldest_time, oldest_bytes, oldest_docs)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                let bytes_delta = self.total_bytes.saturating_sub(oldest_bytes);
                let docs_delta = self.total_docs.saturating_sub(oldest_docs);
                return Rates {
                    docs_per_sec: docs_delta as f64 / elapsed,
                    mib_per_sec: (bytes_delta as f64 / elapsed) / MIB as f64,
                };
            }
        }
        // -- 💤 not enough elapsed time yet: return zeros and maintain composure
        Rates {
            docs_per_sec: 0.0,
            mib_per_sec: 0.0,
        }
    }

    fn remaining(&self, percent: f64) -> String {
        if percent <= 0.0 {
            return "--:--".to_string();
        }
        // 🔮 linear extrapolation: assumes the future looks like the past
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let remaining_secs = elapsed / (percent / 100.0) - elapsed;
        if remaining_secs > 0.0 {
            format_duration(Duration::from_secs_f64(remaining_secs))
        } else {
            "--:--".to_string()
        }
    }

    /// 🎨 The comfy-table under the bar:
    /// ```text
    ///   <docs/s>     <docs done [/ total]>
    ///   <MiB/s>      <bytes done [/ total]>
    ///   <elapsed>    <remaining>
    /// ```
    fn render(&self, rates: Rates) {
        let percent = self.percent();
        let (docs_done, bytes_done) = match self.unit {
            ProgressUnit::Docs => (
                format!("{} / {} Docs ({:.1}%)", format_number(self.total_docs), format_number(self.total), percent),
                format_bytes(self.total_bytes),
            ),
            ProgressUnit::Bytes => (
                format!("{} Docs", format_number(self.total_docs)),
                format!("{} / {} ({:.1}%)", format_bytes(self.total_bytes), format_bytes(self.total), percent),
            ),
        };

        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} Docs/s", format_number(rates.docs_per_sec as u64))).set_alignment(CellAlignment::Right),
            Cell::new(docs_done).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} MiB/s", rates.mib_per_sec)).set_alignment(CellAlignment::Right),
            Cell::new(bytes_done).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(self.start_time.elapsed()))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} remaining", self.remaining(percent))).set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar.set_message(format!("{}\n{}", self.label, table));
    }
}
