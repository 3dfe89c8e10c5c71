use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

static SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn init_spinner(msg: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    pb.set_style(style);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn active() -> Option<ProgressBar> {
    SPINNER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Shows the spinner unless output is quieted.
pub fn start(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }
    let mut slot = SPINNER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(old) = slot.replace(init_spinner(format!("{}", msg.italic()))) {
        old.finish_and_clear();
    }
}

pub fn report_progress(label: &str, count: usize) {
    if let Some(pb) = active() {
        pb.set_message(format!(
            "{} {} so far...",
            count.to_string().green().bold(),
            label
        ));
    }
}

pub fn finish() {
    let taken = SPINNER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(pb) = taken {
        pb.finish_and_clear();
    }
}

/// Routes log lines above the spinner while one is running.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match active() {
            Some(pb) => {
                let msg = String::from_utf8_lossy(buf);
                pb.println(msg.trim_end());
            }
            None => std::io::stdout().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}
