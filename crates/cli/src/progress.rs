//! Terminal progress bars for an inventory run
//!
//! One bar counts finished nodes. Each node in flight gets its own pod bar,
//! removed once the node is merged.

use dashmap::DashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use tonnage_lib::ProgressObserver;

const NODE_TEMPLATE: &str = "{prefix:>8} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)";
const POD_TEMPLATE: &str = "{prefix:>24} [{bar:40.green/white}] {pos}/{len} pods";

/// [`ProgressObserver`] drawing indicatif bars
pub struct BarProgress {
    multi: MultiProgress,
    nodes: ProgressBar,
    pods: DashMap<String, ProgressBar>,
}

impl BarProgress {
    /// Bars drawn on stderr (hidden when stderr is not a terminal)
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let nodes = multi.add(ProgressBar::new(0));
        nodes.set_style(style(NODE_TEMPLATE));
        nodes.set_prefix("Nodes");

        Self {
            multi,
            nodes,
            pods: DashMap::new(),
        }
    }

    /// Writer for log lines. Bars are cleared while a line is written, then redrawn.
    pub fn log_writer(&self) -> BarWriter {
        BarWriter {
            multi: self.multi.clone(),
        }
    }

    /// Stop drawing. Bars of a failed run are left where they stopped.
    pub fn finish(&self, succeeded: bool) {
        for entry in self.pods.iter() {
            entry.value().finish_and_clear();
        }
        self.pods.clear();

        if succeeded {
            self.nodes.finish();
        } else {
            self.nodes.abandon();
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Stderr writer that suspends the bars around every write
#[derive(Clone)]
pub struct BarWriter {
    multi: MultiProgress,
}

impl Write for BarWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ProgressObserver for BarProgress {
    fn nodes_discovered(&self, count: usize) {
        self.nodes.set_length(count as u64);
    }

    fn node_started(&self, node: &str, pods: usize) {
        let bar = self.multi.add(ProgressBar::new(pods as u64));
        bar.set_style(style(POD_TEMPLATE));
        bar.set_prefix(node.to_string());
        self.pods.insert(node.to_string(), bar);
    }

    fn pod_processed(&self, node: &str) {
        if let Some(bar) = self.pods.get(node) {
            bar.inc(1);
        }
    }

    fn node_finished(&self, node: &str) {
        if let Some((_, bar)) = self.pods.remove(node) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
        self.nodes.inc(1);
    }
}
