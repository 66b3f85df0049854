//! Live progress display for search runs
//!
//! The aggregator reports [`ProgressEvent`]s over an unbounded channel. On a
//! terminal they drive an indicatif bar sized to the target count; otherwise a
//! short line per tier is written to stderr.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::ProgressEvent;

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable the visual progress bar
    pub enable_progress_bars: bool,
    /// Spinner tick interval
    pub tick_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            tick_interval: Duration::from_millis(120),
        }
    }
}

/// Progress display bound to one run
pub struct ProgressDisplay {
    config: ProgressConfig,
    is_terminal: bool,
    bar: Option<ProgressBar>,
    update_task: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    /// Create a new progress display with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            is_terminal: atty::is(atty::Stream::Stderr),
            bar: None,
            update_task: None,
        }
    }

    /// Start listening for events and return the sender for the aggregator
    pub fn start(&mut self, target: usize) -> mpsc::UnboundedSender<ProgressEvent> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let bar = if self.config.enable_progress_bars && self.is_terminal {
            let bar = ProgressBar::new(target as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("##-"));
            }
            bar.enable_steady_tick(self.config.tick_interval);
            Some(bar)
        } else {
            None
        };

        let task_bar = bar.clone();
        self.update_task = Some(tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match (&task_bar, event) {
                    (Some(bar), ProgressEvent::TierStarted { kind, .. }) => {
                        bar.set_message(format!("searching {} tier", kind));
                    }
                    (Some(bar), ProgressEvent::PageFetched { page, items }) => {
                        bar.set_message(format!("page {} ({} items)", page, items));
                    }
                    (Some(bar), ProgressEvent::Accepted { collected, .. }) => {
                        bar.set_position(collected as u64);
                    }
                    (None, ProgressEvent::TierStarted { kind, query }) => {
                        eprintln!("Searching {} tier: {}", kind, query);
                    }
                    (None, _) => {}
                }
            }
            debug!("Progress channel closed");
        }));

        self.bar = bar;
        event_tx
    }

    /// Wait for the event stream to end and clear the bar
    ///
    /// The sender returned by [`start`](Self::start) must be dropped first.
    pub async fn finish(&mut self) {
        if let Some(task) = self.update_task.take() {
            let _ = task.await;
        }
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_display_drains_events() {
        let mut display = ProgressDisplay::new(ProgressConfig {
            enable_progress_bars: false,
            ..Default::default()
        });

        let tx = display.start(3);
        tx.send(ProgressEvent::PageFetched { page: 1, items: 4 })
            .unwrap();
        tx.send(ProgressEvent::Accepted {
            collected: 1,
            target: 3,
        })
        .unwrap();
        drop(tx);

        // Returns once the channel is closed
        display.finish().await;
        assert!(display.update_task.is_none());
    }
}
