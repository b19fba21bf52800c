pub mod buffer;

use std::time::Instant;

use log::info;

/// Logs throughput of a long streaming pass every million items; used
/// where the total is unknown and a progress bar cannot be drawn
pub struct ProgressLogger {
    name: &'static str,
    items: u64,
    started: Instant,
}

impl ProgressLogger {
    pub fn new(name: &'static str) -> Self {
        ProgressLogger {
            name,
            items: 0,
            started: Instant::now(),
        }
    }

    pub fn done_item(&mut self) {
        self.items += 1;
        if self.items % 1_000_000 == 0 {
            info!(
                "{}: {} items in {:.1?}",
                self.name,
                self.items,
                self.started.elapsed()
            );
        }
    }

    pub fn done(self) {
        info!(
            "{}: finished {} items in {:.1?}",
            self.name,
            self.items,
            self.started.elapsed()
        );
    }
}
