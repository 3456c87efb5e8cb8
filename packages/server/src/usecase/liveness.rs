//! UseCase: connection liveness
//!
//! Every ping interval each connection is either pinged or, if it has been
//! silent for longer than `interval * multiplier`, closed and disconnected.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::domain::SweepReport;

use super::Dispatcher;

pub struct LivenessSweeper {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    timeout: Duration,
}

impl LivenessSweeper {
    pub fn new(dispatcher: Arc<Dispatcher>, interval: Duration, timeout: Duration) -> Self {
        Self {
            dispatcher,
            interval,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn sweep_once(&self) -> SweepReport {
        let report = self.dispatcher.sweep(self.timeout).await;
        if !report.disconnected.is_empty() {
            tracing::info!(
                "Liveness sweep dropped {} connection(s): {:?}",
                report.disconnected.len(),
                report.disconnected
            );
        }
        tracing::trace!("Liveness sweep pinged {} connection(s)", report.pinged.len());
        report
    }

    /// Sweep forever, first tick one interval from now
    pub async fn run(self) {
        let Some(start) = time::Instant::now().checked_add(self.interval) else {
            tracing::warn!(
                "Ping interval {:?} is out of range, liveness sweep disabled",
                self.interval
            );
            return;
        };
        let mut ticker = time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
