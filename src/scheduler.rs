use crate::prelude::*;

use crate::coordinator::Coordinator;
use crate::presenter::Presenter;
use crate::transport::Transport;

use futures::future::OptionFuture;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Drives poll passes on a fixed interval until shutdown.
pub struct Scheduler {
    coordinator: Coordinator,
    transport: Box<dyn Transport>,
    presenter: Box<dyn Presenter>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        coordinator: Coordinator,
        transport: Box<dyn Transport>,
        presenter: Box<dyn Presenter>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            transport,
            presenter,
            interval,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn into_coordinator(self) -> Coordinator {
        self.coordinator
    }

    /// Polls each configured space once, in order.
    pub async fn run_pass(&mut self) -> Result<()> {
        for space in self.coordinator.spaces() {
            let rows = self
                .coordinator
                .poll(space, self.transport.as_mut())
                .await?;
            self.presenter.present(space, &rows)?;
        }

        Ok(())
    }

    /// Runs passes until `shutdown_rx` fires or `runtime` elapses. A zero
    /// interval runs exactly one pass. A pass already under way is always
    /// finished.
    pub async fn start(
        &mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
        runtime: Option<Duration>,
    ) -> Result<()> {
        if self.interval.is_zero() {
            return self.run_pass().await;
        }

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline: OptionFuture<_> = runtime.map(tokio::time::sleep).into();
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_pass().await?;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
                Some(_) = &mut deadline => {
                    info!("Runtime limit reached, stopping scheduler");
                    break;
                }
            }
        }

        Ok(())
    }
}
