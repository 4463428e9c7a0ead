use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use wayfare_booking::{SideEffect, SideEffectRunner};

/// Drains the post-commit side-effect queue until every sender is gone.
pub struct SideEffectWorker {
    runner: SideEffectRunner,
    receiver: mpsc::Receiver<SideEffect>,
}

impl SideEffectWorker {
    pub fn new(runner: SideEffectRunner, receiver: mpsc::Receiver<SideEffect>) -> Self {
        Self { runner, receiver }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Side effect worker started");
        while let Some(effect) = self.receiver.recv().await {
            let kind = effect.kind();
            let ok = self.runner.run(effect).await;
            debug!(kind, ok, "Side effect processed");
        }
        info!("Side effect worker stopped");
    }
}
