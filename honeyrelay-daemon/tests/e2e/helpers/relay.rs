//! Dispatcher running in a background task.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use honeyrelay_core::config::RelayConfig;
use honeyrelay_daemon::Dispatcher;
use honeyrelay_irc_relay::{ConnectionState, OutboundQueue};

use super::irc_server::{FakeIrc, WAIT, fake_irc};

#[allow(dead_code)]
pub struct RunningRelay {
    pub irc: FakeIrc,
    pub state: watch::Receiver<ConnectionState>,
    pub queue: Arc<OutboundQueue>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<anyhow::Result<()>>,
}

#[allow(dead_code)]
impl RunningRelay {
    /// Build a dispatcher against the fake server and run it until shutdown.
    pub fn start(config: RelayConfig) -> Self {
        let (connector, irc) = fake_irc();
        let mut dispatcher =
            Dispatcher::build_with_connector(config, connector).expect("dispatcher should build");
        let state = dispatcher.state();
        let queue = Arc::clone(dispatcher.queue());

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            dispatcher
                .run_until(async {
                    let _ = stopped.await;
                })
                .await
        });

        Self {
            irc,
            state,
            queue,
            stop,
            task,
        }
    }

    /// Signal shutdown and wait for `run_until` to return.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.stop.send(());
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("dispatcher did not shut down")
            .expect("dispatcher task panicked")
    }
}
