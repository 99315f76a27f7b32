use std::time::Duration;

use kanal::{Receiver, Sender};

/// A finished job's callback, bound to its outcome, waiting for the UI thread
pub type Delivery<C> = Box<dyn FnOnce(&mut C) + Send>;

pub(crate) fn channel<C>() -> (Sender<Delivery<C>>, UiHandoff<C>) {
    let (tx, rx) = kanal::unbounded();
    (tx, UiHandoff { rx })
}

/// UI-thread end of the result channel.
///
/// Callbacks only ever run inside [`UiHandoff::drain`] or
/// [`UiHandoff::wait_and_drain`], on whatever thread calls them.
pub struct UiHandoff<C> {
    rx: Receiver<Delivery<C>>,
}

impl<C> UiHandoff<C> {
    /// Run every delivery already queued, oldest first
    pub fn drain(&self, ctx: &mut C) -> usize {
        let mut delivered = 0;
        while let Ok(Some(delivery)) = self.rx.try_recv() {
            delivery(ctx);
            delivered += 1;
        }
        delivered
    }

    /// Block up to `timeout` for the first delivery, then drain the rest
    pub fn wait_and_drain(&self, ctx: &mut C, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => {
                delivery(ctx);
                1 + self.drain(ctx)
            }
            Err(_) => 0,
        }
    }

    pub fn pending_deliveries(&self) -> usize {
        self.rx.len()
    }
}
