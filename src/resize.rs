//! Resize Coordinator
//!
//! Coalesces window-resize bursts into a single reflow instruction per
//! animation frame across the four current pane handles. Exactly one
//! listener registration is live at a time: dropping a binding deregisters
//! its listener, and re-binding drops the prior binding first.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::render::PaneSurface;

/// Source of animation-frame ticks
#[async_trait]
pub trait FrameClock: Send + Sync {
    /// Resolves at the next frame boundary
    async fn next_frame(&self);
}

/// Production clock ticking at display cadence
pub struct DisplayFrameClock {
    interval: Duration,
}

impl DisplayFrameClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for DisplayFrameClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

#[async_trait]
impl FrameClock for DisplayFrameClock {
    async fn next_frame(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Test clock: frames advance only when stepped
#[derive(Default)]
pub struct ManualFrameClock {
    tick: Notify,
}

impl ManualFrameClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Release one pending (or the next) `next_frame` wait
    pub fn step(&self) {
        self.tick.notify_one();
    }
}

#[async_trait]
impl FrameClock for ManualFrameClock {
    async fn next_frame(&self) {
        self.tick.notified().await;
    }
}

/// Live resize binding for one render cycle.
///
/// Dropping the coordinator aborts its listener task; that drop is the
/// deregistration half of the re-bind contract.
pub struct ResizeCoordinator {
    task: JoinHandle<()>,
}

impl ResizeCoordinator {
    pub fn bind(
        mut events: broadcast::Receiver<()>,
        clock: Arc<dyn FrameClock>,
        panes: [Arc<dyn PaneSurface>; 4],
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }

                // Everything else in the burst collapses into this frame.
                drain(&mut events);
                clock.next_frame().await;
                drain(&mut events);

                trace!("reflowing panes after resize burst");
                for pane in &panes {
                    pane.reflow();
                }
            }
        });

        Self { task }
    }
}

fn drain(events: &mut broadcast::Receiver<()>) {
    loop {
        match events.try_recv() {
            Ok(()) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

impl Drop for ResizeCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}
