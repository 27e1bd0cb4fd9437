//! Pull-to-refresh gesture handling.
//!
//! A small state machine `Idle -> Dragging -> {Committed, Cancelled}` driven by
//! pointer events. The damped visual offset is a pure function of drag
//! distance; the commit decision is separate from it.
//!
//! A committed gesture yields a [`RefreshTicket`]. Only one ticket can exist
//! at a time: while one is alive, further gestures are ignored. The ticket
//! is held for the fetch plus a minimum visible duration, then released on
//! drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::services::api::TimelineSource;
use crate::services::orchestrator::{FetchOrchestrator, LoadParams, LoadPhase};

/// Drag distance needed to commit a refresh.
pub const DEFAULT_THRESHOLD: f64 = 100.0;
/// Visual offset = drag / resistance.
pub const DEFAULT_RESISTANCE: f64 = 2.5;
/// Drag distance beyond which the offset stops growing.
pub const DEFAULT_MAX_DRAG: f64 = 300.0;
/// Shortest time the refreshing indicator stays up.
pub const DEFAULT_MIN_VISIBLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub threshold: f64,
    pub resistance: f64,
    pub max_drag: f64,
    pub min_visible: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            resistance: DEFAULT_RESISTANCE,
            max_drag: DEFAULT_MAX_DRAG,
            min_visible: DEFAULT_MIN_VISIBLE,
        }
    }
}

/// Damped visual offset for a downward drag of `distance` units.
pub fn damped_offset(distance: f64, config: &GestureConfig) -> f64 {
    if !(distance > 0.0) {
        return 0.0;
    }
    distance.min(config.max_drag) / config.resistance
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer is down; `distance` is the accumulated downward movement.
    Dragging { distance: f64 },
}

/// Result of releasing the pointer.
#[derive(Debug)]
pub enum GestureOutcome {
    /// Threshold passed and no refresh running: run the ticket.
    Committed(RefreshTicket),
    /// Released before the threshold (or never dragged down).
    Cancelled,
    /// Threshold passed but a refresh is already in flight.
    Ignored,
}

/// Shared "a refresh is running" flag.
#[derive(Debug, Clone, Default)]
pub struct RefreshGuard {
    refreshing: Arc<AtomicBool>,
}

impl RefreshGuard {
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    fn try_acquire(&self, min_visible: Duration) -> Option<RefreshTicket> {
        self.refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RefreshTicket {
                guard: self.clone(),
                min_visible,
            })
    }
}

/// Permission to run exactly one refresh. Releases the guard on drop.
#[derive(Debug)]
pub struct RefreshTicket {
    guard: RefreshGuard,
    min_visible: Duration,
}

impl RefreshTicket {
    /// Refetch from the network, then keep the indicator up for the minimum
    /// visible duration before releasing the guard.
    pub async fn run<S: TimelineSource>(
        self,
        orchestrator: &FetchOrchestrator<S>,
        params: &LoadParams,
    ) -> LoadPhase {
        let phase = orchestrator.refresh(params).await;
        tokio::time::sleep(self.min_visible).await;
        phase
    }
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        self.guard.refreshing.store(false, Ordering::SeqCst);
        tracing::debug!("Refresh finished, guard released");
    }
}

#[derive(Debug)]
pub struct RefreshGestureController {
    config: GestureConfig,
    phase: DragPhase,
    guard: RefreshGuard,
}

impl Default for RefreshGestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl RefreshGestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: DragPhase::Idle,
            guard: RefreshGuard::default(),
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_refreshing(&self) -> bool {
        self.guard.is_refreshing()
    }

    /// Pointer pressed. Only recognised when the viewport is at its top.
    pub fn pointer_down(&mut self, scrolled_to_top: bool) {
        self.phase = if scrolled_to_top {
            DragPhase::Dragging { distance: 0.0 }
        } else {
            DragPhase::Idle
        };
    }

    /// Pointer moved; `movement_y` is the total vertical movement since
    /// pointer down (positive = downward).
    pub fn pointer_move(&mut self, movement_y: f64) {
        if let DragPhase::Dragging { distance } = &mut self.phase {
            *distance = movement_y.max(0.0);
        }
    }

    /// Current visual offset. Zero unless a drag is in progress.
    pub fn visual_offset(&self) -> f64 {
        match self.phase {
            DragPhase::Dragging { distance } => damped_offset(distance, &self.config),
            DragPhase::Idle => 0.0,
        }
    }

    /// Pointer released: commit, cancel, or ignore. The visual offset resets.
    pub fn pointer_up(&mut self) -> GestureOutcome {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        let DragPhase::Dragging { distance } = phase else {
            return GestureOutcome::Cancelled;
        };

        if distance <= self.config.threshold {
            tracing::debug!("Pull of {:.0} below threshold, cancelled", distance);
            return GestureOutcome::Cancelled;
        }

        match self.guard.try_acquire(self.config.min_visible) {
            Some(ticket) => {
                tracing::debug!("Pull of {:.0} committed, refreshing", distance);
                GestureOutcome::Committed(ticket)
            }
            None => {
                tracing::debug!("Pull ignored, refresh already in flight");
                GestureOutcome::Ignored
            }
        }
    }
}
