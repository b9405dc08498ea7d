// =============================================================================
// Session State — what the user is looking at
// =============================================================================
//
// `SessionState` is an immutable value; `reduce` produces the next one.
// `SessionCell` holds the current value together with the counters that
// asynchronous completions compare against before they touch the view:
//
//   generation  bumped on every state change (snapshot + feed staleness)
//   poll_epoch  bumped on symbol change only  (ticker / book staleness)
//
// Checks and the guarded action run under the read lock, so a transition
// (write lock) can never land between "still current?" and "apply".
// =============================================================================

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{find_symbol, ChartType, Indicator, Pane, SymbolInfo, Timeframe, SYMBOLS};

/// Complete user-selected dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub symbol: SymbolInfo,
    pub timeframe: Timeframe,
    pub chart_type: ChartType,
    pub overlays: BTreeSet<Indicator>,
    pub subcharts: BTreeSet<Indicator>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            symbol: SYMBOLS[0],
            timeframe: Timeframe::H1,
            chart_type: ChartType::default(),
            overlays: BTreeSet::from([Indicator::Ma]),
            subcharts: BTreeSet::from([Indicator::Vol]),
        }
    }
}

/// A user action on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    SelectSymbol(SymbolInfo),
    SelectTimeframe(Timeframe),
    SetChartType(ChartType),
    ToggleOverlay(Indicator),
    ToggleSubchart(Indicator),
    Replace(SessionState),
}

fn toggle(set: &mut BTreeSet<Indicator>, indicator: Indicator) {
    if !set.remove(&indicator) {
        set.insert(indicator);
    }
}

impl SessionState {
    /// Session for `symbol_code` / `timeframe`, falling back to the defaults
    /// for unknown values.
    pub fn initial(symbol_code: &str, timeframe: Timeframe) -> Self {
        Self {
            symbol: find_symbol(symbol_code).unwrap_or(SYMBOLS[0]),
            timeframe,
            ..Self::default()
        }
    }

    /// Next state after `transition`. Toggling an indicator into the wrong
    /// pane leaves the state unchanged.
    pub fn reduce(&self, transition: &Transition) -> SessionState {
        let mut next = self.clone();
        match transition {
            Transition::SelectSymbol(symbol) => next.symbol = *symbol,
            Transition::SelectTimeframe(tf) => next.timeframe = *tf,
            Transition::SetChartType(ct) => next.chart_type = *ct,
            Transition::ToggleOverlay(i) if i.pane() == Pane::Overlay => {
                toggle(&mut next.overlays, *i)
            }
            Transition::ToggleSubchart(i) if i.pane() == Pane::Subchart => {
                toggle(&mut next.subcharts, *i)
            }
            Transition::ToggleOverlay(_) | Transition::ToggleSubchart(_) => {}
            Transition::Replace(state) => {
                next = state.clone();
                next.overlays.retain(|i| i.pane() == Pane::Overlay);
                next.subcharts.retain(|i| i.pane() == Pane::Subchart);
            }
        }
        next
    }

    /// All active indicators, overlays first.
    pub fn indicators(&self) -> BTreeSet<Indicator> {
        self.overlays.union(&self.subcharts).copied().collect()
    }
}

// =============================================================================
// SessionCell
// =============================================================================

#[derive(Debug)]
struct Current {
    state: SessionState,
    generation: u64,
    poll_epoch: u64,
    disposed: bool,
}

/// What a transition changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub state: SessionState,
    pub generation: u64,
    pub poll_epoch: u64,
    pub symbol_changed: bool,
}

/// Shared, lock-protected current session.
#[derive(Debug)]
pub struct SessionCell {
    inner: RwLock<Current>,
}

impl SessionCell {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: RwLock::new(Current {
                state,
                generation: 1,
                poll_epoch: 1,
                disposed: false,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn poll_epoch(&self) -> u64 {
        self.inner.read().poll_epoch
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.read().disposed
    }

    /// Apply `transition`. Returns `None` when disposed or when the state
    /// did not change.
    pub fn commit(&self, transition: &Transition) -> Option<Committed> {
        let mut cur = self.inner.write();
        if cur.disposed {
            return None;
        }
        let next = cur.state.reduce(transition);
        if next == cur.state {
            return None;
        }
        let symbol_changed = next.symbol != cur.state.symbol;
        cur.generation += 1;
        if symbol_changed {
            cur.poll_epoch += 1;
        }
        cur.state = next;
        Some(Committed {
            state: cur.state.clone(),
            generation: cur.generation,
            poll_epoch: cur.poll_epoch,
            symbol_changed,
        })
    }

    /// Mark the session finished; every later guarded action is refused.
    pub fn dispose(&self) -> bool {
        let mut cur = self.inner.write();
        !std::mem::replace(&mut cur.disposed, true)
    }

    /// Run `f` only if `generation` is still current.
    pub fn if_current<R>(&self, generation: u64, f: impl FnOnce() -> R) -> Option<R> {
        let cur = self.inner.read();
        (!cur.disposed && cur.generation == generation).then(f)
    }

    /// Run `f` only if `poll_epoch` is still current.
    pub fn if_polling<R>(&self, poll_epoch: u64, f: impl FnOnce() -> R) -> Option<R> {
        let cur = self.inner.read();
        (!cur.disposed && cur.poll_epoch == poll_epoch).then(f)
    }
}
