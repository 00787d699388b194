//! The synchronous component model.
//!
//! Every piece of logic in the simulator is a [`Synchronous`] component: a
//! pure transition function from the current register state and input levels
//! to the next register state and the output levels of this tick. A
//! [`Clocked`] instance owns the registers and applies the function in two
//! phases so that composites can evaluate all their children against the
//! pre-tick snapshot before any register changes:
//!
//! 1. [`Clocked::eval`] computes outputs and stages the next state.
//! 2. [`Clocked::commit`] makes the staged state visible.
//!
//! A register written during a tick is therefore only observable from the
//! following tick, regardless of the order children are evaluated in.

use std::fmt;

/// A clocked component described by a pure per-tick transition function.
pub trait Synchronous {
    /// Input levels sampled this tick.
    type Input: Copy;
    /// Output levels driven this tick.
    type Output: Copy;
    /// Register contents. `Default` is the reset value.
    type State: Copy + Default + fmt::Debug;

    /// Computes `(next_state, outputs)` from the committed `state` and this
    /// tick's `input`. Must not depend on anything but its arguments and the
    /// component's own parameters.
    fn update(&self, state: Self::State, input: Self::Input) -> (Self::State, Self::Output);
}

/// A component whose outputs are a function of its registers alone.
///
/// Composites read Moore outputs before evaluating their Mealy neighbours,
/// which breaks what would otherwise be a combinational cycle.
pub trait Moore: Synchronous {
    /// Outputs driven from `state` this tick.
    fn outputs(&self, state: &Self::State) -> Self::Output;
}

/// An instantiated component with its register state.
#[derive(Debug, Clone)]
pub struct Clocked<C: Synchronous> {
    component: C,
    state: C::State,
    staged: Option<C::State>,
}

impl<C: Synchronous> Clocked<C> {
    /// Instantiates `component` with every register at its reset value.
    pub fn new(component: C) -> Self {
        Self {
            component,
            state: C::State::default(),
            staged: None,
        }
    }

    /// The component's elaboration-time parameters.
    pub fn component(&self) -> &C {
        &self.component
    }

    /// The committed register state.
    pub fn state(&self) -> &C::State {
        &self.state
    }

    /// Whether a next state has been evaluated but not yet committed.
    pub fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Phase one: evaluate against the committed state and stage the result.
    ///
    /// Evaluating twice before a commit replaces the staged state; both
    /// evaluations see the same committed registers.
    pub fn eval(&mut self, input: C::Input) -> C::Output {
        let (next, output) = self.component.update(self.state, input);
        self.staged = Some(next);
        output
    }

    /// Phase two: make the staged state visible.
    pub fn commit(&mut self) {
        if let Some(next) = self.staged.take() {
            self.state = next;
        }
    }

    /// Evaluates and commits in one go, for components with no neighbours.
    pub fn step(&mut self, input: C::Input) -> C::Output {
        let output = self.eval(input);
        self.commit();
        output
    }
}

impl<C: Moore> Clocked<C> {
    /// Outputs driven from the committed registers.
    pub fn outputs(&self) -> C::Output {
        self.component.outputs(&self.state)
    }
}
