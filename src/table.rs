use std::ops::Index;

use crate::space::{Shape, State};

/// Estimated value of every state, stored densely in sweep order
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFunction {
    shape: Shape,
    values: Vec<f64>,
}

impl ValueFunction {
    /// A value function that assigns `0.0` to every state
    pub fn zeros(shape: Shape) -> Self {
        let values = vec![0.0; shape.len()];
        Self { shape, values }
    }

    /// Value of a state, or `None` if the state is outside the table
    pub fn get(&self, state: &[usize]) -> Option<f64> {
        self.shape.index_of(state).map(|i| self.values[i])
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values in sweep order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn at(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub(crate) fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    pub(crate) fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }
}

impl Index<&[usize]> for ValueFunction {
    type Output = f64;

    /// **Panics** if the state is outside the table
    fn index(&self, state: &[usize]) -> &Self::Output {
        let i = self
            .shape
            .index_of(state)
            .unwrap_or_else(|| panic!("state {state:?} is outside the value table"));
        &self.values[i]
    }
}

impl<const N: usize> Index<[usize; N]> for ValueFunction {
    type Output = f64;

    fn index(&self, state: [usize; N]) -> &Self::Output {
        &self[&state[..]]
    }
}

impl Index<&State> for ValueFunction {
    type Output = f64;

    fn index(&self, state: &State) -> &Self::Output {
        &self[state.coords()]
    }
}

/// The action chosen in every state, stored densely in sweep order
#[derive(Debug, Clone, PartialEq)]
pub struct Policy<A> {
    shape: Shape,
    actions: Vec<A>,
}

impl<A: Copy> Policy<A> {
    /// Build a policy by choosing an action for every state index
    pub fn from_fn(shape: Shape, f: impl FnMut(usize) -> A) -> Self {
        let actions = (0..shape.len()).map(f).collect();
        Self { shape, actions }
    }

    /// Action taken in a state, or `None` if the state is outside the table
    pub fn get(&self, state: &[usize]) -> Option<A> {
        self.shape.index_of(state).map(|i| self.actions[i])
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All actions in sweep order
    pub fn as_slice(&self) -> &[A] {
        &self.actions
    }

    pub(crate) fn at(&self, index: usize) -> A {
        self.actions[index]
    }

    pub(crate) fn set(&mut self, index: usize, action: A) {
        self.actions[index] = action;
    }
}

impl<A> Index<&[usize]> for Policy<A> {
    type Output = A;

    /// **Panics** if the state is outside the table
    fn index(&self, state: &[usize]) -> &Self::Output {
        let i = self
            .shape
            .index_of(state)
            .unwrap_or_else(|| panic!("state {state:?} is outside the policy table"));
        &self.actions[i]
    }
}

impl<A, const N: usize> Index<[usize; N]> for Policy<A> {
    type Output = A;

    fn index(&self, state: [usize; N]) -> &Self::Output {
        &self[&state[..]]
    }
}

impl<A> Index<&State> for Policy<A> {
    type Output = A;

    fn index(&self, state: &State) -> &Self::Output {
        &self[state.coords()]
    }
}
