use std::fmt::Debug;

use crate::{space::State, table::ValueFunction};

/// The dynamics of a finite Markov decision process, as seen by a dynamic programming solver
///
/// A model exposes a single capability: the expected return of taking an action in a state and then
/// following the current value estimates. Transition probabilities and rewards stay private to the model.
///
/// Implementations must be deterministic given `(state, action, values)`, free of side effects, and must
/// never produce infinite or NaN returns. The solver does not guard against any of these.
pub trait Model {
    /// An action that can be taken in every state
    ///
    /// Actions that are illegal in some states should be handled inside [`Model::expected_return`], for example
    /// by returning a sentinel low value.
    type Action: Copy + PartialEq + Debug;

    /// Error raised when an expected return cannot be computed
    ///
    /// Use [`Infallible`](std::convert::Infallible) for models that cannot fail.
    type Error: std::error::Error + 'static;

    /// One-step lookahead: the expected immediate reward plus the discounted value of the next state
    ///
    /// `values` is the solver's live value table. During an in-place sweep it already holds the updated
    /// values of every state visited earlier in the same sweep.
    fn expected_return(
        &self,
        state: &State,
        action: Self::Action,
        values: &ValueFunction,
    ) -> Result<f64, Self::Error>;

    /// States whose values are fixed before solving and never touched by a sweep, e.g. a goal worth `1.0`
    fn pinned_values(&self) -> Vec<(State, f64)> {
        Vec::new()
    }
}

/// A model that knows the shape of its own state space
pub trait DiscreteStateSpace: Model {
    /// Size of each state dimension, states being tuples in `[0, dim)` per dimension
    fn state_dims(&self) -> Vec<usize>;
}

/// A model with a fixed, ordered action set
pub trait DiscreteActionSpace: Model {
    /// All actions, in the order ties are broken during policy improvement
    ///
    /// The returned vec should never be empty.
    fn actions(&self) -> Vec<Self::Action>;
}
