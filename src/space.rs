use std::{fmt, ops::Deref};

use crate::error::ConfigurationError;

/// A point in a rectangular discrete state space
///
/// States are fixed-length tuples of non-negative integers, one coordinate per dimension.
/// They are immutable once created and can be used as keys in a [`HashMap`](std::collections::HashMap).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Box<[usize]>);

impl State {
    /// Construct a state from its coordinates
    pub fn new(coords: impl Into<Box<[usize]>>) -> Self {
        Self(coords.into())
    }

    /// The coordinates of this state, one per dimension
    pub fn coords(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for State {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for State {
    fn from(coords: Vec<usize>) -> Self {
        Self(coords.into_boxed_slice())
    }
}

impl<const N: usize> From<[usize; N]> for State {
    fn from(coords: [usize; N]) -> Self {
        Self(Box::new(coords))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// The shape of a rectangular state space
///
/// Maps state tuples to dense indices with a mixed-radix encoding where the last dimension varies fastest,
/// so index order matches the lexicographic order of the tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    dims: Box<[usize]>,
    strides: Box<[usize]>,
    len: usize,
}

impl Shape {
    /// Build a shape from the size of each dimension
    ///
    /// **Errors** if there are no dimensions, if any dimension is empty, or if the total number of states
    /// does not fit in a `usize`
    pub fn new(dims: &[usize]) -> Result<Self, ConfigurationError> {
        if dims.is_empty() {
            return Err(ConfigurationError::NoDimensions);
        }
        if let Some(index) = dims.iter().position(|&d| d == 0) {
            return Err(ConfigurationError::EmptyDimension { index });
        }

        let mut strides = vec![1; dims.len()];
        let mut len = 1usize;
        for i in (0..dims.len()).rev() {
            strides[i] = len;
            len = len
                .checked_mul(dims[i])
                .ok_or_else(|| ConfigurationError::TooLarge {
                    dims: dims.to_vec(),
                })?;
        }

        Ok(Self {
            dims: dims.into(),
            strides: strides.into_boxed_slice(),
            len,
        })
    }

    /// Size of each dimension
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of states
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false, a valid shape has at least one state
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dense index of a state, or `None` if the coordinates are outside the shape
    pub fn index_of(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.dims.len() {
            return None;
        }

        coords
            .iter()
            .zip(self.dims.iter().zip(self.strides.iter()))
            .try_fold(0, |acc, (&c, (&d, &s))| (c < d).then_some(acc + c * s))
    }

    /// Inverse of [`Shape::index_of`]
    pub fn state_at(&self, index: usize) -> Option<State> {
        (index < self.len).then(|| {
            self.dims
                .iter()
                .zip(self.strides.iter())
                .map(|(&d, &s)| (index / s) % d)
                .collect::<Vec<_>>()
                .into()
        })
    }
}

/// The full enumeration of a rectangular state space
///
/// States are stored in index order, which is also the order every solver sweep visits them in.
#[derive(Debug, Clone)]
pub struct StateSpace {
    shape: Shape,
    states: Vec<State>,
}

impl StateSpace {
    /// Enumerate the Cartesian product of `[0, dim)` for every dimension in `dims`
    pub fn new(dims: &[usize]) -> Result<Self, ConfigurationError> {
        let shape = Shape::new(dims)?;
        let states = (0..shape.len())
            .filter_map(|i| shape.state_at(i))
            .collect();

        Ok(Self { shape, states })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn index_of(&self, coords: &[usize]) -> Option<usize> {
        self.shape.index_of(coords)
    }

    /// The state stored at a dense index
    pub fn get(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    /// Iterate all states in sweep order
    pub fn iter(&self) -> std::slice::Iter<'_, State> {
        self.states.iter()
    }
}

impl<'a> IntoIterator for &'a StateSpace {
    type Item = &'a State;
    type IntoIter = std::slice::Iter<'a, State>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn shape_rejects_bad_dims() {
        assert_eq!(
            Shape::new(&[]),
            Err(ConfigurationError::NoDimensions),
            "no dimensions"
        );
        assert_eq!(
            Shape::new(&[3, 0, 2]),
            Err(ConfigurationError::EmptyDimension { index: 1 }),
            "zero-sized dimension is reported by position"
        );
        assert!(
            matches!(
                Shape::new(&[usize::MAX, 2]),
                Err(ConfigurationError::TooLarge { .. })
            ),
            "overflowing state count"
        );
    }

    #[test]
    fn state_space_cardinality() {
        let space = StateSpace::new(&[2, 3, 4]).unwrap();
        assert_eq!(space.len(), 24, "product of dims");

        let unique = space.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), 24, "every state is unique");
        assert!(
            space.iter().all(|s| s.len() == 3),
            "every state has one coordinate per dimension"
        );
    }

    #[test]
    fn state_space_order_is_lexicographic() {
        let space = StateSpace::new(&[2, 3]).unwrap();
        let states = space.iter().map(|s| s.coords().to_vec()).collect::<Vec<_>>();
        assert_eq!(
            states,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
            ],
            "last dimension varies fastest"
        );

        let mut sorted = space.iter().cloned().collect::<Vec<_>>();
        sorted.sort();
        assert!(
            sorted.iter().eq(space.iter()),
            "index order matches tuple ordering"
        );
    }

    #[test]
    fn index_roundtrip() {
        let shape = Shape::new(&[4, 5, 6]).unwrap();
        for i in [0, 1, 6, 31, 119] {
            let state = shape.state_at(i).unwrap();
            assert_eq!(shape.index_of(&state), Some(i), "index {i} survives decoding");
        }

        assert_eq!(shape.index_of(&[4, 0, 0]), None, "coordinate out of range");
        assert_eq!(shape.index_of(&[1, 1]), None, "wrong number of coordinates");
        assert_eq!(shape.state_at(120), None, "index out of range");
    }

    #[test]
    fn state_display() {
        assert_eq!(State::from([3, 7]).to_string(), "(3, 7)");
        assert_eq!(State::from(vec![42]).to_string(), "(42)");
    }
}
