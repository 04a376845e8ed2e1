use std::cell::Cell;

/// A four-valued label attached to a candidate identity.
///
/// Ordering reflects informativeness: `Initially < Possibly < {Definitely,
/// DefinitelyNot}`. `Definitely` and `DefinitelyNot` are terminal — once a
/// candidate reaches either one it cannot be moved again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Belief {
    #[default]
    Initially,
    Possibly,
    Definitely,
    DefinitelyNot,
}

impl Belief {
    /// Terminal beliefs are sticky: [`BeliefCell::update`] silently ignores
    /// any further write once a candidate lands here.
    fn is_terminal(self) -> bool {
        matches!(self, Belief::Definitely | Belief::DefinitelyNot)
    }
}

impl std::fmt::Display for Belief {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Belief::Initially => "Initially",
            Belief::Possibly => "Possibly",
            Belief::Definitely => "Definitely",
            Belief::DefinitelyNot => "DefinitelyNot",
        };
        f.write_str(s)
    }
}

/// The single legitimate writer of a belief value.
///
/// Wrapping the field in a private [`Cell`] makes a direct write a
/// compile-time error anywhere outside this module; every mutation has to
/// go through [`BeliefCell::update`], which enforces monotonicity.
#[derive(Debug, Default)]
pub struct BeliefCell(Cell<Belief>);

impl BeliefCell {
    pub fn new(initial: Belief) -> Self {
        Self(Cell::new(initial))
    }

    pub fn get(&self) -> Belief {
        self.0.get()
    }

    /// Move to `new` unless the current value is already terminal.
    ///
    /// This is the only write path for belief state anywhere in the crate;
    /// a terminal value silently wins over any later write, which is what
    /// makes the belief tables safe to touch from a reader task racing a
    /// timer without extra locking (see the concurrency notes for each
    /// parser).
    pub fn update(&self, new: Belief) {
        if !self.0.get().is_terminal() {
            self.0.set(new);
        }
    }
}

impl Clone for BeliefCell {
    fn clone(&self) -> Self {
        Self(Cell::new(self.0.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_from_initially_is_allowed() {
        let cell = BeliefCell::default();
        cell.update(Belief::Possibly);
        assert_eq!(cell.get(), Belief::Possibly);
    }

    #[test]
    fn terminal_values_are_sticky() {
        let cell = BeliefCell::new(Belief::Definitely);
        cell.update(Belief::DefinitelyNot);
        assert_eq!(cell.get(), Belief::Definitely);

        let cell = BeliefCell::new(Belief::DefinitelyNot);
        cell.update(Belief::Definitely);
        assert_eq!(cell.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn possibly_can_still_move_to_either_terminal() {
        let cell = BeliefCell::new(Belief::Possibly);
        cell.update(Belief::DefinitelyNot);
        assert_eq!(cell.get(), Belief::DefinitelyNot);
    }

    #[test]
    fn monotonic_sequence_never_decreases_informativeness() {
        let cell = BeliefCell::default();
        let sequence = [Belief::Possibly, Belief::Definitely, Belief::Possibly];
        for value in sequence {
            cell.update(value);
        }
        // The last write (Possibly) was ignored because Definitely is terminal.
        assert_eq!(cell.get(), Belief::Definitely);
    }
}
