//! Compilation phases and the chain combinator.
//!
//! A [`Phase`] is one stage of the pipeline: a reusable unit with a
//! fixed input type, a fixed output type and a fallible `execute`.
//! Two phases whose types line up compose into a [`Chain`], which is
//! itself a phase, so pipelines of any length are built by repeated
//! composition. Misaligned compositions are rejected by the trait
//! bounds at compile time rather than at run time.

use crate::error::OrbitError;

/// A single stage of compilation.
///
/// Implementations must not mutate themselves during `execute`: any
/// configuration a phase needs is captured at construction, and the
/// same instance may be run any number of times. Side effects such as
/// opening a file are allowed but stay scoped to the phase that owns
/// them.
pub trait Phase {
    type Input;
    type Output;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, OrbitError>;

    /// Compose this phase with `next`, which must consume this
    /// phase's output type.
    ///
    /// `then` builds pipelines left to right without the caller ever
    /// spelling out the nested chain types:
    ///
    /// ```ignore
    /// let pipeline = SourceLoader::new().then(Lexer::new()).then(Parser::new());
    /// ```
    fn then<Next>(self, next: Next) -> Chain<Self, Next>
    where
        Self: Sized,
        Next: Phase<Input = Self::Output>,
    {
        Chain::new(self, next)
    }
}

/// Two phases run in sequence.
///
/// The second phase only runs if the first succeeds; the first error
/// aborts the whole chain and no partial result escapes.
#[derive(Debug)]
pub struct Chain<First, Second> {
    first: First,
    second: Second,
}

impl<First, Second> Chain<First, Second>
where
    First: Phase,
    Second: Phase<Input = First::Output>,
{
    pub fn new(first: First, second: Second) -> Self {
        Chain { first, second }
    }
}

impl<First, Second> Phase for Chain<First, Second>
where
    First: Phase,
    Second: Phase<Input = First::Output>,
{
    type Input = First::Input;
    type Output = Second::Output;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, OrbitError> {
        let intermediate = self.first.execute(input)?;
        self.second.execute(intermediate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct AddOne;

    impl Phase for AddOne {
        type Input = i64;
        type Output = i64;

        fn execute(&self, input: i64) -> Result<i64, OrbitError> {
            Ok(input + 1)
        }
    }

    struct Double;

    impl Phase for Double {
        type Input = i64;
        type Output = i64;

        fn execute(&self, input: i64) -> Result<i64, OrbitError> {
            Ok(input * 2)
        }
    }

    struct Stringify;

    impl Phase for Stringify {
        type Input = i64;
        type Output = String;

        fn execute(&self, input: i64) -> Result<String, OrbitError> {
            Ok(input.to_string())
        }
    }

    /// Counts invocations, optionally failing every time.
    struct Counter {
        calls: Rc<Cell<usize>>,
        fail: bool,
    }

    impl Counter {
        fn new(calls: Rc<Cell<usize>>, fail: bool) -> Self {
            Counter { calls, fail }
        }
    }

    impl Phase for Counter {
        type Input = i64;
        type Output = i64;

        fn execute(&self, input: i64) -> Result<i64, OrbitError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(OrbitError::Compilation("counter phase failed".to_string()));
            }
            Ok(input)
        }
    }

    #[test]
    fn chains_two_phases() {
        let chain = AddOne.then(Double);
        assert_eq!(chain.execute(3).expect("execute"), 8);
    }

    #[test]
    fn chains_change_output_type() {
        let chain = AddOne.then(Stringify);
        assert_eq!(chain.execute(41).expect("execute"), "42");
    }

    #[test]
    fn nesting_is_associative() {
        let left = Chain::new(Chain::new(AddOne, Double), Stringify);
        let right = Chain::new(AddOne, Chain::new(Double, Stringify));
        for input in [-3, 0, 7, 1000] {
            assert_eq!(
                left.execute(input).expect("left"),
                right.execute(input).expect("right")
            );
        }
    }

    #[test]
    fn chain_is_reusable() {
        let chain = AddOne.then(Double);
        assert_eq!(chain.execute(1).expect("first run"), 4);
        assert_eq!(chain.execute(1).expect("second run"), 4);
    }

    #[test]
    fn failure_skips_later_phases() {
        let first_calls = Rc::new(Cell::new(0));
        let second_calls = Rc::new(Cell::new(0));
        let third_calls = Rc::new(Cell::new(0));

        let chain = Counter::new(Rc::clone(&first_calls), true)
            .then(Counter::new(Rc::clone(&second_calls), false))
            .then(Counter::new(Rc::clone(&third_calls), false));

        let err = chain.execute(0).unwrap_err();
        assert!(matches!(err, OrbitError::Compilation(_)));
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
        assert_eq!(third_calls.get(), 0);
    }

    #[test]
    fn middle_failure_reports_its_own_error() {
        let first_calls = Rc::new(Cell::new(0));
        let second_calls = Rc::new(Cell::new(0));
        let third_calls = Rc::new(Cell::new(0));

        let chain = Counter::new(Rc::clone(&first_calls), false)
            .then(Counter::new(Rc::clone(&second_calls), true))
            .then(Counter::new(Rc::clone(&third_calls), false));

        chain.execute(0).unwrap_err();
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 1);
        assert_eq!(third_calls.get(), 0);
    }
}
