//! The evaluator core: term model, bindings, unification, the promise
//! engine, and the resolution machine with its built-in predicates.

pub mod arith;
mod builtins;
pub mod env;
pub mod exception;
pub mod machine;
pub mod promise;
pub mod term;
pub mod unify;

pub use env::Env;
pub use exception::Exception;
pub use machine::{Clause, Machine, NativeFn, Procedure, UserProcedure};
pub use promise::{force, Cont, Promise, Search, Thunk};
pub use term::{Atom, Compound, Indicator, Term, Var};
pub use unify::unify;
