//! Hornlog — an embeddable Prolog interpreter.
//!
//! This library executes an ISO-flavored subset of Prolog from a host Rust
//! program: terms, unification, SLD resolution with cut, exceptions, and a
//! dynamic clause database, streamed to the host one solution at a time.
//!
//! # Architecture
//!
//! The pipeline has three stages:
//!
//! 1. **Reading** (`reader` module)
//!    - Tokenizes ISO-flavored source text (atoms, variables, numbers,
//!      strings, `%` and `/* */` comments)
//!    - Parses tokens into terms over the standard operator table
//!    - Substitutes `?` placeholders from marshaled host values
//!
//! 2. **Resolution** (`engine` module)
//!    - Immutable terms with cheap sharing; persistent binding
//!      environments, so sibling search branches never interfere
//!    - A lazy [`engine::Promise`] tree driven by a resumable trampoline:
//!      depth-first, left-to-right, clause order, suspending at every
//!      solution
//!    - Explicit cut barriers: `!` prunes to the clause or meta-call that
//!      owns it; `call/1`, `catch/3`, `\+/1` and the collectors open fresh
//!      barriers
//!    - Exceptions as first-class terms, unwinding the same stack that
//!      backtracking uses
//!
//! 3. **Host surface** ([`Engine`], [`Solutions`])
//!    - `consult` loads programs, running directives and the
//!      `term_expansion/2` hook
//!    - `query` hands back a lazy stream; `query_solution` takes the first
//!      answer or reports [`Error::NoSolutions`]
//!    - `register_predicate` installs native built-ins that take part in
//!      backtracking, cut, and exception handling like any clause
//!
//! # Example
//!
//! ```
//! use hornlog::{Engine, Term};
//!
//! let mut engine = Engine::new();
//! engine
//!     .consult(
//!         "append([], L, L).
//!          append([X|L1], L2, [X|L3]) :- append(L1, L2, L3).",
//!     )
//!     .unwrap();
//!
//! let mut sols = engine.query("append(X, Y, [a, b]).", &[]).unwrap();
//! assert!(sols.next());
//! assert_eq!(sols.get("X"), Some(Term::nil()));
//! assert_eq!(
//!     sols.get("Y"),
//!     Some(Term::list([Term::atom("a"), Term::atom("b")]))
//! );
//! ```
//!
//! # Isolation
//!
//! All mutable state — the clause database and the flag set — is owned by
//! the engine. Two engines are two fully independent worlds; an engine is
//! single-threaded and drives one search at a time.

pub mod config;
pub mod engine;
pub mod error;
pub mod reader;
pub mod solutions;
pub mod writer;

mod interp;
mod ops;

pub use config::Flags;
pub use engine::{Atom, Compound, Env, Exception, Indicator, Machine, Promise, Term, Var};
pub use error::Error;
pub use interp::Engine;
pub use reader::SyntaxError;
pub use solutions::{HostValue, Solution, Solutions};
pub use writer::term_to_string;
