//! The built-in predicates, grouped by concern.
//!
//! Every built-in is a [`crate::engine::machine::NativeFn`]: it receives its
//! arguments, the continuation for the rest of the computation, the current
//! environment, and the caller's cut barrier, and returns a promise. This
//! keeps cut, exceptions, and backtracking uniform across native and user
//! code.

mod control;
mod database;
mod terms;

use crate::engine::machine::Machine;

pub(crate) fn register_all(m: &mut Machine) {
    control::register(m);
    terms::register(m);
    database::register(m);
}
