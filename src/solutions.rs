//! The lazy solution stream handed to the host, and host-value marshaling.

use std::collections::HashMap;

use crate::engine::env::Env;
use crate::engine::machine::Machine;
use crate::engine::promise::Search;
use crate::engine::term::{resolve_all, Term, Var};
use crate::error::Error;

/// A host value marshaled into a term for `?` placeholders.
///
/// Strings become atoms, matching the convention of the query text itself;
/// lists become proper lists.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Atom(String),
    Int(i64),
    Float(f64),
    List(Vec<HostValue>),
}

impl HostValue {
    pub fn to_term(&self) -> Term {
        match self {
            HostValue::Atom(s) => Term::atom(s),
            HostValue::Int(n) => Term::Int(*n),
            HostValue::Float(f) => Term::Float(*f),
            HostValue::List(items) => Term::list(items.iter().map(HostValue::to_term)),
        }
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> HostValue {
        HostValue::Atom(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> HostValue {
        HostValue::Atom(s)
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> HostValue {
        HostValue::Int(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> HostValue {
        HostValue::Int(n as i64)
    }
}

impl From<f64> for HostValue {
    fn from(f: f64) -> HostValue {
        HostValue::Float(f)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> HostValue {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// A lazy iterator over the solutions of one query.
///
/// The underlying search suspends between solutions; each [`Solutions::next`]
/// call resumes it for exactly one more answer. Dropping the value abandons
/// the remaining alternatives.
pub struct Solutions<'m> {
    machine: &'m mut Machine,
    search: Search,
    vars: Vec<(String, Var)>,
    current: Option<Env>,
    err: Option<Error>,
    done: bool,
}

impl<'m> Solutions<'m> {
    pub(crate) fn new(machine: &'m mut Machine, search: Search, vars: Vec<(String, Var)>) -> Self {
        Solutions {
            machine,
            search,
            vars,
            current: None,
            err: None,
            done: false,
        }
    }

    /// Advances to the next solution. Returns `false` when the search is
    /// exhausted or an error occurred; check [`Solutions::err`] to tell the
    /// two apart.
    pub fn next(&mut self) -> bool {
        if self.done {
            return false;
        }
        match self.search.next_solution(self.machine) {
            Ok(Some(env)) => {
                self.current = Some(env);
                true
            }
            Ok(None) => {
                self.done = true;
                self.current = None;
                false
            }
            Err(e) => {
                self.err = Some(Error::Exception(e.into_term()));
                self.done = true;
                self.current = None;
                false
            }
        }
    }

    /// The names of the query's variables, in source order.
    pub fn vars(&self) -> Vec<String> {
        self.vars.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The current binding of the named query variable, fully resolved.
    pub fn get(&self, name: &str) -> Option<Term> {
        let env = self.current.as_ref()?;
        let (_, var) = self.vars.iter().find(|(n, _)| n == name)?;
        Some(resolve_all(&Term::Var(var.clone()), env))
    }

    /// Copies all named bindings of the current solution into `out`.
    pub fn scan(&self, out: &mut HashMap<String, Term>) {
        if let Some(env) = &self.current {
            for (name, var) in &self.vars {
                out.insert(name.clone(), resolve_all(&Term::Var(var.clone()), env));
            }
        }
    }

    /// The error that ended the stream, if any.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Releases the query. Equivalent to dropping.
    pub fn close(self) {}
}

/// One materialized solution, as returned by `query_solution`.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    bindings: Vec<(String, Term)>,
}

impl Solution {
    pub(crate) fn new(bindings: Vec<(String, Term)>) -> Solution {
        Solution { bindings }
    }

    pub fn vars(&self) -> Vec<String> {
        self.bindings.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn scan(&self, out: &mut HashMap<String, Term>) {
        for (name, term) in &self.bindings {
            out.insert(name.clone(), term.clone());
        }
    }
}
