//! The lazy proof search: promises and the trampoline driver.
//!
//! A [`Promise`] is one node of the search tree. The driver ([`Search`])
//! evaluates nodes iteratively over an explicit frame stack, so arbitrarily
//! deep backtracking never grows the call stack, and suspends exactly at
//! `Ok` boundaries so the host pulls solutions one at a time.
//!
//! Cut scoping is explicit: a `Choice` may carry a barrier token, and a
//! `Cut` node prunes every frame younger than — and including — the frame
//! owning its barrier. Exceptions unwind the same stack, stopping at the
//! first frame whose catcher accepts the ball.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::engine::env::Env;
use crate::engine::exception::Exception;
use crate::engine::machine::Machine;

/// A delayed alternative: produces the next promise when tried.
pub type Thunk = Box<dyn FnOnce(&mut Machine) -> Promise>;

/// The "rest of the computation" after a goal succeeds. Invoked once per
/// solution of the goal, with the extended environment.
pub type Cont = Rc<dyn Fn(&mut Machine, &Env) -> Promise>;

/// Exception filter attached to a choice frame by `catch/3`. Returns the
/// recovery promise when the ball matches, `None` to keep unwinding.
pub type CatchFn = Rc<dyn Fn(&mut Machine, &Exception) -> Option<Promise>>;

pub(crate) struct Scope {
    pub barrier: u64,
    pub catcher: Option<CatchFn>,
}

enum Repr {
    /// A tail call: evaluate the thunk and continue with its result.
    Delayed(Thunk),
    /// Ordered alternatives; an exhausted choice is failure.
    Choice {
        alts: VecDeque<Thunk>,
        scope: Option<Scope>,
    },
    /// One solution. The driver suspends here.
    Ok(Env),
    /// Commit: discard alternatives up to the named barrier, then continue.
    Cut { barrier: u64, then: Thunk },
    /// A thrown exception propagating outward.
    Error(Exception),
}

/// A lazy node in the search tree.
pub struct Promise {
    repr: Repr,
}

impl Promise {
    pub fn ok(env: Env) -> Promise {
        Promise { repr: Repr::Ok(env) }
    }

    /// Zero alternatives.
    pub fn fail() -> Promise {
        Promise {
            repr: Repr::Choice {
                alts: VecDeque::new(),
                scope: None,
            },
        }
    }

    pub fn error(e: Exception) -> Promise {
        Promise {
            repr: Repr::Error(e),
        }
    }

    pub fn delay(f: impl FnOnce(&mut Machine) -> Promise + 'static) -> Promise {
        Promise {
            repr: Repr::Delayed(Box::new(f)),
        }
    }

    /// Alternatives tried in order, transparent to cut.
    pub fn choice(alts: Vec<Thunk>) -> Promise {
        Promise {
            repr: Repr::Choice {
                alts: alts.into(),
                scope: None,
            },
        }
    }

    /// Alternatives owning the cut barrier `barrier`: a `!` executed inside
    /// prunes up to this node and no further.
    pub fn cut_scope(barrier: u64, alts: Vec<Thunk>) -> Promise {
        Promise {
            repr: Repr::Choice {
                alts: alts.into(),
                scope: Some(Scope {
                    barrier,
                    catcher: None,
                }),
            },
        }
    }

    /// A cut scope that additionally intercepts exceptions (`catch/3`).
    pub fn catch_scope(barrier: u64, catcher: CatchFn, alts: Vec<Thunk>) -> Promise {
        Promise {
            repr: Repr::Choice {
                alts: alts.into(),
                scope: Some(Scope {
                    barrier,
                    catcher: Some(catcher),
                }),
            },
        }
    }

    /// The success of `!`: prune to `barrier`, then run the continuation.
    pub fn cut(barrier: u64, then: Thunk) -> Promise {
        Promise {
            repr: Repr::Cut { barrier, then },
        }
    }
}

struct ChoiceFrame {
    alts: VecDeque<Thunk>,
    scope: Option<Scope>,
}

/// The resumable trampoline over one promise tree.
///
/// `next_solution` runs until the next `Ok`, exhaustion, or an uncaught
/// exception. Between calls all pending alternatives stay parked on the
/// frame stack, so the search is incremental and cancellable: dropping the
/// `Search` abandons the remaining alternatives.
pub struct Search {
    stack: Vec<ChoiceFrame>,
    pending: Option<Promise>,
}

impl Search {
    pub fn new(root: Promise) -> Search {
        Search {
            stack: Vec::new(),
            pending: Some(root),
        }
    }

    /// Advances to the next solution. `Ok(None)` means the search is
    /// exhausted; `Err` carries an exception no `catch/3` accepted.
    pub fn next_solution(&mut self, m: &mut Machine) -> Result<Option<Env>, Exception> {
        let mut cur = match self.pending.take() {
            Some(p) => p,
            None => match self.backtrack(m) {
                Some(p) => p,
                None => return Ok(None),
            },
        };
        loop {
            cur = match cur.repr {
                Repr::Delayed(thunk) => thunk(m),
                Repr::Choice { mut alts, scope } => match alts.pop_front() {
                    Some(first) => {
                        self.stack.push(ChoiceFrame { alts, scope });
                        first(m)
                    }
                    None => {
                        // Keep barrier/catcher frames discoverable even when
                        // no alternative is left.
                        if scope.is_some() {
                            self.stack.push(ChoiceFrame { alts, scope });
                        }
                        match self.backtrack(m) {
                            Some(p) => p,
                            None => return Ok(None),
                        }
                    }
                },
                Repr::Ok(env) => return Ok(Some(env)),
                Repr::Cut { barrier, then } => {
                    while let Some(frame) = self.stack.pop() {
                        if frame.scope.as_ref().is_some_and(|s| s.barrier == barrier) {
                            break;
                        }
                    }
                    then(m)
                }
                Repr::Error(e) => self.unwind(m, e)?,
            };
        }
    }

    /// Pops frames until an untried alternative is found.
    fn backtrack(&mut self, m: &mut Machine) -> Option<Promise> {
        loop {
            let thunk = self.stack.last_mut()?.alts.pop_front();
            match thunk {
                Some(t) => return Some(t(m)),
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    /// Discards frames until a catcher accepts the exception; rethrows to
    /// the host otherwise.
    fn unwind(&mut self, m: &mut Machine, e: Exception) -> Result<Promise, Exception> {
        while let Some(frame) = self.stack.pop() {
            if let Some(catcher) = frame.scope.and_then(|s| s.catcher) {
                if let Some(recovery) = catcher(m, &e) {
                    return Ok(recovery);
                }
            }
        }
        Err(e)
    }
}

/// Drives `p` to completion, handing each solution to `on_solution`.
/// A `true` return commits (stops the search); `false` backtracks for the
/// next solution. Returns whether the search was stopped by the host.
pub fn force(
    m: &mut Machine,
    p: Promise,
    mut on_solution: impl FnMut(&mut Machine, &Env) -> bool,
) -> Result<bool, Exception> {
    let mut search = Search::new(p);
    while let Some(env) = search.next_solution(m)? {
        if on_solution(m, &env) {
            return Ok(true);
        }
    }
    Ok(false)
}
