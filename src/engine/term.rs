//! The term model: atoms, numbers, variables, and compound terms.
//!
//! Terms are immutable values. Compound terms share their argument storage
//! behind an `Arc`, so cloning a term is O(1); variables carry a stable
//! globally-unique tag, so identity survives any number of clones.

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::engine::env::Env;

/// An interned symbolic constant. Equality is string identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(Arc<str>);

impl Atom {
    pub fn new(name: impl AsRef<str>) -> Atom {
        Atom(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Atom {
        Atom::new(name)
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static NEXT_VAR_TAG: AtomicU64 = AtomicU64::new(1);

/// An identity-bearing placeholder. Two variables are equal iff they share
/// the same tag; names are cosmetic and only used for printing and for
/// mapping query results back to source-level names.
#[derive(Debug, Clone)]
pub struct Var {
    tag: u64,
    name: Option<Arc<str>>,
}

impl Var {
    /// A fresh anonymous variable with a new unique tag.
    pub fn fresh() -> Var {
        Var {
            tag: NEXT_VAR_TAG.fetch_add(1, AtomicOrdering::Relaxed),
            name: None,
        }
    }

    /// A fresh variable carrying a source-level name.
    pub fn named(name: impl AsRef<str>) -> Var {
        Var {
            name: Some(Arc::from(name.as_ref())),
            ..Var::fresh()
        }
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Var) -> bool {
        self.tag == other.tag
    }
}

impl Eq for Var {}

impl std::hash::Hash for Var {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
    }
}

/// A functor applied to one or more arguments.
#[derive(Debug, PartialEq)]
pub struct Compound {
    pub functor: Atom,
    pub args: SmallVec<[Term; 2]>,
}

/// A Prolog term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Atom(Atom),
    Int(i64),
    Float(f64),
    Var(Var),
    Compound(Arc<Compound>),
}

impl Term {
    pub fn atom(name: impl AsRef<str>) -> Term {
        Term::Atom(Atom::new(name))
    }

    /// A fresh unbound variable.
    pub fn var() -> Term {
        Term::Var(Var::fresh())
    }

    /// Builds `functor(args...)`. With no arguments this degenerates to the
    /// plain atom, keeping the arity ≥ 1 invariant of [`Compound`].
    pub fn compound(functor: impl AsRef<str>, args: impl IntoIterator<Item = Term>) -> Term {
        let args: SmallVec<[Term; 2]> = args.into_iter().collect();
        if args.is_empty() {
            return Term::atom(functor);
        }
        Term::Compound(Arc::new(Compound {
            functor: Atom::new(functor),
            args,
        }))
    }

    /// The empty list `[]`.
    pub fn nil() -> Term {
        Term::atom("[]")
    }

    /// One list cell `'.'(head, tail)`.
    pub fn cons(head: Term, tail: Term) -> Term {
        Term::compound(".", [head, tail])
    }

    /// A proper list of the given elements.
    pub fn list(items: impl IntoIterator<Item = Term>) -> Term {
        Term::list_with_tail(items, Term::nil())
    }

    /// A list of the given elements ending in `tail`.
    pub fn list_with_tail(items: impl IntoIterator<Item = Term>, tail: Term) -> Term {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Term::cons(item, acc))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Term::Compound(c) => Some(c),
            _ => None,
        }
    }

    /// The `functor(args)` view of a callable term; atoms are zero-arity.
    pub fn as_callable(&self) -> Option<(&Atom, &[Term])> {
        match self {
            Term::Atom(a) => Some((a, &[])),
            Term::Compound(c) => Some((&c.functor, &c.args)),
            _ => None,
        }
    }
}

/// A `name/arity` pair identifying a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Indicator {
    pub name: Atom,
    pub arity: usize,
}

impl Indicator {
    pub fn new(name: impl Into<Atom>, arity: usize) -> Indicator {
        Indicator {
            name: name.into(),
            arity,
        }
    }

    /// The indicator of a callable term, after resolving variables.
    pub fn of(goal: &Term, env: &Env) -> Option<Indicator> {
        match env.resolve(goal) {
            Term::Atom(a) => Some(Indicator::new(a, 0)),
            Term::Compound(c) => Some(Indicator::new(c.functor.clone(), c.args.len())),
            _ => None,
        }
    }

    /// The `name/arity` term form.
    pub fn to_term(&self) -> Term {
        Term::compound("/", [Term::Atom(self.name.clone()), Term::Int(self.arity as i64)])
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// The shape of a term viewed as a list.
#[derive(Debug, PartialEq)]
pub enum ListView {
    /// A `./2` chain ending in `[]`.
    Proper(Vec<Term>),
    /// A `./2` chain ending in an unbound variable.
    Partial(Vec<Term>, Var),
    /// Anything else.
    NotList,
}

/// Classifies `t` as a list, collecting the elements seen along the spine.
/// Revisiting a spine cell (a cyclic binding) classifies as `NotList`.
pub fn list_view(t: &Term, env: &Env) -> ListView {
    let mut items = Vec::new();
    let mut seen: HashSet<*const Compound> = HashSet::new();
    let mut cur = env.resolve(t);
    loop {
        let next = match &cur {
            Term::Atom(a) if *a == "[]" => return ListView::Proper(items),
            Term::Var(v) => return ListView::Partial(items, v.clone()),
            Term::Compound(c) if c.functor == "." && c.args.len() == 2 => {
                if !seen.insert(Arc::as_ptr(c)) {
                    return ListView::NotList;
                }
                items.push(c.args[0].clone());
                env.resolve(&c.args[1])
            }
            _ => return ListView::NotList,
        };
        cur = next;
    }
}

/// Structural occurrence check after resolving variables. A compound also
/// "contains" its own functor as an atom, matching `contains` in the term
/// model contract.
pub fn contains(t: &Term, sub: &Term, env: &Env) -> bool {
    let t = env.resolve(t);
    match &t {
        Term::Compound(c) => {
            if let Term::Atom(a) = sub {
                if c.functor == *a {
                    return true;
                }
            }
            c.args.iter().any(|arg| contains(arg, sub, env))
        }
        other => *other == env.resolve(sub),
    }
}

/// Normalizes a clause term to `Head :- Body`; a bare head becomes
/// `Head :- true`.
pub fn rulify(t: &Term, env: &Env) -> (Term, Term) {
    let t = env.resolve(t);
    if let Term::Compound(c) = &t {
        if c.functor == ":-" && c.args.len() == 2 {
            return (c.args[0].clone(), c.args[1].clone());
        }
    }
    (t, Term::atom("true"))
}

/// Copies `t`, resolving bindings and replacing every unbound variable with
/// a fresh one. The same unbound variable maps to the same fresh variable
/// across one `map`, so head and body of a clause stay connected.
pub fn copy_term(t: &Term, env: &Env, map: &mut HashMap<u64, Var>) -> Term {
    match env.resolve(t) {
        Term::Var(v) => {
            let fresh = map.entry(v.tag()).or_insert_with(Var::fresh);
            Term::Var(fresh.clone())
        }
        Term::Compound(c) => Term::Compound(Arc::new(Compound {
            functor: c.functor.clone(),
            args: c.args.iter().map(|arg| copy_term(arg, env, map)).collect(),
        })),
        other => other,
    }
}

/// Substitutes all bindings of `env` into `t`. Cyclic bindings are cut at
/// the point of re-entry, leaving the variable in place.
pub fn resolve_all(t: &Term, env: &Env) -> Term {
    fn walk(t: &Term, env: &Env, path: &mut HashSet<u64>) -> Term {
        match t {
            Term::Var(v) => match env.lookup(v) {
                Some(bound) => {
                    if !path.insert(v.tag()) {
                        return t.clone();
                    }
                    let bound = bound.clone();
                    let result = walk(&bound, env, path);
                    path.remove(&v.tag());
                    result
                }
                None => t.clone(),
            },
            Term::Compound(c) => Term::Compound(Arc::new(Compound {
                functor: c.functor.clone(),
                args: c.args.iter().map(|arg| walk(arg, env, path)).collect(),
            })),
            other => other.clone(),
        }
    }
    walk(t, env, &mut HashSet::new())
}

/// Collects the unbound variables of `t` under `env`, in order of first
/// occurrence, without duplicates.
pub fn term_variables(t: &Term, env: &Env, out: &mut Vec<Var>) {
    fn walk(t: &Term, env: &Env, out: &mut Vec<Var>, visiting: &mut HashSet<u64>) {
        match t {
            Term::Var(v) => match env.lookup(v) {
                Some(bound) => {
                    if visiting.insert(v.tag()) {
                        let bound = bound.clone();
                        walk(&bound, env, out, visiting);
                        visiting.remove(&v.tag());
                    }
                }
                None => {
                    if !out.contains(v) {
                        out.push(v.clone());
                    }
                }
            },
            Term::Compound(c) => {
                for arg in &c.args {
                    walk(arg, env, out, visiting);
                }
            }
            _ => {}
        }
    }
    walk(t, env, out, &mut HashSet::new());
}

/// True iff `t` has no unbound variables under `env`.
pub fn is_ground(t: &Term, env: &Env) -> bool {
    let mut vars = Vec::new();
    term_variables(t, env, &mut vars);
    vars.is_empty()
}

/// True iff `t` is finite under `env`. Terminates on cyclic bindings by
/// tracking the variables on the current resolution path.
pub fn is_acyclic(t: &Term, env: &Env) -> bool {
    fn walk(t: &Term, env: &Env, path: &mut HashSet<u64>, done: &mut HashSet<u64>) -> bool {
        match t {
            Term::Var(v) => match env.lookup(v) {
                Some(bound) => {
                    if done.contains(&v.tag()) {
                        return true;
                    }
                    if !path.insert(v.tag()) {
                        return false;
                    }
                    let bound = bound.clone();
                    let ok = walk(&bound, env, path, done);
                    path.remove(&v.tag());
                    if ok {
                        done.insert(v.tag());
                    }
                    ok
                }
                None => true,
            },
            Term::Compound(c) => c.args.iter().all(|arg| walk(arg, env, path, done)),
            _ => true,
        }
    }
    walk(t, env, &mut HashSet::new(), &mut HashSet::new())
}

/// Structural equality up to a variable bijection. Operates on detached
/// terms (the copies `bagof/3` groups by), so no environment is involved.
pub fn variant(a: &Term, b: &Term) -> bool {
    fn walk(a: &Term, b: &Term, fwd: &mut HashMap<u64, u64>, bwd: &mut HashMap<u64, u64>) -> bool {
        match (a, b) {
            (Term::Var(x), Term::Var(y)) => {
                let f = *fwd.entry(x.tag()).or_insert_with(|| y.tag());
                let g = *bwd.entry(y.tag()).or_insert_with(|| x.tag());
                f == y.tag() && g == x.tag()
            }
            (Term::Atom(x), Term::Atom(y)) => x == y,
            (Term::Int(x), Term::Int(y)) => x == y,
            (Term::Float(x), Term::Float(y)) => x == y,
            (Term::Compound(x), Term::Compound(y)) => {
                x.functor == y.functor
                    && x.args.len() == y.args.len()
                    && x.args
                        .iter()
                        .zip(&y.args)
                        .all(|(p, q)| walk(p, q, fwd, bwd))
            }
            _ => false,
        }
    }
    walk(a, b, &mut HashMap::new(), &mut HashMap::new())
}

/// The standard order of terms:
/// variables < numbers < atoms < compounds. Variables order by creation,
/// mixed numbers compare by value with `Float` before `Int` on ties, atoms
/// by codepoint sequence, compounds by arity, then functor, then arguments
/// left to right. Cyclic terms compare equal at the point of re-entry.
pub fn compare_terms(a: &Term, b: &Term, env: &Env) -> Ordering {
    compare_rec(a, b, env, &mut HashSet::new())
}

fn compare_rec(
    a: &Term,
    b: &Term,
    env: &Env,
    seen: &mut HashSet<(*const Compound, *const Compound)>,
) -> Ordering {
    let a = env.resolve(a);
    let b = env.resolve(b);
    match (&a, &b) {
        (Term::Var(x), Term::Var(y)) => x.tag().cmp(&y.tag()),
        (Term::Var(_), _) => Ordering::Less,
        (_, Term::Var(_)) => Ordering::Greater,

        (Term::Float(x), Term::Float(y)) => x.total_cmp(y),
        (Term::Float(x), Term::Int(y)) => x.total_cmp(&(*y as f64)).then(Ordering::Less),
        (Term::Int(x), Term::Float(y)) => (*x as f64).total_cmp(y).then(Ordering::Greater),
        (Term::Int(x), Term::Int(y)) => x.cmp(y),
        (Term::Float(_) | Term::Int(_), _) => Ordering::Less,
        (_, Term::Float(_) | Term::Int(_)) => Ordering::Greater,

        (Term::Atom(x), Term::Atom(y)) => x.as_str().cmp(y.as_str()),
        (Term::Atom(_), _) => Ordering::Less,
        (_, Term::Atom(_)) => Ordering::Greater,

        (Term::Compound(x), Term::Compound(y)) => {
            let key = (Arc::as_ptr(x), Arc::as_ptr(y));
            if !seen.insert(key) {
                return Ordering::Equal;
            }
            let ord = x
                .args
                .len()
                .cmp(&y.args.len())
                .then_with(|| x.functor.as_str().cmp(y.functor.as_str()))
                .then_with(|| {
                    for (p, q) in x.args.iter().zip(&y.args) {
                        let o = compare_rec(p, q, env, seen);
                        if o != Ordering::Equal {
                            return o;
                        }
                    }
                    Ordering::Equal
                });
            seen.remove(&key);
            ord
        }
    }
}
