//! Runs kernel test cases described in `ron` files under `tests/src`.
//!
//! Each file describes an environment, a local context, a query to run against them,
//! and the expected outcome of the query.
//! Declarations in the environment are type checked in order before the query is run.

use std::path::Path;

use dformat::{mk_simple_formatter, FormatOptions, SharedFormatter};
use dkernel::{
    basic::Name,
    context::{Binding, Context},
    environment::{Declaration, Environment},
    expr::Expression,
    result::{InferenceError, UniverseError},
    typeck::{CheckerConfig, TypeChecker},
    universe::Level,
};
use serde::Deserialize;
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Debug)]
pub struct TestCase {
    #[serde(default)]
    pub environment: Vec<Entry>,
    /// Bindings of the local context, outermost first.
    #[serde(default)]
    pub context: Vec<Binding>,
    #[serde(default)]
    pub config: CheckerConfig,
    pub query: Query,
    pub expected: Expected,
}

/// A named declaration.
#[derive(Deserialize, Debug, Clone)]
pub enum Entry {
    Axiom {
        name: Name,
        #[serde(default)]
        universe_params: Vec<Name>,
        ty: Expression,
    },
    Definition {
        name: Name,
        #[serde(default)]
        universe_params: Vec<Name>,
        ty: Expression,
        body: Expression,
    },
    Opaque {
        name: Name,
        #[serde(default)]
        universe_params: Vec<Name>,
        ty: Expression,
        body: Expression,
    },
}

impl Entry {
    pub fn into_declaration(self) -> (Name, Declaration) {
        match self {
            Entry::Axiom {
                name,
                universe_params,
                ty,
            } => (name, Declaration::axiom(universe_params, ty)),
            Entry::Definition {
                name,
                universe_params,
                ty,
                body,
            } => (name, Declaration::definition(universe_params, ty, body)),
            Entry::Opaque {
                name,
                universe_params,
                ty,
                body,
            } => (name, Declaration::opaque(universe_params, ty, body)),
        }
    }
}

#[derive(Deserialize, Debug)]
pub enum Query {
    /// Infer the type of an expression.
    Infer(Expression),
    /// Infer the universe level of a type.
    Universe(Expression),
    /// Check that an expression is well typed.
    Check(Expression),
    Convertible(Expression, Expression),
    /// Type check a declaration against the environment.
    Declaration(Entry),
}

#[derive(Deserialize, Debug)]
pub enum Expected {
    /// The inferred type, up to definitional equality.
    Type(Expression),
    /// The inferred universe level, up to equivalence.
    Level(Level),
    Success,
    Convertible(bool),
    /// The query fails with the named [`InferenceError`] variant.
    /// Universe errors are named by their [`UniverseError`] variant.
    Error(String),
}

/// Outcome of running a query.
enum Outcome {
    Type(Expression),
    Level(Level),
    Success,
    Convertible(bool),
}

/// The name of the variant of an error, as written in test files.
pub fn error_kind(err: &InferenceError) -> &'static str {
    match err {
        InferenceError::UnboundVariable { .. } => "UnboundVariable",
        InferenceError::UnknownConstant(_) => "UnknownConstant",
        InferenceError::FunctionExpected { .. } => "FunctionExpected",
        InferenceError::TypeMismatch { .. } => "TypeMismatch",
        InferenceError::NotASort { .. } => "NotASort",
        InferenceError::UniverseError(err) => match err {
            UniverseError::ArityMismatch { .. } => "ArityMismatch",
            UniverseError::UndeclaredParameter { .. } => "UndeclaredParameter",
            UniverseError::DuplicateParameter { .. } => "DuplicateParameter",
        },
        InferenceError::DeclarationTypeMismatch { .. } => "DeclarationTypeMismatch",
        InferenceError::DeepRecursion { .. } => "DeepRecursion",
        InferenceError::Interrupted => "Interrupted",
    }
}

/// Adds each entry to the environment, after checking it against the declarations before it.
pub fn build_environment(
    entries: Vec<Entry>,
    formatter: &SharedFormatter,
    opts: &FormatOptions,
) -> Environment {
    let mut env = Environment::new();
    for entry in entries {
        let (name, declaration) = entry.into_declaration();
        if let Err(err) = TypeChecker::new(&env).check_declaration(&declaration) {
            panic!(
                "declaration {} in the environment is ill-typed: {}",
                formatter.format_declaration(&name, &declaration, opts),
                formatter.format_error(&err, opts)
            );
        }
        env = env
            .add(name, declaration)
            .unwrap_or_else(|err| panic!("could not build environment: {err}"));
    }
    env
}

fn run_query(
    checker: &mut TypeChecker,
    ctx: &Context,
    query: Query,
) -> Result<Outcome, InferenceError> {
    match query {
        Query::Infer(e) => checker.infer_type(&e, ctx).map(Outcome::Type),
        Query::Universe(e) => checker.infer_universe(&e, ctx).map(Outcome::Level),
        Query::Check(e) => checker.check(&e, ctx).map(|()| Outcome::Success),
        Query::Convertible(left, right) => checker
            .is_convertible(&left, &right, ctx)
            .map(Outcome::Convertible),
        Query::Declaration(entry) => {
            let (_, declaration) = entry.into_declaration();
            checker.check_declaration(&declaration).map(Outcome::Level)
        }
    }
}

/// Runs the test case at the given path, relative to `tests/src`.
pub fn run_test(path: &str) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let full_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/src")
        .join(path);
    let contents = std::fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("could not read {}: {err}", full_path.display()));
    let case: TestCase = ron::from_str(&contents)
        .unwrap_or_else(|err| panic!("could not parse {}: {err}", full_path.display()));
    tracing::debug!("running test case {path}");

    let formatter = mk_simple_formatter();
    let opts = FormatOptions::default();
    let env = build_environment(case.environment, &formatter, &opts);
    let ctx = Context::from_bindings(case.context);
    let mut checker = TypeChecker::with_config(&env, case.config);

    let outcome = run_query(&mut checker, &ctx, case.query);
    match (outcome, case.expected) {
        (Ok(Outcome::Type(found)), Expected::Type(expected)) => {
            let equal = checker
                .is_convertible(&found, &expected, &ctx)
                .unwrap_or_else(|err| panic!("{}", formatter.format_error(&err, &opts)));
            assert!(
                equal,
                "expected type {}, found {}",
                formatter.format_in_context(&ctx, &expected, false, &opts),
                formatter.format_in_context(&ctx, &found, false, &opts)
            );
        }
        (Ok(Outcome::Level(found)), Expected::Level(expected)) => {
            assert!(
                Level::is_equivalent(&found, &expected),
                "expected level {expected}, found {found}"
            );
        }
        (Ok(Outcome::Success), Expected::Success) => {}
        (Ok(Outcome::Convertible(found)), Expected::Convertible(expected)) => {
            assert_eq!(found, expected, "unexpected result of convertibility check");
        }
        (Err(err), Expected::Error(expected)) => {
            tracing::debug!("query failed with {}", formatter.format_error(&err, &opts));
            assert_eq!(
                error_kind(&err),
                expected,
                "query failed with the wrong error: {}",
                formatter.format_error(&err, &opts)
            );
        }
        (Err(err), expected) => panic!(
            "expected {expected:?}, but the query failed: {}",
            formatter.format_error(&err, &opts)
        ),
        (Ok(_), expected) => {
            panic!("the query succeeded with an unexpected result, expected {expected:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::run_test;

    include!(concat!(env!("OUT_DIR"), "/tests.rs"));
}
