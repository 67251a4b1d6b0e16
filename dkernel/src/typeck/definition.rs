//! Certifies declarations before they are added to an environment.

use std::collections::BTreeSet;

use crate::{
    context::Context,
    environment::Declaration,
    result::{InferenceError, Ir, UniverseError},
    universe::Level,
};

use super::TypeChecker;

impl<'env> TypeChecker<'env> {
    /// Checks that a declaration is well formed in the environment this checker is bound to.
    ///
    /// The type of the declaration must be a type, it may only mention the universe parameters
    /// it declares, and its body (if any) must have the declared type.
    /// Opaque bodies are checked in the same way, even though they are never unfolded.
    /// Returns the universe level of the declaration's type.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn check_declaration(&mut self, declaration: &Declaration) -> Ir<Level> {
        check_universe_params(declaration)?;

        let ctx = Context::new();
        // Check that the type of a declaration is indeed a type.
        let level = self.infer_universe_core(&declaration.ty, &ctx)?;

        if let Some(body) = &declaration.body {
            // Check that the type of the body matches the type declared.
            let body_type = self.infer_type_core(body, &ctx)?;
            if !self.is_convertible_core(&body_type, &declaration.ty, &ctx)? {
                tracing::debug!("body of declaration had incorrect type");
                return Err(InferenceError::DeclarationTypeMismatch {
                    expected: declaration.ty.clone(),
                    found: body_type,
                });
            }
        }

        Ok(level.normalise())
    }
}

fn check_universe_params(declaration: &Declaration) -> Ir<()> {
    let mut declared = BTreeSet::new();
    for param in &declaration.universe_params {
        if !declared.insert(param) {
            return Err(UniverseError::DuplicateParameter {
                parameter: param.clone(),
            }
            .into());
        }
    }

    let mut used = declaration.ty.universe_params();
    if let Some(body) = &declaration.body {
        used.extend(body.universe_params());
    }
    match used.into_iter().find(|param| !declared.contains(param)) {
        Some(parameter) => Err(UniverseError::UndeclaredParameter { parameter }.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        basic::Name,
        environment::{Declaration, Environment},
        expr::Expression,
        result::{InferenceError, UniverseError},
        typeck::TypeChecker,
        universe::Level,
    };

    fn environment() -> Environment {
        Environment::new()
            .add(
                Name::new("nat"),
                Declaration::axiom(Vec::new(), Expression::sort_type()),
            )
            .unwrap()
            .add(
                Name::new("zero"),
                Declaration::axiom(Vec::new(), Expression::constant("nat", Vec::new())),
            )
            .unwrap()
    }

    fn polymorphic_identity() -> Declaration {
        let sort_u = Expression::sort(Level::param("u"));
        Declaration::definition(
            vec![Name::new("u")],
            Expression::pi(
                sort_u.clone(),
                Expression::pi(Expression::variable(0), Expression::variable(1)),
            ),
            Expression::lambda(
                sort_u,
                Expression::lambda(Expression::variable(0), Expression::variable(0)),
            ),
        )
    }

    #[test]
    fn well_formed_definition() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        // (A : Sort u) -> A -> A : Sort (imax (u+1) u)
        assert_eq!(
            tc.check_declaration(&polymorphic_identity()),
            Ok(Level::imax(Level::param("u").succ(), Level::param("u")))
        );
    }

    #[test]
    fn axiom_type_must_be_a_type() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        let decl = Declaration::axiom(Vec::new(), Expression::constant("zero", Vec::new()));
        assert!(matches!(
            tc.check_declaration(&decl),
            Err(InferenceError::NotASort { .. })
        ));
    }

    #[test]
    fn body_must_have_declared_type() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        let decl = Declaration::definition(
            Vec::new(),
            Expression::constant("nat", Vec::new()),
            Expression::sort_prop(),
        );
        assert_eq!(
            tc.check_declaration(&decl),
            Err(InferenceError::DeclarationTypeMismatch {
                expected: Expression::constant("nat", Vec::new()),
                found: Expression::sort_type(),
            })
        );
    }

    #[test]
    fn undeclared_universe_parameter() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        let decl = Declaration::axiom(Vec::new(), Expression::sort(Level::param("v")));
        assert_eq!(
            tc.check_declaration(&decl),
            Err(InferenceError::UniverseError(
                UniverseError::UndeclaredParameter {
                    parameter: Name::new("v")
                }
            ))
        );
    }

    #[test]
    fn duplicate_universe_parameter() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        let decl = Declaration::axiom(
            vec![Name::new("u"), Name::new("u")],
            Expression::sort(Level::param("u")),
        );
        assert_eq!(
            tc.check_declaration(&decl),
            Err(InferenceError::UniverseError(
                UniverseError::DuplicateParameter {
                    parameter: Name::new("u")
                }
            ))
        );
    }

    #[test]
    fn checked_declarations_can_be_used() {
        let env = environment();
        let decl = polymorphic_identity();
        TypeChecker::new(&env).check_declaration(&decl).unwrap();
        let env = env.add(Name::new("id"), decl).unwrap();
        let mut tc = TypeChecker::new(&env);
        let e = Expression::constant("id", vec![Level::one()]).create_nary_application([
            &Expression::constant("nat", Vec::new()),
            &Expression::constant("zero", Vec::new()),
        ]);
        assert_eq!(
            tc.infer_type(&e, &crate::context::Context::new()),
            Ok(Expression::constant("nat", Vec::new()))
        );
    }
}
