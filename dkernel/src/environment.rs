//! The global store of declarations.

use std::{collections::HashMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    basic::Name,
    expr::{Expression, ExpressionContents},
};

/// Hints used by the definitional equality checker to choose which definitions to unfold first.
/// In particular, if we are checking if `f x y z` is equal to `g a b c`, we look at the
/// reducibility hints of `f` and `g`. If one has a higher height than the other, we unfold
/// that one first, as it may reduce into an invocation of the other function. This essentially
/// allows us to unfold complicated expressions into easier ones, rather than having to unfold
/// all expressions into normal form, which would be very computationally intensive.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReducibilityHints {
    Regular {
        height: DefinitionHeight,
    },
    /// Opaque declarations are never unfolded.
    /// They do not have a definition height.
    Opaque,
}

impl Display for ReducibilityHints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReducibilityHints::Regular { height } => {
                write!(f, "regular definition with height {height}")
            }
            ReducibilityHints::Opaque => write!(f, "opaque definition"),
        }
    }
}

/// If this number is higher, the definition is 'more complex'.
/// We define the height of a [`ReducibilityHints::Regular`] definition to be one more than
/// the maximum height of any [`ReducibilityHints::Regular`] definitions it contains.
pub type DefinitionHeight = u64;

/// A constant in the environment: an axiom, a definition, or an opaque constant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub ty: Expression,
    /// The universe parameters the type and body may mention.
    /// Every use of the constant supplies exactly this many levels.
    pub universe_params: Vec<Name>,
    pub body: Option<Expression>,
    pub hints: ReducibilityHints,
}

impl Declaration {
    /// A constant with no body.
    pub fn axiom(universe_params: Vec<Name>, ty: Expression) -> Self {
        Self {
            ty,
            universe_params,
            body: None,
            hints: ReducibilityHints::Opaque,
        }
    }

    /// An unfoldable definition.
    /// Its height is computed when it is added to an [`Environment`].
    pub fn definition(universe_params: Vec<Name>, ty: Expression, body: Expression) -> Self {
        Self {
            ty,
            universe_params,
            body: Some(body),
            hints: ReducibilityHints::Regular { height: 0 },
        }
    }

    /// A constant with a body that the checker never unfolds.
    pub fn opaque(universe_params: Vec<Name>, ty: Expression, body: Expression) -> Self {
        Self {
            ty,
            universe_params,
            body: Some(body),
            hints: ReducibilityHints::Opaque,
        }
    }

    /// Returns the height of this declaration if it may be unfolded.
    pub fn definition_height(&self) -> Option<DefinitionHeight> {
        match (self.hints, &self.body) {
            (ReducibilityHints::Regular { height }, Some(_)) => Some(height),
            _ => None,
        }
    }

    /// Returns the body of this declaration if it may be unfolded.
    pub fn unfoldable_body(&self) -> Option<&Expression> {
        match self.hints {
            ReducibilityHints::Regular { .. } => self.body.as_ref(),
            ReducibilityHints::Opaque => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    AlreadyDeclared(Name),
}

impl Display for EnvironmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentError::AlreadyDeclared(name) => {
                write!(f, "constant {name} was already declared")
            }
        }
    }
}

impl std::error::Error for EnvironmentError {}

/// An immutable snapshot of the declarations visible to the type checker.
///
/// New declarations are only visible through a fresh snapshot returned by [`Environment::add`].
/// A type checker borrows its environment, so a snapshot cannot be extended while a checker
/// bound to it is alive.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    declarations: HashMap<Name, Declaration>,
    /// Declaration names in the order they were added.
    order: Vec<Name>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration, returning the extended environment.
    ///
    /// The height of a [`ReducibilityHints::Regular`] declaration is recomputed from the
    /// declarations its body mentions. This does not type check the declaration; see
    /// `TypeChecker::check_declaration`.
    pub fn add(
        mut self,
        name: Name,
        mut declaration: Declaration,
    ) -> Result<Self, EnvironmentError> {
        if self.declarations.contains_key(&name) {
            return Err(EnvironmentError::AlreadyDeclared(name));
        }
        if let (ReducibilityHints::Regular { .. }, Some(body)) =
            (declaration.hints, &declaration.body)
        {
            declaration.hints = ReducibilityHints::Regular {
                height: self.max_definition_height(body) + 1,
            };
        }
        tracing::debug!("declared {name}: {}", declaration.hints);
        self.order.push(name.clone());
        self.declarations.insert(name, declaration);
        Ok(self)
    }

    pub fn lookup(&self, name: &Name) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.declarations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over the declarations in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Declaration)> {
        self.order
            .iter()
            .filter_map(|name| self.declarations.get_key_value(name))
    }

    /// The largest height of any unfoldable definition mentioned in the expression, or zero.
    pub fn max_definition_height(&self, e: &Expression) -> DefinitionHeight {
        let mut result = 0;
        e.for_each_expression(&mut |inner, _offset| {
            if let ExpressionContents::Constant(constant) = inner.value() {
                if let Some(height) = self
                    .lookup(&constant.name)
                    .and_then(Declaration::definition_height)
                {
                    result = result.max(height);
                }
            }
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::{environment::*, universe::Level};

    fn prop_identity() -> Expression {
        Expression::lambda(Expression::sort_prop(), Expression::variable(0))
    }

    fn prop_endomorphism() -> Expression {
        Expression::arrow(Expression::sort_prop(), Expression::sort_prop())
    }

    #[test]
    fn heights() {
        let env = Environment::new()
            .add(
                Name::new("a"),
                Declaration::axiom(Vec::new(), Expression::sort_type()),
            )
            .unwrap()
            .add(
                Name::new("id"),
                Declaration::definition(Vec::new(), prop_endomorphism(), prop_identity()),
            )
            .unwrap()
            .add(
                Name::new("id2"),
                Declaration::definition(
                    Vec::new(),
                    prop_endomorphism(),
                    Expression::constant("id", Vec::new()),
                ),
            )
            .unwrap();
        let height = |name: &str| {
            env.lookup(&Name::new(name))
                .and_then(Declaration::definition_height)
        };
        assert_eq!(height("a"), None);
        assert_eq!(height("id"), Some(1));
        assert_eq!(height("id2"), Some(2));
    }

    #[test]
    fn opaque_has_no_height() {
        let env = Environment::new()
            .add(
                Name::new("secret"),
                Declaration::opaque(Vec::new(), prop_endomorphism(), prop_identity()),
            )
            .unwrap();
        let decl = env.lookup(&Name::new("secret")).unwrap();
        assert_eq!(decl.definition_height(), None);
        assert_eq!(decl.unfoldable_body(), None);
    }

    #[test]
    fn redeclaration_rejected() {
        let env = Environment::new()
            .add(
                Name::new("a"),
                Declaration::axiom(Vec::new(), Expression::sort_prop()),
            )
            .unwrap();
        assert_eq!(
            env.add(
                Name::new("a"),
                Declaration::axiom(vec![Name::new("u")], Expression::sort(Level::param("u"))),
            )
            .unwrap_err(),
            EnvironmentError::AlreadyDeclared(Name::new("a"))
        );
    }

    #[test]
    fn insertion_order() {
        let env = ["c", "a", "b"].iter().fold(Environment::new(), |env, name| {
            env.add(
                Name::new(name),
                Declaration::axiom(Vec::new(), Expression::sort_prop()),
            )
            .unwrap()
        });
        let names = env.iter().map(|(name, _)| name.text()).collect::<Vec<_>>();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(env.len(), 3);
    }
}
