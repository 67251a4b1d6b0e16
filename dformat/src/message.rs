//! Structured diagnostic messages.

use dkernel::{
    basic::Name,
    context::Context,
    expr::Expression,
    result::{InferenceError, UniverseError},
    universe::Level,
};

use crate::style::Style;

/// A message built from text and kernel objects.
/// Expressions keep the context they live in, so a formatter can name their free variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    String(String),
    Expression {
        expression: Expression,
        context: Context,
    },
    Level(Level),
    Styled { style: Style, message: Box<Message> },
    Sequence(Vec<Message>),
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::String(value.to_owned())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::String(value)
    }
}

impl From<&Name> for Message {
    fn from(value: &Name) -> Self {
        Message::Styled {
            style: Style::constant(),
            message: Box::new(value.text().into()),
        }
    }
}

impl From<&Level> for Message {
    fn from(value: &Level) -> Self {
        Message::Level(value.clone())
    }
}

/// An expression with no free variables.
impl From<&Expression> for Message {
    fn from(value: &Expression) -> Self {
        Message::in_context(value, &Context::new())
    }
}

impl From<usize> for Message {
    fn from(value: usize) -> Self {
        Message::String(value.to_string())
    }
}

impl Message {
    pub fn new(string: impl ToString) -> Self {
        Message::String(string.to_string())
    }

    pub fn in_context(expression: &Expression, context: &Context) -> Self {
        Message::Expression {
            expression: expression.clone(),
            context: context.clone(),
        }
    }
}

/// Creates the syntax `message![...]` for creating a message from
/// a sequence of things convertible to message segments.
#[macro_export]
macro_rules! message {
    ($($e:expr),*) => {
        $crate::message::Message::Sequence(
            vec![$($crate::message::Message::from($e)),*]
        )
    };
}

impl From<&InferenceError> for Message {
    fn from(value: &InferenceError) -> Message {
        match value {
            InferenceError::UnboundVariable {
                index,
                context_length,
            } => message![
                "variable ",
                index.to_string(),
                " is not bound in a context of length ",
                *context_length
            ],
            InferenceError::UnknownConstant(name) => message!["unknown constant ", name],
            InferenceError::FunctionExpected {
                function,
                function_type,
                context,
            } => message![
                "expected ",
                Message::in_context(function, context),
                " to be a function, but it has type ",
                Message::in_context(function_type, context)
            ],
            InferenceError::TypeMismatch {
                function,
                argument,
                expected,
                found,
                context,
            } => message![
                "cannot apply function ",
                Message::in_context(function, context),
                " to argument ",
                Message::in_context(argument, context),
                ": expected an argument of type ",
                Message::in_context(expected, context),
                " but found one of type ",
                Message::in_context(found, context)
            ],
            InferenceError::NotASort {
                expression,
                ty,
                context,
            } => message![
                "expected ",
                Message::in_context(expression, context),
                " to be a type, but it has type ",
                Message::in_context(ty, context)
            ],
            InferenceError::UniverseError(err) => err.into(),
            InferenceError::DeclarationTypeMismatch { expected, found } => message![
                "body of declaration has type ",
                found,
                " but the declaration has type ",
                expected
            ],
            InferenceError::DeepRecursion { depth } => {
                message!["exceeded the maximum recursion depth of ", *depth]
            }
            InferenceError::Interrupted => "type checking was interrupted".into(),
        }
    }
}

impl From<&UniverseError> for Message {
    fn from(value: &UniverseError) -> Message {
        match value {
            UniverseError::ArityMismatch {
                constant,
                expected,
                found,
            } => message![
                "constant ",
                constant,
                " expects ",
                *expected,
                " universe levels, but was given ",
                *found
            ],
            UniverseError::UndeclaredParameter { parameter } => {
                message!["universe parameter ", parameter, " was not declared"]
            }
            UniverseError::DuplicateParameter { parameter } => {
                message!["universe parameter ", parameter, " was declared more than once"]
            }
        }
    }
}

impl From<InferenceError> for Message {
    fn from(value: InferenceError) -> Message {
        (&value).into()
    }
}
