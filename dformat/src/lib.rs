//! Renders kernel objects and kernel errors as human-readable text.
//!
//! The kernel itself never produces text for humans. Every [`Formatter`] method goes through
//! the same path: the object is converted into a [`pretty_print::Document`] by a
//! [`printer::Printer`], then laid out to fit the configured width.

use std::rc::Rc;

use dkernel::{
    basic::Name, context::Context, environment::Declaration, environment::Environment,
    expr::Expression, result::InferenceError,
};
use message::Message;
use printer::{InContext, NamedDeclaration, Printable, Printer};
use serde::Deserialize;

pub mod message;
pub mod pretty_print;
pub mod printer;
pub mod style;

/// Controls how objects are rendered.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FormatOptions {
    /// The preferred maximum line width.
    pub width: usize,
    /// If false, lambda binders are printed without their types.
    pub show_binder_types: bool,
    /// Use symbols such as `λ` and `→` instead of their ASCII spellings.
    pub unicode: bool,
    /// Emit terminal styling. Has no effect unless the `console` feature is enabled.
    pub colour: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            width: 100,
            show_binder_types: true,
            unicode: false,
            colour: false,
        }
    }
}

/// Something that can render kernel objects for display.
pub trait Formatter {
    fn format_expression(&self, e: &Expression, opts: &FormatOptions) -> String;
    fn format_context(&self, ctx: &Context, opts: &FormatOptions) -> String;
    /// Renders `e`, naming its free variables after the bindings of `ctx`.
    /// If `format_ctx` is true, the context is rendered as well.
    fn format_in_context(
        &self,
        ctx: &Context,
        e: &Expression,
        format_ctx: bool,
        opts: &FormatOptions,
    ) -> String;
    fn format_declaration(&self, name: &Name, decl: &Declaration, opts: &FormatOptions) -> String;
    fn format_environment(&self, env: &Environment, opts: &FormatOptions) -> String;
    fn format_message(&self, message: &Message, opts: &FormatOptions) -> String;

    fn format_error(&self, err: &InferenceError, opts: &FormatOptions) -> String {
        self.format_message(&err.into(), opts)
    }

    /// Asks a long-running formatting operation to stop early.
    fn set_interrupt(&self, _flag: bool) {}
}

/// Renders everything with the built-in pretty printer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleFormatter;

impl SimpleFormatter {
    #[tracing::instrument(level = "trace", skip_all, fields(width = opts.width))]
    fn render(&self, object: &impl Printable, opts: &FormatOptions) -> String {
        let mut printer = Printer::new(opts);
        object.to_document(&mut printer).pretty_print(opts.width)
    }
}

impl Formatter for SimpleFormatter {
    fn format_expression(&self, e: &Expression, opts: &FormatOptions) -> String {
        self.render(e, opts)
    }

    fn format_context(&self, ctx: &Context, opts: &FormatOptions) -> String {
        self.render(ctx, opts)
    }

    fn format_in_context(
        &self,
        ctx: &Context,
        e: &Expression,
        format_ctx: bool,
        opts: &FormatOptions,
    ) -> String {
        self.render(
            &InContext {
                context: ctx,
                expression: e,
                show_context: format_ctx,
            },
            opts,
        )
    }

    fn format_declaration(&self, name: &Name, decl: &Declaration, opts: &FormatOptions) -> String {
        self.render(
            &NamedDeclaration {
                name,
                declaration: decl,
            },
            opts,
        )
    }

    fn format_environment(&self, env: &Environment, opts: &FormatOptions) -> String {
        self.render(env, opts)
    }

    fn format_message(&self, message: &Message, opts: &FormatOptions) -> String {
        self.render(message, opts)
    }
}

pub type SharedFormatter = Rc<dyn Formatter>;

pub fn mk_simple_formatter() -> SharedFormatter {
    Rc::new(SimpleFormatter)
}
