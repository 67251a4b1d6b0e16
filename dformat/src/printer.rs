//! Converts kernel objects into pretty-printable documents.

use dkernel::{
    basic::{DeBruijnIndex, Name},
    context::Context,
    environment::{Declaration, Environment, ReducibilityHints},
    expr::{Binder, Expression, ExpressionContents},
    universe::Level,
};

use crate::{message::Message, pretty_print::Document, style::Style, FormatOptions};

/// Anything that can be rendered by a [`Printer`].
pub trait Printable {
    fn to_document(&self, printer: &mut Printer) -> Document;
}

/// How tightly the surrounding syntax binds an expression.
/// Expressions that bind less tightly than their position requires are parenthesised.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Top,
    /// The domain of a non-dependent function type.
    Arrow,
    /// An argument of a function application.
    Argument,
}

/// Renders expressions with names for their variables.
pub struct Printer<'a> {
    options: &'a FormatOptions,
    /// Names of the variables in scope, outermost first.
    names: Vec<String>,
}

impl<'a> Printer<'a> {
    pub fn new(options: &'a FormatOptions) -> Self {
        Self {
            options,
            names: Vec::new(),
        }
    }

    fn styled(&self, text: impl Into<String>, style: Style) -> Document {
        if self.options.colour {
            Document::Styled {
                text: text.into(),
                style,
            }
        } else {
            Document::Text(text.into())
        }
    }

    fn keyword(&self, ascii: &str, unicode: &str) -> Document {
        self.styled(
            if self.options.unicode { unicode } else { ascii },
            Style::keyword(),
        )
    }

    fn symbol(&self, ascii: &str, unicode: &str) -> Document {
        Document::text(if self.options.unicode { unicode } else { ascii })
    }

    /// Picks a name for a new variable that does not shadow any variable in scope.
    fn fresh_name(&self, hint: Option<&Name>) -> String {
        let unused = |name: &str| !self.names.iter().any(|existing| existing == name);
        if let Some(hint) = hint.filter(|hint| !hint.is_anonymous()) {
            if unused(hint.text()) {
                return hint.text().to_owned();
            }
        }
        let base = hint
            .filter(|hint| !hint.is_anonymous())
            .map_or("x", |hint| hint.text());
        std::iter::once(base.to_owned())
            .chain((1..).map(|i| format!("{base}{i}")))
            .find(|name| unused(name))
            .unwrap_or_else(|| base.to_owned())
    }

    fn variable(&self, index: DeBruijnIndex) -> Document {
        let index = index.value() as usize;
        match self.names.len().checked_sub(index + 1) {
            Some(position) => self.styled(self.names[position].clone(), Style::variable()),
            // Loose variables are printed with their raw index.
            None => Document::text(format!("#{}", index - self.names.len())),
        }
    }

    /// Names every binding of the context, outermost first, so that expressions in the context can refer to them.
    /// Returns a document describing the bindings.
    pub fn bind_context(&mut self, ctx: &Context) -> Document {
        let bindings = ctx
            .to_vec()
            .into_iter()
            .map(|binding| {
                let name = self.fresh_name(Some(&binding.name));
                let mut doc = vec![
                    self.styled(name.clone(), Style::variable()),
                    Document::text(" : "),
                    self.expression(&binding.ty),
                ];
                if let Some(value) = &binding.value {
                    doc.push(Document::text(" := "));
                    doc.push(self.expression(value));
                }
                self.names.push(name);
                Document::Concat(doc)
            })
            .collect::<Vec<_>>();
        Document::join(bindings, Document::text(",").then(Document::Line)).group()
    }

    pub fn level(&self, level: &Level) -> Document {
        self.styled(level.to_string(), Style::level())
    }

    pub fn expression(&mut self, e: &Expression) -> Document {
        self.expression_with_precedence(e, Precedence::Top)
    }

    fn expression_with_precedence(&mut self, e: &Expression, precedence: Precedence) -> Document {
        match e.value() {
            ExpressionContents::Variable(index) => self.variable(*index),
            ExpressionContents::Sort(level) => match level.to_explicit_level() {
                Some(0) => self.keyword("Prop", "Prop"),
                Some(1) => self.keyword("Type", "Type"),
                _ => {
                    let level_doc = match level {
                        Level::Param(_) => self.level(level),
                        _ if level.to_explicit_level().is_some() => self.level(level),
                        _ => Document::text("(")
                            .then(self.level(level))
                            .then(Document::text(")")),
                    };
                    parenthesise(
                        self.keyword("Sort", "Sort")
                            .then(Document::text(" "))
                            .then(level_doc),
                        precedence >= Precedence::Argument,
                    )
                }
            },
            ExpressionContents::Constant(constant) => {
                let name = self.styled(constant.name.text(), Style::constant());
                if constant.levels.is_empty() {
                    name
                } else {
                    name.then(Document::text(".{"))
                        .then(Document::join(
                            constant.levels.iter().map(|level| self.level(level)),
                            Document::text(", "),
                        ))
                        .then(Document::text("}"))
                }
            }
            ExpressionContents::Apply(_) => {
                let (head, args) = e.destructure_as_nary_application();
                let mut docs = vec![self.expression_with_precedence(head, Precedence::Argument)];
                for arg in args {
                    docs.push(Document::Line);
                    docs.push(self.expression_with_precedence(arg, Precedence::Argument));
                }
                let first = docs.remove(0);
                parenthesise(
                    first.then(Document::Concat(docs).indent()).group(),
                    precedence >= Precedence::Argument,
                )
            }
            ExpressionContents::Lambda(binder) => {
                let name = self.fresh_name(None);
                let binder_doc = if self.options.show_binder_types {
                    self.typed_binder(&name, &binder.domain)
                } else {
                    self.styled(name.clone(), Style::variable())
                };
                let body = self.with_name(name, |printer| printer.expression(&binder.body));
                parenthesise(
                    self.keyword("fun", "λ")
                        .then(Document::text(" "))
                        .then(binder_doc)
                        .then(Document::text(" "))
                        .then(self.symbol("=>", "↦"))
                        .then(Document::Line.then(body).indent())
                        .group(),
                    precedence > Precedence::Top,
                )
            }
            ExpressionContents::Pi(binder) => {
                let doc = self.pi(binder);
                parenthesise(doc, precedence > Precedence::Top)
            }
            ExpressionContents::Let(let_expr) => {
                let name = self.fresh_name(None);
                let value = self.expression(&let_expr.value);
                let body =
                    self.with_name(name.clone(), |printer| printer.expression(&let_expr.body));
                parenthesise(
                    self.keyword("let", "let")
                        .then(Document::text(" "))
                        .then(self.styled(name, Style::variable()))
                        .then(Document::text(" := "))
                        .then(value)
                        .then(Document::text(" "))
                        .then(self.keyword("in", "in"))
                        .then(Document::Line)
                        .then(body)
                        .group(),
                    precedence > Precedence::Top,
                )
            }
        }
    }

    fn pi(&mut self, binder: &Binder) -> Document {
        let name = self.fresh_name(None);
        let binder_doc = if binder.body.has_variable(DeBruijnIndex::zero()) {
            self.typed_binder(&name, &binder.domain)
        } else {
            self.expression_with_precedence(&binder.domain, Precedence::Arrow)
        };
        let body = self.with_name(name, |printer| printer.expression(&binder.body));
        binder_doc
            .then(Document::text(" "))
            .then(self.symbol("->", "→"))
            .then(Document::Line)
            .then(body)
            .group()
    }

    fn typed_binder(&mut self, name: &str, domain: &Expression) -> Document {
        Document::text("(")
            .then(self.styled(name, Style::variable()))
            .then(Document::text(" : "))
            .then(self.expression(domain))
            .then(Document::text(")"))
    }

    fn with_name<T>(&mut self, name: String, f: impl FnOnce(&mut Self) -> T) -> T {
        self.names.push(name);
        let result = f(self);
        self.names.pop();
        result
    }

    fn declaration(&mut self, name: &Name, decl: &Declaration) -> Document {
        let keyword = match (&decl.body, decl.hints) {
            (None, _) => self.keyword("axiom", "axiom"),
            (Some(_), ReducibilityHints::Regular { .. }) => self.keyword("def", "def"),
            (Some(_), ReducibilityHints::Opaque) => self.keyword("opaque", "opaque"),
        };
        let mut header = keyword
            .then(Document::text(" "))
            .then(self.styled(name.text(), Style::constant()));
        if !decl.universe_params.is_empty() {
            header = header
                .then(Document::text(".{"))
                .then(Document::join(
                    decl.universe_params
                        .iter()
                        .map(|param| self.styled(param.text(), Style::level())),
                    Document::text(", "),
                ))
                .then(Document::text("}"));
        }
        let mut doc = header
            .then(Document::text(" :"))
            .then(Document::Line.then(self.expression(&decl.ty)).indent());
        if let Some(body) = &decl.body {
            doc = doc
                .then(Document::text(" :="))
                .then(Document::Line.then(self.expression(body)).indent());
        }
        doc.group()
    }
}

fn parenthesise(doc: Document, needed: bool) -> Document {
    if needed {
        Document::text("(").then(doc).then(Document::text(")"))
    } else {
        doc
    }
}

impl Printable for Expression {
    fn to_document(&self, printer: &mut Printer) -> Document {
        printer.expression(self)
    }
}

impl Printable for Level {
    fn to_document(&self, printer: &mut Printer) -> Document {
        printer.level(self)
    }
}

impl Printable for Context {
    fn to_document(&self, printer: &mut Printer) -> Document {
        printer.bind_context(self)
    }
}

/// An expression together with the context its free variables refer to.
pub struct InContext<'a> {
    pub context: &'a Context,
    pub expression: &'a Expression,
    /// If true, the bindings of the context are rendered before the expression.
    pub show_context: bool,
}

impl Printable for InContext<'_> {
    fn to_document(&self, printer: &mut Printer) -> Document {
        let context = printer.bind_context(self.context);
        let expression = printer.expression(self.expression);
        if self.show_context {
            context
                .then(Document::text(" "))
                .then(printer.symbol("|-", "⊢"))
                .then(Document::Line.then(expression).indent())
                .group()
        } else {
            expression
        }
    }
}

pub struct NamedDeclaration<'a> {
    pub name: &'a Name,
    pub declaration: &'a Declaration,
}

impl Printable for NamedDeclaration<'_> {
    fn to_document(&self, printer: &mut Printer) -> Document {
        printer.declaration(self.name, self.declaration)
    }
}

impl Printable for Environment {
    fn to_document(&self, printer: &mut Printer) -> Document {
        let declarations = self
            .iter()
            .map(|(name, decl)| printer.declaration(name, decl))
            .collect::<Vec<_>>();
        Document::join(declarations, Document::Line)
    }
}

impl Printable for Message {
    fn to_document(&self, printer: &mut Printer) -> Document {
        match self {
            Message::String(text) => Document::text(text.clone()),
            Message::Expression {
                expression,
                context,
            } => {
                let mut inner = Printer::new(printer.options);
                inner.bind_context(context);
                inner.expression(expression)
            }
            Message::Level(level) => printer.level(level),
            Message::Styled { style, message } => match &**message {
                Message::String(text) => printer.styled(text.clone(), style.clone()),
                other => other.to_document(printer),
            },
            Message::Sequence(messages) => Document::Concat(
                messages
                    .iter()
                    .map(|message| message.to_document(printer))
                    .collect(),
            ),
        }
    }
}
