//! Semantic styles for rendered output.

use std::collections::BTreeSet;

/// A colour associated to a particular concept.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SemanticColour {
    /// Names of constants declared in the environment.
    Constant,
    /// Names of local variables.
    Variable,
    Keyword,
    /// Universe levels.
    Level,
}

#[cfg(feature = "console")]
impl From<SemanticColour> for console::Color {
    fn from(value: SemanticColour) -> Self {
        match value {
            SemanticColour::Constant => Self::White,
            SemanticColour::Variable => Self::Cyan,
            SemanticColour::Keyword => Self::Magenta,
            SemanticColour::Level => Self::Yellow,
        }
    }
}

impl SemanticColour {
    #[cfg(feature = "console")]
    fn is_bright(self) -> bool {
        matches!(self, SemanticColour::Constant)
    }
}

/// A rendering attribute associated to a particular concept.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SemanticAttribute {
    /// Usually represented with bold text.
    Strong,
    /// Usually represented with italicised text.
    Emphasis,
}

#[cfg(feature = "console")]
impl From<SemanticAttribute> for console::Attribute {
    fn from(value: SemanticAttribute) -> Self {
        match value {
            SemanticAttribute::Strong => Self::Bold,
            SemanticAttribute::Emphasis => Self::Italic,
        }
    }
}

/// Mirrors the [`console::Style`] struct, but its fields are accessible.
/// This means that we can use this [`Style`] for things that are not terminal styles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Style {
    fg: Option<SemanticColour>,
    attrs: BTreeSet<SemanticAttribute>,
}

impl Style {
    fn fg(mut self, fg: SemanticColour) -> Self {
        self.fg = Some(fg);
        self
    }

    fn attr(mut self, attr: SemanticAttribute) -> Self {
        self.attrs.insert(attr);
        self
    }

    pub fn constant() -> Self {
        Self::default().fg(SemanticColour::Constant)
    }

    pub fn variable() -> Self {
        Self::default().fg(SemanticColour::Variable)
    }

    pub fn keyword() -> Self {
        Self::default()
            .fg(SemanticColour::Keyword)
            .attr(SemanticAttribute::Strong)
    }

    pub fn level() -> Self {
        Self::default().fg(SemanticColour::Level)
    }

    pub fn emphasis() -> Self {
        Self::default().attr(SemanticAttribute::Emphasis)
    }

    /// Renders the text with this style.
    /// Without the `console` feature, the text is returned unchanged.
    pub fn apply(&self, text: &str) -> String {
        #[cfg(feature = "console")]
        {
            console::Style::from(self)
                .force_styling(true)
                .apply_to(text)
                .to_string()
        }
        #[cfg(not(feature = "console"))]
        {
            text.to_owned()
        }
    }
}

#[cfg(feature = "console")]
impl From<&Style> for console::Style {
    fn from(value: &Style) -> Self {
        let mut result = Self::new();
        if let Some(fg) = value.fg {
            result = result.fg(fg.into());
            if fg.is_bright() {
                result = result.bright();
            }
        }
        for attr in value.attrs.iter().copied() {
            result = result.attr(attr.into())
        }
        result
    }
}
