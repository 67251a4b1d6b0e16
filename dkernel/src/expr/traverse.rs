//! Utilities for traversing the expression tree for things like find-and-replace operations.

use std::{cmp::Ordering, collections::BTreeSet};

use crate::{
    basic::{DeBruijnIndex, DeBruijnOffset, Name},
    expr::*,
    universe::Level,
};

pub enum ReplaceResult {
    /// The expression should not be replaced.
    Skip,
    /// The expression should be replaced with the given value.
    ReplaceWith(Expression),
}

impl Expression {
    pub fn subexpressions(&self) -> Vec<&Expression> {
        match self.value() {
            ExpressionContents::Variable(_)
            | ExpressionContents::Sort(_)
            | ExpressionContents::Constant(_) => Vec::new(),
            ExpressionContents::Apply(e) => vec![&e.function, &e.argument],
            ExpressionContents::Lambda(e) | ExpressionContents::Pi(e) => vec![&e.domain, &e.body],
            ExpressionContents::Let(e) => vec![&e.value, &e.body],
        }
    }

    /// Traverses the expression tree and finds expressions matching the provided replacement function.
    /// If any matched, the replacement function generates the value to replace the found value with.
    /// The provided [`DeBruijnOffset`] gives the amount of binders the expression argument is currently under.
    /// Subtrees that are not changed keep sharing their nodes with `self`.
    #[must_use]
    pub fn replace_in_expression(
        &self,
        replace_fn: &impl Fn(&Expression, DeBruijnOffset) -> ReplaceResult,
    ) -> Expression {
        self.replace_in_expression_offset(replace_fn, DeBruijnOffset::zero())
    }

    /// Like [`Self::replace_in_expression`] but keeps track of sub-expression de Bruijn index offsets.
    fn replace_in_expression_offset(
        &self,
        replace_fn: &impl Fn(&Expression, DeBruijnOffset) -> ReplaceResult,
        offset: DeBruijnOffset,
    ) -> Expression {
        let replaced = match replace_fn(self, offset) {
            ReplaceResult::Skip => match self.value() {
                ExpressionContents::Variable(_)
                | ExpressionContents::Sort(_)
                | ExpressionContents::Constant(_) => None,
                ExpressionContents::Apply(e) => {
                    let function = e.function.replace_in_expression_offset(replace_fn, offset);
                    let argument = e.argument.replace_in_expression_offset(replace_fn, offset);
                    let is_changed =
                        changed(&[(&function, &e.function), (&argument, &e.argument)]);
                    is_changed.then(|| ExpressionContents::Apply(Apply { function, argument }))
                }
                ExpressionContents::Lambda(e) => {
                    replace_in_binder(e, replace_fn, offset).map(ExpressionContents::Lambda)
                }
                ExpressionContents::Pi(e) => {
                    replace_in_binder(e, replace_fn, offset).map(ExpressionContents::Pi)
                }
                ExpressionContents::Let(e) => {
                    let value = e.value.replace_in_expression_offset(replace_fn, offset);
                    let body = e
                        .body
                        .replace_in_expression_offset(replace_fn, offset.succ());
                    let is_changed = changed(&[(&value, &e.value), (&body, &e.body)]);
                    is_changed.then(|| ExpressionContents::Let(Let { value, body }))
                }
            },
            // We don't try to traverse the sub-expressions of this returned value.
            ReplaceResult::ReplaceWith(replacement) => return replacement,
        };
        match replaced {
            Some(contents) => Expression::new(contents),
            None => self.clone(),
        }
    }

    /// Traverses the expression tree and finds expressions matching the provided predicate.
    /// If any return `true`, the first such expression is returned.
    /// The tree is traversed depth first.
    pub fn find_in_expression(
        &self,
        predicate: &impl Fn(&Expression, DeBruijnOffset) -> bool,
    ) -> Option<&Expression> {
        self.find_in_expression_offset(predicate, DeBruijnOffset::zero())
    }

    fn find_in_expression_offset(
        &self,
        predicate: &impl Fn(&Expression, DeBruijnOffset) -> bool,
        offset: DeBruijnOffset,
    ) -> Option<&Expression> {
        if predicate(self, offset) {
            return Some(self);
        }
        match self.value() {
            ExpressionContents::Variable(_)
            | ExpressionContents::Sort(_)
            | ExpressionContents::Constant(_) => None,
            ExpressionContents::Apply(e) => e
                .function
                .find_in_expression_offset(predicate, offset)
                .or_else(|| e.argument.find_in_expression_offset(predicate, offset)),
            ExpressionContents::Lambda(e) | ExpressionContents::Pi(e) => e
                .domain
                .find_in_expression_offset(predicate, offset)
                .or_else(|| e.body.find_in_expression_offset(predicate, offset.succ())),
            ExpressionContents::Let(e) => e
                .value
                .find_in_expression_offset(predicate, offset)
                .or_else(|| e.body.find_in_expression_offset(predicate, offset.succ())),
        }
    }

    /// Calls `func` on every sub-expression, including `self`, depth first.
    pub fn for_each_expression(&self, func: &mut impl FnMut(&Expression, DeBruijnOffset)) {
        self.for_each_expression_offset(func, DeBruijnOffset::zero())
    }

    fn for_each_expression_offset(
        &self,
        func: &mut impl FnMut(&Expression, DeBruijnOffset),
        offset: DeBruijnOffset,
    ) {
        func(self, offset);
        match self.value() {
            ExpressionContents::Variable(_)
            | ExpressionContents::Sort(_)
            | ExpressionContents::Constant(_) => {}
            ExpressionContents::Apply(e) => {
                e.function.for_each_expression_offset(func, offset);
                e.argument.for_each_expression_offset(func, offset);
            }
            ExpressionContents::Lambda(e) | ExpressionContents::Pi(e) => {
                e.domain.for_each_expression_offset(func, offset);
                e.body.for_each_expression_offset(func, offset.succ());
            }
            ExpressionContents::Let(e) => {
                e.value.for_each_expression_offset(func, offset);
                e.body.for_each_expression_offset(func, offset.succ());
            }
        }
    }

    /// Returns true if the free variable given by `local` appears in this expression.
    #[must_use]
    pub fn has_variable(&self, local: DeBruijnIndex) -> bool {
        self.find_in_expression(&|inner, offset| {
            matches!(inner.value(), ExpressionContents::Variable(index) if *index == local + offset)
        })
        .is_some()
    }

    /// Instantiate the first bound variable with the given substitution.
    /// This will subtract one from all higher de Bruijn indices.
    #[must_use]
    pub fn instantiate(&self, substitution: &Expression) -> Expression {
        self.replace_in_expression(&|e, offset| {
            if e.first_free_variable_index() <= DeBruijnIndex::zero() + offset {
                // Nothing in here refers to the variable being instantiated or anything above it.
                return ReplaceResult::ReplaceWith(e.clone());
            }
            match e.value() {
                ExpressionContents::Variable(index) => {
                    match index.cmp(&(DeBruijnIndex::zero() + offset)) {
                        Ordering::Less => ReplaceResult::Skip,
                        Ordering::Equal => {
                            // This is exactly the variable we need to substitute.
                            ReplaceResult::ReplaceWith(substitution.lift_free_vars(offset))
                        }
                        Ordering::Greater => {
                            // This index must be decremented, since we just instantiated a variable below it.
                            ReplaceResult::ReplaceWith(Expression::new(
                                ExpressionContents::Variable(index.pred()),
                            ))
                        }
                    }
                }
                _ => ReplaceResult::Skip,
            }
        })
    }

    /// Increase the de Bruijn indices of free variables by a certain offset.
    #[must_use]
    pub fn lift_free_vars(&self, shift: DeBruijnOffset) -> Expression {
        if shift == DeBruijnOffset::zero() {
            return self.clone();
        }
        self.replace_in_expression(&|e, offset| {
            if e.first_free_variable_index() <= DeBruijnIndex::zero() + offset {
                return ReplaceResult::ReplaceWith(e.clone());
            }
            match e.value() {
                ExpressionContents::Variable(index) if *index >= DeBruijnIndex::zero() + offset => {
                    ReplaceResult::ReplaceWith(Expression::new(ExpressionContents::Variable(
                        *index + shift,
                    )))
                }
                _ => ReplaceResult::Skip,
            }
        })
    }

    /// Replace the given list of universe parameters with the given arguments.
    /// The lists should be the same length.
    #[must_use]
    pub fn instantiate_universe_parameters(&self, params: &[Name], levels: &[Level]) -> Expression {
        if params.is_empty() {
            return self.clone();
        }
        self.replace_in_expression(&|e, _offset| match e.value() {
            ExpressionContents::Sort(level) => ReplaceResult::ReplaceWith(Expression::sort(
                level.instantiate_params(params, levels),
            )),
            ExpressionContents::Constant(constant) => {
                ReplaceResult::ReplaceWith(Expression::new(ExpressionContents::Constant(
                    Constant {
                        name: constant.name.clone(),
                        levels: constant
                            .levels
                            .iter()
                            .map(|level| level.instantiate_params(params, levels))
                            .collect(),
                    },
                )))
            }
            _ => ReplaceResult::Skip,
        })
    }

    /// The set of universe parameters mentioned anywhere in this expression.
    pub fn universe_params(&self) -> BTreeSet<Name> {
        let mut result = BTreeSet::new();
        self.for_each_expression(&mut |e, _offset| {
            let mut insert = |name: &Name| {
                result.insert(name.clone());
            };
            match e.value() {
                ExpressionContents::Sort(level) => level.for_each_param(&mut insert),
                ExpressionContents::Constant(constant) => {
                    for level in &constant.levels {
                        level.for_each_param(&mut insert);
                    }
                }
                _ => {}
            }
        });
        result
    }
}

/// Returns true if any of the new expressions differ from the old ones.
fn changed(pairs: &[(&Expression, &Expression)]) -> bool {
    pairs.iter().any(|(new, old)| !new.ptr_eq(old))
}

fn replace_in_binder(
    binder: &Binder,
    replace_fn: &impl Fn(&Expression, DeBruijnOffset) -> ReplaceResult,
    offset: DeBruijnOffset,
) -> Option<Binder> {
    let domain = binder.domain.replace_in_expression_offset(replace_fn, offset);
    let body = binder
        .body
        .replace_in_expression_offset(replace_fn, offset.succ());
    let is_changed = changed(&[(&domain, &binder.domain), (&body, &binder.body)]);
    is_changed.then(|| Binder { domain, body })
}
