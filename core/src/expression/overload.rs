//! Overload resolution (TryGetFunction).

use tracing::trace;

use super::expr::ExprRef;
use super::parser::ExpressionParser;
use crate::diagnostics::{Context, ErrorKind};
use crate::resolver::Signature;
use crate::syntax::Anchor;
use crate::types::Declaration;

/// The overload a call bound to, with its arguments converted to the
/// parameter types.
pub struct Resolved<'a> {
    pub function: Declaration,
    pub signature: Signature,
    pub arguments: &'a [ExprRef<'a>],
}

impl<'a> ExpressionParser<'a> {
    /// Total cost of passing `arguments` to `signature`, or `None` when
    /// one of them does not convert.
    fn measure_call(&self, signature: &Signature, arguments: &[ExprRef<'a>]) -> Option<u32> {
        if signature.parameters.len() != arguments.len() {
            return None;
        }
        arguments
            .iter()
            .zip(&signature.parameters)
            .try_fold(0u32, |total, (argument, parameter)| {
                self.measure(*argument, parameter)
                    .map(|cost| total.saturating_add(cost))
            })
    }

    fn candidate_contexts(&self, candidates: &[Declaration], anchor: &Anchor) -> Vec<Context> {
        candidates
            .iter()
            .map(|candidate| Context::Candidate {
                signature: self.resolver().describe(candidate),
                anchor: anchor.clone(),
            })
            .collect()
    }

    /// Picks the cheapest candidate for `arguments`.
    ///
    /// Reports `AmbiguousFunction` naming every tied candidate when two or
    /// more share the lowest cost, and `FunctionNotFound` when none
    /// accepts the arguments.
    pub(crate) fn resolve_overload(
        &mut self,
        name: &str,
        anchor: &Anchor,
        candidates: &[Declaration],
        arguments: &[ExprRef<'a>],
    ) -> Option<Resolved<'a>> {
        let mut best_cost = u32::MAX;
        let mut best: Vec<(Declaration, Signature)> = Vec::new();
        for candidate in candidates {
            let Some(signature) = self.resolver().signature(candidate) else {
                continue;
            };
            let Some(cost) = self.measure_call(&signature, arguments) else {
                continue;
            };
            trace!(name, cost, candidate = %self.resolver().describe(candidate), "Overload candidate");
            if cost < best_cost {
                best_cost = cost;
                best.clear();
            }
            if cost == best_cost {
                best.push((*candidate, signature));
            }
        }

        match best.len() {
            0 => {
                let context = self.candidate_contexts(candidates, anchor);
                self.diagnostics.report_with(
                    anchor,
                    ErrorKind::FunctionNotFound {
                        name: name.to_string(),
                    },
                    &context,
                );
                None
            }
            1 => {
                let (function, signature) = best.pop()?;
                let mut converted = Vec::with_capacity(arguments.len());
                for (argument, parameter) in arguments.iter().zip(&signature.parameters) {
                    converted.push(self.try_assignment_convert(*argument, parameter)?);
                }
                Some(Resolved {
                    function,
                    signature,
                    arguments: self.alloc_exprs(&converted),
                })
            }
            _ => {
                let tied: Vec<Declaration> = best.iter().map(|(d, _)| *d).collect();
                let context = self.candidate_contexts(&tied, anchor);
                let names = tied.iter().map(|d| self.resolver().describe(d)).collect();
                self.diagnostics.report_with(
                    anchor,
                    ErrorKind::AmbiguousFunction {
                        name: name.to_string(),
                        candidates: names,
                    },
                    &context,
                );
                None
            }
        }
    }
}
