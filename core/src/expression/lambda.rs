use tracing::debug;

use super::expr::{BlurryLambda, ExprRef, ExpressionKind, LambdaFunction};
use super::parser::ExpressionParser;
use crate::diagnostics::ErrorKind;
use crate::types::CompilingType;

impl<'a> ExpressionParser<'a> {
    /// Compiles a blurry lambda once its delegate type `target` is known.
    ///
    /// The body is parsed in a frame of its own; outer locals it reads
    /// become captures copied in when the closure is created.
    pub(crate) fn compile_lambda(
        &mut self,
        expr: ExprRef<'a>,
        lambda: &BlurryLambda<'a>,
        target: &CompilingType,
    ) -> Option<ExprRef<'a>> {
        let signature = self.delegate_signature(target)?;
        debug_assert_eq!(signature.parameters.len(), lambda.parameters.len());

        self.locals.push_frame();
        let mut failed = false;
        for (name, ty) in lambda.parameters.iter().zip(&signature.parameters) {
            if self.locals.add_local(*name, expr.anchor.clone(), *ty).is_err() {
                self.report(
                    &expr.anchor,
                    ErrorKind::DuplicateLocal {
                        name: name.to_string(),
                    },
                );
                failed = true;
            }
        }
        let body = if failed {
            None
        } else {
            self.try_parse(lambda.body)
                .and_then(|body| self.convert_lambda_body(body, &signature.returns))
        };
        // The frame is popped on every path so the enclosing function
        // keeps resolving its own locals.
        let frame = self.locals.pop_frame();
        let body = body?;

        let function = self.lambdas.len() as u32;
        debug!(
            function,
            parameters = lambda.parameters.len(),
            captures = frame.captures.len(),
            "Compiled lambda"
        );
        let captures = self.arena().alloc_slice_clone(&frame.captures);
        self.lambdas.push(LambdaFunction {
            anchor: expr.anchor.clone(),
            delegate: target.definition,
            parameters: lambda.parameters.len(),
            returns: self.arena().alloc_slice_copy(&signature.returns),
            locals: frame.locals,
            captures: frame.captures,
            body,
        });
        Some(self.node(
            expr.anchor.clone(),
            &[*target],
            ExpressionKind::LambdaCreate { function, captures },
        ))
    }

    fn convert_lambda_body(
        &mut self,
        body: ExprRef<'a>,
        returns: &[CompilingType],
    ) -> Option<ExprRef<'a>> {
        match returns {
            [] => Some(body),
            [ty] => self.try_assignment_convert(body, ty),
            _ => {
                let items: &[ExprRef<'a>] = match &body.kind {
                    ExpressionKind::Tuple(items) => items,
                    _ => core::slice::from_ref(&body),
                };
                let anchor = body.anchor.clone();
                let items = self.try_assignment_convert_tuple(items, returns, &anchor)?;
                Some(self.node(anchor, returns, ExpressionKind::Tuple(items)))
            }
        }
    }
}
