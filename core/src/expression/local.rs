use hashbrown::HashMap;

use crate::syntax::Anchor;
use crate::types::CompilingType;

/// A local variable of the function being compiled.
///
/// Indices are unique per function frame; block scopes only affect
/// which names are visible.
#[derive(Debug, Clone, PartialEq)]
pub struct Local<'a> {
    pub anchor: Anchor,
    pub name: &'a str,
    pub index: u32,
    pub ty: CompilingType,
}

/// An outer local copied into a lambda frame when the closure is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture<'a> {
    pub outer: Local<'a>,
    pub inner: Local<'a>,
}

#[derive(Debug, Default)]
struct Frame<'a> {
    scopes: Vec<HashMap<&'a str, Local<'a>>>,
    locals: Vec<Local<'a>>,
    captures: Vec<Capture<'a>>,
}

impl<'a> Frame<'a> {
    fn new() -> Self {
        Frame {
            scopes: vec![HashMap::new()],
            ..Default::default()
        }
    }

    fn lookup(&self, name: &str) -> Option<&Local<'a>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn add(&mut self, name: &'a str, anchor: Anchor, ty: CompilingType) -> Local<'a> {
        let local = Local {
            anchor,
            name,
            index: self.locals.len() as u32,
            ty,
        };
        self.locals.push(local.clone());
        local
    }
}

/// Everything a finished frame declared.
#[derive(Debug, Default)]
pub struct FrameLocals<'a> {
    pub locals: Vec<Local<'a>>,
    pub captures: Vec<Capture<'a>>,
}

/// Stack of per-function frames, each a stack of per-block symbol maps.
///
/// The bottom frame is the function being compiled; lambda bodies push a
/// frame of their own. Reading a local of an enclosing frame captures it.
#[derive(Debug)]
pub struct LocalContext<'a> {
    frames: Vec<Frame<'a>>,
}

impl Default for LocalContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> LocalContext<'a> {
    pub fn new() -> Self {
        LocalContext {
            frames: vec![Frame::new()],
        }
    }

    fn frame(&mut self) -> &mut Frame<'a> {
        self.frames
            .last_mut()
            .expect("local context always has a frame")
    }

    pub fn push_scope(&mut self) {
        self.frame().scopes.push(HashMap::new());
    }

    /// Closes the innermost scope and returns its named locals in index
    /// order.
    pub fn pop_scope(&mut self) -> Vec<Local<'a>> {
        let frame = self.frame();
        debug_assert!(frame.scopes.len() > 1, "popping the frame's base scope");
        let mut locals: Vec<Local<'a>> = frame
            .scopes
            .pop()
            .map(|scope| scope.into_values().collect())
            .unwrap_or_default();
        locals.sort_by_key(|local| local.index);
        locals
    }

    /// Declares `name` in the innermost scope with a fresh index.
    ///
    /// Fails with the existing local when the innermost scope already has
    /// that name.
    pub fn add_local(
        &mut self,
        name: &'a str,
        anchor: Anchor,
        ty: CompilingType,
    ) -> Result<Local<'a>, Local<'a>> {
        let frame = self.frame();
        if let Some(existing) = frame.scopes.last().and_then(|s| s.get(name)) {
            return Err(existing.clone());
        }
        let local = frame.add(name, anchor, ty);
        if let Some(scope) = frame.scopes.last_mut() {
            scope.insert(name, local.clone());
        }
        Ok(local)
    }

    /// Finds `name`, capturing it through every lambda frame in between
    /// when it belongs to an enclosing frame.
    pub fn find(&mut self, name: &str) -> Option<Local<'a>> {
        let top = self.frames.len() - 1;
        let owner = (0..=top)
            .rev()
            .find(|&i| self.frames[i].lookup(name).is_some())?;
        let mut local = self.frames[owner].lookup(name)?.clone();
        for i in owner + 1..=top {
            let frame = &mut self.frames[i];
            let inner = frame.add(local.name, local.anchor.clone(), local.ty);
            frame.scopes[0].insert(local.name, inner.clone());
            frame.captures.push(Capture {
                outer: local,
                inner: inner.clone(),
            });
            local = inner;
        }
        Some(local)
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::new());
    }

    pub fn pop_frame(&mut self) -> FrameLocals<'a> {
        debug_assert!(self.frames.len() > 1, "popping the function frame");
        let frame = self.frames.pop().unwrap_or_default();
        FrameLocals {
            locals: frame.locals,
            captures: frame.captures,
        }
    }

    /// Locals declared so far in the innermost frame, in index order.
    pub fn locals(&self) -> &[Local<'a>] {
        self.frames.last().map_or(&[], |f| &f.locals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shadowing_allocates_fresh_index() {
        let mut context = LocalContext::new();
        let a = context
            .add_local("a", Anchor::default(), CompilingType::INTEGER)
            .unwrap();
        context.push_scope();
        let inner = context
            .add_local("a", Anchor::default(), CompilingType::REAL)
            .unwrap();
        assert_eq!((a.index, inner.index), (0, 1));
        assert_eq!(context.find("a").unwrap().ty, CompilingType::REAL);
        context.pop_scope();
        assert_eq!(context.find("a").unwrap().index, 0);
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let mut context = LocalContext::new();
        context
            .add_local("a", Anchor::default(), CompilingType::INTEGER)
            .unwrap();
        let err = context
            .add_local("a", Anchor::default(), CompilingType::BOOL)
            .unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn test_capture_through_lambda_frames() {
        let mut context = LocalContext::new();
        context
            .add_local("n", Anchor::default(), CompilingType::INTEGER)
            .unwrap();
        context.push_frame();
        context.push_frame();
        let inner = context.find("n").unwrap();
        assert_eq!(inner.index, 0);
        // A second lookup reuses the capture.
        assert_eq!(context.find("n").unwrap(), inner);
        let innermost = context.pop_frame();
        let middle = context.pop_frame();
        assert_eq!(innermost.captures.len(), 1);
        assert_eq!(middle.captures.len(), 1);
        assert_eq!(innermost.captures[0].outer, middle.captures[0].inner);
    }
}
