use std::fmt;
use std::sync::Arc;

/// One entry of an [`Agent`](super::Agent)'s instruction list: either a
/// fixed string or a function of the caller-supplied context value (§4.6
/// step 2). Resolved fresh at the start of every turn, since a dynamic
/// instruction may read context state the caller mutated between turns.
pub enum Instruction<C> {
    Static(String),
    Dynamic(Arc<dyn Fn(&C) -> String + Send + Sync>),
}

impl<C> Instruction<C> {
    pub fn text(text: impl Into<String>) -> Self {
        Instruction::Static(text.into())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&C) -> String + Send + Sync + 'static,
    {
        Instruction::Dynamic(Arc::new(f))
    }

    pub(crate) fn resolve(&self, context: &C) -> String {
        match self {
            Instruction::Static(text) => text.clone(),
            Instruction::Dynamic(f) => f(context),
        }
    }
}

impl<C> Clone for Instruction<C> {
    fn clone(&self) -> Self {
        match self {
            Instruction::Static(text) => Instruction::Static(text.clone()),
            Instruction::Dynamic(f) => Instruction::Dynamic(Arc::clone(f)),
        }
    }
}

impl<C> fmt::Debug for Instruction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Instruction::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<fn>").finish(),
        }
    }
}
