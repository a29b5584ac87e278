//! Utility traits such as [Verify], [Named] etc.

use crate::{context::Context, result::Result};

/// Check and ensure correctness.
pub trait Verify {
    fn verify(&self, ctx: &Context) -> Result<()>;
}

/// Anything that has a name, which may or may not have been given by a user.
pub trait Named {
    /// A user given name, if any.
    fn given_name(&self, ctx: &Context) -> Option<String>;
    /// A name that is unique within the [Context].
    fn id(&self, ctx: &Context) -> String;
    /// The name to refer to this object. [Self::given_name] if present,
    /// made unique by appending [Self::id] to it.
    fn unique_name(&self, ctx: &Context) -> String {
        match self.given_name(ctx) {
            Some(given_name) => given_name + "_" + &self.id(ctx),
            None => self.id(ctx),
        }
    }
}
