//! Ordered transform chain.
//!
//! Transforms run strictly one after another over the shared
//! [`BuildContext`]. The first failure stops the chain; nothing after it runs.

use super::{BuildContext, BuildError};
use anyhow::Result;

/// A named stage of the build.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &mut BuildContext) -> Result<()>;
}

/// Adapter turning a closure into a [`Transform`].
#[cfg(test)]
struct FnTransform<F> {
    name: &'static str,
    f: F,
}

#[cfg(test)]
impl<F> Transform for FnTransform<F>
where
    F: Fn(&mut BuildContext) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        (self.f)(ctx)
    }
}

/// Ordered list of transforms.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Box<dyn Transform>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform.
    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.stages.push(Box::new(transform));
        self
    }

    /// Append a closure as a named transform.
    #[cfg(test)]
    pub fn with_fn<F>(self, name: &'static str, f: F) -> Self
    where
        F: Fn(&mut BuildContext) -> Result<()> + Send + Sync + 'static,
    {
        self.with(FnTransform { name, f })
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        for stage in &self.stages {
            stage.apply(ctx).map_err(|source| BuildError::Transform {
                name: stage.name(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FileMap, FileRecord, Metadata};
    use anyhow::bail;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn marker(ctx: &mut BuildContext, name: &str) {
        ctx.files.insert(format!("{name}.marker"), FileRecord::default());
    }

    #[test]
    fn test_stages_run_in_order_and_see_earlier_mutations() {
        let chain = Chain::new()
            .with_fn("first", |ctx| {
                let mut metadata = Metadata::new();
                metadata.insert("step".into(), json!(1));
                ctx.files.insert("a.md", FileRecord::new("a", metadata));
                Ok(())
            })
            .with_fn("second", |ctx| {
                let record = ctx.files.get_mut("a.md").expect("inserted by first");
                let step = record.metadata["step"].as_i64().unwrap_or(0);
                record.metadata.insert("step".into(), json!(step + 1));
                Ok(())
            });

        let mut ctx = BuildContext::default();
        chain.run(&mut ctx).unwrap();
        assert_eq!(ctx.files.get("a.md").unwrap().metadata["step"], json!(2));
    }

    #[test]
    fn test_failure_short_circuits_remaining_stages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let after = Arc::clone(&calls);

        let chain = Chain::new()
            .with_fn("one", |ctx| {
                marker(ctx, "one");
                Ok(())
            })
            .with_fn("two", |_| bail!("boom"))
            .with_fn("three", move |ctx| {
                after.fetch_add(1, Ordering::SeqCst);
                marker(ctx, "three");
                Ok(())
            });

        let mut ctx = BuildContext::new(FileMap::new(), Default::default());
        let err = chain.run(&mut ctx).unwrap_err();

        assert!(matches!(err, BuildError::Transform { name: "two", .. }));
        assert!(ctx.files.contains("one.marker"));
        assert!(!ctx.files.contains("three.marker"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_chain_succeeds() {
        let mut ctx = BuildContext::default();
        assert!(Chain::new().run(&mut ctx).is_ok());
    }

    #[test]
    fn test_names_follow_insertion_order() {
        let chain = Chain::new()
            .with_fn("a", |_| Ok(()))
            .with_fn("b", |_| Ok(()));
        assert_eq!(chain.names(), ["a", "b"]);
    }
}
