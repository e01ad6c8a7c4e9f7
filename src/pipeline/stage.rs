//! Stage trait and successor wiring.

use crate::models::SubmissionContext;
use async_trait::async_trait;
use std::fmt;

/// One step of the submission pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logging and for positioning custom stages
    fn name(&self) -> &'static str;

    /// Process the context. Call the successor to continue, or return to stop.
    async fn handle(&self, ctx: SubmissionContext) -> SubmissionContext;

    /// Wire the stage that runs after this one
    fn set_next(&mut self, next: Box<dyn Stage>);
}

/// Link to the next stage. The end of the chain returns the context as-is.
#[derive(Default)]
pub struct Successor(Option<Box<dyn Stage>>);

impl Successor {
    pub fn set(&mut self, next: Box<dyn Stage>) {
        self.0 = Some(next);
    }

    pub fn is_linked(&self) -> bool {
        self.0.is_some()
    }

    pub async fn forward(&self, ctx: SubmissionContext) -> SubmissionContext {
        match &self.0 {
            Some(next) => next.handle(ctx).await,
            None => ctx,
        }
    }
}

impl fmt::Debug for Successor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(next) => write!(f, "Successor({})", next.name()),
            None => f.write_str("Successor(end)"),
        }
    }
}

/// Link stages in order and return the head of the chain
pub fn link_stages(stages: Vec<Box<dyn Stage>>) -> Option<Box<dyn Stage>> {
    let mut next: Option<Box<dyn Stage>> = None;
    for mut stage in stages.into_iter().rev() {
        if let Some(successor) = next.take() {
            stage.set_next(successor);
        }
        next = Some(stage);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestPayload;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        next: Successor,
    }

    #[async_trait]
    impl Stage for Recording {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn handle(&self, ctx: SubmissionContext) -> SubmissionContext {
            self.log.lock().push(self.label);
            self.next.forward(ctx).await
        }

        fn set_next(&mut self, next: Box<dyn Stage>) {
            self.next.set(next);
        }
    }

    fn recording(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Box<dyn Stage> {
        Box::new(Recording {
            label,
            log: Arc::clone(log),
            next: Successor::default(),
        })
    }

    #[tokio::test]
    async fn test_linked_stages_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let head = link_stages(vec![
            recording("a", &log),
            recording("b", &log),
            recording("c", &log),
        ])
        .unwrap();

        assert_eq!(head.name(), "a");
        head.handle(SubmissionContext::new(RequestPayload::default()))
            .await;
        assert_eq!(*log.lock(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unlinked_successor_returns_context_unchanged() {
        let successor = Successor::default();
        assert!(!successor.is_linked());

        let ctx = SubmissionContext::new(RequestPayload::default());
        let returned = successor.forward(ctx.clone()).await;
        assert_eq!(returned, ctx);
    }

    #[test]
    fn test_empty_chain_has_no_head() {
        assert!(link_stages(Vec::new()).is_none());
    }
}
