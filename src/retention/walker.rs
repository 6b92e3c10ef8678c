use std::sync::Arc;

use super::{ProgressSink, RetentionDecider, RetentionError, RetentionResult, RunSummary};
use crate::{
    db::ContentRepo,
    models::Item,
    rules::{ItemFilterOutcome, RuleContext, RuleList},
};

/// Visits every item below a root exactly once, parent before children.
///
/// Traversal uses an explicit stack, so hierarchy depth is bounded by
/// `max_depth` rather than by the call stack.
pub struct TreeWalker {
    content: Arc<dyn ContentRepo>,
    item_rules: Arc<dyn RuleList>,
    decider: RetentionDecider,
    progress: Arc<dyn ProgressSink>,
    max_depth: usize,
}

impl TreeWalker {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        item_rules: Arc<dyn RuleList>,
        decider: RetentionDecider,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let max_depth = decider.settings().max_depth;
        Self {
            content,
            item_rules,
            decider,
            progress,
            max_depth,
        }
    }

    /// Walk the subtree rooted at `root`.
    pub async fn walk(&self, root: Item, summary: &mut RunSummary) -> RetentionResult<()> {
        let mut stack = vec![(root, 0usize)];

        while let Some((item, depth)) = stack.pop() {
            self.visit(&item, summary).await?;

            let children = self.content.children(&item).await?;
            if children.is_empty() {
                continue;
            }
            if depth >= self.max_depth {
                return Err(RetentionError::DepthExceeded {
                    path: item.path,
                    max_depth: self.max_depth,
                });
            }
            // Reversed so the first child is popped first
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        Ok(())
    }

    async fn visit(&self, item: &Item, summary: &mut RunSummary) -> RetentionResult<()> {
        self.progress.processed(1);
        self.progress.message(&format!("processing: {}", item.path));
        summary.items_visited += 1;

        let mut ctx = RuleContext::for_item(item);
        self.item_rules.run(&mut ctx)?;
        let directives = ItemFilterOutcome::from_context(&ctx);

        if directives.valid_for_version_removal {
            summary.items_matched += 1;
            self.decider
                .trim_item_versions(item, &directives, summary)
                .await?;
        }

        Ok(())
    }
}
