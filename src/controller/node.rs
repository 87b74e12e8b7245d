//! The transition protocol.

use super::Controller;
use crate::error::TransitionError;
use crate::metrics;
use crate::router::{format_state_list, RouterState, StateSegment};
use crate::telemetry::{spans, TransitionTimer};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, info, warn, Instrument};

/// Move the tree under `root` to `target`.
///
/// Controllers whose state is off the target path are left first, innermost
/// first. Stateless controllers along the path are then entered outermost
/// first, each `enter` completing before its child is considered. A failed
/// `enter` is cleaned up with `leave` on the failing controller and aborts
/// the transition; controllers above it keep their new state.
pub async fn transition(
    root: &mut dyn Controller,
    target: &[StateSegment],
    upgrade: bool,
) -> Result<(), TransitionError> {
    let target_text = format_state_list(target);
    let _timer = TransitionTimer::new(target_text.clone());

    async {
        leave_diverged(root, target, 0, true);
        enter_missing(root, target, 0, upgrade).await?;
        metrics::record_transition(&target_text);
        info!("transition complete");
        Ok(())
    }
    .instrument(spans::transition(&target_text, upgrade))
    .await
}

fn leave_diverged(node: &mut dyn Controller, target: &[StateSegment], depth: usize, ancestors_kept: bool) {
    let kept = ancestors_kept && depth < target.len() && node.path() == Some(&target[..=depth]);

    if let Some(child) = node.child() {
        leave_diverged(child, target, depth + 1, kept);
    }

    if !kept {
        if let Some(path) = node.path() {
            debug!(controller = node.name(), state = %format_state_list(path), "leave");
            node.leave();
        }
    }
}

fn enter_missing<'a>(
    node: &'a mut dyn Controller,
    target: &'a [StateSegment],
    depth: usize,
    upgrade: bool,
) -> BoxFuture<'a, Result<(), TransitionError>> {
    async move {
        if depth >= target.len() {
            return Ok(());
        }

        if node.path().is_none() {
            let path = target[..=depth].to_vec();
            debug!(controller = node.name(), state = %target[depth], upgrade, "enter");
            if let Err(e) = node.enter(path, upgrade).await {
                node.leave();
                metrics::record_transition_error(e.error_code());
                warn!(controller = node.name(), error = %e, "enter failed; transition aborted");
                return Err(e);
            }
        }

        match node.child() {
            Some(child) => enter_missing(child, target, depth + 1, upgrade).await,
            None => Ok(()),
        }
    }
    .boxed()
}

/// Path of the deepest controller holding a state.
pub fn current_path(root: &dyn Controller) -> RouterState {
    let mut path = RouterState::new();
    let mut node = Some(root);
    while let Some(current) = node {
        match current.path() {
            Some(p) => path = p.to_vec(),
            None => break,
        }
        node = current.child_ref();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::unknown_state;
    use crate::router::parse_state_list;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        path: Option<RouterState>,
        log: Log,
        child: Option<Box<Recording>>,
    }

    impl Recording {
        fn chain(log: &Log) -> Self {
            let leaf = Recording {
                name: "leaf",
                path: None,
                log: Arc::clone(log),
                child: None,
            };
            let middle = Recording {
                name: "middle",
                path: None,
                log: Arc::clone(log),
                child: Some(Box::new(leaf)),
            };
            Recording {
                name: "root",
                path: None,
                log: Arc::clone(log),
                child: Some(Box::new(middle)),
            }
        }
    }

    #[async_trait]
    impl Controller for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn path(&self) -> Option<&[StateSegment]> {
            self.path.as_deref()
        }

        async fn enter(&mut self, path: RouterState, _upgrade: bool) -> Result<(), TransitionError> {
            let state = path.last().cloned().unwrap_or_else(|| StateSegment::name(""));
            if state.is("broken") {
                return Err(unknown_state(self.name, &state));
            }
            tokio::task::yield_now().await;
            self.log.lock().push(format!("enter {}", format_state_list(&path)));
            self.path = Some(path);
            Ok(())
        }

        fn leave(&mut self) {
            if let Some(path) = self.path.take() {
                self.log.lock().push(format!("leave {}", format_state_list(&path)));
            }
        }

        fn child(&mut self) -> Option<&mut dyn Controller> {
            self.child.as_deref_mut().map(|c| c as &mut dyn Controller)
        }

        fn child_ref(&self) -> Option<&dyn Controller> {
            self.child.as_deref().map(|c| c as &dyn Controller)
        }
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock())
    }

    #[tokio::test]
    async fn leaves_innermost_first_and_enters_outermost_first() {
        let log = Log::default();
        let mut root = Recording::chain(&log);

        transition(&mut root, &parse_state_list("page/home/none"), false).await.unwrap();
        assert_eq!(drain(&log), vec!["enter page", "enter page/home", "enter page/home/none"]);

        transition(&mut root, &parse_state_list("page/home/edit"), false).await.unwrap();
        assert_eq!(drain(&log), vec!["leave page/home/none", "enter page/home/edit"]);

        // Same target again: nothing happens.
        transition(&mut root, &parse_state_list("page/home/edit"), false).await.unwrap();
        assert!(drain(&log).is_empty());

        transition(&mut root, &parse_state_list("page/@acme/none"), false).await.unwrap();
        assert_eq!(
            drain(&log),
            vec![
                "leave page/home/edit",
                "leave page/home",
                "enter page/@acme",
                "enter page/@acme/none",
            ]
        );
        assert_eq!(current_path(&root), parse_state_list("page/@acme/none"));

        transition(&mut root, &[], false).await.unwrap();
        assert_eq!(drain(&log), vec!["leave page/@acme/none", "leave page/@acme", "leave page"]);
        assert!(current_path(&root).is_empty());
    }

    #[tokio::test]
    async fn every_enter_is_matched_by_one_leave() {
        let log = Log::default();
        let mut root = Recording::chain(&log);
        let targets = [
            "page/home/none",
            "page/home/submit",
            "page/@x/none",
            "page/home/edit",
            "page/home/none",
            "page",
            "page/@y/none",
        ];
        for target in targets {
            transition(&mut root, &parse_state_list(target), false).await.unwrap();
        }
        transition(&mut root, &[], false).await.unwrap();

        let entries = drain(&log);
        let mut open: Vec<&str> = Vec::new();
        for entry in &entries {
            match entry.split_once(' ') {
                Some(("enter", path)) => {
                    assert!(!open.contains(&path), "double enter of {path}");
                    open.push(path);
                }
                Some(("leave", path)) => {
                    let at = open.iter().position(|p| *p == path).expect("leave without enter");
                    open.remove(at);
                }
                _ => unreachable!(),
            }
        }
        assert!(open.is_empty(), "never left: {open:?}");
    }

    #[tokio::test]
    async fn failed_enter_aborts_and_leaves_failing_controller_stateless() {
        let log = Log::default();
        let mut root = Recording::chain(&log);

        let err = transition(&mut root, &parse_state_list("page/broken/none"), false)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "unknown_state");
        assert_eq!(drain(&log), vec!["enter page"]);
        assert_eq!(current_path(&root), parse_state_list("page"));

        // The tree is still usable.
        transition(&mut root, &parse_state_list("page/home/none"), false).await.unwrap();
        assert_eq!(drain(&log), vec!["enter page/home", "enter page/home/none"]);
    }
}
