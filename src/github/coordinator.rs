use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::try_join;

use crate::error::{Error, Result};
use crate::github::cancel::CancelScope;
use crate::github::source::ProfileSource;
use crate::models::ProfileData;

struct Outstanding {
    id: u64,
    scope: CancelScope,
}

/// Resolves handles into `(profile, repositories)` snapshots, keeping at most
/// one resolution outstanding. Starting a new resolution cancels the previous
/// one, whose result is then discarded.
pub struct RequestCoordinator<S> {
    source: S,
    current: Mutex<Option<Outstanding>>,
    next_id: AtomicU64,
}

impl<S: ProfileSource> RequestCoordinator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns `Ok(None)` when the handle is blank or this call was superseded
    /// before it finished. A superseded call never reports an error.
    pub async fn resolve(&self, handle: &str) -> Result<Option<ProfileData>> {
        let handle = handle.trim();
        if handle.is_empty() {
            tracing::debug!("Ignoring blank handle");
            return Ok(None);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let scope = CancelScope::new();
        let token = scope.token();

        let previous = self.slot().replace(Outstanding { id, scope });
        let pending = Pending {
            current: &self.current,
            id: Some(id),
        };
        if let Some(previous) = previous {
            tracing::debug!("Resolution #{} superseded by #{}", previous.id, id);
            previous.scope.cancel();
        }

        tracing::info!("Resolving profile for: {}", handle);
        let result = token
            .run(try_join(
                self.source.fetch_profile(handle, &token),
                self.source.fetch_repositories(handle, &token),
            ))
            .await;

        let owned = pending.release();
        if !owned || token.is_cancelled() {
            tracing::debug!("Discarding result of superseded resolution #{}", id);
            return Ok(None);
        }

        match result {
            Ok((user, repos)) => {
                tracing::info!("Resolved {} with {} repositories", user.login, repos.len());
                Ok(Some(ProfileData { user, repos }))
            }
            Err(Error::Cancelled) => Ok(None),
            Err(e) => {
                tracing::debug!("Resolution #{} for {} failed: {}", id, handle, e);
                Err(e)
            }
        }
    }

    pub fn cancel_pending(&self) {
        if let Some(outstanding) = self.slot().take() {
            tracing::debug!("Cancelling resolution #{}", outstanding.id);
            outstanding.scope.cancel();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.slot().is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn slot(&self) -> MutexGuard<'_, Option<Outstanding>> {
        lock(&self.current)
    }
}

/// Frees the slot for call `id` when released or dropped, but only while the
/// slot still holds that call.
struct Pending<'a> {
    current: &'a Mutex<Option<Outstanding>>,
    id: Option<u64>,
}

impl Pending<'_> {
    fn release(mut self) -> bool {
        self.take()
    }

    fn take(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        let mut slot = lock(self.current);
        if slot.as_ref().is_some_and(|o| o.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.take();
    }
}

fn lock(current: &Mutex<Option<Outstanding>>) -> MutexGuard<'_, Option<Outstanding>> {
    current.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::cancel::CancelToken;
    use crate::models::{GitHubUser, Repository};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Clone)]
    enum Script {
        /// Never completes on its own; only cancellation ends it.
        Hang,
        /// Completes once `gate` is notified.
        Gated,
        Ok,
        Fail(u16),
    }

    #[derive(Default)]
    struct FakeSource {
        profile: HashMap<String, Script>,
        repos: HashMap<String, Script>,
        started: Notify,
        gate: Notify,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn script(mut self, handle: &str, profile: Script, repos: Script) -> Self {
            self.profile.insert(handle.to_string(), profile);
            self.repos.insert(handle.to_string(), repos);
            self
        }

        async fn play<T>(&self, script: Option<&Script>, token: &CancelToken, value: T) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            match script.cloned().unwrap_or(Script::Fail(404)) {
                Script::Hang => token.run(std::future::pending()).await,
                Script::Gated => {
                    self.gate.notified().await;
                    Ok(value)
                }
                Script::Ok => Ok(value),
                Script::Fail(404) => Err(Error::NotFound("scripted".into())),
                Script::Fail(status) => Err(Error::Upstream { status }),
            }
        }
    }

    #[async_trait]
    impl ProfileSource for FakeSource {
        async fn fetch_profile(&self, handle: &str, token: &CancelToken) -> Result<GitHubUser> {
            self.play(self.profile.get(handle), token, user(handle)).await
        }

        async fn fetch_repositories(&self, handle: &str, token: &CancelToken) -> Result<Vec<Repository>> {
            self.play(self.repos.get(handle), token, vec![repo(handle)]).await
        }
    }

    fn user(login: &str) -> GitHubUser {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        GitHubUser {
            login: login.to_string(),
            id: 1,
            avatar_url: String::new(),
            html_url: format!("https://github.com/{}", login),
            name: None,
            company: None,
            blog: None,
            location: None,
            email: None,
            bio: None,
            twitter_username: None,
            public_repos: 1,
            followers: 0,
            following: 0,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn repo(owner: &str) -> Repository {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Repository {
            id: 7,
            name: "demo".to_string(),
            full_name: format!("{}/demo", owner),
            html_url: String::new(),
            description: None,
            fork: false,
            language: None,
            stargazers_count: 0,
            forks_count: 0,
            updated_at: ts,
            pushed_at: Some(ts),
            topics: Vec::new(),
            size: 0,
        }
    }

    #[tokio::test]
    async fn test_resolve_returns_both_halves() {
        let coordinator =
            RequestCoordinator::new(FakeSource::default().script("octocat", Script::Ok, Script::Ok));

        let data = coordinator.resolve("  octocat ").await.unwrap().unwrap();
        assert_eq!(data.user.login, "octocat");
        assert_eq!(data.repos.len(), 1);
        assert_eq!(data.repos[0].full_name, "octocat/demo");
        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_blank_handle_is_a_no_op() {
        let coordinator = RequestCoordinator::new(FakeSource::default());

        assert!(coordinator.resolve("").await.unwrap().is_none());
        assert!(coordinator.resolve("   \t").await.unwrap().is_none());
        assert_eq!(coordinator.source().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_either_failure_fails_the_whole_resolution() {
        let source = FakeSource::default()
            .script("norepos", Script::Ok, Script::Fail(500))
            .script("noprofile", Script::Fail(404), Script::Hang);
        let coordinator = RequestCoordinator::new(source);

        let err = coordinator.resolve("norepos").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 500 }));

        // The hanging repository call is dropped once the profile call fails.
        let err = coordinator.resolve("noprofile").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_newer_resolve_supersedes_outstanding_one() {
        let source = FakeSource::default()
            .script("a", Script::Hang, Script::Hang)
            .script("b", Script::Ok, Script::Ok);
        let coordinator = Arc::new(RequestCoordinator::new(source));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.resolve("a").await }
        });

        coordinator.source().started.notified().await;
        assert!(coordinator.has_pending());

        let second = coordinator.resolve("b").await.unwrap().unwrap();
        assert_eq!(second.user.login, "b");

        let first = first.await.unwrap();
        assert!(matches!(first, Ok(None)), "superseded call surfaced {:?}", first);
        assert!(!coordinator.has_pending());
    }

    #[tokio::test]
    async fn test_superseded_failure_is_not_surfaced() {
        let source = FakeSource::default()
            .script("a", Script::Hang, Script::Hang)
            .script("b", Script::Fail(404), Script::Ok);
        let coordinator = Arc::new(RequestCoordinator::new(source));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.resolve("a").await }
        });
        coordinator.source().started.notified().await;

        let second = coordinator.resolve("b").await;
        assert!(matches!(second, Err(Error::NotFound(_))));
        assert!(matches!(first.await.unwrap(), Ok(None)));
    }

    #[tokio::test]
    async fn test_completed_call_is_not_cancelled_by_next_one() {
        let source = FakeSource::default()
            .script("a", Script::Ok, Script::Ok)
            .script("b", Script::Ok, Script::Ok);
        let coordinator = RequestCoordinator::new(source);

        let first = coordinator.resolve("a").await.unwrap();
        assert!(!coordinator.has_pending());
        let second = coordinator.resolve("b").await.unwrap();

        assert_eq!(first.unwrap().user.login, "a");
        assert_eq!(second.unwrap().user.login, "b");
    }

    #[tokio::test]
    async fn test_cancel_pending_discards_outstanding_call() {
        let source = FakeSource::default().script("a", Script::Hang, Script::Hang);
        let coordinator = Arc::new(RequestCoordinator::new(source));

        let pending = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.resolve("a").await }
        });
        coordinator.source().started.notified().await;

        coordinator.cancel_pending();
        assert!(!coordinator.has_pending());
        assert!(matches!(pending.await.unwrap(), Ok(None)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_call_that_lost_the_slot_discards_its_result() {
        let source = FakeSource::default().script("a", Script::Gated, Script::Ok);
        let coordinator = Arc::new(RequestCoordinator::new(source));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.resolve("a").await }
        });
        coordinator.source().started.notified().await;

        // A newer call has taken the slot but not yet cancelled "a".
        let newer = coordinator.slot().replace(Outstanding {
            id: u64::MAX,
            scope: CancelScope::new(),
        });
        assert!(newer.is_some());

        coordinator.source().gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, Ok(None)), "superseded call surfaced {:?}", first);

        // The newer call's slot is left alone.
        assert!(coordinator.slot().as_ref().is_some_and(|o| o.id == u64::MAX));
    }

    #[tokio::test]
    async fn test_dropped_resolution_frees_the_slot() {
        let source = FakeSource::default()
            .script("a", Script::Hang, Script::Hang)
            .script("b", Script::Ok, Script::Ok);
        let coordinator = RequestCoordinator::new(source);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), coordinator.resolve("a")).await;
        assert!(timed_out.is_err());
        assert!(!coordinator.has_pending());

        let next = coordinator.resolve("b").await.unwrap();
        assert_eq!(next.unwrap().user.login, "b");
    }
}
