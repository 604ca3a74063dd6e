use crate::application::ports::{RetryPrompt, ToggleGateway, ViewerSession};
use crate::domain::entities::{ToggleIntentState, ToggleSnapshot};
use crate::domain::value_objects::{ToggleTarget, ViewerId};
use crate::shared::config::ToggleConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// トグルコントローラーが利用する外部依存
#[derive(Clone)]
pub struct ToggleDeps {
    pub gateway: Arc<dyn ToggleGateway>,
    pub session: Arc<dyn ViewerSession>,
    pub retry_prompt: Arc<dyn RetryPrompt>,
}

/// いいね/ブックマークの楽観的トグル。
///
/// `toggle()` は表示状態を即座に反転してデバウンス後の同期を予約するだけで、
/// ネットワークを待たない。同期処理は `desired` と `server_confirmed` を比較し、
/// 差分があるときだけ最新の `desired` を 1 回書き込む。同一エンティティに対する
/// 書き込みは常に高々 1 件しか走らない。
#[derive(Clone)]
pub struct ToggleController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    target: ToggleTarget,
    deps: ToggleDeps,
    config: ToggleConfig,
    state: Mutex<ControllerState>,
    display_tx: watch::Sender<ToggleSnapshot>,
}

struct ControllerState {
    intent: ToggleIntentState,
    // デバウンスタイマーの世代。新しい操作で古いタイマーを無効化する
    generation: u64,
    viewer: Option<ViewerId>,
}

impl ToggleController {
    pub fn new(
        target: ToggleTarget,
        initial: ToggleSnapshot,
        deps: ToggleDeps,
        config: ToggleConfig,
    ) -> Self {
        let initial = if target.kind.has_counter() {
            initial
        } else {
            ToggleSnapshot::flag(initial.active)
        };
        let (display_tx, _) = watch::channel(initial);
        Self {
            inner: Arc::new(ControllerInner {
                target,
                deps,
                config,
                state: Mutex::new(ControllerState {
                    intent: ToggleIntentState::new(initial),
                    generation: 0,
                    viewer: None,
                }),
                display_tx,
            }),
        }
    }

    pub fn target(&self) -> &ToggleTarget {
        &self.inner.target
    }

    pub fn display(&self) -> ToggleSnapshot {
        *self.inner.display_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ToggleSnapshot> {
        self.inner.display_tx.subscribe()
    }

    pub async fn is_settled(&self) -> bool {
        self.inner.state.lock().await.intent.is_settled()
    }

    /// 表示を反転し、デバウンス後の同期を予約する。
    pub async fn toggle(&self) -> Result<ToggleSnapshot, AppError> {
        let viewer = self
            .inner
            .deps
            .session
            .current_viewer()
            .ok_or(AppError::Unauthenticated)?;

        let (snapshot, generation) = {
            let mut state = self.inner.state.lock().await;
            state.viewer = Some(viewer);
            state.intent.flip();
            state.generation += 1;
            (state.intent.display(), state.generation)
        };

        self.inner.publish(snapshot);
        let active = snapshot.active;
        debug!(
            target_entity = %self.inner.target,
            active,
            generation,
            "toggle intent recorded"
        );
        ControllerInner::schedule(&self.inner, generation, self.inner.config.debounce());
        Ok(snapshot)
    }

    /// デバウンスを待たずに同期する（画面を閉じる時など）
    pub async fn flush(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.generation += 1;
        }
        self.inner.reconcile().await;
    }

    /// サーバー上の状態を読み直して採用する。未同期の操作がある間は何もしない。
    pub async fn refresh_from_server(&self) -> Result<ToggleSnapshot, AppError> {
        let viewer = self
            .inner
            .deps
            .session
            .current_viewer()
            .ok_or(AppError::Unauthenticated)?;
        let present = self
            .inner
            .deps
            .gateway
            .fetch_presence(&self.inner.target, &viewer)
            .await?;

        let display = {
            let mut state = self.inner.state.lock().await;
            if !state.intent.is_settled() {
                return Ok(state.intent.display());
            }
            state.intent.adopt_server_state(ToggleSnapshot::flag(present));
            state.viewer = Some(viewer);
            state.intent.display()
        };
        self.inner.publish(display);
        Ok(display)
    }
}

impl ToggleController {
    /// 未同期の操作がなければ、再読み込みした一覧などから得たサーバー状態を採用する。
    /// 採用した場合は `true`。
    pub async fn adopt_if_settled(&self, server: ToggleSnapshot) -> bool {
        let server = if self.inner.target.kind.has_counter() {
            server
        } else {
            ToggleSnapshot::flag(server.active)
        };
        let snapshot = {
            let mut state = self.inner.state.lock().await;
            if !state.intent.is_settled() {
                return false;
            }
            state.intent.adopt_server_state(server);
            state.intent.display()
        };
        self.inner.publish(snapshot);
        true
    }
}

impl ControllerInner {
    fn publish(&self, display: ToggleSnapshot) {
        self.display_tx.send_replace(display);
    }

    fn schedule(inner: &Arc<Self>, generation: u64, delay: Duration) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if inner.state.lock().await.generation != generation {
                return;
            }
            inner.reconcile().await;
        });
    }

    async fn reconcile(self: &Arc<Self>) {
        loop {
            let (active, viewer) = {
                let mut state = self.state.lock().await;
                let Some(viewer) = state.viewer.clone() else {
                    return;
                };
                match state.intent.begin_write() {
                    Some(active) => (active, viewer),
                    None => return,
                }
            };

            debug!(target_entity = %self.target, active, "persisting toggle");
            match self.persist(active, &viewer).await {
                Ok(()) => {
                    let (diverged, generation, display) = {
                        let mut state = self.state.lock().await;
                        state.intent.complete_success(active);
                        (
                            state.intent.has_diverged(),
                            state.generation,
                            state.intent.display(),
                        )
                    };
                    self.publish(display);
                    if diverged {
                        info!(
                            target_entity = %self.target,
                            persisted = active,
                            "intent changed while writing; scheduling follow-up"
                        );
                        Self::schedule(self, generation, self.config.follow_up());
                    }
                    return;
                }
                Err(err) => {
                    let (abandoned, display) = {
                        let mut state = self.state.lock().await;
                        let abandoned = state.intent.complete_failure();
                        (abandoned, state.intent.display())
                    };
                    self.publish(display);

                    let Some(intent) = abandoned else {
                        debug!(
                            target_entity = %self.target,
                            error = %err,
                            "write failed but intent already matches server state"
                        );
                        return;
                    };
                    warn!(
                        target_entity = %self.target,
                        error = %err,
                        "toggle write failed; reverted to server state"
                    );

                    if !self.deps.retry_prompt.confirm_retry(&self.target, &err).await {
                        return;
                    }

                    let display = {
                        let mut state = self.state.lock().await;
                        if !state.intent.is_settled() {
                            // 確認中に新しい操作があった。そちらのタイマーに任せる
                            return;
                        }
                        state.intent.set_desired(intent);
                        state.generation += 1;
                        state.intent.display()
                    };
                    self.publish(display);
                    info!(target_entity = %self.target, active = intent, "retrying toggle write");
                }
            }
        }
    }

    async fn persist(&self, active: bool, viewer: &ViewerId) -> Result<(), AppError> {
        let gateway = &self.deps.gateway;
        let result = if active {
            gateway.insert_record(&self.target, viewer).await
        } else {
            gateway.delete_record(&self.target, viewer).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_already_applied(active) => {
                debug!(
                    target_entity = %self.target,
                    error = %err,
                    "record already in requested state"
                );
                Ok(())
            }
            Err(err) => Err(err.into_write_failure()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DeclineRetry;
    use crate::domain::value_objects::{DiscussionId, EntityId, ToggleKind};
    use async_trait::async_trait;
    use mockall::{mock, predicate::*};

    mock! {
        pub Gateway {}

        #[async_trait]
        impl ToggleGateway for Gateway {
            async fn fetch_presence(&self, target: &ToggleTarget, viewer: &ViewerId) -> Result<bool, AppError>;
            async fn insert_record(&self, target: &ToggleTarget, viewer: &ViewerId) -> Result<(), AppError>;
            async fn delete_record(&self, target: &ToggleTarget, viewer: &ViewerId) -> Result<(), AppError>;
        }
    }

    struct FixedSession(Option<ViewerId>);

    impl ViewerSession for FixedSession {
        fn current_viewer(&self) -> Option<ViewerId> {
            self.0.clone()
        }

        fn access_token(&self) -> Option<String> {
            None
        }
    }

    fn viewer() -> ViewerId {
        ViewerId::new("viewer-1").unwrap()
    }

    fn like_target() -> ToggleTarget {
        ToggleTarget::discussion_like(&DiscussionId::new("d-1").unwrap())
    }

    fn controller(gateway: MockGateway, session: Option<ViewerId>) -> ToggleController {
        ToggleController::new(
            like_target(),
            ToggleSnapshot::new(false, Some(3)),
            ToggleDeps {
                gateway: Arc::new(gateway),
                session: Arc::new(FixedSession(session)),
                retry_prompt: Arc::new(DeclineRetry),
            },
            ToggleConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn unauthenticated_toggle_changes_nothing() {
        let mut gateway = MockGateway::new();
        gateway.expect_insert_record().times(0);
        gateway.expect_delete_record().times(0);
        let controller = controller(gateway, None);

        let result = controller.toggle().await;

        assert_eq!(result, Err(AppError::Unauthenticated));
        assert_eq!(controller.display(), ToggleSnapshot::new(false, Some(3)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(controller.is_settled().await);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_insert_counts_as_success() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_insert_record()
            .with(eq(like_target()), eq(viewer()))
            .times(1)
            .returning(|_, _| Err(AppError::Conflict("duplicate key".into())));
        let controller = controller(gateway, Some(viewer()));

        controller.toggle().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(controller.is_settled().await);
        assert_eq!(controller.display(), ToggleSnapshot::new(true, Some(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_skips_debounce_window() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_insert_record()
            .times(1)
            .returning(|_, _| Ok(()));
        let controller = controller(gateway, Some(viewer()));

        controller.toggle().await.unwrap();
        controller.flush().await;
        assert!(controller.is_settled().await);

        // 予約済みタイマーは世代が変わっているので再送しない
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn refresh_adopts_server_presence_when_settled() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_fetch_presence()
            .times(1)
            .returning(|_, _| Ok(true));
        let controller = controller(gateway, Some(viewer()));

        let display = controller.refresh_from_server().await.unwrap();
        assert_eq!(display, ToggleSnapshot::new(true, Some(3)));
        assert_eq!(controller.display(), display);
    }

    #[tokio::test(start_paused = true)]
    async fn adopt_if_settled_skips_pending_intent() {
        let mut gateway = MockGateway::new();
        gateway.expect_insert_record().times(0);
        gateway.expect_delete_record().times(0);
        let controller = controller(gateway, Some(viewer()));

        assert!(controller.adopt_if_settled(ToggleSnapshot::new(true, Some(6))).await);
        assert_eq!(controller.display(), ToggleSnapshot::new(true, Some(6)));

        // 取り消しの意図が残っている間は上書きしない
        controller.toggle().await.unwrap();
        assert!(!controller.adopt_if_settled(ToggleSnapshot::new(false, Some(5))).await);
        assert_eq!(controller.display(), ToggleSnapshot::new(false, Some(5)));

        // 確定済みの true/6 を起点に戻ったので書き込みは発生しない
        controller.toggle().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.display(), ToggleSnapshot::new(true, Some(6)));
    }

    #[test]
    fn bookmark_controllers_drop_counter() {
        let target = ToggleTarget::new(
            ToggleKind::DiscussionBookmark,
            EntityId::new("d-1").unwrap(),
        );
        let controller = ToggleController::new(
            target,
            ToggleSnapshot::new(true, Some(10)),
            ToggleDeps {
                gateway: Arc::new(MockGateway::new()),
                session: Arc::new(FixedSession(None)),
                retry_prompt: Arc::new(DeclineRetry),
            },
            ToggleConfig::default(),
        );
        assert_eq!(controller.display(), ToggleSnapshot::flag(true));
    }
}
