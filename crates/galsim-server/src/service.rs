//! 对话服务：开始会话、推进回合、查询会话
//!
//! 与 HTTP 无关，路由层只做 JSON 编解码。

use std::sync::Arc;

use galsim_core::{
    DialogueRequest, DialogueResponse, SessionInfo, StartRequest, StartResponse, AUTO_THEME,
};
use galsim_session::{Message, SessionStore};
use tracing::{info, warn};

use crate::affection::affection_delta;
use crate::engine::DialogueEngine;
use crate::error::{ApiError, ApiResult};

/// 主题的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSource {
    /// 由引擎挑选
    Auto,
    /// 玩家指定
    Given(String),
}

impl ThemeSource {
    /// `custom_theme` 优先；`theme == "auto"` 由引擎挑选；两者都缺失时拒绝
    pub fn resolve(request: &StartRequest) -> ApiResult<Self> {
        let custom = request
            .custom_theme
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(custom) = custom {
            return Ok(ThemeSource::Given(custom.to_string()));
        }

        match request.theme.as_deref().map(str::trim) {
            Some(AUTO_THEME) => Ok(ThemeSource::Auto),
            Some(theme) if !theme.is_empty() => Ok(ThemeSource::Given(theme.to_string())),
            _ => Err(ApiError::InvalidTheme(
                "either theme=\"auto\" or a non-empty custom_theme is required".to_string(),
            )),
        }
    }
}

#[derive(Clone)]
pub struct DialogueService {
    store: Arc<SessionStore>,
    engine: Arc<dyn DialogueEngine>,
    context_window: usize,
}

impl DialogueService {
    pub fn new(
        store: Arc<SessionStore>,
        engine: Arc<dyn DialogueEngine>,
        context_window: usize,
    ) -> Self {
        Self {
            store,
            engine,
            context_window: context_window.max(1),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// 开始新对话
    pub async fn start(&self, request: StartRequest) -> ApiResult<StartResponse> {
        let theme = match ThemeSource::resolve(&request)? {
            ThemeSource::Auto => self.engine.pick_theme().await?,
            ThemeSource::Given(theme) => theme,
        };

        // 先生成开场白，失败时不留下空会话
        let opening = self.engine.opening(&theme).await?;

        let created = self.store.create(theme)?;
        let mut session = self.store.lock(created.session_id()).await?;
        session.add_message(Message::character(opening.text.clone()));
        session.offer_choices(opening.choices.clone());

        info!(
            "Started dialogue session: {} with theme: {}",
            session.session_id(),
            session.theme()
        );

        Ok(StartResponse {
            session_id: session.session_id().to_string(),
            theme: session.theme().to_string(),
            affection: session.affection(),
            initial_dialogue: opening.text,
            choices: opening.choices,
        })
    }

    /// 推进一个回合；引擎失败时会话保持不变
    pub async fn advance(&self, request: DialogueRequest) -> ApiResult<DialogueResponse> {
        if request.session_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("session_id is required".to_string()));
        }
        let user_input = request.user_input.trim();
        if user_input.is_empty() {
            return Err(ApiError::InvalidRequest("user_input is required".to_string()));
        }

        let mut session = self.store.lock(&request.session_id).await?;

        let theme = request.theme.trim();
        if !theme.is_empty() && theme != session.theme() {
            warn!(
                "Session {} is bound to theme {:?}, ignoring {:?}",
                session.session_id(),
                session.theme(),
                theme
            );
        }

        let delta = affection_delta(session.choice_position(user_input), user_input);
        let pending = Message::user(user_input);

        let mut context: Vec<Message> =
            session.context(self.context_window - 1).to_vec();
        context.push(pending.clone());

        let reply = self
            .engine
            .reply(session.theme(), &context, user_input)
            .await?;

        let affection = session.apply_affection_delta(delta);
        session.add_message(pending);
        session.add_message(Message::character(reply.text.clone()));
        session.offer_choices(reply.choices.clone());

        info!(
            "Continued dialogue for session: {} (affection {:+} -> {})",
            session.session_id(),
            delta,
            affection
        );

        Ok(DialogueResponse {
            affection,
            character_response: reply.text,
            choices: reply.choices,
        })
    }

    /// 查询会话信息
    pub fn info(&self, session_id: &str) -> ApiResult<SessionInfo> {
        let snapshot = self.store.get(session_id)?;
        Ok(snapshot.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, EngineResult, ScriptedEngine, Utterance};
    use async_trait::async_trait;
    use galsim_session::SessionStoreConfig;

    fn service() -> DialogueService {
        DialogueService::new(
            SessionStore::new(SessionStoreConfig::default()),
            Arc::new(ScriptedEngine::new()),
            10,
        )
    }

    fn auto() -> StartRequest {
        StartRequest {
            theme: Some("auto".to_string()),
            custom_theme: None,
        }
    }

    #[test]
    fn test_theme_resolution() {
        let custom = StartRequest {
            theme: Some("auto".to_string()),
            custom_theme: Some("  Ghost story  ".to_string()),
        };
        assert_eq!(
            ThemeSource::resolve(&custom).unwrap(),
            ThemeSource::Given("Ghost story".to_string())
        );
        assert_eq!(ThemeSource::resolve(&auto()).unwrap(), ThemeSource::Auto);

        let neither = StartRequest {
            theme: None,
            custom_theme: Some("   ".to_string()),
        };
        assert!(matches!(
            ThemeSource::resolve(&neither),
            Err(ApiError::InvalidTheme(_))
        ));
    }

    #[tokio::test]
    async fn test_start_then_advance() {
        let service = service();
        let started = service.start(auto()).await.unwrap();
        assert_eq!(started.affection, 50);
        assert_eq!(started.choices.len(), 4);

        let reply = service
            .advance(DialogueRequest {
                user_input: started.choices[0].clone(),
                session_id: started.session_id.clone(),
                theme: started.theme.clone(),
            })
            .await
            .unwrap();
        assert_eq!(reply.affection, 53);

        let info = service.info(&started.session_id).unwrap();
        assert_eq!(info.history_length, 3);
        assert_eq!(info.theme, started.theme);
    }

    #[tokio::test]
    async fn test_theme_cannot_change() {
        let service = service();
        let started = service.start(auto()).await.unwrap();

        tokio_test::assert_ok!(
            service
                .advance(DialogueRequest {
                    user_input: "Hello".to_string(),
                    session_id: started.session_id.clone(),
                    theme: "Something else".to_string(),
                })
                .await
        );

        let info = service.info(&started.session_id).unwrap();
        assert_eq!(info.theme, started.theme);
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let service = service();
        let err = service
            .advance(DialogueRequest {
                user_input: "Hi".to_string(),
                session_id: "does-not-exist".to_string(),
                theme: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SessionNotFound(_)));
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    struct FailingReplies;

    #[async_trait]
    impl DialogueEngine for FailingReplies {
        async fn pick_theme(&self) -> EngineResult<String> {
            Ok("Test".to_string())
        }

        async fn opening(&self, _theme: &str) -> EngineResult<Utterance> {
            Ok(Utterance::new("Hi", vec!["Wave".to_string()]))
        }

        async fn reply(
            &self,
            _theme: &str,
            _context: &[Message],
            _user_input: &str,
        ) -> EngineResult<Utterance> {
            Err(EngineError::Unavailable("model offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_engine_failure_leaves_session_untouched() {
        let service = DialogueService::new(
            SessionStore::new(SessionStoreConfig::default()),
            Arc::new(FailingReplies),
            10,
        );
        let started = service.start(auto()).await.unwrap();

        let err = service
            .advance(DialogueRequest {
                user_input: "Wave".to_string(),
                session_id: started.session_id.clone(),
                theme: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DIALOGUE_ERROR");

        let info = service.info(&started.session_id).unwrap();
        assert_eq!(info.history_length, 1);
        assert_eq!(info.affection, 50);
    }

    /// Holds every reply until released.
    struct GatedReplies {
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl DialogueEngine for GatedReplies {
        async fn pick_theme(&self) -> EngineResult<String> {
            Ok("Test".to_string())
        }

        async fn opening(&self, _theme: &str) -> EngineResult<Utterance> {
            Ok(Utterance::new("Hi", vec!["Wave".to_string()]))
        }

        async fn reply(
            &self,
            _theme: &str,
            _context: &[Message],
            _user_input: &str,
        ) -> EngineResult<Utterance> {
            self.gate.notified().await;
            Ok(Utterance::new("Hello again", vec!["Wave".to_string()]))
        }
    }

    #[tokio::test]
    async fn test_info_answers_during_turn() {
        let engine = Arc::new(GatedReplies {
            gate: tokio::sync::Notify::new(),
        });
        let service = Arc::new(DialogueService::new(
            SessionStore::new(SessionStoreConfig::default()),
            engine.clone(),
            10,
        ));
        let started = service.start(auto()).await.unwrap();

        let turn = {
            let service = Arc::clone(&service);
            let session_id = started.session_id.clone();
            tokio::spawn(async move {
                service
                    .advance(DialogueRequest {
                        user_input: "Wave".to_string(),
                        session_id,
                        theme: String::new(),
                    })
                    .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!turn.is_finished());

        let info = service.info(&started.session_id).unwrap();
        assert_eq!(info.history_length, 1);

        engine.gate.notify_one();
        tokio_test::assert_ok!(turn.await.unwrap());
        let info = service.info(&started.session_id).unwrap();
        assert_eq!(info.history_length, 3);
    }
}
