//! # GalSim Server
//!
//! 对话会话服务：创建会话、推进回合、查询会话信息。
//!
//! 会话状态保存在 [`galsim_session::SessionStore`] 中，台词由可替换的
//! [`engine::DialogueEngine`] 生成，好感度变化由 [`affection`] 中的规则计算。

pub mod affection;
pub mod engine;
pub mod error;
pub mod logging;
pub mod server;
pub mod service;

pub use engine::{DialogueEngine, EngineError, EngineResult, ScriptedEngine, Utterance};
pub use error::{ApiError, ApiResult};
pub use server::{create_router, run_server, serve, AppState, ServerConfig};
pub use service::{DialogueService, ThemeSource};
