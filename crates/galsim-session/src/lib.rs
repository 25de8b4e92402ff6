//! # GalSim Session Store
//!
//! 对话服务端的会话存储。
//!
//! ## 功能特性
//!
//! - **会话分配**：每次开始对话分配全新的 UUID 作为 session_id
//! - **历史追加**：按回合顺序追加，不重排、不删除
//! - **好感度**：由服务端按回合更新，限制在 0..=100
//! - **回合串行**：同一会话的回合通过会话级锁串行执行，会话之间互不共享可变状态
//! - **自动清理**：空闲超时的会话视为不存在，后台任务定期清理
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use galsim_session::{Message, SessionStore, SessionStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SessionStore::new(SessionStoreConfig::default());
//!     let _cleanup = store.start_cleanup_task();
//!
//!     let session = store.create("雨天的图书馆")?;
//!
//!     let mut guard = store.lock(session.session_id()).await?;
//!     guard.add_message(Message::user("你好"));
//!     guard.apply_affection_delta(1);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod types;

pub use error::{SessionError, SessionResult};
pub use store::{SessionGuard, SessionStore, SessionStoreConfig};
pub use types::{Message, SessionRecord, MAX_AFFECTION, MIN_AFFECTION};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
