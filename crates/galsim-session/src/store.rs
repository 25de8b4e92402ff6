//! # Session Store
//!
//! 管理对话会话的内存存储：
//! - 分配全新的 session_id
//! - 按会话加锁，串行化同一会话的并发回合
//! - 空闲超时后视为不存在，并由后台任务清理

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::types::SessionRecord;

/// SessionStore 配置
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// 空闲超时
    pub ttl: Duration,
    /// 清理间隔
    pub cleanup_interval: Duration,
    /// 初始好感度
    pub initial_affection: i64,
    /// 最大会话数
    pub max_sessions: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),              // 1小时超时
            cleanup_interval: Duration::from_secs(300), // 5分钟清理一次
            initial_affection: 50,
            max_sessions: 10_000,
        }
    }
}

impl SessionStoreConfig {
    /// 设置空闲超时
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// 设置清理间隔
    pub fn with_cleanup_interval(mut self, every: Duration) -> Self {
        self.cleanup_interval = every;
        self
    }

    /// 设置初始好感度
    pub fn with_initial_affection(mut self, affection: i64) -> Self {
        self.initial_affection = affection;
        self
    }

    /// 设置最大会话数
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }
}

/// 单个会话：可变记录加上最近一次提交的快照
struct SessionSlot {
    record: Arc<Mutex<SessionRecord>>,
    committed: Arc<RwLock<SessionRecord>>,
}

impl SessionSlot {
    fn new(record: SessionRecord) -> Self {
        Self {
            committed: Arc::new(RwLock::new(record.clone())),
            record: Arc::new(Mutex::new(record)),
        }
    }

    fn committed(&self) -> Option<SessionRecord> {
        self.committed.read().ok().map(|record| record.clone())
    }
}

/// 被锁定的会话，持有期间同一会话的其他回合会等待
///
/// 释放时把修改发布为新的快照，`get` 只读快照，不等待锁。
#[derive(Debug)]
pub struct SessionGuard {
    record: OwnedMutexGuard<SessionRecord>,
    committed: Arc<RwLock<SessionRecord>>,
}

impl Deref for SessionGuard {
    type Target = SessionRecord;

    fn deref(&self) -> &SessionRecord {
        &self.record
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut SessionRecord {
        &mut self.record
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        match self.committed.write() {
            Ok(mut committed) => *committed = self.record.clone(),
            Err(_) => warn!("Snapshot lock poisoned for session {}", self.record.session_id()),
        }
    }
}

/// SessionStore
pub struct SessionStore {
    config: SessionStoreConfig,
    sessions: DashMap<String, SessionSlot>,
    /// 已占用的名额；先预留再插入，上限检查与插入之间没有空隙
    reserved: AtomicUsize,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Arc<Self> {
        info!(
            "SessionStore initialized (ttl: {:?}, cleanup every {:?})",
            config.ttl, config.cleanup_interval
        );
        Arc::new(Self {
            config,
            sessions: DashMap::new(),
            reserved: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// 启动后台清理任务；store 被释放后任务自动结束
    pub fn start_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let every = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = interval(every);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    debug!("SessionStore dropped, stopping cleanup task");
                    break;
                };
                let removed = store.cleanup_expired();
                if removed > 0 {
                    info!("Cleaned up {} expired sessions", removed);
                }
            }
        })
    }

    /// 创建新会话，返回创建时的快照
    pub fn create(&self, theme: impl Into<String>) -> SessionResult<SessionRecord> {
        let limit = self.config.max_sessions;
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < limit).then_some(taken + 1)
            })
            .map_err(|_| SessionError::CapacityExceeded { limit })?;

        let mut session_id = uuid::Uuid::new_v4().to_string();
        while self.sessions.contains_key(&session_id) {
            session_id = uuid::Uuid::new_v4().to_string();
        }

        let record = SessionRecord::new(&session_id, theme, self.config.initial_affection);
        self.sessions
            .insert(session_id.clone(), SessionSlot::new(record.clone()));

        info!("Created session: {} (theme: {})", session_id, record.theme());
        Ok(record)
    }

    /// 锁定会话以推进一个回合；过期会话会被移除
    pub async fn lock(&self, session_id: &str) -> SessionResult<SessionGuard> {
        let (record, committed) = self
            .sessions
            .get(session_id)
            .map(|entry| {
                let slot = entry.value();
                (Arc::clone(&slot.record), Arc::clone(&slot.committed))
            })
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;

        let record = record.lock_owned().await;
        if record.is_expired(self.config.ttl) {
            drop(record);
            self.evict(session_id);
            debug!("Session {} expired on access", session_id);
            return Err(SessionError::Expired {
                id: session_id.to_string(),
            });
        }
        Ok(SessionGuard { record, committed })
    }

    /// 获取最近一次提交的会话快照；不等待进行中的回合，也不更新访问时间
    pub fn get(&self, session_id: &str) -> SessionResult<SessionRecord> {
        let (snapshot, idle) = {
            let entry = self.sessions.get(session_id).ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;
            let slot = entry.value();
            let snapshot = slot.committed().ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })?;
            // 锁被占用说明回合正在进行，会话仍然存活
            let idle = slot.record.try_lock().is_ok();
            (snapshot, idle)
        };

        if idle && snapshot.is_expired(self.config.ttl) {
            self.evict(session_id);
            debug!("Session {} expired on access", session_id);
            return Err(SessionError::Expired {
                id: session_id.to_string(),
            });
        }
        Ok(snapshot)
    }

    /// 删除会话
    pub fn delete(&self, session_id: &str) -> bool {
        let removed = self.evict(session_id);
        if removed {
            info!("Deleted session: {}", session_id);
        }
        removed
    }

    /// 移除会话并归还名额
    fn evict(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            self.reserved.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// 清理过期会话，返回清理数量
    ///
    /// 正在进行回合的会话（锁被占用）不会被清理。
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .record
                    .try_lock()
                    .map(|record| record.is_expired(ttl))
                    .unwrap_or(false)
            })
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .iter()
            .filter(|id| self.evict(id))
            .inspect(|id| debug!("Evicted expired session: {}", id))
            .count()
    }

    /// 当前会话数量
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
