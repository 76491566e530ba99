use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::config::AppConfig;
use crate::search::QueryEngine;

/// Index building progress / 索引构建进度
#[derive(Debug, Clone, Serialize)]
pub struct IndexProgress {
    pub is_running: bool,
    pub is_done: bool,
    pub rows_indexed: u64,
    pub tables_indexed: u64,
    pub current_table: Option<String>,
    pub error: Option<String>,
    pub last_done_time: Option<i64>,
}

impl Default for IndexProgress {
    fn default() -> Self {
        Self {
            is_running: false,
            is_done: true,
            rows_indexed: 0,
            tables_indexed: 0,
            current_table: None,
            error: None,
            last_done_time: None,
        }
    }
}

/// Index state management / 索引状态管理
pub struct IndexState {
    pub running: AtomicBool,
    pub rows_indexed: AtomicU64,
    pub tables_indexed: AtomicU64,
    pub progress: RwLock<IndexProgress>,
}

impl IndexState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            rows_indexed: AtomicU64::new(0),
            tables_indexed: AtomicU64::new(0),
            progress: RwLock::new(IndexProgress::default()),
        }
    }

    /// Mark a build as started unless one is already running / 尝试开始构建
    pub fn try_start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.reset();
        true
    }

    fn reset(&self) {
        self.rows_indexed.store(0, Ordering::SeqCst);
        self.tables_indexed.store(0, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = true;
        progress.is_done = false;
        progress.rows_indexed = 0;
        progress.tables_indexed = 0;
        progress.current_table = None;
        progress.error = None;
    }

    pub fn begin_table(&self, table: &str) {
        self.progress.write().current_table = Some(table.to_string());
    }

    pub fn increment(&self) {
        let count = self.rows_indexed.fetch_add(1, Ordering::SeqCst) + 1;
        let mut progress = self.progress.write();
        progress.rows_indexed = count;
    }

    pub fn table_done(&self) {
        let count = self.tables_indexed.fetch_add(1, Ordering::SeqCst) + 1;
        let mut progress = self.progress.write();
        progress.tables_indexed = count;
    }

    pub fn finish(&self, error: Option<String>) {
        self.running.store(false, Ordering::SeqCst);
        let mut progress = self.progress.write();
        progress.is_running = false;
        progress.is_done = error.is_none();
        progress.current_table = None;
        progress.error = error;
        progress.last_done_time = Some(chrono::Utc::now().timestamp());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn get_progress(&self) -> IndexProgress {
        self.progress.read().clone()
    }
}

impl Default for IndexState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    pub config: AppConfig,
    /// Source URL resolved at startup / 启动时解析的源数据库URL
    pub source_url: Option<String>,
    pub engine: RwLock<Arc<QueryEngine>>,
    pub index_state: Arc<IndexState>,
}

impl AppState {
    pub fn new(config: AppConfig, source_url: Option<String>, engine: QueryEngine) -> Self {
        Self {
            config,
            source_url,
            engine: RwLock::new(Arc::new(engine)),
            index_state: Arc::new(IndexState::new()),
        }
    }

    /// Current engine; callers keep using it even if a rebuild swaps it / 获取当前查询引擎
    pub fn engine(&self) -> Arc<QueryEngine> {
        self.engine.read().clone()
    }

    /// Publish the engine of a freshly promoted store / 替换查询引擎
    pub fn replace_engine(&self, engine: QueryEngine) {
        *self.engine.write() = Arc::new(engine);
    }
}
