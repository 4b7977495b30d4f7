use crate::pipeline::pipeline::StageEntry;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

/// 链路快照与纪元的组合存储。
///
/// # 设计背景（Why）
/// - 结构变更采用"复制-替换"策略：读取方拿到的永远是一份不可变快照，
///   派发无需与变更互斥；纪元值单调递增，供诊断与指标观察结构演进。
///
/// # 逻辑解析（How）
/// - `spin::RwLock<Arc<Vec<_>>>` 中只存一个 `Arc` 指针，`load` 克隆指针后
///   立即释放读锁，临界区极短；
/// - 先 [`store`](Self::store) 新快照再 [`bump_epoch`](Self::bump_epoch)，
///   观察到新纪元的一方必然能读到不旧于该纪元的快照。
pub(crate) struct ChainEpochBuffer {
    chain: spin::RwLock<Arc<Vec<Arc<StageEntry>>>>,
    epoch: AtomicU64,
}

impl ChainEpochBuffer {
    pub(crate) fn new(initial: Arc<Vec<Arc<StageEntry>>>) -> Self {
        Self {
            chain: spin::RwLock::new(initial),
            epoch: AtomicU64::new(0),
        }
    }

    /// 取当前快照。
    pub(crate) fn load(&self) -> Arc<Vec<Arc<StageEntry>>> {
        Arc::clone(&self.chain.read())
    }

    /// 发布新快照。
    pub(crate) fn store(&self, next: Arc<Vec<Arc<StageEntry>>>) {
        *self.chain.write() = next;
    }

    /// 当前纪元值。
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// 纪元自增，返回新值。
    pub(crate) fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}
