//! # Scheduler 模块
//!
//! 单线程协作式定时器队列。
//!
//! ## 设计说明
//!
//! - 时间由 Host 提供（毫秒时间戳），Scheduler 自身不读取真实时钟
//! - 到期的定时器按（到期时间, 插入顺序）逐个弹出，回调之间不会交错
//! - 弹出时 `now` 设为该定时器的到期时间，回调内新建的延迟都相对于这一刻
//! - 周期任务在弹出时即重新排队（`due + period`），回调可以用同一个句柄取消自己
//! - 每个周期任务都有显式句柄；`TaskSlot` 保证同一资源最多一个任务在运行

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// 毫秒时间戳
pub type Timestamp = u64;

/// 定时任务句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(u64);

/// 已排队的任务
#[derive(Debug)]
struct Entry<E> {
    handle: TaskHandle,
    event: E,
    /// 周期（毫秒），`None` 表示一次性
    period: Option<u64>,
}

/// 到期弹出的任务
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<E> {
    pub handle: TaskHandle,
    pub at: Timestamp,
    pub event: E,
}

/// 定时器队列
#[derive(Debug)]
pub struct Scheduler<E> {
    now: Timestamp,
    next_handle: u64,
    next_seq: u64,
    /// (到期时间, 插入序号) -> 任务
    queue: BTreeMap<(Timestamp, u64), Entry<E>>,
    /// 句柄 -> 队列键
    index: HashMap<TaskHandle, (Timestamp, u64)>,
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_handle: 1,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// 当前时间
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// 在 `delay_ms` 之后触发一次
    pub fn once(&mut self, delay_ms: u64, event: E) -> TaskHandle {
        let handle = self.allocate_handle();
        self.insert(self.now + delay_ms, handle, event, None);
        handle
    }

    /// 每隔 `period_ms` 触发一次，首次在一个周期之后
    pub fn every(&mut self, period_ms: u64, event: E) -> TaskHandle {
        let period = period_ms.max(1);
        let handle = self.allocate_handle();
        self.insert(self.now + period, handle, event, Some(period));
        handle
    }

    /// 取消任务
    ///
    /// 句柄未知或任务已结束时返回 `false`。
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.index.remove(&handle) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    /// 排队中的任务数
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    /// 最早的到期时间
    pub fn next_due(&self) -> Option<Timestamp> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// 弹出一个在 `until` 之前（含）到期的任务
    pub fn pop_due(&mut self, until: Timestamp) -> Option<Fired<E>> {
        let key = *self.queue.keys().next()?;
        if key.0 > until {
            return None;
        }

        let entry = self.queue.remove(&key)?;
        self.index.remove(&entry.handle);
        self.now = self.now.max(key.0);

        if let Some(period) = entry.period {
            let due = key.0 + period;
            self.insert(due, entry.handle, entry.event.clone(), Some(period));
        }

        Some(Fired {
            handle: entry.handle,
            at: key.0,
            event: entry.event,
        })
    }

    /// 推进时钟（不会倒退）
    pub fn advance_to(&mut self, now: Timestamp) {
        self.now = self.now.max(now);
    }

    fn allocate_handle(&mut self) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn insert(&mut self, due: Timestamp, handle: TaskHandle, event: E, period: Option<u64>) {
        let key = (due, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(
            key,
            Entry {
                handle,
                event,
                period,
            },
        );
        self.index.insert(handle, key);
    }
}

/// 单个资源的任务槽
///
/// `None` 表示没有任务在运行。替换前总是先取消旧任务。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSlot(Option<TaskHandle>);

impl TaskSlot {
    pub fn is_running(&self) -> bool {
        self.0.is_some()
    }

    /// 是否为当前槽中的任务
    pub fn owns(&self, handle: TaskHandle) -> bool {
        self.0 == Some(handle)
    }

    /// 放入新任务，返回被取消的旧句柄
    pub fn replace<E: Clone>(
        &mut self,
        scheduler: &mut Scheduler<E>,
        handle: TaskHandle,
    ) -> Option<TaskHandle> {
        let stale = self.0.take();
        if let Some(old) = stale {
            scheduler.cancel(old);
        }
        self.0 = Some(handle);
        stale
    }

    /// 取消并清空
    pub fn stop<E: Clone>(&mut self, scheduler: &mut Scheduler<E>) -> bool {
        match self.0.take() {
            Some(handle) => {
                scheduler.cancel(handle);
                true
            }
            None => false,
        }
    }
}
