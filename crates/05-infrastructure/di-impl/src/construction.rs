//! 跨线程构造跟踪
//!
//! 记录每个正在构造的共享实例（单例或作用域实例）由哪个线程负责，
//! 以及每个线程正在等待哪个实例。线程在阻塞等待其他线程的构造之前
//! 沿等待图检查，若最终回到自己则说明存在跨线程循环依赖。

use hearth_common::ServiceKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::{self, ThreadId};
use uuid::Uuid;

/// 共享实例单元的标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellId {
    scope: Option<Uuid>,
    key: ServiceKey,
}

impl CellId {
    pub(crate) fn singleton(key: ServiceKey) -> Self {
        Self { scope: None, key }
    }

    pub(crate) fn scoped(scope: Uuid, key: ServiceKey) -> Self {
        Self {
            scope: Some(scope),
            key,
        }
    }
}

#[derive(Default)]
struct TrackerState {
    owners: HashMap<CellId, ThreadId>,
    waiting: HashMap<ThreadId, CellId>,
}

#[derive(Default)]
pub(crate) struct ConstructionTracker {
    state: Mutex<TrackerState>,
}

impl ConstructionTracker {
    /// 登记当前线程将等待 `cell`
    ///
    /// 等待会形成环时返回环上的服务键（从 `cell` 开始，到当前线程持有的单元为止）。
    pub(crate) fn begin_wait(&self, cell: CellId) -> Result<WaitGuard<'_>, Vec<ServiceKey>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        let mut path = vec![cell.key];
        let mut next = cell;
        while let Some(&owner) = state.owners.get(&next) {
            if owner == me {
                return Err(path);
            }
            let Some(&waited) = state.waiting.get(&owner) else {
                break;
            };
            if path.len() > state.owners.len() {
                break;
            }
            path.push(waited.key);
            next = waited;
        }

        state.waiting.insert(me, cell);
        Ok(WaitGuard {
            tracker: self,
            thread: me,
            cell,
        })
    }

    /// 登记当前线程开始构造 `cell`
    pub(crate) fn begin_construct(&self, cell: CellId) -> ConstructGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        state.waiting.remove(&me);
        state.owners.insert(cell, me);
        ConstructGuard { tracker: self, cell }
    }
}

pub(crate) struct WaitGuard<'a> {
    tracker: &'a ConstructionTracker,
    thread: ThreadId,
    cell: CellId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.tracker.state.lock();
        if state.waiting.get(&self.thread) == Some(&self.cell) {
            state.waiting.remove(&self.thread);
        }
    }
}

pub(crate) struct ConstructGuard<'a> {
    tracker: &'a ConstructionTracker,
    cell: CellId,
}

impl Drop for ConstructGuard<'_> {
    fn drop(&mut self) {
        self.tracker.state.lock().owners.remove(&self.cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Left;
    struct Right;

    #[test]
    fn waiting_on_own_cell_is_a_cycle() {
        let tracker = ConstructionTracker::default();
        let left = CellId::singleton(ServiceKey::of::<Left>());

        let _constructing = tracker.begin_construct(left);
        let path = tracker.begin_wait(left).err().unwrap();
        assert_eq!(path, vec![ServiceKey::of::<Left>()]);
    }

    #[test]
    fn cross_thread_wait_cycle_is_reported() {
        let tracker = ConstructionTracker::default();
        let left = CellId::singleton(ServiceKey::of::<Left>());
        let right = CellId::singleton(ServiceKey::of::<Right>());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let _constructing = tracker.begin_construct(left);
        let tracker = &tracker;
        thread::scope(|s| {
            s.spawn(move || {
                let _other = tracker.begin_construct(right);
                let _wait = tracker.begin_wait(left).unwrap();
                ready_tx.send(()).unwrap();
                done_rx.recv().unwrap();
            });

            let done = done_tx;
            ready_rx.recv().unwrap();
            let path = tracker.begin_wait(right).err().unwrap();
            assert_eq!(path, vec![ServiceKey::of::<Right>(), ServiceKey::of::<Left>()]);
            done.send(()).unwrap();
        });
    }

    #[test]
    fn guards_release_their_entries() {
        let tracker = ConstructionTracker::default();
        let left = CellId::singleton(ServiceKey::of::<Left>());
        {
            let _constructing = tracker.begin_construct(left);
        }
        let wait = tracker.begin_wait(left);
        assert!(wait.is_ok());
        drop(wait);

        let state = tracker.state.lock();
        assert!(state.owners.is_empty());
        assert!(state.waiting.is_empty());
    }
}
