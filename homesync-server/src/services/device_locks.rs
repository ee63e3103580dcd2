use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes status writes per external device id; distinct devices never wait on each other.
#[derive(Clone, Default)]
pub struct DeviceLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, external_id: &str) -> DeviceLockGuard {
        let mutex = self
            .locks
            .entry(external_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        DeviceLockGuard {
            external_id: external_id.to_string(),
            locks: self.locks.clone(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct DeviceLockGuard {
    external_id: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DeviceLockGuard {
    fn drop(&mut self) {
        // Only the table and this guard hold the mutex: nobody is waiting, forget the entry.
        self.locks
            .remove_if(&self.external_id, |_, mutex| Arc::strong_count(mutex) <= 2);
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_device_is_serialized() {
        let locks = DeviceLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let inside = inside.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("dev1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_devices_do_not_block() {
        let locks = DeviceLocks::new();

        let _lamp = locks.lock("dev1").await;
        let plug = tokio::time::timeout(Duration::from_millis(100), locks.lock("dev2")).await;

        assert!(plug.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
