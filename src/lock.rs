use crate::errors::RegistryError;
use crate::workbook::Workbook;
use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Document-wide mutex around a workbook.
///
/// Every read-check-write sequence that must be atomic (ID allocation plus
/// the row write that consumes the ID, cross-reference lookups plus the
/// mutation they guard) runs while holding the guard returned by
/// [`DocumentLock::lock`]. The guard releases on drop, on every path.
/// Each acquisition first reloads the workbook if another writer saved it.
pub struct DocumentLock<W> {
    inner: Mutex<W>,
    timeout: Duration,
}

pub type DocumentGuard<'a, W> = MutexGuard<'a, W>;

impl<W> DocumentLock<W> {
    pub fn new(workbook: W) -> Self {
        Self::with_timeout(workbook, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_timeout(workbook: W, timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(workbook),
            timeout,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Workbook> DocumentLock<W> {
    /// Wait up to the configured timeout for exclusive access to the
    /// current contents of the workbook.
    pub fn lock(&self) -> Result<DocumentGuard<'_, W>> {
        let Some(mut guard) = self.inner.try_lock_for(self.timeout) else {
            warn!(timeout_ms = self.timeout.as_millis() as u64, "document lock timed out");
            return Err(RegistryError::LockTimeout(self.timeout).into());
        };
        guard.reload()?;
        Ok(guard)
    }

    /// Run `f` under a short-lived acquisition, for scans that happen before
    /// the mutating phase.
    pub fn read<T>(&self, f: impl FnOnce(&W) -> T) -> Result<T> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::MemoryWorkbook;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    #[test]
    fn second_acquirer_times_out() {
        let lock = Arc::new(DocumentLock::with_timeout(
            MemoryWorkbook::new(),
            Duration::from_millis(20),
        ));
        let held = lock.lock().unwrap();
        let other = Arc::clone(&lock);
        let err = std::thread::spawn(move || other.lock().map(|_| ()).unwrap_err())
            .join()
            .unwrap();
        assert_matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::LockTimeout(_))
        );
        drop(held);
        assert!(lock.lock().is_ok());
    }

    #[test]
    fn guard_releases_when_closure_fails() {
        let lock = DocumentLock::with_timeout(
            MemoryWorkbook::new().with_sheet("Trash", Vec::new()),
            Duration::from_millis(20),
        );
        let result: Result<()> = (|| {
            let _guard = lock.lock()?;
            anyhow::bail!("boom")
        })();
        assert!(result.is_err());
        assert!(lock.read(|wb| wb.has_sheet("Trash")).unwrap());
    }
}
