use serde::Serialize;
use storelens_db::{Backend, CatalogStore};

/// Writes `value` to stdout as pretty-printed JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

/// The in-memory store lives and dies with this process.
pub(crate) fn warn_if_volatile(store: &dyn CatalogStore) {
    if store.backend() == Backend::Memory {
        tracing::warn!(
            "DATABASE_URL is not set: using an empty in-memory catalog that is discarded on exit"
        );
    }
}
