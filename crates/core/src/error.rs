use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("intake queue is full")]
    IntakeFull,

    #[error(transparent)]
    Store(#[from] digest_store::StoreError),

    #[error(transparent)]
    Adapter(#[from] digest_adapters::AdapterError),
}
