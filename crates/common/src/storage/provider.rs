use std::fmt::Debug;

use async_trait::async_trait;

#[async_trait]
pub trait StringStorage: Send + Sync + Debug {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the value stored under `key`
    ///
    /// # Returns
    /// * `Ok(None)` - Nothing is stored under the key
    /// * `Err(Self::Error)` - The backend could not be read
    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error>;

    /// Remove the value stored under `key`; absent keys are not an error
    async fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

#[async_trait]
impl<T: StringStorage + ?Sized> StringStorage for std::sync::Arc<T> {
    type Error = T::Error;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), Self::Error> {
        (**self).remove(key).await
    }
}
