use std::sync::Arc;

use crate::{
    dispatch::{DispatchHandle, Dispatcher, Recipients},
    report,
    store::RecordStore,
    structures::{errors::StatusBoardError, model::StatusRecord},
};

/// The operations callers can perform, independent of the transport.
#[derive(Clone)]
pub struct StatusBoard {
    store: Arc<dyn RecordStore>,
    dispatcher: Dispatcher,
    report_title: String,
}

impl StatusBoard {
    pub fn new(
        store: Arc<dyn RecordStore>,
        dispatcher: Dispatcher,
        report_title: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            report_title: report_title.into(),
        }
    }

    pub async fn submit(&self, site_name: &str, status: &str) -> Result<(), StatusBoardError> {
        Ok(self.store.append(site_name, status).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<StatusRecord>, StatusBoardError> {
        Ok(self.store.list_all().await?)
    }

    /// Renders the current records and starts sending them. Returns once the
    /// sends are started; the handle can be dropped to let them run detached.
    pub async fn report_and_send(
        &self,
        recipients: Recipients,
    ) -> Result<DispatchHandle, StatusBoardError> {
        let records = self.store.list_all().await?;
        let report = report::render(&self.report_title, &records)?;
        Ok(self.dispatcher.dispatch(&report, recipients))
    }

    pub async fn clear_all(&self) -> Result<(), StatusBoardError> {
        Ok(self.store.clear_all().await?)
    }
}
