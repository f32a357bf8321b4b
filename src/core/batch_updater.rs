use crate::core::run_log::RunLog;
use crate::core::session::ZuoraSession;
use crate::core::{Failure, Record, Success, Unit, ID_FIELD};
use crate::utils::error::{ImportError, Result};
use serde::Serialize;

/// Upper bound on objects per call to `/v1/action/update`.
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Serialize)]
struct UpdateRequest<'a> {
    objects: &'a [Record],
    #[serde(rename = "type")]
    object_type: &'a str,
}

/// Sends records to the bulk update action in fixed-size batches.
///
/// A batch is all-or-nothing: every record in it is reported with the same
/// outcome. Batches run one after another so the watermark only ever reflects
/// a batch that has been confirmed.
pub struct BatchUpdater {
    object: String,
    batch_size: usize,
}

impl BatchUpdater {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            batch_size: MAX_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn run(&self, session: &mut ZuoraSession, records: &[Record], log: &mut RunLog) {
        let url = session.update_url();
        log.info(format!("Update URL: {}", url));

        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            let unit = Unit::Batch { index };
            let ids: Vec<String> = batch.iter().map(Record::id_or_unknown).collect();
            log.info(format!("Processing {} with records: {:?}", unit, ids));

            let first_position = index * self.batch_size;
            match self.submit(session, &url, batch, log).await {
                Ok(after_refresh) => {
                    let last_position = first_position + batch.len() - 1;
                    let last_id = ids.last().cloned().unwrap_or_default();
                    log.record_success(Success {
                        unit,
                        ids,
                        after_refresh,
                    });
                    log.advance_watermark(last_position, &last_id);
                }
                Err(e) => {
                    log.record_failure(
                        Failure {
                            unit,
                            ids,
                            reason: e.into(),
                        },
                        first_position,
                    );
                    log.log_watermark();
                }
            }
        }
    }

    /// Returns whether the batch only went through after a token refresh.
    async fn submit(
        &self,
        session: &mut ZuoraSession,
        url: &str,
        batch: &[Record],
        log: &mut RunLog,
    ) -> Result<bool> {
        if batch.iter().any(|record| record.id().is_none()) {
            return Err(ImportError::FieldError {
                field: ID_FIELD.to_string(),
            });
        }

        let request = UpdateRequest {
            objects: batch,
            object_type: &self.object,
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(payload) = serde_json::to_string(&request) {
                tracing::debug!("Payload: {}", payload);
            }
        }

        let reply = session.post_json(url, &request, log).await?;
        if reply.is_ok() {
            Ok(reply.refreshed)
        } else {
            Err(ImportError::HttpError {
                status: reply.status,
                body: reply.body,
            })
        }
    }
}
