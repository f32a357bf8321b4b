use crate::core::run_log::RunLog;
use crate::core::session::{Reply, ZuoraSession};
use crate::core::{Failure, FailureReason, Record, Success, Unit, UNKNOWN_ID};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "Success", default)]
    success: bool,
    #[serde(rename = "Id")]
    id: Option<String>,
}

/// Creates records one POST at a time.
pub struct RecordCreator {
    object: String,
}

impl RecordCreator {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
        }
    }

    pub async fn run(&self, session: &mut ZuoraSession, records: &[Record], log: &mut RunLog) {
        let url = session.create_url(&self.object);
        log.info(format!("Create URL: {}", url));

        for (index, record) in records.iter().enumerate() {
            let unit = Unit::Record { index };
            if tracing::enabled!(tracing::Level::DEBUG) {
                if let Ok(payload) = serde_json::to_string_pretty(record) {
                    tracing::debug!("Payload: {}", payload);
                }
            }

            match session.post_json(&url, record, log).await {
                Ok(reply) => match interpret(reply) {
                    Ok((id, after_refresh)) => {
                        log.record_success(Success {
                            unit,
                            ids: vec![id.clone()],
                            after_refresh,
                        });
                        if id != UNKNOWN_ID {
                            log.advance_watermark(index, &id);
                        }
                    }
                    Err((id, reason)) => log.record_failure(
                        Failure {
                            unit,
                            ids: vec![id],
                            reason,
                        },
                        index,
                    ),
                },
                Err(e) => log.record_failure(
                    Failure {
                        unit,
                        ids: vec![UNKNOWN_ID.to_string()],
                        reason: e.into(),
                    },
                    index,
                ),
            }
        }
    }
}

/// Maps a reply to the created id, or to the id available plus the reason.
fn interpret(reply: Reply) -> Result<(String, bool), (String, FailureReason)> {
    if !reply.is_ok() {
        return Err((
            UNKNOWN_ID.to_string(),
            FailureReason::Http {
                status: reply.status,
                body: reply.body,
            },
        ));
    }

    let response: CreateResponse = serde_json::from_str(&reply.body).map_err(|e| {
        (
            UNKNOWN_ID.to_string(),
            FailureReason::InvalidResponse(format!("{}: {}", e, reply.body)),
        )
    })?;
    let id = response.id.unwrap_or_else(|| UNKNOWN_ID.to_string());
    if response.success {
        Ok((id, reply.refreshed))
    } else {
        Err((id, FailureReason::Rejected { body: reply.body }))
    }
}
