use crate::config::ImportConfig;
use crate::core::batch_updater::BatchUpdater;
use crate::core::record_creator::RecordCreator;
use crate::core::run_log::RunLog;
use crate::core::session::{self, ZuoraSession};
use crate::core::token::OAuthTokenProvider;
use crate::core::{source, Action, ImportReport, Record, TokenProvider, Unit};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;

/// Runs one CSV through Zuora with the given configuration.
pub async fn run_import(config: ImportConfig, csv: &[u8]) -> Result<ImportReport> {
    ImportEngine::new(config)?.run(csv).await
}

pub struct ImportEngine {
    config: ImportConfig,
    client: Client,
    provider: Arc<dyn TokenProvider>,
}

impl ImportEngine {
    pub fn new(config: ImportConfig) -> Result<Self> {
        let client = Self::build_client(&config)?;
        let provider = Arc::new(OAuthTokenProvider::from_config(client.clone(), &config));
        Ok(Self {
            config,
            client,
            provider,
        })
    }

    pub fn with_token_provider(
        config: ImportConfig,
        provider: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let client = Self::build_client(&config)?;
        Ok(Self {
            config,
            client,
            provider,
        })
    }

    fn build_client(config: &ImportConfig) -> Result<Client> {
        Ok(Client::builder()
            .timeout(config.request_timeout())
            .build()?)
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Fails only on setup problems: bad configuration, unreadable CSV, or no
    /// initial token. Per-batch and per-record failures land in the report.
    pub async fn run(&self, csv: &[u8]) -> Result<ImportReport> {
        let started_at = Utc::now();
        self.config.validate()?;

        let records = source::parse(csv)?;
        let mut log = RunLog::with_row_offset(self.config.skip_rows);
        let records = self.apply_skip(records, &mut log);

        log.info(format!(
            "Starting {} of {} {} records",
            self.config.action,
            records.len(),
            self.config.object
        ));
        log.info(format!("Auth URL: {}", self.config.auth_url));

        let mut session = ZuoraSession::start(
            self.client.clone(),
            &self.config.api_url,
            Arc::clone(&self.provider),
            &mut log,
        )
        .await?;

        match self.config.action {
            Action::Update => {
                BatchUpdater::new(&self.config.object)
                    .with_batch_size(self.config.batch_size)
                    .run(&mut session, &records, &mut log)
                    .await
            }
            Action::Create => {
                RecordCreator::new(&self.config.object)
                    .run(&mut session, &records, &mut log)
                    .await
            }
        }

        let report_summary = summarize(&log);
        log.info(report_summary);
        log.log_watermark();

        Ok(log.finish(
            self.config.action,
            &self.config.object,
            session.refreshes(),
            false,
            started_at,
        ))
    }

    /// Parses and lays out the work without authenticating or sending anything.
    pub fn plan(&self, csv: &[u8]) -> Result<ImportReport> {
        let started_at = Utc::now();
        self.config.validate()?;

        let records = source::parse(csv)?;
        let mut log = RunLog::with_row_offset(self.config.skip_rows);
        let records = self.apply_skip(records, &mut log);

        log.info(format!(
            "Dry run: {} of {} {} records",
            self.config.action,
            records.len(),
            self.config.object
        ));
        log.info(format!("Auth URL: {}", self.config.auth_url));

        match self.config.action {
            Action::Update => {
                let updater =
                    BatchUpdater::new(&self.config.object).with_batch_size(self.config.batch_size);
                log.info(format!(
                    "Update URL: {}",
                    session::update_url(&self.config.api_url)
                ));
                for (index, batch) in records.chunks(updater.batch_size()).enumerate() {
                    let ids: Vec<String> = batch.iter().map(Record::id_or_unknown).collect();
                    let missing = batch.iter().filter(|r| r.id().is_none()).count();
                    if missing > 0 {
                        log.warn(format!(
                            "Would fail {}: {} record(s) without Id",
                            Unit::Batch { index },
                            missing
                        ));
                    } else {
                        log.info(format!(
                            "Would send {} with records: {:?}",
                            Unit::Batch { index },
                            ids
                        ));
                    }
                }
            }
            Action::Create => {
                log.info(format!(
                    "Create URL: {}",
                    session::create_url(&self.config.api_url, &self.config.object)
                ));
                log.info(format!("Would send {} create requests", records.len()));
            }
        }

        Ok(log.finish(
            self.config.action,
            &self.config.object,
            0,
            true,
            started_at,
        ))
    }

    fn apply_skip(&self, records: Vec<Record>, log: &mut RunLog) -> Vec<Record> {
        let skip = self.config.skip_rows;
        if skip == 0 {
            return records;
        }
        if skip >= records.len() {
            log.warn(format!(
                "Skipping {} rows leaves nothing to import ({} rows in file)",
                skip,
                records.len()
            ));
            return Vec::new();
        }
        log.info(format!("Skipping the first {} rows", skip));
        records.into_iter().skip(skip).collect()
    }
}

fn summarize(log: &RunLog) -> String {
    let (mut ok, mut failed) = (0usize, 0usize);
    for result in log.results() {
        match result {
            Ok(success) => ok += success.ids.len(),
            Err(failure) => failed += failure.ids.len(),
        }
    }
    format!("Finished: {} records succeeded, {} records failed", ok, failed)
}
