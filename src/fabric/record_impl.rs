use super::*;
use crate::connection::config::RecordMatchPolicy;
use crate::core::GlobalId;
use tracing::{Instrument, info_span};

/// Outcome of resolving a record name.
#[derive(Debug, Clone)]
pub struct RecordResolution {
    pub record: Record,
    /// True when the record did not exist and was added.
    pub created: bool,
    /// Set when the record was added but the edit session was not released.
    pub release_error: Option<FabricError>,
}

impl FabricClient {
    /// Looks a record up by exact name without creating it.
    ///
    /// With [`RecordMatchPolicy::FirstMatch`] the first match wins; with
    /// [`RecordMatchPolicy::RejectAmbiguous`] several matches are an error.
    pub async fn find_record(&self, name: &str) -> Result<Option<Record>> {
        let matches = self.query_records(name).await?;
        if matches.len() > 1 && self.config.record_match == RecordMatchPolicy::RejectAmbiguous {
            return Err(FabricError::AmbiguousRecord {
                name: name.to_string(),
                matches: matches.len(),
            });
        }
        if matches.len() > 1 {
            event!(
                Level::WARN,
                record = %name,
                matches = matches.len(),
                "record name is ambiguous, using first match"
            );
        }
        Ok(matches.into_iter().next())
    }

    /// Whether at least one record carries `name`.
    pub async fn record_exists(&self, name: &str) -> Result<bool> {
        Ok(!self.query_records(name).await?.is_empty())
    }

    /// Find-or-create: makes the record named `name` the active record.
    ///
    /// An existing record is reused without opening a session. Otherwise a new
    /// record is added inside an edit session (see [`FabricClient::create_record`]).
    /// On failure the active record is left unchanged.
    pub async fn resolve_record(&self, name: &str) -> Result<RecordResolution> {
        require_record_name(name)?;
        let span = info_span!(
            "fabric.record.resolve",
            record = %name,
            version = %self.context.version_name()
        );

        async move {
            if let Some(record) = self.find_record(name).await? {
                event!(Level::INFO, record_id = %record.id(), "existing record reused");
                self.replace_active_record(record.clone()).await;
                self.notify(Notice::RecordReused {
                    name: record.name().to_string(),
                });
                return Ok(RecordResolution {
                    record,
                    created: false,
                    release_error: None,
                });
            }

            self.create_record(name).await
        }
        .instrument(span)
        .await
    }

    /// Adds a record named `name` and makes it the active record.
    ///
    /// Inside one edit session: reserve one object id on the records layer,
    /// generate the record's global id, submit the add. Does not check for an
    /// existing record with the same name.
    pub async fn create_record(&self, name: &str) -> Result<RecordResolution> {
        require_record_name(name)?;
        let span = info_span!("fabric.record.create", record = %name);

        async move {
            let records_url = self.config.records_layer_url();
            let apply_edits_url = self.config.apply_edits_url();

            let added = self
                .with_session(|ticket| async move {
                    let reservation = self.context.reserve_object_ids(&records_url, 1).await?;
                    let global_id = GlobalId::from_generated(&self.context.generate_unique_id())?;

                    let edits = payload::record_add_edits(
                        &self.config,
                        reservation.first_object_id,
                        &global_id,
                        name,
                    );
                    let params = payload::record_add_params(
                        ticket.session_id.as_str(),
                        &ticket.version_name,
                        &edits,
                    );
                    let response = self.transport.post(&apply_edits_url, &params).await?;
                    payload::interpret_record_add(&response, &global_id)
                })
                .await;

            let added = match added {
                Ok(added) => added,
                Err(err) => {
                    event!(Level::ERROR, error = %err, "record creation failed");
                    self.notify(Notice::OperationFailed {
                        operation: "createRecord".to_string(),
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            };

            let record = Record::new(name, added.value);
            event!(Level::INFO, record_id = %record.id(), "record created");
            self.replace_active_record(record.clone()).await;
            self.notify(Notice::RecordCreated {
                name: record.name().to_string(),
                id: record.id().clone(),
            });

            Ok(RecordResolution {
                record,
                created: true,
                release_error: added.release_error,
            })
        }
        .instrument(span)
        .await
    }

    async fn query_records(&self, name: &str) -> Result<Vec<Record>> {
        let url = format!("{}/query", self.config.records_layer_url());
        let params = payload::record_query_params(name, &self.context.version_name());
        let response = self.transport.post(&url, &params).await?;
        payload::parse_record_features(&response, name)
    }
}

fn require_record_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FabricError::InvalidInput(
            "record name cannot be empty".to_string(),
        ));
    }
    Ok(())
}
