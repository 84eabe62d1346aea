use super::*;
use crate::core::{EditOutcome, FabricOperation, GlobalId, ParcelFeatureRef, RequestParams};
use tracing::{Instrument, info_span};

impl FabricClient {
    /// Tags a feature with the active record by writing the record id into its
    /// `CreatedByRecord` attribute (configurable).
    ///
    /// A feature must belong to a record before it can take part in the other
    /// fabric operations.
    pub async fn assign_feature_to_record(
        &self,
        layer_id: u32,
        feature_id: &GlobalId,
    ) -> Result<EditOutcome> {
        let params = payload::assign_params(&self.config, layer_id, feature_id)?;
        self.run_operation(FabricOperation::AssignFeaturesToRecord, params)
            .await
    }

    /// Creates parcel seeds for closed loops of lines in the active record.
    pub async fn create_seeds(&self) -> Result<EditOutcome> {
        let params = payload::record_scoped_params(&self.config);
        self.run_operation(FabricOperation::CreateSeeds, params).await
    }

    /// Builds the active record's parcels from its seeds and lines.
    pub async fn build_record(&self) -> Result<EditOutcome> {
        let params = payload::record_scoped_params(&self.config);
        self.run_operation(FabricOperation::Build, params).await
    }

    /// Copies the lines of the selected parcels to the configured target parcel
    /// type, marking the parents historic.
    pub async fn copy_lines_to(&self, selected: &[ParcelFeatureRef]) -> Result<EditOutcome> {
        let params = payload::copy_lines_params(&self.config, selected)?;
        self.run_operation(FabricOperation::CopyLinesToParcelType, params)
            .await
    }

    /// Merges the selected parcels into a new parcel named `merged_name`.
    ///
    /// The new parcel lands in the layer of the first selected feature.
    pub async fn merge_parcels(
        &self,
        merged_name: &str,
        stated_area: f64,
        selected: &[ParcelFeatureRef],
    ) -> Result<EditOutcome> {
        let params = payload::merge_params(
            &self.config,
            merged_name,
            stated_area,
            selected,
            payload::current_moment(),
        )?;
        self.run_operation(FabricOperation::Merge, params).await
    }

    /// Submits one fabric operation for the active record inside its own session.
    async fn run_operation(
        &self,
        operation: FabricOperation,
        operation_params: RequestParams,
    ) -> Result<EditOutcome> {
        let record = self.require_active_record().await?;
        let span = info_span!(
            "fabric.operation",
            operation = %operation,
            record = %record.name(),
            version = %self.context.version_name()
        );

        async move {
            let url = self.config.operation_url(operation.endpoint());
            let submitted = self
                .with_session(move |ticket| async move {
                    let mut params = RequestParams::json()
                        .with("gdbVersion", &ticket.version_name)
                        .with("sessionId", &ticket.session_id)
                        .with("record", record.id());
                    params.extend(operation_params);

                    let response = self.transport.post(&url, &params).await?;
                    payload::interpret_operation(operation, &response)
                })
                .await;

            match submitted {
                Ok(released) => {
                    event!(Level::INFO, clean = released.is_clean(), "fabric operation applied");
                    self.notify(Notice::OperationApplied { operation });
                    Ok(EditOutcome {
                        operation,
                        service_edits: released.value,
                        release_error: released.release_error,
                    })
                }
                Err(err) => {
                    event!(Level::ERROR, error = %err, "fabric operation failed");
                    self.notify(Notice::OperationFailed {
                        operation: operation.to_string(),
                        message: err.to_string(),
                    });
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
