//! Autoscaler reconciliation. The group identity (name, flavor, disk,
//! spot flag) can only change through a disable/enable cycle; min/max
//! alone are edited in place.

use tfplug::context::Context;

use crate::api::projects::{EditAutoscalerCommand, EnableAutoscalerCommand};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::utils::gib_to_bytes;

use super::model::AutoscalerSpec;
use super::wait_ready;

async fn enable(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    spec: &AutoscalerSpec,
) -> Result<(), ApiError> {
    data.client
        .projects()
        .enable_autoscaler(&EnableAutoscalerCommand {
            project_id,
            autoscaling_group_name: spec.name.clone(),
            flavor: spec.flavor.clone(),
            disk_size: gib_to_bytes(spec.disk_size_gib),
            min_size: spec.min_size,
            max_size: spec.max_size,
            spot_enabled: spec.spot_enabled,
        })
        .await?;
    wait_ready(data, ctx, project_id).await
}

async fn disable(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
) -> Result<(), ApiError> {
    data.client.projects().disable_autoscaler(project_id).await?;
    wait_ready(data, ctx, project_id).await
}

pub async fn reconcile(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    prior: Option<&AutoscalerSpec>,
    planned: Option<&AutoscalerSpec>,
) -> Result<(), ApiError> {
    match (prior, planned) {
        (None, None) => Ok(()),
        (Some(_), None) => disable(data, ctx, project_id).await,
        (None, Some(new)) => enable(data, ctx, project_id, new).await,
        (Some(old), Some(new)) => {
            if old.identity_changed(new) {
                disable(data, ctx, project_id).await?;
                enable(data, ctx, project_id, new).await
            } else if old.min_size != new.min_size || old.max_size != new.max_size {
                data.client
                    .projects()
                    .edit_autoscaler(&EditAutoscalerCommand {
                        project_id,
                        min_size: new.min_size,
                        max_size: new.max_size,
                    })
                    .await?;
                wait_ready(data, ctx, project_id).await
            } else {
                Ok(())
            }
        }
    }
}
