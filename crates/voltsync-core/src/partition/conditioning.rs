// Conditioning partition: preconditioning on/off.

use super::{FieldChange, FieldSet, Partition, SnapshotContext};
use crate::CoreError;

const NAME: &str = "conditioning";

#[derive(Debug, Default)]
pub struct ConditioningPartition {
    fields: FieldSet,
}

impl Partition for ConditioningPartition {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<FieldChange>, CoreError> {
        let Some(climate) = ctx.data.climate_state.as_ref() else {
            return Err(CoreError::MalformedResponse { partition: NAME });
        };

        let mut out = Vec::new();
        self.fields.set(
            NAME,
            "conditioning_on",
            climate.is_auto_conditioning_on,
            &mut out,
        );
        Ok(out)
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }
}
