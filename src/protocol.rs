// =============================================================================
// Coordinator <-> Backend message contract
// =============================================================================
//
// Transport-independent: inside this crate the messages travel over tokio
// channels, but the serde derives give the same schema a JSON form:
//
//   -> {"type":"SetDataset","datasetId":"..","timestamp":[..],"open":[..],...}
//   <- {"type":"DatasetReady","datasetId":".."}
//   -> {"type":"Compute","id":1,"indicator":"ma","params":[20],"datasetId":".."}
//   <- {"type":"ComputeResult","id":1,"ok":true,"series":[{},{"ma1":1.0}]}

use serde::{Deserialize, Serialize};

use crate::dataset::{Columns, DatasetId};
use crate::error::ComputeError;
use crate::types::Series;

/// Messages sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BackendRequest {
    SetDataset {
        dataset_id: DatasetId,
        #[serde(flatten)]
        columns: Columns,
    },
    Compute {
        id: u64,
        indicator: String,
        params: Vec<f64>,
        dataset_id: DatasetId,
    },
}

/// Messages emitted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum BackendResponse {
    DatasetReady {
        dataset_id: DatasetId,
    },
    ComputeResult {
        id: u64,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        series: Option<Series>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl BackendResponse {
    pub fn success(id: u64, series: Series) -> Self {
        Self::ComputeResult {
            id,
            ok: true,
            series: Some(series),
            error: None,
        }
    }

    pub fn failure(id: u64, err: &ComputeError) -> Self {
        Self::ComputeResult {
            id,
            ok: false,
            series: None,
            error: Some(err.to_string()),
        }
    }
}

/// Turn the `ok`/`series`/`error` triple back into a `Result`.
pub fn into_result(
    ok: bool,
    series: Option<Series>,
    error: Option<String>,
) -> Result<Series, ComputeError> {
    if ok {
        Ok(series.unwrap_or_default())
    } else {
        Err(ComputeError::from_message(
            error.unwrap_or_else(|| "computation failed".to_string()),
        ))
    }
}
